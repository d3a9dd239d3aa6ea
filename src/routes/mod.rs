pub mod health;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::jobs::handlers as jobs;
use crate::middleware::rate_limit;
use crate::render::handlers as render;
use crate::state::AppState;
use crate::templates::handlers as templates;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::handle_root))
        .route("/health", get(health::handle_health))
        .route("/metrics", get(health::handle_metrics))
        // ── Registry & schemas ─────────────────────────────────────────────
        .route("/templates", get(templates::handle_list_templates))
        .route(
            "/templates/:doc_type",
            get(templates::handle_list_templates_by_type),
        )
        .route(
            "/template-info/:doc_type/:name",
            get(templates::handle_template_info),
        )
        .route("/schema/:doc_type", get(templates::handle_schema))
        // ── Validation & analysis ──────────────────────────────────────────
        .route("/validate", post(render::handle_validate))
        .route("/analyze", post(render::handle_analyze))
        .route("/analyze-pdf", post(render::handle_analyze_pdf))
        // ── Rendering ──────────────────────────────────────────────────────
        .route("/generate", post(render::handle_generate))
        .route("/generate-yaml", post(render::handle_generate_yaml))
        // ── Async jobs ─────────────────────────────────────────────────────
        .route("/generate/async", post(jobs::handle_submit))
        .route("/jobs/:id", get(jobs::handle_status))
        .route("/jobs/:id/download", get(jobs::handle_download))
        .route("/jobs/:id/cancel", post(jobs::handle_cancel))
        .layer(from_fn_with_state(state.clone(), rate_limit::limit))
        .with_state(state)
}
