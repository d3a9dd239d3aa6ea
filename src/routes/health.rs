use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /
/// Service banner.
pub async fn handle_root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the Scrivener document generation service",
        "service": "scrivener-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health
/// Liveness plus compiler/cache readiness flags.
pub async fn handle_health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "compiler_ready": true,
        "fonts_loaded": state.ctx.compiler.font_count(),
        "cache_connected": state.ctx.cache.connected(),
    }))
}

/// GET /metrics
/// Cache counters plus job queue depth.
pub async fn handle_metrics(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "cache": state.ctx.cache.metrics(),
        "jobs": { "queue_depth": state.jobs.queue_depth() },
    }))
}
