//! End-to-end tests against the full router, with the cache in disabled mode
//! and no Redis backend (the degraded configuration the service must keep
//! serving in).

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use scrivener_api::cache::DocumentCache;
use scrivener_api::compiler::TypstCompiler;
use scrivener_api::config::Config;
use scrivener_api::jobs::worker::JobQueue;
use scrivener_api::jobs::JobStore;
use scrivener_api::middleware::rate_limit::RateLimiter;
use scrivener_api::render::RenderContext;
use scrivener_api::routes::build_router;
use scrivener_api::state::AppState;
use scrivener_api::templates::TemplateRegistry;

fn app() -> Router {
    let config = Config::from_env().unwrap();
    let ctx = RenderContext::new(
        Arc::new(TemplateRegistry::new()),
        Arc::new(TypstCompiler::new(None).unwrap()),
        DocumentCache::disabled(),
        2,
        config.max_pdf_size_bytes,
        Duration::from_secs(60),
    );
    let jobs = JobQueue::start(JobStore::new(None), 2, ctx.clone());
    let limiter = RateLimiter::disabled(60, 20);
    build_router(AppState {
        config,
        ctx,
        jobs,
        limiter,
    })
}

async fn send(
    router: Router,
    method: &str,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let builder = Request::builder().method(method).uri(path);
    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, headers, bytes)
}

fn as_json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

fn minimal_resume_request(format: &str) -> Value {
    json!({
        "document_type": "resume",
        "template": "classic",
        "format": format,
        "data": {"personalInfo": {"name": "A B", "email": "a@b.co"}},
    })
}

#[tokio::test]
async fn test_banner_and_health() {
    let (status, _, body) = send(app(), "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body)["service"], "scrivener-api");

    let (status, _, body) = send(app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    let health = as_json(&body);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["compiler_ready"], true);
    assert_eq!(health["cache_connected"], false);
}

#[tokio::test]
async fn test_metrics_report_disconnected_cache() {
    let (status, _, body) = send(app(), "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    let metrics = as_json(&body);
    assert_eq!(metrics["cache"]["connected"], false);
    assert_eq!(metrics["cache"]["enabled"], false);
}

#[tokio::test]
async fn test_templates_listing_and_slice() {
    let (status, _, body) = send(app(), "GET", "/templates", None).await;
    assert_eq!(status, StatusCode::OK);
    let listing = as_json(&body);
    assert_eq!(listing["templates"]["resume"], json!(["classic", "two_column"]));
    assert_eq!(listing["templates"]["cover_letter"], json!(["classic", "modern"]));

    let (status, _, body) = send(app(), "GET", "/templates/resume", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body)["templates"], json!(["classic", "two_column"]));

    let (status, _, _) = send(app(), "GET", "/templates/poster", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_template_info_and_schema() {
    let (status, _, body) = send(app(), "GET", "/template-info/resume/two_column", None).await;
    assert_eq!(status, StatusCode::OK);
    let info = as_json(&body);
    assert_eq!(info["name"], "two_column");
    assert_eq!(info["document_type"], "resume");

    let (status, _, body) = send(app(), "GET", "/schema/cover_letter", None).await;
    assert_eq!(status, StatusCode::OK);
    let schema = as_json(&body);
    assert!(schema["schema"]["required"]
        .as_array()
        .unwrap()
        .contains(&json!("body")));
    assert!(schema["example"]["personalInfo"]["email"].is_string());
}

#[tokio::test]
async fn test_validate_accepts_and_normalizes() {
    let (status, _, body) = send(
        app(),
        "POST",
        "/validate",
        Some(json!({
            "data": {"personalInfo": {"name": "A", "email": " A@B.Co", "github": "github.com/a"}},
            "ultra_validation": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let result = as_json(&body);
    assert_eq!(result["valid"], true);
    assert_eq!(result["data"]["personalInfo"]["email"], "a@b.co");
    assert_eq!(result["warnings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_email_yields_val001_with_field_path() {
    let (status, _, body) = send(
        app(),
        "POST",
        "/generate",
        Some(json!({
            "document_type": "resume",
            "template": "classic",
            "format": "typst",
            "data": {"personalInfo": {"name": "A"}},
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = as_json(&body);
    assert_eq!(error["error"]["code"], "VAL001");
    assert_eq!(error["error"]["context"]["field"], "personalInfo.email");
}

#[tokio::test]
async fn test_unknown_template_yields_tpl001_with_hint() {
    let (status, _, body) = send(
        app(),
        "POST",
        "/generate",
        Some(json!({
            "document_type": "resume",
            "template": "neon",
            "data": {"personalInfo": {"name": "A", "email": "a@b.co"}},
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let error = as_json(&body);
    assert_eq!(error["error"]["code"], "TPL001");
    assert_eq!(
        error["error"]["context"]["available_templates"],
        "classic, two_column"
    );
}

#[tokio::test]
async fn test_generate_typst_source_with_filename_and_cache_miss() {
    let (status, headers, body) =
        send(app(), "POST", "/generate", Some(minimal_resume_request("typst"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-cache"], "MISS");
    assert!(headers["content-disposition"]
        .to_str()
        .unwrap()
        .contains("resume_A_B.typ"));
    let source = String::from_utf8(body).unwrap();
    assert!(source.contains("#set page"));
    assert!(source.contains("A B"));
}

#[tokio::test]
async fn test_generate_pdf_returns_pdf_bytes() {
    let (status, headers, body) =
        send(app(), "POST", "/generate", Some(minimal_resume_request("pdf"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "application/pdf");
    assert_eq!(headers["x-cache"], "MISS");
    assert!(headers["content-disposition"]
        .to_str()
        .unwrap()
        .contains("resume_A_B.pdf"));
    assert!(body.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_generate_docx_bypasses_cache() {
    let (status, headers, body) =
        send(app(), "POST", "/generate", Some(minimal_resume_request("docx"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-cache"], "BYPASS");
    assert!(body.starts_with(b"PK"));
}

#[tokio::test]
async fn test_cover_letter_array_body_paragraphs_in_source() {
    let (status, _, body) = send(
        app(),
        "POST",
        "/generate",
        Some(json!({
            "document_type": "cover_letter",
            "template": "classic",
            "format": "typst",
            "data": {
                "personalInfo": {"name": "A B", "email": "a@b.co"},
                "body": ["P1", "P2"],
            },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let source = String::from_utf8(body).unwrap();
    assert!(source.contains("P1\n\nP2"), "paragraphs missing: {source}");
}

#[tokio::test]
async fn test_generate_yaml_matches_json_output() {
    let json_request = json!({
        "document_type": "resume",
        "template": "classic",
        "format": "typst",
        "data": {"personalInfo": {"name": "A B", "email": "a@b.co"}},
    });
    let yaml_request = json!({
        "document_type": "resume",
        "template": "classic",
        "format": "typst",
        "data": "personalInfo:\n  name: A B\n  email: a@b.co\n",
    });

    let (status_a, _, body_a) = send(app(), "POST", "/generate", Some(json_request)).await;
    let (status_b, _, body_b) = send(app(), "POST", "/generate-yaml", Some(yaml_request)).await;
    assert_eq!(status_a, StatusCode::OK);
    assert_eq!(status_b, StatusCode::OK);
    assert_eq!(body_a, body_b);
}

#[tokio::test]
async fn test_generate_yaml_rejects_bad_yaml() {
    let (status, _, body) = send(
        app(),
        "POST",
        "/generate-yaml",
        Some(json!({
            "document_type": "resume",
            "template": "classic",
            "data": "personalInfo: [unclosed",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(as_json(&body)["error"]["code"], "VAL014");
}

#[tokio::test]
async fn test_long_paragraph_renders_untruncated() {
    let long = "x".repeat(10_000);
    let (status, _, body) = send(
        app(),
        "POST",
        "/generate",
        Some(json!({
            "document_type": "cover_letter",
            "template": "classic",
            "format": "typst",
            "data": {
                "personalInfo": {"name": "A B", "email": "a@b.co"},
                "body": long,
            },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let source = String::from_utf8(body).unwrap();
    assert!(source.contains(&"x".repeat(10_000)));
}

#[tokio::test]
async fn test_analyze_returns_metrics() {
    let (status, _, body) = send(
        app(),
        "POST",
        "/analyze",
        Some(json!({
            "document_type": "resume",
            "template": "classic",
            "data": {
                "personalInfo": {"name": "A B", "email": "a@b.co"},
                "professionalSummary": "A summary of reasonable length.",
            },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let analysis = &as_json(&body)["analysis"];
    assert!(analysis["total_words"].as_u64().unwrap() > 0);
    assert_eq!(analysis["lines_per_page"], 52);
}

#[tokio::test]
async fn test_analyze_pdf_returns_density() {
    let (status, _, body) = send(
        app(),
        "POST",
        "/analyze-pdf",
        Some(json!({
            "document_type": "resume",
            "data": {
                "personalInfo": {"name": "A B", "email": "a@b.co"},
                "professionalSummary": "Summary.",
            },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let analysis = &as_json(&body)["analysis"];
    assert!(analysis["whitespace_ratio"].is_number());
    assert!(analysis["section_density"].is_array());
}

#[tokio::test]
async fn test_async_submit_poll_download() {
    let router = app();

    let (status, _, body) = send(
        router.clone(),
        "POST",
        "/generate/async",
        Some(minimal_resume_request("typst")),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let submitted = as_json(&body);
    assert_eq!(submitted["state"], "pending");
    let job_id = submitted["job_id"].as_str().unwrap().to_string();

    let mut state = String::new();
    for _ in 0..600 {
        let (status, _, body) =
            send(router.clone(), "GET", &format!("/jobs/{job_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        state = as_json(&body)["state"].as_str().unwrap().to_string();
        if state == "success" || state == "failed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(state, "success");

    let (status, headers, body) = send(
        router.clone(),
        "GET",
        &format!("/jobs/{job_id}/download"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers["content-disposition"]
        .to_str()
        .unwrap()
        .contains("resume_A_B.typ"));
    assert!(String::from_utf8(body).unwrap().contains("#set page"));
}

#[tokio::test]
async fn test_job_status_unknown_id_is_404() {
    let (status, _, body) = send(
        app(),
        "GET",
        "/jobs/00000000-0000-0000-0000-000000000000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(as_json(&body)["error"]["code"], "API011");
}

#[tokio::test]
async fn test_identical_requests_yield_identical_bytes() {
    // Determinism law: generate(data) == generate(data), even with the
    // cache disabled.
    let request = minimal_resume_request("pdf");
    let (_, _, first) = send(app(), "POST", "/generate", Some(request.clone())).await;
    let (_, _, second) = send(app(), "POST", "/generate", Some(request)).await;
    assert_eq!(first, second);
}
