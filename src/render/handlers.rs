//! Axum route handlers for the rendering pipeline.

use axum::{
    extract::State,
    http::{header, HeaderName},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::models::{DocumentRequest, DocumentType, SpacingMode, YamlDocumentRequest};
use crate::state::AppState;
use crate::templates::{analysis, spacing, TemplateConfig};
use crate::validation;

use super::{generate_with_deadline, RenderedDocument};

/// Flushes an artifact as a binary attachment.
pub fn attachment_response(document: RenderedDocument) -> Response {
    (
        [
            (header::CONTENT_TYPE, document.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", document.filename),
            ),
            (
                HeaderName::from_static("x-cache"),
                document.cache_status.header_value().to_string(),
            ),
        ],
        document.bytes,
    )
        .into_response()
}

/// POST /generate
///
/// Synchronous render. Returns PDF/DOCX bytes or Typst source text with an
/// `X-Cache: HIT|MISS` marker.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<DocumentRequest>,
) -> Result<Response, AppError> {
    let document = generate_with_deadline(&state.ctx, &request).await?;
    Ok(attachment_response(document))
}

/// POST /generate-yaml
///
/// Same contract as /generate, but `data` arrives as YAML text. Parsed with
/// a safe loader; no code execution.
pub async fn handle_generate_yaml(
    State(state): State<AppState>,
    Json(request): Json<YamlDocumentRequest>,
) -> Result<Response, AppError> {
    let data: Value =
        serde_yaml::from_str(&request.data).map_err(|e| AppError::Yaml(e.to_string()))?;

    let request = DocumentRequest {
        document_type: request.document_type,
        template: request.template,
        format: request.format,
        data,
        ultra_validation: request.ultra_validation,
        spacing_mode: request.spacing_mode,
    };
    let document = generate_with_deadline(&state.ctx, &request).await?;
    Ok(attachment_response(document))
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub data: Value,
    #[serde(default)]
    pub ultra_validation: bool,
}

/// POST /validate
///
/// Runs the validator without rendering. Returns the normalized data and any
/// warnings.
pub async fn handle_validate(
    Json(request): Json<ValidateRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = validation::validate(&request.data, request.ultra_validation)?;
    Ok(Json(json!({
        "valid": true,
        "data": outcome.data,
        "warnings": outcome.warnings,
    })))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub document_type: DocumentType,
    #[serde(default)]
    pub template: Option<String>,
    pub data: Value,
    #[serde(default)]
    pub spacing_mode: Option<SpacingMode>,
}

/// POST /analyze
///
/// Content metrics and layout recommendations via the template helper.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<Value>, AppError> {
    let template = request.template.as_deref().unwrap_or("classic");
    let helper = state.ctx.registry.create(
        request.document_type,
        template,
        request.data.clone(),
        TemplateConfig {
            spacing_mode: request.spacing_mode,
        },
    )?;
    Ok(Json(json!({ "analysis": helper.analyze_document() })))
}

/// POST /analyze-pdf
///
/// Extended whitespace/density analysis.
pub async fn handle_analyze_pdf(
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<Value>, AppError> {
    let mode = spacing::resolve(request.spacing_mode, &request.data);
    let density = analysis::analyze_density(&request.data, mode);
    Ok(Json(json!({ "analysis": density })))
}
