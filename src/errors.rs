//! Application error taxonomy.
//!
//! Every failure surfaced over HTTP carries a stable code (`VAL001`,
//! `TPL001`, ...) with a category, severity, title, and suggested fix. The
//! wire envelope is:
//!
//! ```json
//! {"error": {"code", "category", "severity", "title", "message",
//!            "suggestedFix", "timestamp", "context"}}
//! ```
//!
//! `AppError` implements `IntoResponse` so axum handlers can return
//! `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::compiler::CompileError;
use crate::validation::ValidationError;

// ────────────────────────────────────────────────────────────────────────────
// Stable error codes
// ────────────────────────────────────────────────────────────────────────────

/// Stable, client-visible error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "VAL001")]
    Val001, // missing required field
    #[serde(rename = "VAL002")]
    Val002, // invalid field type
    #[serde(rename = "VAL003")]
    Val003, // invalid email format
    #[serde(rename = "VAL005")]
    Val005, // invalid URL format
    #[serde(rename = "VAL006")]
    Val006, // invalid date format
    #[serde(rename = "VAL013")]
    Val013, // invalid JSON structure
    #[serde(rename = "VAL014")]
    Val014, // invalid YAML structure
    #[serde(rename = "TPL001")]
    Tpl001, // template not found
    #[serde(rename = "TPL002")]
    Tpl002, // typst compilation failed
    #[serde(rename = "TPL003")]
    Tpl003, // template rendering failed
    #[serde(rename = "TPL008")]
    Tpl008, // PDF generation failed
    #[serde(rename = "TPL011")]
    Tpl011, // format not supported
    #[serde(rename = "API001")]
    Api001, // malformed request
    #[serde(rename = "API003")]
    Api003, // invalid request parameter
    #[serde(rename = "API004")]
    Api004, // request timeout
    #[serde(rename = "API005")]
    Api005, // rate limit exceeded
    #[serde(rename = "API007")]
    Api007, // request too large
    #[serde(rename = "API011")]
    Api011, // resource not found
    #[serde(rename = "API013")]
    Api013, // service unavailable
    #[serde(rename = "SYS001")]
    Sys001, // internal server error
    #[serde(rename = "SYS009")]
    Sys009, // resource exhausted
    #[serde(rename = "SEC001")]
    Sec001, // malicious input detected
    #[serde(rename = "SEC006")]
    Sec006, // size limit exceeded
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Val001 => "VAL001",
            ErrorCode::Val002 => "VAL002",
            ErrorCode::Val003 => "VAL003",
            ErrorCode::Val005 => "VAL005",
            ErrorCode::Val006 => "VAL006",
            ErrorCode::Val013 => "VAL013",
            ErrorCode::Val014 => "VAL014",
            ErrorCode::Tpl001 => "TPL001",
            ErrorCode::Tpl002 => "TPL002",
            ErrorCode::Tpl003 => "TPL003",
            ErrorCode::Tpl008 => "TPL008",
            ErrorCode::Tpl011 => "TPL011",
            ErrorCode::Api001 => "API001",
            ErrorCode::Api003 => "API003",
            ErrorCode::Api004 => "API004",
            ErrorCode::Api005 => "API005",
            ErrorCode::Api007 => "API007",
            ErrorCode::Api011 => "API011",
            ErrorCode::Api013 => "API013",
            ErrorCode::Sys001 => "SYS001",
            ErrorCode::Sys009 => "SYS009",
            ErrorCode::Sec001 => "SEC001",
            ErrorCode::Sec006 => "SEC006",
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::Sec001 | ErrorCode::Sec006 => "security",
            other => match &other.as_str()[..3] {
                "VAL" => "validation",
                "TPL" => "template",
                "API" => "api",
                _ => "system",
            },
        }
    }

    pub fn severity(&self) -> &'static str {
        match self {
            ErrorCode::Sys001 | ErrorCode::Sec001 => "critical",
            _ => "error",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ErrorCode::Val001 => "Required Field Missing",
            ErrorCode::Val002 => "Invalid Field Type",
            ErrorCode::Val003 => "Invalid Email Format",
            ErrorCode::Val005 => "Invalid URL Format",
            ErrorCode::Val006 => "Invalid Date Format",
            ErrorCode::Val013 => "Invalid JSON Structure",
            ErrorCode::Val014 => "Invalid YAML Structure",
            ErrorCode::Tpl001 => "Template Not Found",
            ErrorCode::Tpl002 => "Typst Compilation Failed",
            ErrorCode::Tpl003 => "Template Rendering Failed",
            ErrorCode::Tpl008 => "PDF Generation Failed",
            ErrorCode::Tpl011 => "Format Not Supported",
            ErrorCode::Api001 => "Invalid Request Format",
            ErrorCode::Api003 => "Invalid Request Parameter",
            ErrorCode::Api004 => "Request Timeout",
            ErrorCode::Api005 => "Rate Limit Exceeded",
            ErrorCode::Api007 => "Request Too Large",
            ErrorCode::Api011 => "Resource Not Found",
            ErrorCode::Api013 => "Service Unavailable",
            ErrorCode::Sys001 => "Internal Server Error",
            ErrorCode::Sys009 => "Resource Exhausted",
            ErrorCode::Sec001 => "Malicious Input Detected",
            ErrorCode::Sec006 => "Size Limit Exceeded",
        }
    }

    pub fn suggested_fix(&self) -> &'static str {
        match self {
            ErrorCode::Val001 => "Add the required field to your data",
            ErrorCode::Val002 => "Change the field to the correct data type",
            ErrorCode::Val003 => "Use format like 'user@domain.com'",
            ErrorCode::Val005 => "Use format like 'https://domain.com'",
            ErrorCode::Val006 => "Use format like 'YYYY-MM' or 'YYYY-MM-DD'",
            ErrorCode::Val013 => "Check JSON syntax and structure",
            ErrorCode::Val014 => "Check YAML syntax and indentation",
            ErrorCode::Tpl001 => "Use one of the available templates",
            ErrorCode::Tpl002 => "Check the reported diagnostic against your input text",
            ErrorCode::Tpl003 => "Check data compatibility with template requirements",
            ErrorCode::Tpl008 => "Reduce document size or retry later",
            ErrorCode::Tpl011 => "Use one of: pdf, typst, docx",
            ErrorCode::Api001 => "Check API documentation for correct request format",
            ErrorCode::Api003 => "Check parameter format and allowed values",
            ErrorCode::Api004 => "Retry with a smaller document or try again later",
            ErrorCode::Api005 => "Wait for the rate limit window to reset",
            ErrorCode::Api007 => "Reduce the request payload size",
            ErrorCode::Api011 => "Check the resource path and ensure it exists",
            ErrorCode::Api013 => "Try again later",
            ErrorCode::Sys001 => "Try again later or contact support if the problem persists",
            ErrorCode::Sys009 => "Try again later",
            ErrorCode::Sec001 => "Remove unsafe control sequences from your input",
            ErrorCode::Sec006 => "Reduce the input size",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::Tpl001 | ErrorCode::Api011 => StatusCode::NOT_FOUND,
            ErrorCode::Tpl002 | ErrorCode::Tpl003 | ErrorCode::Tpl008 | ErrorCode::Sys001 => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorCode::Api004 => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::Api005 => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::Api007 => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::Api013 | ErrorCode::Sys009 => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Application error
// ────────────────────────────────────────────────────────────────────────────

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Template '{template}' not found for document type '{document_type}'")]
    TemplateNotFound {
        document_type: String,
        template: String,
        available: Vec<String>,
    },

    #[error("Rendering failed for template '{template}': {details}")]
    Render { template: String, details: String },

    #[error("Typst compilation failed: {0}")]
    Compile(#[from] CompileError),

    #[error("Generated artifact of {size} bytes exceeds the {limit} byte limit")]
    ArtifactTooLarge { size: usize, limit: usize },

    #[error("Malformed request: {0}")]
    BadRequest(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("YAML parsing failed: {0}")]
    Yaml(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Job is not finished (state: {state})")]
    JobNotReady { state: String },

    #[error("Job queue is full")]
    QueueFull,

    #[error("Request deadline exceeded")]
    Timeout,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(e) => e.primary_code(),
            AppError::TemplateNotFound { .. } => ErrorCode::Tpl001,
            AppError::Render { .. } => ErrorCode::Tpl003,
            AppError::Compile(_) => ErrorCode::Tpl002,
            AppError::ArtifactTooLarge { .. } => ErrorCode::Tpl008,
            AppError::BadRequest(_) => ErrorCode::Api001,
            AppError::InvalidParameter(_) => ErrorCode::Api003,
            AppError::Yaml(_) => ErrorCode::Val014,
            AppError::NotFound(_) => ErrorCode::Api011,
            AppError::JobNotReady { .. } => ErrorCode::Api003,
            AppError::QueueFull => ErrorCode::Api013,
            AppError::Timeout => ErrorCode::Api004,
            AppError::Internal(_) => ErrorCode::Sys001,
        }
    }

    /// Extra per-error context included in the wire envelope.
    fn context(&self) -> Value {
        match self {
            AppError::Validation(e) => json!({
                "field": e.primary_field(),
                "issues": &e.issues,
            }),
            AppError::TemplateNotFound {
                document_type,
                template,
                available,
            } => json!({
                "document_type": document_type,
                "template": template,
                "available_templates": available.join(", "),
            }),
            AppError::Compile(e) => json!({ "diagnostic": e.diagnostic() }),
            AppError::ArtifactTooLarge { size, limit } => {
                json!({ "size_bytes": size, "limit_bytes": limit })
            }
            AppError::JobNotReady { state } => json!({ "state": state }),
            _ => json!({}),
        }
    }

    fn status(&self) -> StatusCode {
        // 425 Too Early for jobs still in flight; everything else follows the
        // code table.
        if matches!(self, AppError::JobNotReady { .. }) {
            return StatusCode::TOO_EARLY;
        }
        self.code().http_status()
    }
}

/// Builds the standard error envelope for a code + message + context.
pub fn error_body(code: ErrorCode, message: &str, context: Value) -> Value {
    json!({
        "error": {
            "code": code.as_str(),
            "category": code.category(),
            "severity": code.severity(),
            "title": code.title(),
            "message": message,
            "suggestedFix": code.suggested_fix(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "context": context,
        }
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status = self.status();

        // Internal details go to logs, never to clients.
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An unexpected error occurred".to_string()
            }
            AppError::Compile(e) => {
                tracing::error!("Typst compilation failed: {}", e.diagnostic());
                self.to_string()
            }
            other => other.to_string(),
        };

        let body = error_body(code, &message, self.context());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_category_per_prefix() {
        assert_eq!(ErrorCode::Val001.category(), "validation");
        assert_eq!(ErrorCode::Tpl001.category(), "template");
        assert_eq!(ErrorCode::Api005.category(), "api");
        assert_eq!(ErrorCode::Sys001.category(), "system");
        assert_eq!(ErrorCode::Sec001.category(), "security");
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(ErrorCode::Val001.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Tpl001.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::Api005.http_status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(ErrorCode::Api004.http_status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            ErrorCode::Api013.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_error_body_envelope_shape() {
        let body = error_body(ErrorCode::Tpl001, "no such template", json!({}));
        let err = &body["error"];
        assert_eq!(err["code"], "TPL001");
        assert_eq!(err["category"], "template");
        assert_eq!(err["severity"], "error");
        assert!(err["timestamp"].as_str().unwrap().contains('T'));
        assert!(err.get("suggestedFix").is_some());
    }

    #[test]
    fn test_template_not_found_context_lists_available() {
        let err = AppError::TemplateNotFound {
            document_type: "resume".into(),
            template: "neon".into(),
            available: vec!["classic".into(), "two_column".into()],
        };
        assert_eq!(err.code(), ErrorCode::Tpl001);
        assert_eq!(err.context()["available_templates"], "classic, two_column");
    }
}
