//! Axum route handlers for registry metadata and schemas.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::models::DocumentType;
use crate::state::AppState;

fn parse_doc_type(raw: &str) -> Result<DocumentType, AppError> {
    DocumentType::parse(raw)
        .ok_or_else(|| AppError::NotFound(format!("Document type '{raw}' not supported")))
}

/// GET /templates
///
/// Full registry dump, grouped by document type.
pub async fn handle_list_templates(State(state): State<AppState>) -> Json<Value> {
    let registry = &state.ctx.registry;
    let mut grouped = serde_json::Map::new();
    for doc_type in DocumentType::ALL {
        grouped.insert(
            doc_type.as_str().to_string(),
            json!(registry.available(doc_type)),
        );
    }
    Json(json!({ "templates": grouped }))
}

/// GET /templates/{doc_type}
pub async fn handle_list_templates_by_type(
    State(state): State<AppState>,
    Path(doc_type): Path<String>,
) -> Result<Json<Value>, AppError> {
    let doc_type = parse_doc_type(&doc_type)?;
    Ok(Json(json!({
        "document_type": doc_type,
        "templates": state.ctx.registry.available(doc_type),
    })))
}

/// GET /template-info/{doc_type}/{name}
pub async fn handle_template_info(
    State(state): State<AppState>,
    Path((doc_type, name)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let doc_type = parse_doc_type(&doc_type)?;
    let info = state.ctx.registry.get(doc_type, &name).ok_or_else(|| {
        AppError::TemplateNotFound {
            document_type: doc_type.to_string(),
            template: name.clone(),
            available: state.ctx.registry.available(doc_type),
        }
    })?;
    Ok(Json(json!({
        "name": info.name,
        "document_type": info.document_type,
        "description": info.description,
        "required_fields": info.required_fields,
    })))
}

/// GET /schema/{doc_type}
///
/// Expected payload shape plus a worked example.
pub async fn handle_schema(Path(doc_type): Path<String>) -> Result<Json<Value>, AppError> {
    let doc_type = parse_doc_type(&doc_type)?;
    Ok(Json(schema_payload(doc_type)))
}

/// Schema + example for a document type. Shared with the CLI `sample`
/// command.
pub fn schema_payload(doc_type: DocumentType) -> Value {
    match doc_type {
        DocumentType::Resume => json!({
            "schema": {
                "type": "object",
                "required": ["personalInfo"],
                "properties": {
                    "personalInfo": {
                        "type": "object",
                        "required": ["name", "email"],
                        "properties": {
                            "name": {"type": "string"},
                            "email": {"type": "string"},
                            "phone": {"type": "string"},
                            "location": {"type": "string"},
                            "website": {"type": "string"},
                            "linkedin": {"type": "string"},
                            "github": {"type": "string"},
                        },
                    },
                    "professionalSummary": {"type": "string"},
                    "experience": {"type": "array"},
                    "education": {"type": "array"},
                    "projects": {"type": "array"},
                    "certifications": {"type": "array"},
                    "technologiesAndSkills": {"type": "array"},
                },
            },
            "example": sample_payload(doc_type),
        }),
        DocumentType::CoverLetter => json!({
            "schema": {
                "type": "object",
                "required": ["personalInfo", "body"],
                "properties": {
                    "personalInfo": {
                        "type": "object",
                        "required": ["name", "email"],
                        "properties": {
                            "name": {"type": "string"},
                            "email": {"type": "string"},
                        },
                    },
                    "recipient": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "title": {"type": "string"},
                            "company": {"type": "string"},
                        },
                    },
                    "body": {
                        "oneOf": [
                            {"type": "string"},
                            {"type": "array", "items": {"type": "string"}},
                        ],
                    },
                },
            },
            "example": sample_payload(doc_type),
        }),
    }
}

/// A starter payload that passes validation and renders every major section.
pub fn sample_payload(doc_type: DocumentType) -> Value {
    match doc_type {
        DocumentType::Resume => json!({
            "personalInfo": {
                "name": "John Doe",
                "email": "john@example.com",
                "phone": "+1 (555) 010-0100",
                "location": "New York, NY",
                "website": "https://johndoe.dev",
                "website_display": "johndoe.dev",
            },
            "professionalSummary": "Software engineer with 8 years of backend experience.",
            "experience": [{
                "position": "Senior Engineer",
                "company": "Example Corp",
                "location": "New York, NY",
                "startDate": "2020-03",
                "endDate": "Present",
                "achievements": [
                    "Reduced API latency by 40%",
                    "Led a team of 5 engineers",
                ],
            }],
            "education": [{
                "degree": "BS Computer Science",
                "institution": "State University",
                "startDate": "2012-09",
                "endDate": "2016-06",
            }],
            "technologiesAndSkills": [
                {"category": "Languages", "skills": ["Rust", "Python", "SQL"]},
            ],
        }),
        DocumentType::CoverLetter => json!({
            "personalInfo": {
                "name": "John Doe",
                "email": "john@example.com",
            },
            "recipient": {
                "name": "Jane Smith",
                "company": "Example Corp",
            },
            "body": [
                "I am excited to apply for the Senior Engineer position.",
                "My background in distributed systems fits your roadmap.",
            ],
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation;

    #[test]
    fn test_sample_payloads_pass_standard_validation() {
        for doc_type in DocumentType::ALL {
            let sample = sample_payload(doc_type);
            assert!(
                validation::validate_standard(&sample).is_ok(),
                "sample for {doc_type} should validate"
            );
        }
    }

    #[test]
    fn test_schema_payload_contains_example() {
        let schema = schema_payload(DocumentType::Resume);
        assert!(schema["schema"]["required"][0].is_string());
        assert_eq!(schema["example"]["personalInfo"]["name"], "John Doe");
    }
}
