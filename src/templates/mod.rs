//! Template registry and the helper contract.
//!
//! A helper turns validated request data into Typst markup. Helpers are
//! stateless after construction: `render` is a pure function of the data and
//! config captured at `new` time, and instances are never shared across
//! requests. Selection happens at runtime through the static registry table.

pub mod analysis;
pub mod cover_letter_classic;
pub mod cover_letter_modern;
pub mod escape;
pub mod fields;
pub mod handlers;
pub mod letter;
pub mod resume_classic;
pub mod resume_two_column;
pub mod spacing;

use serde_json::Value;
use thiserror::Error;

use crate::errors::AppError;
use crate::models::{DocumentType, SpacingMode};
use crate::validation::ValidationError;
use analysis::DocumentAnalysis;

// ────────────────────────────────────────────────────────────────────────────
// Helper contract
// ────────────────────────────────────────────────────────────────────────────

/// Per-request template configuration.
#[derive(Debug, Clone, Default)]
pub struct TemplateConfig {
    pub spacing_mode: Option<SpacingMode>,
}

/// Errors raised by a helper while emitting markup.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Rendering(String),
}

/// The behavioral contract every template implements.
///
/// `render` never fails for optional-but-missing data: an empty section is
/// simply omitted. It fails only when the helper's own required fields are
/// absent or emission itself goes wrong.
pub trait TemplateHelper: Send + Sync {
    fn template_type(&self) -> DocumentType;

    fn required_fields(&self) -> &'static [&'static str];

    /// Checks the helper's own required fields. Idempotent.
    fn validate_data(&self) -> Result<(), ValidationError>;

    /// Emits the full Typst document.
    fn render(&self) -> Result<String, RenderError>;

    /// Content metrics for `/analyze`.
    fn analyze_document(&self) -> DocumentAnalysis;
}

// ────────────────────────────────────────────────────────────────────────────
// Registry
// ────────────────────────────────────────────────────────────────────────────

type HelperCtor = fn(Value, TemplateConfig) -> Box<dyn TemplateHelper>;

/// One registry row: metadata plus the helper constructor.
pub struct TemplateInfo {
    pub name: &'static str,
    pub document_type: DocumentType,
    pub description: &'static str,
    pub required_fields: &'static [&'static str],
    ctor: HelperCtor,
}

impl TemplateInfo {
    pub fn instantiate(&self, data: Value, config: TemplateConfig) -> Box<dyn TemplateHelper> {
        (self.ctor)(data, config)
    }
}

/// Static table mapping `(document_type, template_name)` to helpers.
/// Immutable after construction; no locking needed.
pub struct TemplateRegistry {
    entries: Vec<TemplateInfo>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self {
            entries: vec![
                TemplateInfo {
                    name: "classic",
                    document_type: DocumentType::Resume,
                    description: "Single-column resume with centered header and ruled sections",
                    required_fields: &["personalInfo"],
                    ctor: resume_classic::ClassicResume::boxed,
                },
                TemplateInfo {
                    name: "two_column",
                    document_type: DocumentType::Resume,
                    description: "Resume with a dark sidebar for contact, skills, and education",
                    required_fields: &["personalInfo"],
                    ctor: resume_two_column::TwoColumnResume::boxed,
                },
                TemplateInfo {
                    name: "classic",
                    document_type: DocumentType::CoverLetter,
                    description: "Traditional block-format cover letter",
                    required_fields: &["personalInfo", "body"],
                    ctor: cover_letter_classic::ClassicCoverLetter::boxed,
                },
                TemplateInfo {
                    name: "modern",
                    document_type: DocumentType::CoverLetter,
                    description: "Cover letter with an accented header and right-aligned date",
                    required_fields: &["personalInfo", "body"],
                    ctor: cover_letter_modern::ModernCoverLetter::boxed,
                },
            ],
        }
    }

    /// Template names registered for a document type.
    pub fn available(&self, document_type: DocumentType) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.document_type == document_type)
            .map(|e| e.name.to_string())
            .collect()
    }

    pub fn get(&self, document_type: DocumentType, name: &str) -> Option<&TemplateInfo> {
        self.entries
            .iter()
            .find(|e| e.document_type == document_type && e.name == name)
    }

    /// Resolves and instantiates a helper, or reports the available names.
    pub fn create(
        &self,
        document_type: DocumentType,
        name: &str,
        data: Value,
        config: TemplateConfig,
    ) -> Result<Box<dyn TemplateHelper>, AppError> {
        match self.get(document_type, name) {
            Some(info) => Ok(info.instantiate(data, config)),
            None => Err(AppError::TemplateNotFound {
                document_type: document_type.to_string(),
                template: name.to_string(),
                available: self.available(document_type),
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TemplateInfo> {
        self.entries.iter()
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}
