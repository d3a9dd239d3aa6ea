//! Request and enum types shared across the rendering pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kinds of documents the service can typeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Resume,
    CoverLetter,
}

impl DocumentType {
    pub const ALL: [DocumentType; 2] = [DocumentType::Resume, DocumentType::CoverLetter];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Resume => "resume",
            DocumentType::CoverLetter => "cover_letter",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "resume" => Some(DocumentType::Resume),
            "cover_letter" => Some(DocumentType::CoverLetter),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output formats. PDF is the default; `typst` returns raw markup and `docx`
/// bypasses the Typst pipeline entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pdf,
    Typst,
    Docx,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Typst => "typst",
            OutputFormat::Docx => "docx",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Typst => "typ",
            OutputFormat::Docx => "docx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "application/pdf",
            OutputFormat::Typst => "text/plain; charset=utf-8",
            OutputFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layout density presets. Each selects page margins, font size, and
/// paragraph leading in the emitted preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpacingMode {
    #[serde(rename = "normal")]
    Normal,
    #[default]
    #[serde(rename = "compact")]
    Compact,
    #[serde(rename = "ultra-compact")]
    UltraCompact,
}

impl SpacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpacingMode::Normal => "normal",
            SpacingMode::Compact => "compact",
            SpacingMode::UltraCompact => "ultra-compact",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(SpacingMode::Normal),
            "compact" => Some(SpacingMode::Compact),
            "ultra-compact" | "ultra_compact" => Some(SpacingMode::UltraCompact),
            _ => None,
        }
    }
}

/// The client's work order, as posted to `/generate` and `/generate/async`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub document_type: DocumentType,
    pub template: String,
    #[serde(default)]
    pub format: OutputFormat,
    pub data: Value,
    #[serde(default)]
    pub ultra_validation: bool,
    /// Explicit spacing override; when absent, `data.spacing_mode` /
    /// `data.spacingMode` apply, then the compact default.
    #[serde(default)]
    pub spacing_mode: Option<SpacingMode>,
}

/// Variant accepted by `/generate-yaml`: identical shape except that `data`
/// arrives as YAML text.
#[derive(Debug, Clone, Deserialize)]
pub struct YamlDocumentRequest {
    pub document_type: DocumentType,
    pub template: String,
    #[serde(default)]
    pub format: OutputFormat,
    pub data: String,
    #[serde(default)]
    pub ultra_validation: bool,
    #[serde(default)]
    pub spacing_mode: Option<SpacingMode>,
}

/// Builds the attachment filename: `{type}_{name_with_underscores}.{ext}`.
pub fn artifact_filename(document_type: DocumentType, data: &Value, format: OutputFormat) -> String {
    let person = data
        .get("personalInfo")
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or("document");
    format!(
        "{}_{}.{}",
        document_type,
        person.replace(' ', "_"),
        format.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let req: DocumentRequest = serde_json::from_value(json!({
            "document_type": "resume",
            "template": "classic",
            "data": {"personalInfo": {"name": "A B", "email": "a@b.co"}},
        }))
        .unwrap();
        assert_eq!(req.format, OutputFormat::Pdf);
        assert_eq!(req.spacing_mode, None);
        assert!(!req.ultra_validation);
    }

    #[test]
    fn test_spacing_mode_wire_names() {
        let m: SpacingMode = serde_json::from_value(json!("ultra-compact")).unwrap();
        assert_eq!(m, SpacingMode::UltraCompact);
        assert_eq!(serde_json::to_value(SpacingMode::Normal).unwrap(), "normal");
    }

    #[test]
    fn test_artifact_filename_underscores() {
        let data = json!({"personalInfo": {"name": "A B", "email": "a@b.co"}});
        assert_eq!(
            artifact_filename(DocumentType::Resume, &data, OutputFormat::Pdf),
            "resume_A_B.pdf"
        );
        assert_eq!(
            artifact_filename(DocumentType::CoverLetter, &data, OutputFormat::Typst),
            "cover_letter_A_B.typ"
        );
    }

    #[test]
    fn test_artifact_filename_missing_name() {
        let data = json!({});
        assert_eq!(
            artifact_filename(DocumentType::Resume, &data, OutputFormat::Docx),
            "resume_document.docx"
        );
    }

    #[test]
    fn test_document_type_parse_round_trip() {
        for dt in DocumentType::ALL {
            assert_eq!(DocumentType::parse(dt.as_str()), Some(dt));
        }
        assert!(DocumentType::parse("poster").is_none());
    }
}
