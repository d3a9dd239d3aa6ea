//! Modern cover letter template: accented header rule, right-aligned date.

use serde_json::Value;

use crate::errors::ErrorCode;
use crate::models::{DocumentType, SpacingMode};
use crate::validation::ValidationError;

use super::analysis::{self, DocumentAnalysis};
use super::escape::{escape, link};
use super::fields::str_field;
use super::letter;
use super::spacing;
use super::{RenderError, TemplateConfig, TemplateHelper};

const ACCENT: &str = "rgb(45, 55, 72)";

pub struct ModernCoverLetter {
    data: Value,
    spacing: SpacingMode,
}

impl ModernCoverLetter {
    pub fn new(data: Value, config: TemplateConfig) -> Self {
        let spacing = spacing::resolve(config.spacing_mode, &data);
        Self { data, spacing }
    }

    pub fn boxed(data: Value, config: TemplateConfig) -> Box<dyn TemplateHelper> {
        Box::new(Self::new(data, config))
    }

    fn header(&self) -> String {
        let info = &self.data["personalInfo"];
        let name = str_field(info, "name").unwrap_or_default();

        let mut contact = Vec::new();
        if let Some(email) = str_field(info, "email") {
            contact.push(link(&format!("mailto:{email}"), Some(email)));
        }
        if let Some(phone) = str_field(info, "phone") {
            contact.push(escape(phone));
        }
        for (field, display_field) in [
            ("website", "website_display"),
            ("linkedin", "linkedin_display"),
        ] {
            if let Some(url) = str_field(info, field) {
                contact.push(link(url, str_field(info, display_field)));
            }
        }

        let mut out = format!(
            "#text(size: 15pt, weight: \"bold\", fill: {ACCENT})[{}]\n",
            escape(name)
        );
        if !contact.is_empty() {
            out.push_str(&format!("{}\n", contact.join(" | ")));
        }
        out.push_str(&format!("#line(length: 100%, stroke: 1pt + {ACCENT})\n"));
        out
    }

    fn body(&self) -> String {
        letter::body_paragraphs(&self.data["body"])
            .iter()
            .map(|p| escape(p))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl TemplateHelper for ModernCoverLetter {
    fn template_type(&self) -> DocumentType {
        DocumentType::CoverLetter
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["personalInfo", "body"]
    }

    fn validate_data(&self) -> Result<(), ValidationError> {
        let info = self.data.get("personalInfo").ok_or_else(|| {
            ValidationError::single(
                ErrorCode::Val001,
                "personalInfo",
                "Personal information is required",
            )
        })?;
        for field in ["name", "email"] {
            if str_field(info, field).is_none() {
                return Err(ValidationError::single(
                    ErrorCode::Val001,
                    format!("personalInfo.{field}"),
                    format!("Required field '{field}' is missing from personalInfo"),
                ));
            }
        }
        if letter::body_paragraphs(&self.data["body"]).is_empty() {
            return Err(ValidationError::single(
                ErrorCode::Val001,
                "body",
                "Cover letter body is required",
            ));
        }
        Ok(())
    }

    fn render(&self) -> Result<String, RenderError> {
        self.validate_data()?;

        let recipient = &self.data["recipient"];
        let mut doc = spacing::preamble(self.spacing);
        doc.push_str(&self.header());
        doc.push_str(&format!(
            "#align(right)[{}]\n\n",
            escape(&letter::letter_date(&self.data))
        ));

        let mut recipient_lines = Vec::new();
        if let Some(name) = str_field(recipient, "name") {
            recipient_lines.push(escape(name));
        }
        if let Some(company) = str_field(recipient, "company") {
            recipient_lines.push(escape(company));
        }
        if !recipient_lines.is_empty() {
            doc.push_str(&format!("{}\n\n", recipient_lines.join(" \\\n")));
        }

        doc.push_str(&format!("{}\n\n", escape(&letter::salutation(&self.data))));
        doc.push_str(&self.body());
        doc.push_str("\n\n");

        let name = str_field(&self.data["personalInfo"], "name").unwrap_or_default();
        let closing = str_field(&self.data, "closing").unwrap_or("Sincerely,");
        doc.push_str(&format!(
            "{} \\\n#v(18pt)\n*{}*\n",
            escape(closing),
            escape(name)
        ));
        Ok(doc)
    }

    fn analyze_document(&self) -> DocumentAnalysis {
        analysis::analyze(&self.data, self.spacing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data() -> Value {
        json!({
            "personalInfo": {"name": "A B", "email": "a@b.co"},
            "recipient": {"company": "Acme"},
            "body": "I would like to apply.",
        })
    }

    #[test]
    fn test_header_uses_accent_color() {
        let markup = ModernCoverLetter::new(data(), TemplateConfig::default())
            .render()
            .unwrap();
        assert!(markup.contains("rgb(45, 55, 72)"));
        assert!(markup.contains("#align(right)["));
    }

    #[test]
    fn test_company_only_salutation() {
        let markup = ModernCoverLetter::new(data(), TemplateConfig::default())
            .render()
            .unwrap();
        assert!(markup.contains("Dear Hiring Manager at Acme,"));
    }

    #[test]
    fn test_default_date_inserted_when_absent() {
        let markup = ModernCoverLetter::new(data(), TemplateConfig::default())
            .render()
            .unwrap();
        // A "Month D, YYYY" date lands inside the right-aligned block.
        assert!(markup.contains("#align(right)["));
        assert!(markup.contains(", 20"));
    }

    #[test]
    fn test_empty_body_entries_skipped() {
        let mut d = data();
        d["body"] = json!(["P1", "", "P2"]);
        let markup = ModernCoverLetter::new(d, TemplateConfig::default())
            .render()
            .unwrap();
        assert!(markup.contains("P1\n\nP2"));
    }
}
