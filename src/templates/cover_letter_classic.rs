//! Classic block-format cover letter template.

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

pub struct ClassicCoverLetter {
    data: Value,
    spacing: SpacingMode,
}

impl ClassicCoverLetter {
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
        if let Some(location) = str_field(info, "location") {
            contact.push(escape(location));
        }

        let mut out = format!("*{}* \\\n", escape(name));
        if !contact.is_empty() {
            out.push_str(&contact.join(" | "));
            out.push('\n');
        }
        out
    }

    fn recipient_block(&self) -> String {
        let recipient = &self.data["recipient"];
        let mut lines = Vec::new();
        if let Some(name) = str_field(recipient, "name") {
            lines.push(escape(name));
        }
        if let Some(title) = str_field(recipient, "title") {
            lines.push(escape(title));
        }
        if let Some(company) = str_field(recipient, "company") {
            lines.push(escape(company));
        }
        if let Some(address) = str_field(recipient, "address") {
            lines.push(escape(address));
        }
        if lines.is_empty() {
            return String::new();
        }
        format!("{}\n", lines.join(" \\\n"))
    }

    fn body(&self) -> String {
        letter::body_paragraphs(&self.data["body"])
            .iter()
            .map(|p| escape(p))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn signature(&self) -> String {
        let name = str_field(&self.data["personalInfo"], "name").unwrap_or_default();
        let closing = str_field(&self.data, "closing").unwrap_or("Sincerely,");
        format!("{} \\\n#v(18pt)\n{}\n", escape(closing), escape(name))
    }
}

impl TemplateHelper for ClassicCoverLetter {
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

        let mut doc = spacing::preamble(self.spacing);
        doc.push_str(&self.header());
        doc.push('\n');
        doc.push_str(&format!("{}\n\n", escape(&letter::letter_date(&self.data))));

        let recipient = self.recipient_block();
        if !recipient.is_empty() {
            doc.push_str(&recipient);
            doc.push('\n');
        }

        doc.push_str(&format!("{}\n\n", escape(&letter::salutation(&self.data))));
        doc.push_str(&self.body());
        doc.push_str("\n\n");
        doc.push_str(&self.signature());
        Ok(doc)
    }

    fn analyze_document(&self) -> DocumentAnalysis {
        analysis::analyze(&self.data, self.spacing)
    }
}
