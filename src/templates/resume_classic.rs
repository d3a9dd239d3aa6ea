//! Classic single-column resume template.
//!
//! Centered header, ruled section headings, dated entries with right-aligned
//! ranges. Sections with no data are omitted entirely.

use serde_json::Value;

use crate::errors::ErrorCode;
use crate::models::{DocumentType, SpacingMode};
use crate::validation::ValidationError;

use super::analysis::{self, DocumentAnalysis};
use super::escape::{escape, link};
use super::fields::{field_with_fallback, str_field, text_with_fallback};
use super::spacing;
use super::{RenderError, TemplateConfig, TemplateHelper};

pub struct ClassicResume {
    data: Value,
    spacing: SpacingMode,
}

impl ClassicResume {
    pub fn new(data: Value, config: TemplateConfig) -> Self {
        let spacing = spacing::resolve(config.spacing_mode, &data);
        Self { data, spacing }
    }

    pub fn boxed(data: Value, config: TemplateConfig) -> Box<dyn TemplateHelper> {
        Box::new(Self::new(data, config))
    }

    // ── Section emitters ────────────────────────────────────────────────────

    fn header(&self) -> String {
        let info = &self.data["personalInfo"];
        let name = str_field(info, "name").unwrap_or_default();

        let mut contact = Vec::new();
        if let Some(location) = str_field(info, "location") {
            contact.push(escape(location));
        }
        if let Some(email) = str_field(info, "email") {
            contact.push(link(&format!("mailto:{email}"), Some(email)));
        }
        if let Some(phone) = str_field(info, "phone") {
            contact.push(escape(phone));
        }
        for (field, display_field) in [
            ("website", "website_display"),
            ("linkedin", "linkedin_display"),
            ("github", "github_display"),
        ] {
            if let Some(url) = str_field(info, field) {
                contact.push(link(url, str_field(info, display_field)));
            }
        }

        let mut out = String::new();
        out.push_str(&format!(
            "#align(center)[#text(size: 16pt, weight: \"bold\")[{}]]\n",
            escape(name)
        ));
        if !contact.is_empty() {
            out.push_str(&format!("#align(center)[{}]\n", contact.join(" | ")));
        }
        out.push_str("#v(2pt)\n");
        out
    }

    fn section_heading(title: &str) -> String {
        format!("== {title}\n#line(length: 100%, stroke: 0.5pt)\n")
    }

    fn summary(&self) -> String {
        let summary = text_with_fallback(
            &self.data,
            "professionalSummary",
            &["summary", "profile", "objective"],
            "",
        );
        if summary.is_empty() {
            return String::new();
        }
        format!(
            "{}{}\n",
            Self::section_heading("Professional Summary"),
            escape(&summary)
        )
    }

    fn experience(&self) -> String {
        let Some(entries) = self.data.get("experience").and_then(Value::as_array) else {
            return String::new();
        };
        if entries.is_empty() {
            return String::new();
        }

        let mut out = Self::section_heading("Experience");
        for entry in entries {
            let title = text_with_fallback(entry, "position", &["title", "role"], "Position");
            let company =
                text_with_fallback(entry, "company", &["employer", "organization"], "Company");
            let location = str_field(entry, "location").unwrap_or_default();

            let start = str_field(entry, "startDate").unwrap_or_default();
            let end = text_with_fallback(entry, "endDate", &["end_date"], "Present");
            let dates = if start.is_empty() {
                end.clone()
            } else {
                format!("{start} -- {end}")
            };

            let mut line = format!("*{}*, {}", escape(&title), escape(&company));
            if !location.is_empty() {
                line.push_str(&format!(", {}", escape(location)));
            }
            line.push_str(&format!(" #h(1fr) _{}_\n", escape(&dates)));
            out.push_str(&line);

            if let Some(achievements) = field_with_fallback(
                entry,
                "achievements",
                &["details", "responsibilities", "duties"],
            )
            .and_then(Value::as_array)
            {
                for item in achievements {
                    if let Some(text) = item.as_str().filter(|s| !s.is_empty()) {
                        out.push_str(&format!("- {}\n", escape(text)));
                    }
                }
            }
            out.push_str("#v(2pt)\n");
        }
        out
    }

    fn education(&self) -> String {
        let Some(entries) = self.data.get("education").and_then(Value::as_array) else {
            return String::new();
        };
        if entries.is_empty() {
            return String::new();
        }

        let mut out = Self::section_heading("Education");
        for entry in entries {
            let degree = text_with_fallback(entry, "degree", &["title", "qualification"], "Degree");
            let institution = text_with_fallback(
                entry,
                "institution",
                &["school", "university", "college"],
                "Institution",
            );
            let start = str_field(entry, "startDate").unwrap_or_default();
            let end = text_with_fallback(
                entry,
                "endDate",
                &["end_date", "date", "graduationDate"],
                "",
            );
            let dates = match (start.is_empty(), end.is_empty()) {
                (false, false) => format!("{start} -- {end}"),
                (false, true) => start.to_string(),
                (true, false) => end.clone(),
                (true, true) => String::new(),
            };

            out.push_str(&format!("*{}*, {}", escape(&degree), escape(&institution)));
            if !dates.is_empty() {
                out.push_str(&format!(" #h(1fr) _{}_", escape(&dates)));
            }
            out.push('\n');

            let focus = text_with_fallback(
                entry,
                "focus",
                &["major", "specialization", "concentration"],
                "",
            );
            if !focus.is_empty() {
                out.push_str(&format!("- Focus: {}\n", escape(&focus)));
            }
            if let Some(gpa) = str_field(entry, "gpa") {
                out.push_str(&format!("- GPA: {}\n", escape(gpa)));
            }
            out.push_str("#v(2pt)\n");
        }
        out
    }

    fn projects(&self) -> String {
        let Some(entries) = self.data.get("projects").and_then(Value::as_array) else {
            return String::new();
        };
        if entries.is_empty() {
            return String::new();
        }

        let mut out = Self::section_heading("Projects");
        for entry in entries {
            let name = text_with_fallback(entry, "name", &["title", "project_name"], "Project");
            out.push_str(&format!("*{}*", escape(&name)));

            let description = match entry.get("description") {
                Some(Value::String(s)) if !s.is_empty() => s.clone(),
                Some(Value::Array(parts)) => parts
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                _ => text_with_fallback(entry, "summary", &["desc"], ""),
            };
            if !description.is_empty() {
                out.push_str(&format!(": _{}_", escape(&description)));
            }
            out.push('\n');

            if let Some(tools) = field_with_fallback(
                entry,
                "tools",
                &["technologies", "tech_stack", "stack"],
            )
            .and_then(Value::as_array)
            {
                let joined = tools
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                if !joined.is_empty() {
                    out.push_str(&format!("- Tools: {}\n", escape(&joined)));
                }
            }
            if let Some(achievements) = entry.get("achievements").and_then(Value::as_array) {
                for item in achievements {
                    if let Some(text) = item.as_str().filter(|s| !s.is_empty()) {
                        out.push_str(&format!("- {}\n", escape(text)));
                    }
                }
            }
            out.push_str("#v(2pt)\n");
        }
        out
    }

    fn publications(&self) -> String {
        let Some(entries) = field_with_fallback(
            &self.data,
            "articlesAndPublications",
            &["publications", "articles", "papers"],
        )
        .and_then(Value::as_array) else {
            return String::new();
        };
        if entries.is_empty() {
            return String::new();
        }

        let mut out = Self::section_heading("Publications");
        for entry in entries {
            let title = text_with_fallback(entry, "title", &["name"], "Publication");
            let date = text_with_fallback(entry, "date", &["published_date", "year"], "");
            if date.is_empty() {
                out.push_str(&format!("- *{}*\n", escape(&title)));
            } else {
                out.push_str(&format!("- *{}* ({})\n", escape(&title), escape(&date)));
            }
        }
        out
    }

    fn simple_bullets(&self, heading: &str, primary: &str, fallbacks: &[&str]) -> String {
        let Some(items) =
            field_with_fallback(&self.data, primary, fallbacks).and_then(Value::as_array)
        else {
            return String::new();
        };
        if items.is_empty() {
            return String::new();
        }

        let mut out = Self::section_heading(heading);
        for item in items {
            if let Some(text) = item.as_str().filter(|s| !s.is_empty()) {
                out.push_str(&format!("- {}\n", escape(text)));
            }
        }
        out
    }

    fn skills(&self) -> String {
        let Some(skills) = field_with_fallback(
            &self.data,
            "technologiesAndSkills",
            &["skills", "technologies", "tech_skills"],
        ) else {
            return String::new();
        };

        let mut out = Self::section_heading("Technologies & Skills");
        match skills {
            // Flat list of skill names.
            Value::Array(items) if items.iter().all(Value::is_string) => {
                let joined = items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                out.push_str(&format!("{}\n", escape(&joined)));
            }
            // List of {category, skills} groups.
            Value::Array(groups) => {
                for group in groups {
                    let category =
                        text_with_fallback(group, "category", &["name", "type"], "Skills");
                    let names = field_with_fallback(group, "skills", &["items", "technologies"])
                        .and_then(Value::as_array)
                        .map(|items| {
                            items
                                .iter()
                                .filter_map(Value::as_str)
                                .collect::<Vec<_>>()
                                .join(", ")
                        })
                        .unwrap_or_default();
                    if !names.is_empty() {
                        out.push_str(&format!("*{}:* {}\n\n", escape(&category), escape(&names)));
                    }
                }
            }
            // Category map: {"technical": [...], "soft": [...]}.
            Value::Object(map) => {
                for (category, names) in map {
                    if let Some(items) = names.as_array() {
                        let joined = items
                            .iter()
                            .filter_map(Value::as_str)
                            .collect::<Vec<_>>()
                            .join(", ");
                        if !joined.is_empty() {
                            out.push_str(&format!(
                                "*{}:* {}\n\n",
                                escape(category),
                                escape(&joined)
                            ));
                        }
                    }
                }
            }
            _ => return String::new(),
        }
        out
    }
}

impl TemplateHelper for ClassicResume {
    fn template_type(&self) -> DocumentType {
        DocumentType::Resume
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["personalInfo"]
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
        Ok(())
    }

    fn render(&self) -> Result<String, RenderError> {
        self.validate_data()?;

        let sections = [
            self.summary(),
            self.experience(),
            self.education(),
            self.projects(),
            self.publications(),
            self.simple_bullets("Achievements", "achievements", &[
                "accomplishments",
                "awards",
                "honors",
            ]),
            self.simple_bullets("Certifications", "certifications", &[
                "certificates",
                "credentials",
                "licenses",
            ]),
            self.skills(),
        ];

        let mut doc = spacing::preamble(self.spacing);
        doc.push_str(&self.header());
        for section in sections.into_iter().filter(|s| !s.is_empty()) {
            doc.push('\n');
            doc.push_str(&section);
        }
        Ok(doc)
    }

    fn analyze_document(&self) -> DocumentAnalysis {
        analysis::analyze(&self.data, self.spacing)
    }
}
