//! Two-column resume template.
//!
//! Left sidebar on a fixed dark panel (contact, skills, education,
//! certifications, white text, ~32% width), main column on the right
//! (summary, experience, projects, publications).

use serde_json::Value;

use crate::errors::ErrorCode;
use crate::models::{DocumentType, SpacingMode};
use crate::validation::ValidationError;

use super::analysis::{self, DocumentAnalysis};
use super::escape::{escape, link};
use super::fields::{field_with_fallback, str_field, text_with_fallback};
use super::spacing;
use super::{RenderError, TemplateConfig, TemplateHelper};

/// Sidebar panel background, fixed by the template design.
const SIDEBAR_FILL: &str = "rgb(45, 55, 72)";
const SIDEBAR_WIDTH: &str = "32%";

pub struct TwoColumnResume {
    data: Value,
    spacing: SpacingMode,
}

impl TwoColumnResume {
    pub fn new(data: Value, config: TemplateConfig) -> Self {
        let spacing = spacing::resolve(config.spacing_mode, &data);
        Self { data, spacing }
    }

    pub fn boxed(data: Value, config: TemplateConfig) -> Box<dyn TemplateHelper> {
        Box::new(Self::new(data, config))
    }

    fn sidebar_heading(title: &str) -> String {
        format!(
            "#text(weight: \"bold\")[{}]\n#line(length: 100%, stroke: 0.5pt + white)\n",
            title.to_uppercase()
        )
    }

    fn main_heading(title: &str) -> String {
        format!("== {title}\n#line(length: 100%, stroke: 0.5pt)\n")
    }

    // ── Sidebar emitters ────────────────────────────────────────────────────

    fn sidebar_contact(&self) -> String {
        let info = &self.data["personalInfo"];
        let mut items = Vec::new();

        if let Some(email) = str_field(info, "email") {
            items.push(link(&format!("mailto:{email}"), Some(email)));
        }
        if let Some(phone) = str_field(info, "phone") {
            items.push(escape(phone));
        }
        if let Some(location) = str_field(info, "location") {
            items.push(escape(location));
        }
        for (field, display_field) in [
            ("website", "website_display"),
            ("linkedin", "linkedin_display"),
            ("github", "github_display"),
        ] {
            if let Some(url) = str_field(info, field) {
                items.push(link(url, str_field(info, display_field)));
            }
        }

        if items.is_empty() {
            return String::new();
        }
        let mut out = Self::sidebar_heading("Contact");
        for item in items {
            out.push_str(&item);
            out.push_str(" \\\n");
        }
        out.push_str("#v(6pt)\n");
        out
    }

    fn sidebar_skills(&self) -> String {
        let Some(skills) = field_with_fallback(
            &self.data,
            "technologiesAndSkills",
            &["skills", "technologies", "tech_skills"],
        ) else {
            return String::new();
        };

        let mut out = Self::sidebar_heading("Skills");
        match skills {
            Value::Array(items) if items.iter().all(Value::is_string) => {
                let joined = items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                out.push_str(&format!("{}\n", escape(&joined)));
            }
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
                        out.push_str(&format!(
                            "*{}* \\\n{}\n\n",
                            escape(&category),
                            escape(&names)
                        ));
                    }
                }
            }
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
                                "*{}* \\\n{}\n\n",
                                escape(category),
                                escape(&joined)
                            ));
                        }
                    }
                }
            }
            _ => return String::new(),
        }
        out.push_str("#v(6pt)\n");
        out
    }

    fn sidebar_education(&self) -> String {
        let Some(entries) = self.data.get("education").and_then(Value::as_array) else {
            return String::new();
        };
        if entries.is_empty() {
            return String::new();
        }

        let mut out = Self::sidebar_heading("Education");
        for entry in entries {
            let degree = text_with_fallback(entry, "degree", &["title", "qualification"], "Degree");
            let institution = text_with_fallback(
                entry,
                "institution",
                &["school", "university", "college"],
                "Institution",
            );
            let end = text_with_fallback(
                entry,
                "endDate",
                &["end_date", "date", "graduationDate"],
                "",
            );

            out.push_str(&format!(
                "*{}* \\\n{}",
                escape(&degree),
                escape(&institution)
            ));
            if !end.is_empty() {
                out.push_str(&format!(" \\\n_{}_", escape(&end)));
            }
            out.push_str("\n\n");
        }
        out.push_str("#v(6pt)\n");
        out
    }

    fn sidebar_certifications(&self) -> String {
        let Some(items) = field_with_fallback(
            &self.data,
            "certifications",
            &["certificates", "credentials", "licenses"],
        )
        .and_then(Value::as_array) else {
            return String::new();
        };
        if items.is_empty() {
            return String::new();
        }

        let mut out = Self::sidebar_heading("Certifications");
        for item in items {
            if let Some(text) = item.as_str().filter(|s| !s.is_empty()) {
                out.push_str(&format!("{} \\\n", escape(text)));
            }
        }
        out
    }

    // ── Main column emitters ────────────────────────────────────────────────

    fn main_summary(&self) -> String {
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
            "{}{}\n#v(4pt)\n",
            Self::main_heading("Professional Summary"),
            escape(&summary)
        )
    }

    fn main_experience(&self) -> String {
        let Some(entries) = self.data.get("experience").and_then(Value::as_array) else {
            return String::new();
        };
        if entries.is_empty() {
            return String::new();
        }

        let mut out = Self::main_heading("Experience");
        for entry in entries {
            let title = text_with_fallback(entry, "position", &["title", "role"], "Position");
            let company =
                text_with_fallback(entry, "company", &["employer", "organization"], "Company");
            let start = str_field(entry, "startDate").unwrap_or_default();
            let end = text_with_fallback(entry, "endDate", &["end_date"], "Present");
            let dates = if start.is_empty() {
                end.clone()
            } else {
                format!("{start} -- {end}")
            };

            out.push_str(&format!(
                "*{}*, {} #h(1fr) _{}_\n",
                escape(&title),
                escape(&company),
                escape(&dates)
            ));
            if let Some(location) = str_field(entry, "location") {
                out.push_str(&format!("_{}_\n", escape(location)));
            }

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
            out.push_str("#v(3pt)\n");
        }
        out
    }

    fn main_projects(&self) -> String {
        let Some(entries) = self.data.get("projects").and_then(Value::as_array) else {
            return String::new();
        };
        if entries.is_empty() {
            return String::new();
        }

        let mut out = Self::main_heading("Projects");
        for entry in entries {
            let name = text_with_fallback(entry, "name", &["title", "project_name"], "Project");
            let description = text_with_fallback(entry, "description", &["summary", "desc"], "");
            out.push_str(&format!("*{}*", escape(&name)));
            if !description.is_empty() {
                out.push_str(&format!(" \\\n{}", escape(&description)));
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
                    out.push_str(&format!("_Technologies: {}_\n", escape(&joined)));
                }
            }
            out.push_str("#v(3pt)\n");
        }
        out
    }

    fn main_publications(&self) -> String {
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

        let mut out = Self::main_heading("Publications");
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

    fn main_achievements(&self) -> String {
        let Some(items) = field_with_fallback(
            &self.data,
            "achievements",
            &["accomplishments", "awards", "honors"],
        )
        .and_then(Value::as_array) else {
            return String::new();
        };
        if items.is_empty() {
            return String::new();
        }

        let mut out = Self::main_heading("Achievements");
        for item in items {
            if let Some(text) = item.as_str().filter(|s| !s.is_empty()) {
                out.push_str(&format!("- {}\n", escape(text)));
            }
        }
        out
    }
}

impl TemplateHelper for TwoColumnResume {
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

        let name = str_field(&self.data["personalInfo"], "name").unwrap_or_default();

        let sidebar: String = [
            self.sidebar_contact(),
            self.sidebar_skills(),
            self.sidebar_education(),
            self.sidebar_certifications(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

        let main: String = [
            self.main_summary(),
            self.main_experience(),
            self.main_projects(),
            self.main_publications(),
            self.main_achievements(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

        let mut doc = spacing::preamble(self.spacing);
        doc.push_str(&format!(
            "#align(center)[#text(size: 16pt, weight: \"bold\")[{}]]\n#v(4pt)\n",
            escape(name)
        ));
        doc.push_str(&format!(
            "#grid(\n  columns: ({SIDEBAR_WIDTH}, 1fr),\n  column-gutter: 14pt,\n  box(fill: {SIDEBAR_FILL}, inset: 10pt, width: 100%)[\n#set text(fill: white)\n{sidebar}\n  ],\n  [\n{main}\n  ],\n)\n"
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
            "personalInfo": {
                "name": "Grace Hopper",
                "email": "grace@example.com",
                "location": "Arlington, VA",
            },
            "professionalSummary": "Compiler pioneer.",
            "experience": [{
                "position": "Rear Admiral",
                "company": "US Navy",
                "startDate": "1943-12",
                "endDate": "1986-08",
                "achievements": ["Invented the compiler"],
            }],
            "education": [{
                "degree": "PhD Mathematics",
                "school": "Yale",
                "graduationDate": "1934-06",
            }],
            "certifications": ["COBOL committee"],
            "skills": ["COBOL", "FLOW-MATIC"],
        })
    }

    fn render(data: Value) -> String {
        TwoColumnResume::new(data, TemplateConfig::default())
            .render()
            .unwrap()
    }

    #[test]
    fn test_sidebar_uses_fixed_fill_and_width() {
        let markup = render(data());
        assert!(markup.contains("rgb(45, 55, 72)"));
        assert!(markup.contains("columns: (32%, 1fr)"));
        assert!(markup.contains("fill: white"));
    }

    #[test]
    fn test_sidebar_contains_contact_skills_education_certifications() {
        let markup = render(data());
        for heading in ["CONTACT", "SKILLS", "EDUCATION", "CERTIFICATIONS"] {
            assert!(markup.contains(heading), "missing sidebar {heading}");
        }
    }

    #[test]
    fn test_main_column_contains_summary_and_experience() {
        let markup = render(data());
        assert!(markup.contains("== Professional Summary"));
        assert!(markup.contains("== Experience"));
        assert!(markup.contains("Invented the compiler"));
    }

    #[test]
    fn test_education_school_alias() {
        let markup = render(data());
        assert!(markup.contains("Yale"));
        assert!(markup.contains("1934-06"));
    }

    #[test]
    fn test_flat_skill_list_rendered_comma_joined() {
        let markup = render(data());
        assert!(markup.contains("COBOL, FLOW-MATIC"));
    }

    #[test]
    fn test_missing_optional_sidebar_sections_omitted() {
        let minimal = json!({"personalInfo": {"name": "A", "email": "a@b.co"}});
        let markup = render(minimal);
        assert!(!markup.contains("SKILLS"));
        assert!(!markup.contains("CERTIFICATIONS"));
        assert!(markup.contains("CONTACT"));
    }
}
