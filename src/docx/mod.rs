//! DOCX generation: a side-channel path that maps the same validated data
//! directly to Word paragraphs, bypassing the Typst pipeline.

pub mod writer;

use serde_json::Value;

use crate::errors::AppError;
use crate::models::DocumentType;
use crate::templates::fields::{field_with_fallback, str_field, text_with_fallback};
use crate::templates::letter;

use writer::DocxWriter;

/// Builds the Word document for a validated payload.
pub fn generate(document_type: DocumentType, data: &Value) -> Result<Vec<u8>, AppError> {
    let mut writer = DocxWriter::new();
    match document_type {
        DocumentType::Resume => write_resume(&mut writer, data),
        DocumentType::CoverLetter => write_cover_letter(&mut writer, data),
    }
    writer
        .finish()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("DOCX packaging failed: {e}")))
}

// ────────────────────────────────────────────────────────────────────────────
// Resume layout
// ────────────────────────────────────────────────────────────────────────────

fn write_resume(writer: &mut DocxWriter, data: &Value) {
    let info = &data["personalInfo"];
    if let Some(name) = str_field(info, "name") {
        writer.heading(name);
    }

    let mut contact = Vec::new();
    for field in ["email", "phone", "location", "website", "linkedin", "github"] {
        if let Some(value) = str_field(info, field) {
            contact.push(value.to_string());
        }
    }
    if !contact.is_empty() {
        writer.centered_line(&contact.join(" | "));
    }
    writer.spacer();

    let summary = text_with_fallback(
        data,
        "professionalSummary",
        &["summary", "profile", "objective"],
        "",
    );
    if !summary.is_empty() {
        writer.section_header("Professional Summary");
        writer.plain(&summary);
        writer.spacer();
    }

    write_experience(writer, data);
    write_education(writer, data);
    write_projects(writer, data);
    write_publications(writer, data);
    write_skills(writer, data);
    write_simple_bullets(
        writer,
        data,
        "Certifications",
        "certifications",
        &["certificates", "credentials", "licenses"],
    );
    write_simple_bullets(
        writer,
        data,
        "Achievements",
        "achievements",
        &["accomplishments", "awards", "honors"],
    );
}

fn write_experience(writer: &mut DocxWriter, data: &Value) {
    let Some(entries) = data.get("experience").and_then(Value::as_array) else {
        return;
    };
    if entries.is_empty() {
        return;
    }

    writer.section_header("Experience");
    for entry in entries {
        let title = text_with_fallback(entry, "position", &["title", "role"], "Position");
        let start = str_field(entry, "startDate").unwrap_or_default();
        let end = text_with_fallback(entry, "endDate", &["end_date"], "Present");
        let dates = if start.is_empty() {
            end.clone()
        } else {
            format!("{start} - {end}")
        };
        writer.split_line(&title, &dates);

        let company = text_with_fallback(entry, "company", &["employer", "organization"], "");
        let location = str_field(entry, "location").unwrap_or_default();
        let second_line = match (company.is_empty(), location.is_empty()) {
            (false, false) => format!("{company}, {location}"),
            (false, true) => company.clone(),
            (true, false) => location.to_string(),
            (true, true) => String::new(),
        };
        if !second_line.is_empty() {
            writer.italic_line(&second_line);
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
                    writer.bullet(text);
                }
            }
        }
        writer.spacer();
    }
}

fn write_education(writer: &mut DocxWriter, data: &Value) {
    let Some(entries) = data.get("education").and_then(Value::as_array) else {
        return;
    };
    if entries.is_empty() {
        return;
    }

    writer.section_header("Education");
    for entry in entries {
        let degree = text_with_fallback(entry, "degree", &["title", "qualification"], "Degree");
        let date = text_with_fallback(
            entry,
            "endDate",
            &["end_date", "date", "graduationDate"],
            "",
        );
        writer.split_line(&degree, &date);

        let institution = text_with_fallback(
            entry,
            "institution",
            &["school", "university", "college"],
            "",
        );
        if !institution.is_empty() {
            writer.italic_line(&institution);
        }
        if let Some(gpa) = str_field(entry, "gpa") {
            writer.plain(&format!("GPA: {gpa}"));
        }
        writer.spacer();
    }
}

fn write_projects(writer: &mut DocxWriter, data: &Value) {
    let Some(entries) = data.get("projects").and_then(Value::as_array) else {
        return;
    };
    if entries.is_empty() {
        return;
    }

    writer.section_header("Projects");
    for entry in entries {
        let name = text_with_fallback(entry, "name", &["title", "project_name"], "Project");
        writer.bold_line(&name);

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
            writer.plain(&description);
        }

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
                writer.italic_line(&format!("Technologies: {joined}"));
            }
        }
        if let Some(achievements) = entry.get("achievements").and_then(Value::as_array) {
            for item in achievements {
                if let Some(text) = item.as_str().filter(|s| !s.is_empty()) {
                    writer.bullet(text);
                }
            }
        }
        writer.spacer();
    }
}

fn write_publications(writer: &mut DocxWriter, data: &Value) {
    let Some(entries) = field_with_fallback(
        data,
        "articlesAndPublications",
        &["publications", "articles", "papers"],
    )
    .and_then(Value::as_array) else {
        return;
    };
    if entries.is_empty() {
        return;
    }

    writer.section_header("Publications");
    for entry in entries {
        let title = text_with_fallback(entry, "title", &["name"], "Publication");
        let date = text_with_fallback(entry, "date", &["published_date", "year"], "");
        if date.is_empty() {
            writer.bullet(&title);
        } else {
            writer.bullet(&format!("{title} ({date})"));
        }
    }
    writer.spacer();
}

/// Skills render as categorized bullets when the data is grouped, or as a
/// single comma-joined paragraph for a flat list.
fn write_skills(writer: &mut DocxWriter, data: &Value) {
    let Some(skills) = field_with_fallback(
        data,
        "technologiesAndSkills",
        &["skills", "technologies", "tech_skills"],
    ) else {
        return;
    };

    writer.section_header("Skills");
    match skills {
        Value::Array(items) if items.iter().all(Value::is_string) => {
            let joined = items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            writer.plain(&joined);
        }
        Value::Array(groups) => {
            for group in groups {
                let category = text_with_fallback(group, "category", &["name", "type"], "Skills");
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
                    writer.bullet(&format!("{category}: {names}"));
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
                        writer.bullet(&format!("{category}: {joined}"));
                    }
                }
            }
        }
        _ => {}
    }
    writer.spacer();
}

fn write_simple_bullets(
    writer: &mut DocxWriter,
    data: &Value,
    heading: &str,
    primary: &str,
    fallbacks: &[&str],
) {
    let Some(items) = field_with_fallback(data, primary, fallbacks).and_then(Value::as_array)
    else {
        return;
    };
    if items.is_empty() {
        return;
    }

    writer.section_header(heading);
    for item in items {
        if let Some(text) = item.as_str().filter(|s| !s.is_empty()) {
            writer.bullet(text);
        }
    }
    writer.spacer();
}

// ────────────────────────────────────────────────────────────────────────────
// Cover-letter layout
// ────────────────────────────────────────────────────────────────────────────

fn write_cover_letter(writer: &mut DocxWriter, data: &Value) {
    let info = &data["personalInfo"];
    if let Some(name) = str_field(info, "name") {
        writer.heading(name);
    }
    let mut contact = Vec::new();
    for field in ["email", "phone", "location"] {
        if let Some(value) = str_field(info, field) {
            contact.push(value.to_string());
        }
    }
    if !contact.is_empty() {
        writer.centered_line(&contact.join(" | "));
    }
    writer.spacer();

    writer.plain(&letter::letter_date(data));
    writer.spacer();

    let recipient = &data["recipient"];
    for field in ["name", "title", "company", "address"] {
        if let Some(value) = str_field(recipient, field) {
            writer.plain(value);
        }
    }
    writer.spacer();

    writer.plain(&letter::salutation(data));
    writer.spacer();

    for paragraph in letter::body_paragraphs(&data["body"]) {
        writer.plain(&paragraph);
        writer.spacer();
    }

    writer.plain(str_field(data, "closing").unwrap_or("Sincerely,"));
    writer.spacer();
    if let Some(name) = str_field(info, "name") {
        writer.plain(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{Cursor, Read};

    fn document_xml(bytes: &[u8]) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut file = archive.by_name("word/document.xml").unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_resume_docx_contains_header_and_sections() {
        let data = json!({
            "personalInfo": {"name": "A B", "email": "a@b.co", "phone": "+1 555"},
            "experience": [{
                "position": "Dev",
                "company": "Acme",
                "startDate": "2020-01",
                "achievements": ["Shipped"],
            }],
            "skills": ["Rust", "Typst"],
        });
        let bytes = generate(DocumentType::Resume, &data).unwrap();
        let doc = document_xml(&bytes);
        assert!(doc.contains("A B"));
        assert!(doc.contains("a@b.co | +1 555"));
        assert!(doc.contains("Experience"));
        assert!(doc.contains("2020-01 - Present"));
        assert!(doc.contains("Rust, Typst"));
    }

    #[test]
    fn test_grouped_skills_become_bullets() {
        let data = json!({
            "personalInfo": {"name": "A", "email": "a@b.co"},
            "technologiesAndSkills": [{"category": "Languages", "skills": ["Rust"]}],
        });
        let doc = document_xml(&generate(DocumentType::Resume, &data).unwrap());
        assert!(doc.contains("Languages: Rust"));
        assert!(doc.contains("<w:numId w:val=\"1\"/>"));
    }

    #[test]
    fn test_projects_and_publications_sections_rendered() {
        let data = json!({
            "personalInfo": {"name": "A B", "email": "a@b.co"},
            "projects": [{
                "title": "difference_engine",
                "summary": "Mechanical computation library",
                "technologies": ["Rust", "Typst"],
                "achievements": ["Computed polynomials"],
            }],
            "articlesAndPublications": [
                {"title": "Notes on the Analytical Engine", "year": "1843"},
                {"name": "Sketch of the Engine"},
            ],
        });
        let doc = document_xml(&generate(DocumentType::Resume, &data).unwrap());
        assert!(doc.contains("Projects"));
        assert!(doc.contains("difference_engine"));
        assert!(doc.contains("Mechanical computation library"));
        assert!(doc.contains("Technologies: Rust, Typst"));
        assert!(doc.contains("Computed polynomials"));
        assert!(doc.contains("Publications"));
        assert!(doc.contains("Notes on the Analytical Engine (1843)"));
        assert!(doc.contains("Sketch of the Engine"));
    }

    #[test]
    fn test_cover_letter_docx_layout() {
        let data = json!({
            "personalInfo": {"name": "A B", "email": "a@b.co"},
            "recipient": {"company": "Acme"},
            "body": ["P1", "P2"],
        });
        let doc = document_xml(&generate(DocumentType::CoverLetter, &data).unwrap());
        assert!(doc.contains("Dear Hiring Manager at Acme,"));
        assert!(doc.contains("P1"));
        assert!(doc.contains("P2"));
        assert!(doc.contains("Sincerely,"));
    }

    #[test]
    fn test_missing_sections_are_skipped() {
        let data = json!({"personalInfo": {"name": "A", "email": "a@b.co"}});
        let doc = document_xml(&generate(DocumentType::Resume, &data).unwrap());
        assert!(!doc.contains("Experience"));
        assert!(!doc.contains("Education"));
    }
}
