//! Shared cover-letter plumbing: salutation cascade, date line, body
//! normalization. Both cover-letter templates build on these.

use chrono::Local;
use serde_json::Value;

use super::fields::str_field;

/// Deterministic salutation when the data does not supply one:
/// recipient name, then title, then "Hiring Manager at {company}", then the
/// plain default.
pub fn salutation(data: &Value) -> String {
    if let Some(explicit) = str_field(data, "salutation") {
        return explicit.to_string();
    }
    let recipient = &data["recipient"];
    if let Some(name) = str_field(recipient, "name") {
        return format!("Dear {name},");
    }
    if let Some(title) = str_field(recipient, "title") {
        return format!("Dear {title},");
    }
    if let Some(company) = str_field(recipient, "company") {
        return format!("Dear Hiring Manager at {company},");
    }
    "Dear Hiring Manager,".to_string()
}

/// The letter date: supplied value verbatim, else today as `Month D, YYYY`.
pub fn letter_date(data: &Value) -> String {
    if let Some(date) = str_field(data, "date") {
        return date.to_string();
    }
    Local::now().format("%B %-d, %Y").to_string()
}

/// Normalizes the body into ordered paragraphs.
///
/// Accepts a single string (split on blank lines), an array of strings, or an
/// array of `{text}` objects. Empty entries are skipped.
pub fn body_paragraphs(body: &Value) -> Vec<String> {
    match body {
        Value::String(text) => text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Object(_) => item
                    .get("text")
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_string()),
                _ => None,
            })
            .filter(|p| !p.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_salutation_cascade() {
        assert_eq!(
            salutation(&json!({"recipient": {"name": "Dr. Smith"}})),
            "Dear Dr. Smith,"
        );
        assert_eq!(
            salutation(&json!({"recipient": {"title": "Head of Engineering"}})),
            "Dear Head of Engineering,"
        );
        assert_eq!(
            salutation(&json!({"recipient": {"company": "Acme"}})),
            "Dear Hiring Manager at Acme,"
        );
        assert_eq!(salutation(&json!({})), "Dear Hiring Manager,");
    }

    #[test]
    fn test_salutation_explicit_wins() {
        let data = json!({"salutation": "To whom it may concern,", "recipient": {"name": "X"}});
        assert_eq!(salutation(&data), "To whom it may concern,");
    }

    #[test]
    fn test_letter_date_passthrough() {
        assert_eq!(letter_date(&json!({"date": "March 1, 2025"})), "March 1, 2025");
    }

    #[test]
    fn test_letter_date_default_shape() {
        // "Month D, YYYY": one comma, no zero-padded day.
        let date = letter_date(&json!({}));
        assert!(date.contains(", "));
        assert!(!date.split_whitespace().nth(1).unwrap().starts_with('0'));
    }

    #[test]
    fn test_body_string_splits_paragraphs() {
        let body = json!("First paragraph.\n\nSecond paragraph.");
        assert_eq!(
            body_paragraphs(&body),
            vec!["First paragraph.", "Second paragraph."]
        );
    }

    #[test]
    fn test_body_array_skips_empties() {
        let body = json!(["P1", "", "  ", "P2"]);
        assert_eq!(body_paragraphs(&body), vec!["P1", "P2"]);
    }

    #[test]
    fn test_body_structured_paragraphs() {
        let body = json!([{"text": "P1"}, {"other": "x"}, {"text": "P2"}]);
        assert_eq!(body_paragraphs(&body), vec!["P1", "P2"]);
    }
}
