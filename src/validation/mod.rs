//! Request-data validation.
//!
//! Two levels share one issue vocabulary:
//!
//! - **standard** fails fast on the first disqualifying problem and performs
//!   the legacy `title` → `position` alias normalization.
//! - **ultra** collects every issue, canonicalizes the email, prepends
//!   `https://` to scheme-less profile URLs (as warnings), and returns the
//!   transformed data. It raises only when at least one issue has severity
//!   `error`.
//!
//! The original payload is never mutated; both levels return a normalized
//! copy.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::errors::ErrorCode;

const DATE_FIELDS: &[&str] = &["startDate", "endDate", "graduationDate"];
const URL_FIELDS: &[&str] = &["website", "linkedin", "github"];

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // YYYY-MM, YYYY-MM-DD, MM-YYYY, MM-DD-YYYY
    RE.get_or_init(|| {
        Regex::new(r"^(\d{4}-\d{2}(-\d{2})?|\d{2}-\d{4}|\d{2}-\d{2}-\d{4})$").unwrap()
    })
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // RFC-5322-lite: enough to reject obviously broken addresses.
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap())
}

// ────────────────────────────────────────────────────────────────────────────
// Issue and error types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One validation finding, tied to the offending field path
/// (dotted, with array indices: `experience[0].startDate`).
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub code: ErrorCode,
    pub severity: Severity,
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn error(code: ErrorCode, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(code: ErrorCode, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Raised when validation finds at least one error-severity issue.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn single(code: ErrorCode, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![ValidationIssue::error(code, field, message)],
        }
    }

    /// Code of the first error-severity issue.
    pub fn primary_code(&self) -> ErrorCode {
        self.issues
            .iter()
            .find(|i| i.severity == Severity::Error)
            .or(self.issues.first())
            .map(|i| i.code)
            .unwrap_or(ErrorCode::Val001)
    }

    /// Field path of the first error-severity issue.
    pub fn primary_field(&self) -> &str {
        self.issues
            .iter()
            .find(|i| i.severity == Severity::Error)
            .or(self.issues.first())
            .map(|i| i.field.as_str())
            .unwrap_or("")
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .issues
            .iter()
            .map(|i| format!("{}: {}", i.field, i.message))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

impl std::error::Error for ValidationError {}

/// Result of a successful ultra validation: transformed data plus any
/// warning-severity findings.
#[derive(Debug, Clone)]
pub struct Validated {
    pub data: Value,
    pub warnings: Vec<ValidationIssue>,
}

// ────────────────────────────────────────────────────────────────────────────
// Public entry points
// ────────────────────────────────────────────────────────────────────────────

/// Runs validation at the requested level and returns the normalized data.
pub fn validate(data: &Value, ultra: bool) -> Result<Validated, ValidationError> {
    if ultra {
        validate_ultra(data)
    } else {
        validate_standard(data).map(|data| Validated {
            data,
            warnings: Vec::new(),
        })
    }
}

/// Standard validation: structural checks, date shapes, alias normalization.
/// Fails fast on the first disqualifying issue.
pub fn validate_standard(data: &Value) -> Result<Value, ValidationError> {
    let mut issues = Vec::new();
    let normalized = run_checks(data, &mut issues, true);
    match issues.into_iter().find(|i| i.severity == Severity::Error) {
        Some(first) => Err(ValidationError {
            issues: vec![first],
        }),
        None => Ok(normalized),
    }
}

/// Ultra validation: everything standard does, plus email canonicalization
/// and URL scheme fixups. Collects all issues before deciding.
pub fn validate_ultra(data: &Value) -> Result<Validated, ValidationError> {
    let mut issues = Vec::new();
    let mut normalized = run_checks(data, &mut issues, false);
    run_ultra_transforms(&mut normalized, &mut issues);

    if issues.iter().any(|i| i.severity == Severity::Error) {
        return Err(ValidationError { issues });
    }
    Ok(Validated {
        data: normalized,
        warnings: issues,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Checks
// ────────────────────────────────────────────────────────────────────────────

/// Shared structural checks. Returns a normalized copy of `data`.
/// With `fail_fast`, stops at the first error-severity issue.
fn run_checks(data: &Value, issues: &mut Vec<ValidationIssue>, fail_fast: bool) -> Value {
    collect_issues(data, issues, fail_fast);
    let mut normalized = data.clone();
    normalize_title_alias(&mut normalized);
    normalized
}

fn collect_issues(data: &Value, issues: &mut Vec<ValidationIssue>, fail_fast: bool) {
    let Some(map) = data.as_object() else {
        issues.push(ValidationIssue::error(
            ErrorCode::Val002,
            "data",
            "Document data must be a mapping",
        ));
        return;
    };

    match map.get("personalInfo") {
        None => {
            issues.push(ValidationIssue::error(
                ErrorCode::Val001,
                "personalInfo",
                "Personal information is required",
            ));
            return;
        }
        Some(info) if !info.is_object() => {
            issues.push(ValidationIssue::error(
                ErrorCode::Val002,
                "personalInfo",
                "personalInfo must be a mapping",
            ));
            return;
        }
        Some(info) => {
            for field in ["name", "email"] {
                let present = info
                    .get(field)
                    .and_then(Value::as_str)
                    .map(|s| !s.trim().is_empty())
                    .unwrap_or(false);
                if !present {
                    issues.push(ValidationIssue::error(
                        ErrorCode::Val001,
                        format!("personalInfo.{field}"),
                        format!("Required field '{field}' is missing from personalInfo"),
                    ));
                    if fail_fast {
                        return;
                    }
                }
            }
        }
    }

    for section in ["experience", "education"] {
        check_entry_dates(data, section, issues);
        if fail_fast && issues.iter().any(|i| i.severity == Severity::Error) {
            return;
        }
    }
}

/// Date-shaped fields must match `YYYY-MM`, `YYYY-MM-DD`, `MM-YYYY`,
/// `MM-DD-YYYY`, be empty, or read `Present` (any case).
fn is_valid_date(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("present") || date_re().is_match(value)
}

fn check_entry_dates(data: &Value, section: &str, issues: &mut Vec<ValidationIssue>) {
    let Some(entries) = data.get(section).and_then(Value::as_array) else {
        return;
    };
    for (idx, entry) in entries.iter().enumerate() {
        for field in DATE_FIELDS {
            if let Some(value) = entry.get(*field).and_then(Value::as_str) {
                if !is_valid_date(value) {
                    issues.push(ValidationIssue::error(
                        ErrorCode::Val006,
                        format!("{section}[{idx}].{field}"),
                        format!("Date '{value}' is not in a recognized format"),
                    ));
                }
            }
        }
    }
}

/// Legacy payloads use `title` where the templates expect `position`.
fn normalize_title_alias(data: &mut Value) {
    let Some(entries) = data.get_mut("experience").and_then(Value::as_array_mut) else {
        return;
    };
    for entry in entries {
        let Some(map) = entry.as_object_mut() else {
            continue;
        };
        if !map.contains_key("position") {
            if let Some(title) = map.get("title").cloned() {
                map.insert("position".to_string(), title);
            }
        }
    }
}

/// Ultra-only transforms: canonicalize the email, fix URL schemes.
fn run_ultra_transforms(data: &mut Value, issues: &mut Vec<ValidationIssue>) {
    let Some(info) = data.get_mut("personalInfo").and_then(Value::as_object_mut) else {
        return;
    };

    if let Some(Value::String(email)) = info.get_mut("email") {
        let canonical = email.trim().to_lowercase();
        if !canonical.is_empty() && !email_re().is_match(&canonical) {
            issues.push(ValidationIssue::error(
                ErrorCode::Val003,
                "personalInfo.email",
                format!("Email '{canonical}' is not in valid format"),
            ));
        } else {
            *email = canonical;
        }
    }

    for field in URL_FIELDS {
        if let Some(Value::String(url)) = info.get_mut(*field) {
            if !url.is_empty() && !url.starts_with("http://") && !url.starts_with("https://") {
                let fixed = format!("https://{url}");
                issues.push(ValidationIssue::warning(
                    ErrorCode::Val005,
                    format!("personalInfo.{field}"),
                    format!("URL '{url}' had no scheme; assumed '{fixed}'"),
                ));
                *url = fixed;
            }
        }
    }
}
