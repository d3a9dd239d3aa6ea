//! Field lookup helpers for the open-shape data payload.
//!
//! Upstream clients send loosely-schemaed maps with aliased keys
//! (`title`/`position`/`role`, `institution`/`school`/...). All template
//! lookups route through `field_with_fallback` so the alias tolerance lives
//! in one place.

use serde_json::Value;

/// Python-style truthiness for JSON values.
///
/// An empty string counts as falsy; downstream rendering relies on this to
/// fall through to an alias when a key exists but is blank.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Returns `obj[primary]` if truthy, else the first truthy `obj[fallback]`.
pub fn field_with_fallback<'a>(
    obj: &'a Value,
    primary: &str,
    fallbacks: &[&str],
) -> Option<&'a Value> {
    if let Some(v) = obj.get(primary) {
        if is_truthy(v) {
            return Some(v);
        }
    }
    for key in fallbacks {
        if let Some(v) = obj.get(*key) {
            if is_truthy(v) {
                return Some(v);
            }
        }
    }
    None
}

/// Like `field_with_fallback`, but coerces to a string with a default.
pub fn text_with_fallback(obj: &Value, primary: &str, fallbacks: &[&str], default: &str) -> String {
    match field_with_fallback(obj, primary, fallbacks) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => default.to_string(),
    }
}

/// Returns a non-empty string field, if present.
pub fn str_field<'a>(obj: &'a Value, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Navigates a dotted path (`experience.0.startDate`) through maps and
/// arrays. Numeric segments index into arrays.
pub fn nested<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_with_fallback_prefers_primary() {
        let obj = json!({"title": "Engineer", "position": "Dev"});
        assert_eq!(
            field_with_fallback(&obj, "title", &["position"]).unwrap(),
            "Engineer"
        );
    }

    #[test]
    fn test_field_with_fallback_blank_primary_falls_through() {
        let obj = json!({"title": "", "position": "Dev"});
        assert_eq!(
            field_with_fallback(&obj, "title", &["position"]).unwrap(),
            "Dev"
        );
    }

    #[test]
    fn test_field_with_fallback_missing_everywhere() {
        let obj = json!({"other": "x"});
        assert!(field_with_fallback(&obj, "title", &["position", "role"]).is_none());
    }

    #[test]
    fn test_text_with_fallback_default() {
        let obj = json!({});
        assert_eq!(text_with_fallback(&obj, "company", &["employer"], "Company"), "Company");
    }

    #[test]
    fn test_empty_list_is_falsy() {
        let obj = json!({"achievements": [], "details": ["did a thing"]});
        let v = field_with_fallback(&obj, "achievements", &["details"]).unwrap();
        assert_eq!(v[0], "did a thing");
    }

    #[test]
    fn test_nested_walks_arrays_and_maps() {
        let data = json!({"experience": [{"startDate": "2020-01"}]});
        assert_eq!(
            nested(&data, "experience.0.startDate").unwrap(),
            "2020-01"
        );
        assert!(nested(&data, "experience.1.startDate").is_none());
        assert!(nested(&data, "experience.zero").is_none());
    }

    #[test]
    fn test_is_truthy_numbers_and_bools() {
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!(0.5)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(null)));
        assert!(is_truthy(&json!({"k": 1})));
        assert!(!is_truthy(&json!({})));
    }
}
