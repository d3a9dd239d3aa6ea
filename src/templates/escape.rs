//! Escaping of Typst-reserved glyphs in user-supplied text.

use serde_json::Value;

/// Characters that Typst treats as markup and must be backslash-escaped.
const RESERVED: &[char] = &['\\', '#', '$', '*', '_', '@', '~', '<', '>'];

/// Escapes Typst-reserved characters in `text`.
///
/// The backslash itself is part of the reserved set and is handled in the
/// same single pass, so already-escaped input gains a literal backslash
/// rather than being double-unescaped. Empty input yields an empty string.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if RESERVED.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Emits a Typst `link` call. Display text falls back to the URL itself and
/// is escaped; the URL lives in string context and is passed through as-is.
pub fn link(url: &str, display: Option<&str>) -> String {
    let display = display.filter(|s| !s.is_empty()).unwrap_or(url);
    format!("#link(\"{}\")[{}]", url.replace('"', "%22"), escape(display))
}

/// Walks a JSON value and escapes every string leaf.
///
/// Non-string leaves (numbers, bools, null) pass through unchanged. Keys are
/// left alone; only values are user-visible text.
pub fn escape_deep(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(escape(s)),
        Value::Array(items) => Value::Array(items.iter().map(escape_deep).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), escape_deep(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_hash_and_dollar() {
        assert_eq!(escape("C# costs $5"), "C\\# costs \\$5");
    }

    #[test]
    fn test_escape_all_reserved_chars() {
        assert_eq!(
            escape("\\ # $ * _ @ ~ < >"),
            "\\\\ \\# \\$ \\* \\_ \\@ \\~ \\< \\>"
        );
    }

    #[test]
    fn test_escape_empty_input() {
        assert_eq!(escape(""), "");
    }

    #[test]
    fn test_escape_plain_text_unchanged() {
        assert_eq!(escape("Built 3 services"), "Built 3 services");
    }

    #[test]
    fn test_escape_backslash_first_no_double_escape_of_suffix() {
        // Escaping twice yields a literal backslash before the escaped char,
        // deliberately: idempotency is not part of the contract.
        let once = escape("a_b");
        assert_eq!(once, "a\\_b");
        let twice = escape(&once);
        assert_eq!(twice, "a\\\\\\_b");
    }

    #[test]
    fn test_escape_output_has_no_bare_reserved_chars() {
        let out = escape("x#y$z*w_v@u~t<s>r");
        let mut chars = out.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\\' {
                chars.next(); // the escaped character
            } else {
                assert!(
                    !['#', '$', '*', '_', '@', '~', '<', '>'].contains(&c),
                    "unescaped reserved char {c:?} in {out:?}"
                );
            }
        }
    }

    #[test]
    fn test_link_display_falls_back_to_url() {
        assert_eq!(
            link("https://ab.dev", None),
            "#link(\"https://ab.dev\")[https://ab.dev]"
        );
        assert_eq!(
            link("https://ab.dev", Some("ab.dev")),
            "#link(\"https://ab.dev\")[ab.dev]"
        );
    }

    #[test]
    fn test_link_escapes_display_not_url() {
        let out = link("mailto:a@b.co", Some("a@b.co"));
        assert_eq!(out, "#link(\"mailto:a@b.co\")[a\\@b.co]");
    }

    #[test]
    fn test_escape_deep_walks_nested_containers() {
        let input = json!({
            "personalInfo": {"name": "A_B"},
            "tags": ["x#y", 42, null],
        });
        let escaped = escape_deep(&input);
        assert_eq!(escaped["personalInfo"]["name"], "A\\_B");
        assert_eq!(escaped["tags"][0], "x\\#y");
        assert_eq!(escaped["tags"][1], 42);
        assert_eq!(escaped["tags"][2], Value::Null);
    }
}
