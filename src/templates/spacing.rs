//! Spacing-mode presets: page margins, font size, and paragraph leading.

use serde_json::Value;

use crate::models::SpacingMode;

/// Numeric preset behind a spacing mode. The string fields are emitted
/// verbatim into the Typst preamble.
#[derive(Debug, Clone, Copy)]
pub struct SpacingPreset {
    pub margin: &'static str,
    pub font_size: &'static str,
    pub leading: &'static str,
    /// Estimated rendered lines per page, used by content analysis.
    pub lines_per_page: u32,
}

pub fn preset(mode: SpacingMode) -> SpacingPreset {
    match mode {
        SpacingMode::Normal => SpacingPreset {
            margin: "0.8cm",
            font_size: "10pt",
            leading: "0.6em",
            lines_per_page: 45,
        },
        SpacingMode::Compact => SpacingPreset {
            margin: "0.6cm",
            font_size: "10pt",
            leading: "0.5em",
            lines_per_page: 52,
        },
        SpacingMode::UltraCompact => SpacingPreset {
            margin: "0.45cm",
            font_size: "9.5pt",
            leading: "0.45em",
            lines_per_page: 58,
        },
    }
}

/// Emits the page/text preamble for a spacing mode.
pub fn preamble(mode: SpacingMode) -> String {
    let p = preset(mode);
    format!(
        "#set page(paper: \"a4\", margin: {})\n#set text(size: {})\n#set par(leading: {}, justify: true)\n",
        p.margin, p.font_size, p.leading
    )
}

/// Resolves the effective spacing mode: explicit config wins, then
/// `data.spacing_mode`, then `data.spacingMode`, then the compact default.
pub fn resolve(configured: Option<SpacingMode>, data: &Value) -> SpacingMode {
    if let Some(mode) = configured {
        return mode;
    }
    for key in ["spacing_mode", "spacingMode"] {
        if let Some(mode) = data
            .get(key)
            .and_then(Value::as_str)
            .and_then(SpacingMode::parse)
        {
            return mode;
        }
    }
    SpacingMode::Compact
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_preamble_contains_preset_values() {
        let text = preamble(SpacingMode::Normal);
        assert!(text.contains("margin: 0.8cm"));
        assert!(text.contains("size: 10pt"));
        assert!(text.contains("leading: 0.6em"));

        let ultra = preamble(SpacingMode::UltraCompact);
        assert!(ultra.contains("9.5pt"));
        assert!(ultra.contains("0.45em"));
    }

    #[test]
    fn test_resolve_order_config_first() {
        let data = json!({"spacing_mode": "normal"});
        assert_eq!(
            resolve(Some(SpacingMode::UltraCompact), &data),
            SpacingMode::UltraCompact
        );
        assert_eq!(resolve(None, &data), SpacingMode::Normal);
    }

    #[test]
    fn test_resolve_camel_case_key_and_default() {
        assert_eq!(
            resolve(None, &json!({"spacingMode": "ultra-compact"})),
            SpacingMode::UltraCompact
        );
        assert_eq!(resolve(None, &json!({})), SpacingMode::Compact);
    }

    #[test]
    fn test_lines_per_page_table() {
        assert_eq!(preset(SpacingMode::Normal).lines_per_page, 45);
        assert_eq!(preset(SpacingMode::Compact).lines_per_page, 52);
        assert_eq!(preset(SpacingMode::UltraCompact).lines_per_page, 58);
    }
}
