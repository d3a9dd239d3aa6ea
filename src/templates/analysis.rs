//! Content analysis: word/line estimates, page projections, and
//! plain-language recommendations.
//!
//! Estimates are heuristic by design: a rendered line is approximated as 75
//! characters, each section pays a 2-line header/spacing overhead, and
//! lines-per-page follows the spacing-mode table.

use serde::Serialize;
use serde_json::Value;

use crate::models::SpacingMode;

use super::spacing;

/// Characters per estimated rendered line.
const CHARS_PER_LINE: usize = 75;
/// Header and spacing overhead per section, in lines.
const SECTION_OVERHEAD_LINES: usize = 2;

/// Keys that carry layout hints rather than document content.
const NON_CONTENT_KEYS: &[&str] = &["spacing_mode", "spacingMode", "date", "salutation"];

#[derive(Debug, Clone, Serialize)]
pub struct SectionMetrics {
    pub section: String,
    pub word_count: usize,
    pub char_count: usize,
    pub estimated_lines: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentAnalysis {
    pub sections: Vec<SectionMetrics>,
    pub total_words: usize,
    pub total_chars: usize,
    pub estimated_lines: usize,
    pub estimated_pages: f64,
    pub lines_per_page: u32,
    pub spacing_mode: String,
    pub recommendations: Vec<String>,
}

/// Extended density view served by `/analyze-pdf`.
#[derive(Debug, Clone, Serialize)]
pub struct DensityAnalysis {
    #[serde(flatten)]
    pub analysis: DocumentAnalysis,
    /// Share of the final page left unused (0.0 = full, 1.0 = empty).
    pub whitespace_ratio: f64,
    /// Per-section share of total estimated lines.
    pub section_density: Vec<SectionDensity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionDensity {
    pub section: String,
    pub line_share: f64,
}

/// Collects every string leaf under a value into one text blob.
fn collect_text(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(s);
        }
        Value::Array(items) => {
            for item in items {
                collect_text(item, out);
            }
        }
        Value::Object(map) => {
            for v in map.values() {
                collect_text(v, out);
            }
        }
        _ => {}
    }
}

/// Computes per-section and aggregate content metrics.
pub fn analyze(data: &Value, mode: SpacingMode) -> DocumentAnalysis {
    let lines_per_page = spacing::preset(mode).lines_per_page;
    let mut sections = Vec::new();

    if let Some(map) = data.as_object() {
        for (key, value) in map {
            if NON_CONTENT_KEYS.contains(&key.as_str()) {
                continue;
            }
            let mut text = String::new();
            collect_text(value, &mut text);
            if text.is_empty() {
                continue;
            }
            let char_count = text.chars().count();
            sections.push(SectionMetrics {
                section: key.clone(),
                word_count: text.split_whitespace().count(),
                char_count,
                estimated_lines: char_count.div_ceil(CHARS_PER_LINE) + SECTION_OVERHEAD_LINES,
            });
        }
    }

    let total_words: usize = sections.iter().map(|s| s.word_count).sum();
    let total_chars: usize = sections.iter().map(|s| s.char_count).sum();
    let estimated_lines: usize = sections.iter().map(|s| s.estimated_lines).sum();
    let estimated_pages =
        ((estimated_lines as f64 / lines_per_page as f64) * 100.0).ceil() / 100.0;

    let recommendations = recommend(mode, estimated_pages, total_words);

    DocumentAnalysis {
        sections,
        total_words,
        total_chars,
        estimated_lines,
        estimated_pages,
        lines_per_page,
        spacing_mode: mode.as_str().to_string(),
        recommendations,
    }
}

/// Extended whitespace/density analysis for `/analyze-pdf`.
pub fn analyze_density(data: &Value, mode: SpacingMode) -> DensityAnalysis {
    let analysis = analyze(data, mode);
    let capacity = (analysis.estimated_pages.ceil().max(1.0)
        * analysis.lines_per_page as f64)
        .max(1.0);
    let whitespace_ratio =
        ((1.0 - analysis.estimated_lines as f64 / capacity).max(0.0) * 100.0).round() / 100.0;

    let total_lines = analysis.estimated_lines.max(1) as f64;
    let section_density = analysis
        .sections
        .iter()
        .map(|s| SectionDensity {
            section: s.section.clone(),
            line_share: (s.estimated_lines as f64 / total_lines * 100.0).round() / 100.0,
        })
        .collect();

    DensityAnalysis {
        analysis,
        whitespace_ratio,
        section_density,
    }
}

fn recommend(mode: SpacingMode, pages: f64, words: usize) -> Vec<String> {
    let mut recommendations = Vec::new();

    if pages > 2.0 {
        recommendations.push(format!(
            "Estimated length is {pages:.1} pages; trim content or switch to ultra-compact spacing"
        ));
    } else if mode == SpacingMode::Normal && pages > 1.5 {
        recommendations.push(
            "Estimated length exceeds 1.5 pages in normal spacing; consider compact mode"
                .to_string(),
        );
    }
    if words > 800 {
        recommendations.push(format!(
            "Word count ({words}) is high; aim for 800 or fewer for a readable document"
        ));
    }
    recommendations
}
