//! Typst compiler binding.
//!
//! One `TypstCompiler` is created per process and holds the font catalog,
//! which is the expensive part of initialization. Each `compile` call builds
//! a fresh engine over the shared catalog, so no state leaks between
//! requests. `compile` is CPU-bound and synchronous; async callers run it
//! inside `tokio::task::spawn_blocking`.

use std::path::Path;

use thiserror::Error;
use typst_as_lib::TypstEngine;

/// Compiler diagnostics are truncated before they reach clients.
const DIAGNOSTIC_LIMIT: usize = 500;

/// Errors from the Typst compilation stage.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Typst compilation failed: {0}")]
    Compilation(String),

    #[error("Font error: {0}")]
    Font(String),

    #[error("PDF export failed: {0}")]
    Export(String),
}

impl CompileError {
    /// The compiler's diagnostic text, truncated to a client-safe length.
    pub fn diagnostic(&self) -> String {
        let text = match self {
            CompileError::Compilation(d) | CompileError::Font(d) | CompileError::Export(d) => d,
        };
        if text.chars().count() <= DIAGNOSTIC_LIMIT {
            text.clone()
        } else {
            let truncated: String = text.chars().take(DIAGNOSTIC_LIMIT).collect();
            format!("{truncated}…")
        }
    }
}

/// Process-wide Typst compiler: a pinned font catalog plus per-call engines.
pub struct TypstCompiler {
    fonts: Vec<Vec<u8>>,
}

impl TypstCompiler {
    /// Loads the font catalog. With no `font_dir`, relies on the engine's
    /// built-in font discovery.
    pub fn new(font_dir: Option<&Path>) -> Result<Self, CompileError> {
        let mut fonts = Vec::new();
        if let Some(dir) = font_dir {
            let entries = std::fs::read_dir(dir)
                .map_err(|e| CompileError::Font(format!("Failed to read {}: {e}", dir.display())))?;
            for entry in entries {
                let entry =
                    entry.map_err(|e| CompileError::Font(format!("Failed to list fonts: {e}")))?;
                let path = entry.path();
                let is_font = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| matches!(e.to_ascii_lowercase().as_str(), "ttf" | "otf" | "ttc"))
                    .unwrap_or(false);
                if is_font {
                    let bytes = std::fs::read(&path).map_err(|e| {
                        CompileError::Font(format!("Failed to read font {}: {e}", path.display()))
                    })?;
                    fonts.push(bytes);
                }
            }
        }
        Ok(Self { fonts })
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    /// Compiles Typst source to PDF bytes.
    ///
    /// CPU-bound, up to ~1 s for dense documents. The engine is rebuilt per
    /// call over the shared font catalog, so concurrent callers never share
    /// mutable compiler state.
    pub fn compile(&self, source: &str) -> Result<Vec<u8>, CompileError> {
        let mut builder = TypstEngine::builder().main_file(source.to_string());
        for font in &self.fonts {
            builder = builder.fonts([font.clone()]);
        }
        let engine = builder.build();

        let compiled = engine.compile();
        let document = compiled
            .output
            .map_err(|e| CompileError::Compilation(format!("{e:?}")))?;

        let options = typst_pdf::PdfOptions::default();
        let pdf_bytes = typst_pdf::pdf(&document, &options)
            .map_err(|e| CompileError::Export(format!("{e:?}")))?;

        Ok(pdf_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_simple_markup() {
        let compiler = TypstCompiler::new(None).unwrap();
        let pdf = compiler
            .compile("= Hello\n\nThis is a test document.")
            .expect("compilation should succeed");
        assert!(pdf.starts_with(b"%PDF"), "output missing PDF header");
    }

    #[test]
    fn test_compile_is_deterministic_for_equal_source() {
        let compiler = TypstCompiler::new(None).unwrap();
        let source = "= Title\n\nBody text with *bold*.";
        let a = compiler.compile(source).unwrap();
        let b = compiler.compile(source).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_compile_reports_diagnostic_on_bad_source() {
        let compiler = TypstCompiler::new(None).unwrap();
        // An unclosed code block is a hard syntax error.
        let result = compiler.compile("#let x = (");
        assert!(result.is_err());
    }

    #[test]
    fn test_diagnostic_truncated_to_limit() {
        let long = "x".repeat(2000);
        let err = CompileError::Compilation(long);
        let diag = err.diagnostic();
        assert!(diag.chars().count() <= DIAGNOSTIC_LIMIT + 1);
        assert!(diag.ends_with('…'));
    }

    #[test]
    fn test_missing_font_dir_is_an_error() {
        let result = TypstCompiler::new(Some(Path::new("/nonexistent/fonts")));
        assert!(matches!(result, Err(CompileError::Font(_))));
    }
}
