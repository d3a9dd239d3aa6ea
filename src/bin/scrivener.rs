//! Companion CLI: generate documents, list templates, emit sample data.
//!
//! Exit codes: 0 success, 2 invalid arguments, 3 validation error,
//! 4 template not found, 5 compilation error, 1 anything else.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

use scrivener_api::compiler::TypstCompiler;
use scrivener_api::docx;
use scrivener_api::errors::AppError;
use scrivener_api::models::{DocumentType, OutputFormat, SpacingMode};
use scrivener_api::templates::handlers::sample_payload;
use scrivener_api::templates::{spacing, RenderError, TemplateConfig, TemplateRegistry};
use scrivener_api::validation;

const EXIT_OTHER: u8 = 1;
const EXIT_ARGS: u8 = 2;
const EXIT_VALIDATION: u8 = 3;
const EXIT_TEMPLATE: u8 = 4;
const EXIT_COMPILE: u8 = 5;

#[derive(Parser)]
#[command(name = "scrivener")]
#[command(version, about = "Generate typeset resumes and cover letters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum CliFormat {
    /// Compiled PDF
    #[default]
    Pdf,
    /// Raw Typst markup
    Typst,
    /// Word document
    Docx,
}

impl From<CliFormat> for OutputFormat {
    fn from(value: CliFormat) -> Self {
        match value {
            CliFormat::Pdf => OutputFormat::Pdf,
            CliFormat::Typst => OutputFormat::Typst,
            CliFormat::Docx => OutputFormat::Docx,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a document from a JSON or YAML data file
    Generate {
        /// Document type: resume or cover_letter
        doc_type: String,
        /// Template name (see `list`)
        template: String,
        /// Input data file (.json, .yaml, .yml)
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value = "pdf")]
        format: CliFormat,
        /// Run the normalizing ultra validator
        #[arg(long)]
        ultra: bool,
        /// Spacing mode: normal, compact, ultra-compact
        #[arg(long)]
        spacing: Option<String>,
        /// Font directory for the Typst compiler
        #[arg(long)]
        fonts: Option<PathBuf>,
    },
    /// List available templates per document type
    List,
    /// Show metadata for one template
    Info { doc_type: String, template: String },
    /// Write a sample data file for a document type
    Sample { doc_type: String, out_file: PathBuf },
}

/// CLI failure with its process exit code.
struct CliError {
    code: u8,
    message: String,
}

impl CliError {
    fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            ExitCode::from(err.code)
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Generate {
            doc_type,
            template,
            input,
            output,
            format,
            ultra,
            spacing,
            fonts,
        } => generate(
            &doc_type, &template, &input, &output, format.into(), ultra, spacing, fonts,
        ),
        Commands::List => {
            let registry = TemplateRegistry::new();
            for doc_type in DocumentType::ALL {
                println!("{doc_type}:");
                for name in registry.available(doc_type) {
                    println!("  {name}");
                }
            }
            Ok(())
        }
        Commands::Info { doc_type, template } => {
            let doc_type = parse_doc_type(&doc_type)?;
            let registry = TemplateRegistry::new();
            let info = registry.get(doc_type, &template).ok_or_else(|| {
                CliError::new(
                    EXIT_TEMPLATE,
                    format!(
                        "template '{template}' not found for {doc_type} (available: {})",
                        registry.available(doc_type).join(", ")
                    ),
                )
            })?;
            println!("name:            {}", info.name);
            println!("document type:   {}", info.document_type);
            println!("description:     {}", info.description);
            println!("required fields: {}", info.required_fields.join(", "));
            Ok(())
        }
        Commands::Sample { doc_type, out_file } => {
            let doc_type = parse_doc_type(&doc_type)?;
            let sample = sample_payload(doc_type);
            let pretty = serde_json::to_string_pretty(&sample)
                .map_err(|e| CliError::new(EXIT_OTHER, e.to_string()))?;
            std::fs::write(&out_file, pretty)
                .map_err(|e| CliError::new(EXIT_OTHER, format!("writing {out_file:?}: {e}")))?;
            println!("Wrote sample {doc_type} data to {}", out_file.display());
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn generate(
    doc_type: &str,
    template: &str,
    input: &Path,
    output: &Path,
    format: OutputFormat,
    ultra: bool,
    spacing_flag: Option<String>,
    fonts: Option<PathBuf>,
) -> Result<(), CliError> {
    let doc_type = parse_doc_type(doc_type)?;
    let spacing_override = match spacing_flag {
        Some(raw) => Some(SpacingMode::parse(&raw).ok_or_else(|| {
            CliError::new(EXIT_ARGS, format!("unknown spacing mode '{raw}'"))
        })?),
        None => None,
    };

    let data = read_data(input)?;
    let validated = validation::validate(&data, ultra)
        .map_err(|e| CliError::new(EXIT_VALIDATION, e.to_string()))?;
    for warning in &validated.warnings {
        eprintln!("warning: {}: {}", warning.field, warning.message);
    }
    let data = validated.data;

    let bytes = match format {
        OutputFormat::Docx => docx::generate(doc_type, &data)
            .map_err(|e| CliError::new(EXIT_OTHER, e.to_string()))?,
        _ => {
            let registry = TemplateRegistry::new();
            let mode = spacing::resolve(spacing_override, &data);
            let helper = registry
                .create(
                    doc_type,
                    template,
                    data.clone(),
                    TemplateConfig {
                        spacing_mode: Some(mode),
                    },
                )
                .map_err(|e| match e {
                    AppError::TemplateNotFound { available, .. } => CliError::new(
                        EXIT_TEMPLATE,
                        format!(
                            "template '{template}' not found for {doc_type} (available: {})",
                            available.join(", ")
                        ),
                    ),
                    other => CliError::new(EXIT_OTHER, other.to_string()),
                })?;

            let source = helper.render().map_err(|e| match e {
                RenderError::Validation(v) => CliError::new(EXIT_VALIDATION, v.to_string()),
                RenderError::Rendering(d) => CliError::new(EXIT_OTHER, d),
            })?;

            match format {
                OutputFormat::Typst => source.into_bytes(),
                _ => {
                    let compiler = TypstCompiler::new(fonts.as_deref())
                        .map_err(|e| CliError::new(EXIT_COMPILE, e.to_string()))?;
                    compiler
                        .compile(&source)
                        .map_err(|e| CliError::new(EXIT_COMPILE, e.diagnostic()))?
                }
            }
        }
    };

    std::fs::write(output, &bytes)
        .map_err(|e| CliError::new(EXIT_OTHER, format!("writing {output:?}: {e}")))?;
    println!(
        "Wrote {} ({} bytes, {} format)",
        output.display(),
        bytes.len(),
        format
    );
    Ok(())
}

fn parse_doc_type(raw: &str) -> Result<DocumentType, CliError> {
    DocumentType::parse(raw).ok_or_else(|| {
        CliError::new(
            EXIT_ARGS,
            format!("unknown document type '{raw}' (expected: resume, cover_letter)"),
        )
    })
}

fn read_data(input: &Path) -> Result<Value, CliError> {
    let raw = std::fs::read_to_string(input)
        .map_err(|e| CliError::new(EXIT_ARGS, format!("reading {input:?}: {e}")))?;
    let is_yaml = input
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "yaml" | "yml"))
        .unwrap_or(false);
    if is_yaml {
        serde_yaml::from_str(&raw)
            .map_err(|e| CliError::new(EXIT_VALIDATION, format!("YAML parsing failed: {e}")))
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| CliError::new(EXIT_VALIDATION, format!("JSON parsing failed: {e}")))
    }
}
