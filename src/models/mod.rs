pub mod document;

pub use document::{DocumentRequest, DocumentType, OutputFormat, SpacingMode, YamlDocumentRequest};
