//! Scrivener: a document-generation service that turns structured resume and
//! cover-letter data into typeset PDF, Typst source, or DOCX artifacts.
//!
//! The crate is consumed by two binaries: the HTTP service (`scrivener-api`)
//! and the companion CLI (`scrivener`).

pub mod cache;
pub mod compiler;
pub mod config;
pub mod docx;
pub mod errors;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod render;
pub mod routes;
pub mod state;
pub mod templates;
pub mod validation;
