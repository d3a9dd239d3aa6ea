//! Render orchestrator: validate → resolve template → render → compile,
//! with a content-addressed cache in front and per-key single-flight around
//! the expensive compile step.

pub mod handlers;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard, Semaphore};
use tracing::debug;

use crate::cache::{cache_key, DocumentCache};
use crate::compiler::TypstCompiler;
use crate::errors::AppError;
use crate::models::document::artifact_filename;
use crate::models::{DocumentRequest, OutputFormat, SpacingMode};
use crate::templates::{spacing, RenderError, TemplateConfig, TemplateRegistry};
use crate::{docx, validation};

// ────────────────────────────────────────────────────────────────────────────
// Single-flight
// ────────────────────────────────────────────────────────────────────────────

/// Per-key latch map: at most one compilation per cache key runs at a time
/// in this process. Followers wait for the leader, then re-check the cache.
/// A failed leader releases the latch, so each follower gets its own
/// independent attempt rather than a shared failure.
#[derive(Clone, Default)]
pub struct SingleFlight {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl SingleFlight {
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let latch = {
            let mut map = self.locks.lock().await;
            // Drop latches nobody holds anymore.
            map.retain(|_, latch| Arc::strong_count(latch) > 1);
            map.entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        latch.lock_owned().await
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Context and output types
// ────────────────────────────────────────────────────────────────────────────

/// Everything the pipeline needs; shared by HTTP handlers, job workers, and
/// the CLI.
#[derive(Clone)]
pub struct RenderContext {
    pub registry: Arc<TemplateRegistry>,
    pub compiler: Arc<TypstCompiler>,
    pub cache: DocumentCache,
    pub flights: SingleFlight,
    /// Bounds concurrent CPU-bound compilations.
    pub compile_permits: Arc<Semaphore>,
    pub max_pdf_size: usize,
    pub request_timeout: Duration,
}

impl RenderContext {
    pub fn new(
        registry: Arc<TemplateRegistry>,
        compiler: Arc<TypstCompiler>,
        cache: DocumentCache,
        max_workers: usize,
        max_pdf_size: usize,
        request_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            compiler,
            cache,
            flights: SingleFlight::default(),
            compile_permits: Arc::new(Semaphore::new(max_workers.max(1))),
            max_pdf_size,
            request_timeout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    Bypass,
}

impl CacheStatus {
    pub fn header_value(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
        }
    }
}

/// A finished artifact ready to flush to the client.
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
    pub cache_status: CacheStatus,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Runs the full pipeline under the overall request deadline.
pub async fn generate_with_deadline(
    ctx: &RenderContext,
    request: &DocumentRequest,
) -> Result<RenderedDocument, AppError> {
    tokio::time::timeout(ctx.request_timeout, generate_document(ctx, request))
        .await
        .map_err(|_| AppError::Timeout)?
}

/// The synchronous pipeline: resolve, validate, then either the DOCX
/// branch or cache lookup, render, compile, and cache store.
pub async fn generate_document(
    ctx: &RenderContext,
    request: &DocumentRequest,
) -> Result<RenderedDocument, AppError> {
    // Resolve the template before validating so unknown names 404 fast.
    if ctx
        .registry
        .get(request.document_type, &request.template)
        .is_none()
    {
        return Err(AppError::TemplateNotFound {
            document_type: request.document_type.to_string(),
            template: request.template.clone(),
            available: ctx.registry.available(request.document_type),
        });
    }

    let validated = validation::validate(&request.data, request.ultra_validation)?;
    let data = validated.data;
    let spacing_mode = spacing::resolve(request.spacing_mode, &data);

    // DOCX bypasses the Typst pipeline and the cache entirely.
    if request.format == OutputFormat::Docx {
        let bytes = docx::generate(request.document_type, &data)?;
        enforce_size(ctx, bytes.len())?;
        return Ok(RenderedDocument {
            filename: artifact_filename(request.document_type, &data, OutputFormat::Docx),
            bytes,
            content_type: OutputFormat::Docx.content_type(),
            cache_status: CacheStatus::Bypass,
        });
    }

    let key = cache_key(
        request.document_type,
        &request.template,
        &data,
        request.format,
        spacing_mode,
    );

    if let Some(doc) = cache_lookup(ctx, &key, request, &data).await {
        return Ok(doc);
    }

    // Per-key latch: concurrent arrivals for the same key wait here, then
    // find the leader's result in the cache.
    let _flight = ctx.flights.acquire(&key).await;
    if let Some(doc) = cache_lookup(ctx, &key, request, &data).await {
        return Ok(doc);
    }

    let source = render_markup(ctx, request, &data, spacing_mode)?;

    if request.format == OutputFormat::Typst {
        let cache = ctx.cache.clone();
        let cached_key = key.clone();
        let cached_source = source.clone();
        tokio::spawn(async move { cache.set_typst(&cached_key, &cached_source).await });
        return Ok(RenderedDocument {
            filename: artifact_filename(request.document_type, &data, OutputFormat::Typst),
            bytes: source.into_bytes(),
            content_type: OutputFormat::Typst.content_type(),
            cache_status: CacheStatus::Miss,
        });
    }

    let bytes = compile(ctx, source).await?;
    enforce_size(ctx, bytes.len())?;

    // Fire-and-forget: cache write failures are logged, never surfaced.
    let cache = ctx.cache.clone();
    let cached_key = key.clone();
    let cached_bytes = bytes.clone();
    tokio::spawn(async move { cache.set_pdf(&cached_key, &cached_bytes).await });

    Ok(RenderedDocument {
        filename: artifact_filename(request.document_type, &data, OutputFormat::Pdf),
        bytes,
        content_type: OutputFormat::Pdf.content_type(),
        cache_status: CacheStatus::Miss,
    })
}

/// Renders Typst markup through the helper contract.
fn render_markup(
    ctx: &RenderContext,
    request: &DocumentRequest,
    data: &Value,
    spacing_mode: SpacingMode,
) -> Result<String, AppError> {
    let helper = ctx.registry.create(
        request.document_type,
        &request.template,
        data.clone(),
        TemplateConfig {
            spacing_mode: Some(spacing_mode),
        },
    )?;
    helper.validate_data().map_err(AppError::Validation)?;
    helper.render().map_err(|e| match e {
        RenderError::Validation(v) => AppError::Validation(v),
        RenderError::Rendering(details) => AppError::Render {
            template: request.template.clone(),
            details,
        },
    })
}

/// Compiles on the blocking pool, bounded by the compile semaphore.
async fn compile(ctx: &RenderContext, source: String) -> Result<Vec<u8>, AppError> {
    let permit = ctx
        .compile_permits
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("compile semaphore closed: {e}")))?;

    let compiler = ctx.compiler.clone();
    let bytes = tokio::task::spawn_blocking(move || {
        let _permit = permit; // held for the duration of the compile
        compiler.compile(&source)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in compile: {e}")))??;

    Ok(bytes)
}

async fn cache_lookup(
    ctx: &RenderContext,
    key: &str,
    request: &DocumentRequest,
    data: &Value,
) -> Option<RenderedDocument> {
    match request.format {
        OutputFormat::Pdf => ctx.cache.get_pdf(key).await.map(|bytes| RenderedDocument {
            filename: artifact_filename(request.document_type, data, OutputFormat::Pdf),
            bytes,
            content_type: OutputFormat::Pdf.content_type(),
            cache_status: CacheStatus::Hit,
        }),
        OutputFormat::Typst => ctx.cache.get_typst(key).await.map(|source| {
            debug!(key, "serving cached typst source");
            RenderedDocument {
                filename: artifact_filename(request.document_type, data, OutputFormat::Typst),
                bytes: source.into_bytes(),
                content_type: OutputFormat::Typst.content_type(),
                cache_status: CacheStatus::Hit,
            }
        }),
        OutputFormat::Docx => None,
    }
}

fn enforce_size(ctx: &RenderContext, size: usize) -> Result<(), AppError> {
    if size > ctx.max_pdf_size {
        return Err(AppError::ArtifactTooLarge {
            size,
            limit: ctx.max_pdf_size,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentType;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_context() -> RenderContext {
        RenderContext::new(
            Arc::new(TemplateRegistry::new()),
            Arc::new(TypstCompiler::new(None).unwrap()),
            DocumentCache::disabled(),
            2,
            26_214_400,
            Duration::from_secs(30),
        )
    }

    fn typst_request() -> DocumentRequest {
        DocumentRequest {
            document_type: DocumentType::Resume,
            template: "classic".to_string(),
            format: OutputFormat::Typst,
            data: json!({"personalInfo": {"name": "A B", "email": "a@b.co"}}),
            ultra_validation: false,
            spacing_mode: None,
        }
    }

    #[tokio::test]
    async fn test_typst_format_skips_compiler() {
        let ctx = test_context();
        let doc = generate_document(&ctx, &typst_request()).await.unwrap();
        assert_eq!(doc.cache_status, CacheStatus::Miss);
        assert_eq!(doc.filename, "resume_A_B.typ");
        let source = String::from_utf8(doc.bytes).unwrap();
        assert!(source.contains("#set page"));
    }

    #[tokio::test]
    async fn test_unknown_template_is_not_found() {
        let ctx = test_context();
        let mut request = typst_request();
        request.template = "neon".to_string();
        let err = generate_document(&ctx, &request).await.err().unwrap();
        assert!(matches!(err, AppError::TemplateNotFound { .. }));
    }

    #[tokio::test]
    async fn test_validation_failure_propagates() {
        let ctx = test_context();
        let mut request = typst_request();
        request.data = json!({"personalInfo": {"name": "A"}});
        let err = generate_document(&ctx, &request).await.err().unwrap();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_single_flight_serializes_same_key() {
        let flights = SingleFlight::default();
        let counter = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flights = flights.clone();
            let counter = counter.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _guard = flights.acquire("pdf:resume:classic:k").await;
                let current = counter.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(current, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                counter.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1, "holders overlapped");
    }

    #[tokio::test]
    async fn test_single_flight_distinct_keys_run_concurrently() {
        let flights = SingleFlight::default();
        let guard_a = flights.acquire("a").await;
        // A different key must not block.
        let guard_b =
            tokio::time::timeout(Duration::from_millis(100), flights.acquire("b")).await;
        assert!(guard_b.is_ok());
        drop(guard_a);
    }

    #[tokio::test]
    async fn test_single_flight_prunes_idle_latches() {
        let flights = SingleFlight::default();
        drop(flights.acquire("a").await);
        drop(flights.acquire("b").await);
        // Next acquire prunes released latches.
        let _guard = flights.acquire("c").await;
        assert!(flights.len().await <= 2);
    }

    #[tokio::test]
    async fn test_artifact_size_ceiling() {
        let mut ctx = test_context();
        ctx.max_pdf_size = 16;
        let result = generate_document(&ctx, &typst_request()).await;
        // Typst source path doesn't enforce the cap, PDF/DOCX do; exercise
        // the guard directly.
        assert!(result.is_ok());
        assert!(matches!(
            enforce_size(&ctx, 17),
            Err(AppError::ArtifactTooLarge { .. })
        ));
    }
}
