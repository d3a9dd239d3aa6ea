//! Content-addressed document cache.
//!
//! Keys are derived from the canonical JSON of the semantic inputs
//! (`{document_type, template, data, format}`, keys sorted), hashed with
//! SHA-256 and prefixed `pdf:{type}:{template}:` or `typst:{type}:{template}:`.
//!
//! The backing store is Redis with TTL semantics. When the backend is
//! unavailable the cache runs in **disabled** mode: every get misses, every
//! set is a no-op, and errors are counted but never propagated. Each
//! operation is bounded by a short timeout so a slow backend cannot stall
//! the render path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::models::{DocumentType, OutputFormat, SpacingMode};

/// Per-operation timeout. On expiry, gets behave as a miss and sets as a
/// failed (but silent) write.
const OP_TIMEOUT: Duration = Duration::from_millis(250);

// ────────────────────────────────────────────────────────────────────────────
// Key derivation
// ────────────────────────────────────────────────────────────────────────────

/// Serializes a JSON value with object keys sorted, so logically-equal
/// payloads hash identically regardless of key order.
pub fn canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => serde_json::to_string(s).unwrap_or_default(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", inner.join(","))
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let inner: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(k).unwrap_or_default(),
                        canonical_json(&map[k])
                    )
                })
                .collect();
            format!("{{{}}}", inner.join(","))
        }
    }
}

/// Derives the cache key for a request. Deterministic: equal canonical
/// inputs yield equal keys. The resolved spacing mode is part of the hash
/// because it changes the emitted bytes.
pub fn cache_key(
    document_type: DocumentType,
    template: &str,
    data: &Value,
    format: OutputFormat,
    spacing: SpacingMode,
) -> String {
    let payload = serde_json::json!({
        "type": document_type.as_str(),
        "template": template,
        "data": data,
        "format": format.as_str(),
        "spacing": spacing.as_str(),
    });
    let digest = Sha256::digest(canonical_json(&payload).as_bytes());
    let prefix = match format {
        OutputFormat::Typst => "typst",
        _ => "pdf",
    };
    format!("{prefix}:{document_type}:{template}:{digest:x}")
}

// ────────────────────────────────────────────────────────────────────────────
// Metrics
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    errors: AtomicU64,
}

/// Snapshot served by `/metrics`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub total_requests: u64,
    pub hit_rate_percent: f64,
    pub sets: u64,
    pub errors: u64,
    pub enabled: bool,
    pub connected: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Cache
// ────────────────────────────────────────────────────────────────────────────

/// Redis-backed cache handle. Cheap to clone; counters are shared.
#[derive(Clone)]
pub struct DocumentCache {
    conn: Option<ConnectionManager>,
    enabled: bool,
    pdf_ttl: u64,
    typst_ttl: u64,
    counters: Arc<Counters>,
}

impl DocumentCache {
    /// `enabled` reflects configuration (`CACHE_ENABLED`), independent of
    /// whether the backend connection actually came up; `connected()` reports
    /// the latter. A configured-but-unreachable backend shows as
    /// `enabled=true, connected=false` in metrics.
    pub fn new(
        conn: Option<ConnectionManager>,
        enabled: bool,
        pdf_ttl: u64,
        typst_ttl: u64,
    ) -> Self {
        Self {
            conn,
            enabled,
            pdf_ttl,
            typst_ttl,
            counters: Arc::new(Counters::default()),
        }
    }

    /// A cache that misses everything; used when `CACHE_ENABLED=false`.
    pub fn disabled() -> Self {
        Self::new(None, false, 0, 0)
    }

    pub fn connected(&self) -> bool {
        self.conn.is_some()
    }

    pub async fn get_pdf(&self, key: &str) -> Option<Vec<u8>> {
        self.get_bytes(key).await
    }

    pub async fn set_pdf(&self, key: &str, bytes: &[u8]) {
        self.set_bytes(key, bytes, self.pdf_ttl).await;
    }

    pub async fn get_typst(&self, key: &str) -> Option<String> {
        self.get_bytes(key)
            .await
            .and_then(|bytes| String::from_utf8(bytes).ok())
    }

    pub async fn set_typst(&self, key: &str, source: &str) {
        self.set_bytes(key, source.as_bytes(), self.typst_ttl).await;
    }

    pub async fn invalidate(&self, key: &str) {
        let Some(mut conn) = self.conn.clone() else {
            return;
        };
        let result: Result<Result<(), _>, _> =
            tokio::time::timeout(OP_TIMEOUT, conn.del(key)).await;
        if !matches!(result, Ok(Ok(()))) {
            self.counters.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn metrics(&self) -> CacheMetrics {
        let hits = self.counters.hits.load(Ordering::Relaxed);
        let misses = self.counters.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64 * 10_000.0).round() / 100.0
        } else {
            0.0
        };
        CacheMetrics {
            hits,
            misses,
            total_requests: total,
            hit_rate_percent: hit_rate,
            sets: self.counters.sets.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
            enabled: self.enabled,
            connected: self.connected(),
        }
    }

    async fn get_bytes(&self, key: &str) -> Option<Vec<u8>> {
        let mut conn = self.conn.clone()?;
        match tokio::time::timeout(OP_TIMEOUT, conn.get::<_, Option<Vec<u8>>>(key)).await {
            Ok(Ok(Some(bytes))) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key, "cache HIT");
                Some(bytes)
            }
            Ok(Ok(None)) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key, "cache MISS");
                None
            }
            Ok(Err(e)) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key, "cache get error: {e}");
                None
            }
            Err(_) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key, "cache get timed out");
                None
            }
        }
    }

    async fn set_bytes(&self, key: &str, bytes: &[u8], ttl: u64) {
        let Some(mut conn) = self.conn.clone() else {
            return;
        };
        match tokio::time::timeout(OP_TIMEOUT, conn.set_ex::<_, _, ()>(key, bytes, ttl)).await {
            Ok(Ok(())) => {
                self.counters.sets.fetch_add(1, Ordering::Relaxed);
                debug!(key, bytes = bytes.len(), "cache SET");
            }
            Ok(Err(e)) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key, "cache set error: {e}");
            }
            Err(_) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key, "cache set timed out");
            }
        }
    }
}
