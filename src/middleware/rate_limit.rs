//! Token-bucket rate limiting per client IP.
//!
//! Buckets live in the same Redis backend as the cache under
//! `ratelimit:{ip}` with a TTL of one window. The bucket holds `burst`
//! tokens and refills at `limit / 60` tokens per second. Redis failures
//! fail open: a broken limiter must never take the service down with it.
//! `/health` and `/metrics` are exempt.

use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::errors::{error_body, ErrorCode};
use crate::state::AppState;

const OP_TIMEOUT: Duration = Duration::from_millis(250);
/// Bucket TTL, equal to the window length.
const WINDOW_SECONDS: u64 = 60;

const EXEMPT_PATHS: &[&str] = &["/health", "/metrics"];

// ────────────────────────────────────────────────────────────────────────────
// Bucket math
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct Bucket {
    tokens: f64,
    last_refill: f64,
}

/// Pure token-bucket step: refill for elapsed time, then try to take one
/// token. Returns `(allowed, tokens_after, retry_after_seconds)`.
fn refill_and_take(
    tokens: f64,
    last_refill: f64,
    now: f64,
    refill_rate: f64,
    burst: f64,
) -> (bool, f64, u64) {
    let elapsed = (now - last_refill).max(0.0);
    let refilled = (tokens + elapsed * refill_rate).min(burst);
    if refilled >= 1.0 {
        (true, refilled - 1.0, 0)
    } else {
        let needed = 1.0 - refilled;
        let retry_after = (needed / refill_rate).ceil() as u64;
        (false, refilled, retry_after.max(1))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Limiter
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub retry_after: u64,
    pub limit: u32,
}

#[derive(Clone)]
pub struct RateLimiter {
    conn: Option<ConnectionManager>,
    limit_per_minute: u32,
    burst: u32,
}

impl RateLimiter {
    pub fn new(conn: Option<ConnectionManager>, limit_per_minute: u32, burst: u32) -> Self {
        Self {
            conn,
            limit_per_minute,
            burst,
        }
    }

    /// A limiter that allows everything (no backend).
    pub fn disabled(limit_per_minute: u32, burst: u32) -> Self {
        Self::new(None, limit_per_minute, burst)
    }

    fn allow(&self, remaining: u32) -> RateDecision {
        RateDecision {
            allowed: true,
            remaining,
            retry_after: 0,
            limit: self.limit_per_minute,
        }
    }

    pub async fn check(&self, client: &str) -> RateDecision {
        let Some(mut conn) = self.conn.clone() else {
            return self.allow(self.burst);
        };

        let key = format!("ratelimit:{client}");
        let now = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
        let refill_rate = self.limit_per_minute as f64 / 60.0;

        let read = tokio::time::timeout(OP_TIMEOUT, conn.get::<_, Option<String>>(&key)).await;
        let bucket = match read {
            Ok(Ok(Some(raw))) => serde_json::from_str::<Bucket>(&raw).unwrap_or(Bucket {
                tokens: self.burst as f64,
                last_refill: now,
            }),
            Ok(Ok(None)) => Bucket {
                tokens: self.burst as f64,
                last_refill: now,
            },
            _ => {
                // Fail open.
                warn!(%client, "rate limiter backend unavailable, allowing request");
                return self.allow(self.burst);
            }
        };

        let (allowed, tokens, retry_after) = refill_and_take(
            bucket.tokens,
            bucket.last_refill,
            now,
            refill_rate,
            self.burst as f64,
        );

        let updated = Bucket {
            tokens,
            last_refill: now,
        };
        if let Ok(payload) = serde_json::to_string(&updated) {
            let write = conn.set_ex::<_, _, ()>(&key, payload, WINDOW_SECONDS);
            if !matches!(tokio::time::timeout(OP_TIMEOUT, write).await, Ok(Ok(()))) {
                warn!(%client, "rate limiter bucket write failed");
            }
        }

        RateDecision {
            allowed,
            remaining: tokens.floor().max(0.0) as u32,
            retry_after,
            limit: self.limit_per_minute,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Middleware
// ────────────────────────────────────────────────────────────────────────────

/// Client identity: first hop of `X-Forwarded-For`, else the peer address.
fn client_ip(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if EXEMPT_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let client = client_ip(&request);
    let decision = state.limiter.check(&client).await;

    if !decision.allowed {
        warn!(%client, "rate limit exceeded");
        let body = error_body(
            ErrorCode::Api005,
            &format!(
                "Rate limit exceeded. Retry after {} seconds.",
                decision.retry_after
            ),
            json!({ "retry_after": decision.retry_after }),
        );
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [
                (header::RETRY_AFTER, decision.retry_after.to_string()),
                (
                    header::HeaderName::from_static("x-ratelimit-limit"),
                    decision.limit.to_string(),
                ),
                (
                    header::HeaderName::from_static("x-ratelimit-remaining"),
                    "0".to_string(),
                ),
                (
                    header::HeaderName::from_static("x-ratelimit-reset"),
                    decision.retry_after.to_string(),
                ),
            ],
            Json(body),
        )
            .into_response();
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    if let Ok(value) = decision.limit.to_string().parse() {
        headers.insert("x-ratelimit-limit", value);
    }
    if let Ok(value) = decision.remaining.to_string().parse() {
        headers.insert("x-ratelimit-remaining", value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: f64 = 1.0; // 60/min
    const BURST: f64 = 20.0;

    #[test]
    fn test_burst_then_reject() {
        let mut tokens = BURST;
        let now = 1_000.0;
        for i in 0..20 {
            let (allowed, left, _) = refill_and_take(tokens, now, now, RATE, BURST);
            assert!(allowed, "request {i} within burst should pass");
            tokens = left;
        }
        let (allowed, _, retry_after) = refill_and_take(tokens, now, now, RATE, BURST);
        assert!(!allowed, "request 21 should be rejected");
        assert!(retry_after >= 1 && retry_after <= 60);
    }

    #[test]
    fn test_refill_restores_tokens_over_time() {
        // Empty bucket, 5 seconds later: 5 tokens back.
        let (allowed, left, _) = refill_and_take(0.0, 1_000.0, 1_005.0, RATE, BURST);
        assert!(allowed);
        assert!((left - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_refill_capped_at_burst() {
        let (allowed, left, _) = refill_and_take(0.0, 0.0, 10_000.0, RATE, BURST);
        assert!(allowed);
        assert!((left - (BURST - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_clock_skew_does_not_grow_bucket() {
        // last_refill in the future: no negative elapsed refill.
        let (allowed, left, _) = refill_and_take(2.0, 2_000.0, 1_000.0, RATE, BURST);
        assert!(allowed);
        assert!((left - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_disabled_limiter_fails_open() {
        let limiter = RateLimiter::disabled(60, 20);
        for _ in 0..100 {
            assert!(limiter.check("10.0.0.1").await.allowed);
        }
    }
}
