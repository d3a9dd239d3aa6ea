use crate::config::Config;
use crate::jobs::worker::JobQueue;
use crate::middleware::rate_limit::RateLimiter;
use crate::render::RenderContext;

/// Shared application state injected into all route handlers via Axum
/// extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Registry + compiler + cache + single-flight, shared with job workers.
    pub ctx: RenderContext,
    pub jobs: JobQueue,
    pub limiter: RateLimiter,
}
