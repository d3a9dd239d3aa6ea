use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use axum::http::{header, Method};
use redis::aio::ConnectionManager;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scrivener_api::cache::DocumentCache;
use scrivener_api::compiler::TypstCompiler;
use scrivener_api::config::Config;
use scrivener_api::jobs::worker::JobQueue;
use scrivener_api::jobs::JobStore;
use scrivener_api::middleware::rate_limit::RateLimiter;
use scrivener_api::render::RenderContext;
use scrivener_api::routes::build_router;
use scrivener_api::state::AppState;
use scrivener_api::templates::TemplateRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Scrivener API v{}", env!("CARGO_PKG_VERSION"));

    // Redis backs the cache, the job store, and the rate limiter. Losing it
    // degrades all three gracefully instead of failing startup.
    let redis = if config.cache_enabled {
        connect_redis(&config).await
    } else {
        info!("Caching disabled by configuration");
        None
    };

    // Compiler init loads the font catalog; it is the slow part of startup.
    let started = Instant::now();
    let compiler = Arc::new(TypstCompiler::new(config.font_dir.as_deref())?);
    info!(
        fonts = compiler.font_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Typst compiler initialized"
    );

    let cache = DocumentCache::new(
        redis.clone(),
        config.cache_enabled,
        config.pdf_cache_ttl,
        config.typst_cache_ttl,
    );
    let ctx = RenderContext::new(
        Arc::new(TemplateRegistry::new()),
        compiler,
        cache,
        config.max_workers,
        config.max_pdf_size_bytes,
        config.request_timeout,
    );

    let jobs = JobQueue::start(JobStore::new(redis.clone()), config.job_workers, ctx.clone());
    info!(workers = config.job_workers, "Job worker pool started");

    let limiter = RateLimiter::new(
        redis,
        config.rate_limit_per_minute,
        config.rate_limit_burst,
    );

    let state = AppState {
        config: config.clone(),
        ctx,
        jobs,
        limiter,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Connects the shared Redis backend; on failure the service starts with the
/// cache in disabled mode and the rate limiter failing open.
async fn connect_redis(config: &Config) -> Option<ConnectionManager> {
    let client = match redis::Client::open(config.redis_url()) {
        Ok(client) => client,
        Err(e) => {
            warn!("Invalid Redis configuration, cache disabled: {e}");
            return None;
        }
    };
    match tokio::time::timeout(Duration::from_secs(5), ConnectionManager::new(client)).await {
        Ok(Ok(conn)) => {
            info!(
                "Redis connected: {}:{}",
                config.redis_host, config.redis_port
            );
            Some(conn)
        }
        Ok(Err(e)) => {
            warn!("Redis unavailable, cache disabled: {e}");
            None
        }
        Err(_) => {
            warn!("Redis connection timed out, cache disabled");
            None
        }
    }
}

/// Open CORS per the public API contract.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(86_400))
}
