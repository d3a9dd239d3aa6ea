//! Application configuration loaded from environment variables.
//! Every knob has a default, so a bare `scrivener-api` starts locally.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,

    pub cache_enabled: bool,
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_db: i64,
    pub redis_password: Option<String>,
    pub redis_ssl: bool,

    pub pdf_cache_ttl: u64,
    pub typst_cache_ttl: u64,

    /// Concurrent Typst compilations in the sync path.
    pub max_workers: usize,
    /// Async job worker pool size.
    pub job_workers: usize,

    pub max_pdf_size_bytes: usize,

    pub rate_limit_per_minute: u32,
    pub rate_limit_burst: u32,

    pub request_timeout: Duration,

    /// Directory of .ttf/.otf files for the Typst font catalog.
    pub font_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: env_parse("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),

            cache_enabled: env_parse("CACHE_ENABLED", true)?,
            redis_host: std::env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".to_string()),
            redis_port: env_parse("REDIS_PORT", 6379)?,
            redis_db: env_parse("REDIS_DB", 0)?,
            redis_password: std::env::var("REDIS_PASSWORD").ok().filter(|s| !s.is_empty()),
            redis_ssl: env_parse("REDIS_SSL", false)?,

            pdf_cache_ttl: env_parse("PDF_CACHE_TTL", 86_400)?,
            typst_cache_ttl: env_parse("TYPST_CACHE_TTL", 43_200)?,

            max_workers: env_parse("MAX_WORKERS", 4)?,
            job_workers: env_parse("JOB_WORKERS", 32)?,

            max_pdf_size_bytes: env_parse("MAX_PDF_SIZE_BYTES", 26_214_400)?,

            rate_limit_per_minute: env_parse("RATE_LIMIT_PER_MINUTE", 60)?,
            rate_limit_burst: env_parse("RATE_LIMIT_BURST", 20)?,

            request_timeout: Duration::from_secs(env_parse("REQUEST_TIMEOUT_SECONDS", 120)?),

            font_dir: std::env::var("FONT_DIR").ok().map(PathBuf::from),
        })
    }

    /// Redis connection URL assembled from the individual parts.
    pub fn redis_url(&self) -> String {
        let scheme = if self.redis_ssl { "rediss" } else { "redis" };
        let auth = match &self.redis_password {
            Some(password) => format!(":{password}@"),
            None => String::new(),
        };
        format!(
            "{scheme}://{auth}{}:{}/{}",
            self.redis_host, self.redis_port, self.redis_db
        )
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value")),
        Err(_) => Ok(default),
    }
}
