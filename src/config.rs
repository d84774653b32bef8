use crate::executor::executor::{ExecutorConfig, default_worker_count};

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP bind address (default: `127.0.0.1:8000`).
    pub bind: SocketAddr,
    /// Key expected in the `x-api-key` header (default: `secret123`).
    pub api_key: String,
    /// Worker pool sizing and handler timeout.
    pub executor: ExecutorConfig,
    /// How long finished jobs stay pollable (default: 1 hour).
    pub job_ttl: Duration,
    /// How often the retention sweeper runs (default: 60 s).
    pub sweep_interval: Duration,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                    | Default                        |
    /// |----------------------------|--------------------------------|
    /// | `UDF_BIND`                 | `127.0.0.1:8000`               |
    /// | `API_KEY`                  | `secret123`                    |
    /// | `UDF_WORKERS`              | cores - 1, clamped to `2..=8`  |
    /// | `UDF_QUEUE_DEPTH`          | `64`                           |
    /// | `UDF_HANDLER_TIMEOUT_SECS` | unset (no timeout)             |
    /// | `UDF_JOB_TTL_SECS`         | `3600`                         |
    /// | `UDF_SWEEP_INTERVAL_SECS`  | `60`                           |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = parse_or(&lookup, "UDF_BIND", SocketAddr::from(([127, 0, 0, 1], 8000)))?;

        let api_key = lookup("API_KEY")
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| "secret123".to_string());

        let workers: usize = parse_or(&lookup, "UDF_WORKERS", default_worker_count())?;
        if workers == 0 {
            anyhow::bail!("UDF_WORKERS must be at least 1");
        }

        let queue_depth: usize = parse_or(&lookup, "UDF_QUEUE_DEPTH", 64)?;
        match workers.checked_add(queue_depth) {
            Some(capacity) if capacity <= Semaphore::MAX_PERMITS => {}
            _ => anyhow::bail!(
                "UDF_WORKERS + UDF_QUEUE_DEPTH must not exceed {}",
                Semaphore::MAX_PERMITS
            ),
        }

        let handler_timeout = match lookup("UDF_HANDLER_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().with_context(|| {
                    format!("UDF_HANDLER_TIMEOUT_SECS must be a valid u64, got '{}'", raw)
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        let job_ttl = Duration::from_secs(parse_or(&lookup, "UDF_JOB_TTL_SECS", 3600u64)?);

        let sweep_secs: u64 = parse_or(&lookup, "UDF_SWEEP_INTERVAL_SECS", 60)?;
        if sweep_secs == 0 {
            anyhow::bail!("UDF_SWEEP_INTERVAL_SECS must be at least 1");
        }

        Ok(Self {
            bind,
            api_key,
            executor: ExecutorConfig {
                workers,
                queue_depth,
                handler_timeout,
            },
            job_ttl,
            sweep_interval: Duration::from_secs(sweep_secs),
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: '{}'", key, raw)),
        None => Ok(default),
    }
}
