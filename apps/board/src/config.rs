use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

/// Where per-job board preferences are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateBackend {
    Memory,
    File,
    Redis,
}

impl FromStr for StateBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StateBackend::Memory),
            "file" => Ok(StateBackend::File),
            "redis" => Ok(StateBackend::Redis),
            other => Err(anyhow!(
                "STATE_BACKEND must be one of memory, file, redis (got '{other}')"
            )),
        }
    }
}

/// Daemon configuration loaded from environment variables.
/// Everything has a default except `REDIS_URL` when the Redis backend is selected.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub port: u16,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub state_backend: StateBackend,
    pub state_path: PathBuf,
    pub redis_url: Option<String>,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend_url: "http://localhost:8000".to_string(),
            port: 8090,
            poll_interval: Duration::from_millis(3000),
            request_timeout: Duration::from_millis(10_000),
            state_backend: StateBackend::File,
            state_path: PathBuf::from(".board-state.json"),
            redis_url: None,
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();

        let state_backend = match lookup("STATE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => defaults.state_backend,
        };
        let redis_url = lookup("REDIS_URL");
        if state_backend == StateBackend::Redis && redis_url.is_none() {
            bail!("Required environment variable 'REDIS_URL' is not set (STATE_BACKEND=redis)");
        }

        Ok(Config {
            backend_url: lookup("BACKEND_URL").unwrap_or(defaults.backend_url),
            port: match lookup("PORT") {
                Some(raw) => raw
                    .parse::<u16>()
                    .context("PORT must be a valid port number")?,
                None => defaults.port,
            },
            poll_interval: millis(&lookup, "POLL_INTERVAL_MS")?.unwrap_or(defaults.poll_interval),
            request_timeout: millis(&lookup, "REQUEST_TIMEOUT_MS")?
                .unwrap_or(defaults.request_timeout),
            state_backend,
            state_path: lookup("STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_path),
            redis_url,
            rust_log: lookup("RUST_LOG").unwrap_or(defaults.rust_log),
        })
    }
}

fn millis(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Duration>> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let ms = raw
        .parse::<u64>()
        .with_context(|| format!("{key} must be a whole number of milliseconds"))?;
    if ms == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(Some(Duration::from_millis(ms)))
}
