// Device agent configuration.
//
// Purpose
// - Turn `PUNCH_SYNC_*` environment variables into typed settings.
//
// Responsibilities
// - Apply defaults for anything unset, except the acceptance endpoint.
// - Fail startup on missing or out-of-range values, naming the variable.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const PREFIX: &str = "PUNCH_SYNC_";

const MIN_DEBOUNCE_MS: u64 = 2000;

/// Shortest hold before a connectivity change is reported.
pub const MIN_DEBOUNCE: Duration = Duration::from_millis(MIN_DEBOUNCE_MS);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name}={value:?} is invalid: {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },

    #[error("{name} must be set")]
    Missing { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub queue_path: PathBuf,
    pub endpoint_url: String,
    pub probe_url: Option<String>,
    pub debounce: Duration,
    pub probe_interval: Duration,
    pub delivery_timeout: Duration,
    pub retry_base: Duration,
    pub retry_max: Duration,
    pub sweep_interval: Duration,
    pub failed_retention: Duration,
}

impl Config {
    /// Default settings for a device delivering to `endpoint_url`.
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
            queue_path: PathBuf::from("punch-queue.jsonl"),
            endpoint_url: endpoint_url.into(),
            probe_url: None,
            debounce: MIN_DEBOUNCE,
            probe_interval: Duration::from_millis(500),
            delivery_timeout: Duration::from_secs(30),
            retry_base: Duration::from_secs(2),
            retry_max: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
            failed_retention: Duration::from_secs(168 * 3600),
        }
    }

    /// Reads the process environment, after loading `.env` when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars { lookup };
        let endpoint_url = vars.text("ENDPOINT_URL").ok_or_else(|| ConfigError::Missing {
            name: format!("{PREFIX}ENDPOINT_URL"),
        })?;
        let defaults = Self::new(endpoint_url);
        let config = Self {
            bind_addr: vars.parsed("BIND_ADDR")?.unwrap_or(defaults.bind_addr),
            queue_path: vars
                .text("QUEUE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.queue_path),
            endpoint_url: defaults.endpoint_url,
            probe_url: vars.text("PROBE_URL"),
            debounce: vars
                .at_least("DEBOUNCE_MS", MIN_DEBOUNCE_MS)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.debounce),
            probe_interval: vars
                .positive("PROBE_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.probe_interval),
            delivery_timeout: vars
                .positive("DELIVERY_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.delivery_timeout),
            retry_base: vars
                .positive("RETRY_BASE_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_base),
            retry_max: vars
                .positive("RETRY_MAX_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_max),
            sweep_interval: vars
                .positive("SWEEP_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            failed_retention: vars
                .parsed::<u64>("FAILED_RETENTION_HOURS")?
                .map(|hours| Duration::from_secs(hours.saturating_mul(3600)))
                .unwrap_or(defaults.failed_retention),
        };
        if config.retry_max < config.retry_base {
            return Err(ConfigError::Invalid {
                name: format!("{PREFIX}RETRY_MAX_SECS"),
                value: config.retry_max.as_secs().to_string(),
                reason: "must not be below the retry base".into(),
            });
        }
        Ok(config)
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn text(&self, key: &str) -> Option<String> {
        (self.lookup)(&format!("{PREFIX}{key}"))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parsed<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(value) = self.text(key) else {
            return Ok(None);
        };
        value
            .parse()
            .map(Some)
            .map_err(|error: T::Err| ConfigError::Invalid {
                name: format!("{PREFIX}{key}"),
                value,
                reason: error.to_string(),
            })
    }

    fn positive(&self, key: &str) -> Result<Option<u64>, ConfigError> {
        self.at_least(key, 1)
    }

    fn at_least(&self, key: &str, min: u64) -> Result<Option<u64>, ConfigError> {
        match self.parsed::<u64>(key)? {
            Some(value) if value < min => Err(ConfigError::Invalid {
                name: format!("{PREFIX}{key}"),
                value: value.to_string(),
                reason: format!("must be at least {min}"),
            }),
            other => Ok(other),
        }
    }
}
