use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::{PoolwatchError, Result};
use crate::types::DEFAULT_POLL_DELAY_MS;

/// Watcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Status endpoint that is long-polled
    pub url: String,

    /// Delay between a processed response and the next request
    pub poll_delay_ms: u64,

    /// Request timeout in seconds (none = rely on the transport)
    pub request_timeout_secs: Option<u64>,

    /// Dashboard bind address
    pub bind: SocketAddr,

    /// Only chart these pools (empty = all)
    pub pools: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            url: String::from("http://127.0.0.1:8000/status/"),
            poll_delay_ms: DEFAULT_POLL_DELAY_MS,
            request_timeout_secs: None,
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            pools: Vec::new(),
        }
    }
}

impl WatchConfig {
    /// Load from a `.toml` file, anything else is read as JSON
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(PoolwatchError::Config("status url must not be empty".into()));
        }
        if self.poll_delay_ms == 0 {
            return Err(PoolwatchError::Config("poll delay must be > 0".into()));
        }
        Ok(())
    }

    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Whether stats for `pool` should be charted
    pub fn wants_pool(&self, pool: &str) -> bool {
        self.pools.is_empty() || self.pools.iter().any(|p| p == pool)
    }
}
