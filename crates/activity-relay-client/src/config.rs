//! Client configuration, read from TOML.
//!
//! ```toml
//! page_url = "https://crm.example.com"
//! path = "/ws/activities"
//! feed_capacity = 50
//!
//! [reconnect]
//! base_delay_ms = 1000
//! max_attempts = 5
//! ```

use crate::backoff::{Backoff, DEFAULT_BASE_DELAY, DEFAULT_CEILING};
use crate::feed::DEFAULT_FEED_CAPACITY;
use activity_relay_core::{DEFAULT_RELAY_PATH, EndpointError, RelayEndpoint};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// URL of the page hosting the dashboard; the relay is on the same host.
    pub page_url: String,
    /// Path the relay is mounted on.
    pub path: String,
    pub feed_capacity: usize,
    pub reconnect: ReconnectConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconnectConfig {
    pub base_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            page_url: "http://localhost:3000".to_string(),
            path: DEFAULT_RELAY_PATH.to_string(),
            feed_capacity: DEFAULT_FEED_CAPACITY,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: DEFAULT_BASE_DELAY.as_millis() as u64,
            max_attempts: DEFAULT_CEILING,
        }
    }
}

impl RelayConfig {
    /// Read a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Relay endpoint derived from `page_url` and `path`.
    pub fn endpoint(&self) -> Result<RelayEndpoint, EndpointError> {
        RelayEndpoint::from_page_url_with_path(&self.page_url, &self.path)
    }

    pub fn backoff(&self) -> Backoff {
        self.reconnect.backoff()
    }
}

impl ReconnectConfig {
    pub fn backoff(&self) -> Backoff {
        Backoff::new(Duration::from_millis(self.base_delay_ms), self.max_attempts)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
