//! Client configuration.
//!
//! Configuration is loaded from TOML with the following resolution order:
//! 1. explicit path (must exist)
//! 2. `<config dir>/eventide/config.toml` (e.g. `~/.config/eventide/config.toml`)
//! 3. built-in defaults
//!
//! The API key may also come from the `EVENTIDE_API_KEY` environment variable
//! when the file does not set one.
//!
//! ```toml
//! base_url = "https://api.example.com/v1"
//! debounce_ms = 250
//! cache_ttl_ms = 120000
//! page_size = 25
//! known_sources = ["eventbrite", "meetup"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cache::CacheConfig;
use crate::sync::QueryOptions;
use crate::{EventideError, Result};

/// Environment variable consulted for the API key.
pub const API_KEY_ENV: &str = "EVENTIDE_API_KEY";

/// Client configuration shared by the transport and the coordinators.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Backend base URL (default: http://127.0.0.1:8080).
    pub base_url: String,
    /// Bearer credential sent with every request.
    pub api_key: Option<String>,
    /// HTTP request timeout in milliseconds (default: 30s).
    pub request_timeout_ms: u64,
    /// Quiet period before a parameter change is fetched (default: 300ms).
    pub debounce_ms: u64,
    /// Cache time-to-live in milliseconds (default: 5 minutes).
    pub cache_ttl_ms: u64,
    /// Cache capacity (default: 1,000).
    pub cache_max_entries: u64,
    /// Page size requested from the search endpoint (default: 20).
    pub page_size: u32,
    /// Platforms reported in search metadata even when the backend omits them.
    pub known_sources: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            api_key: None,
            request_timeout_ms: 30_000,
            debounce_ms: 300,
            cache_ttl_ms: 300_000,
            cache_max_entries: 1_000,
            page_size: 20,
            known_sources: vec![
                "eventbrite".to_string(),
                "meetup".to_string(),
                "ticketmaster".to_string(),
            ],
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = millis(timeout);
        self
    }

    pub fn debounce(mut self, delay: Duration) -> Self {
        self.debounce_ms = millis(delay);
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_ms = millis(ttl);
        self
    }

    pub fn cache_max_entries(mut self, n: u64) -> Self {
        self.cache_max_entries = n;
        self
    }

    pub fn page_size(mut self, n: u32) -> Self {
        self.page_size = n;
        self
    }

    pub fn known_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn request_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn debounce_duration(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn cache_ttl_duration(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Cache settings derived from this configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .max_entries(self.cache_max_entries)
            .ttl(self.cache_ttl_duration())
    }

    /// Query coordinator defaults derived from this configuration.
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions::new()
            .debounce(self.debounce_duration())
            .page_size(self.page_size)
    }

    /// Parse configuration from a TOML string and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| EventideError::Configuration(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the standard locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => {
                let content = fs::read_to_string(&path).map_err(|e| {
                    EventideError::Configuration(format!(
                        "Failed to read config file {path:?}: {e}"
                    ))
                })?;
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };

        if config.api_key.is_none() {
            config.api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
        }
        Ok(config)
    }

    /// Check invariants the rest of the crate relies on.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_ms == 0 {
            return Err(EventideError::Configuration(
                "request_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(EventideError::Configuration(
                "page_size must be at least 1".to_string(),
            ));
        }
        reqwest::Url::parse(&self.base_url).map_err(|e| {
            EventideError::Configuration(format!("Invalid base_url {:?}: {e}", self.base_url))
        })?;
        Ok(())
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(EventideError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(dir) = dirs::config_dir() {
            let user_config = dir.join("eventide").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        Ok(None)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
