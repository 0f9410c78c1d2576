//! Typed configuration from environment variables or a TOML file.
//!
//! Every field has a default, so an empty environment yields a working
//! config that talks to a backend on `127.0.0.1:8000` (falling back to 8001).

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const ALTERNATE_PORT: u16 = 8001;
pub const DEFAULT_DOMAIN: &str = "gaming";
pub const DEFAULT_EVENT_TIMEOUT_MS: u64 = 3000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend_host: String,
    pub backend_port: u16,
    /// Operating-context tag attached to requests and events.
    pub domain: String,
    pub compliance_targets: Vec<String>,
    /// Per-attempt ceiling for background (fire-and-forget) sends.
    pub event_timeout_ms: u64,
    /// Per-attempt ceiling for interactive sends. `None` leaves the HTTP
    /// client's own default in place.
    pub interactive_timeout_ms: Option<u64>,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_host: DEFAULT_HOST.to_string(),
            backend_port: DEFAULT_PORT,
            domain: DEFAULT_DOMAIN.to_string(),
            compliance_targets: Vec::new(),
            event_timeout_ms: DEFAULT_EVENT_TIMEOUT_MS,
            interactive_timeout_ms: None,
            otel_endpoint: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            backend_host: optional_var("RELAY_BACKEND_HOST").unwrap_or(defaults.backend_host),
            backend_port: parsed_var("RELAY_BACKEND_PORT")?.unwrap_or(defaults.backend_port),
            domain: optional_var("RELAY_DOMAIN").unwrap_or(defaults.domain),
            compliance_targets: optional_var("RELAY_COMPLIANCE_TARGETS")
                .map(|raw| split_targets(&raw))
                .unwrap_or_default(),
            event_timeout_ms: parsed_var("RELAY_EVENT_TIMEOUT_MS")?
                .unwrap_or(defaults.event_timeout_ms),
            interactive_timeout_ms: parsed_var("RELAY_INTERACTIVE_TIMEOUT_MS")?,
            otel_endpoint: optional_var("OTEL_ENDPOINT"),
            log_level: optional_var("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("bad config: {e}")))
    }

    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// The secondary port: the other of {8000, 8001} when the primary is
    /// 8000, otherwise 8000.
    pub fn fallback_port(&self) -> u16 {
        if self.backend_port == DEFAULT_PORT {
            ALTERNATE_PORT
        } else {
            DEFAULT_PORT
        }
    }

    pub fn event_timeout(&self) -> Duration {
        Duration::from_millis(self.event_timeout_ms)
    }

    pub fn interactive_timeout(&self) -> Option<Duration> {
        self.interactive_timeout_ms.map(Duration::from_millis)
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_var(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| Error::Config(format!("{name}={raw} is invalid: {e}")))
        })
        .transpose()
}

fn split_targets(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}
