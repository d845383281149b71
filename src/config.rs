//! Service configuration
//!
//! Loaded from YAML with environment overrides for deployment:
//! - `SAMPLES_ACCOUNT_URL`, `SAMPLES_PRODUCT_URL`, `SAMPLES_EMPLOYEE_URL`: domain base URLs
//! - `SAMPLES_EVENTS_URL`: event sink URL (enables notification)
//! - `SAMPLES_ENRICHMENT_TIMEOUT_MS`: per-domain batch timeout

use crate::derivation::DerivationPolicy;
use crate::enrichment::DEFAULT_BATCH_PATH;
use crate::events::{DEFAULT_EVENT_SOURCE, DEFAULT_EVENT_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Domain names accepted under `domains:`.
pub const KNOWN_DOMAINS: [&str; 3] = ["account", "product", "employee"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Where one domain service lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEndpoint {
    pub base_url: String,
    #[serde(default = "default_batch_path")]
    pub batch_path: String,
}

impl DomainEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            batch_path: default_batch_path(),
        }
    }
}

fn default_batch_path() -> String {
    DEFAULT_BATCH_PATH.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentSettings {
    /// Upper bound on each domain's batch call
    pub timeout_ms: u64,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

impl EnrichmentSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Event sink settings; absent means notification is off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsConfig {
    pub url: String,
    #[serde(default = "default_event_type")]
    pub event_type: String,
    #[serde(default = "default_event_source")]
    pub source: String,
    #[serde(default = "default_events_timeout_ms")]
    pub timeout_ms: u64,
}

impl EventsConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            event_type: default_event_type(),
            source: default_event_source(),
            timeout_ms: default_events_timeout_ms(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_event_type() -> String {
    DEFAULT_EVENT_TYPE.to_string()
}

fn default_event_source() -> String {
    DEFAULT_EVENT_SOURCE.to_string()
}

fn default_events_timeout_ms() -> u64 {
    5_000
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Domain name → endpoint. Domains without an entry are not enriched.
    pub domains: BTreeMap<String, DomainEndpoint>,
    pub enrichment: EnrichmentSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<EventsConfig>,
    pub derivation: DerivationPolicy,
}

impl ServiceConfig {
    /// Parse, apply environment overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml_str(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, else from the default location if it
    /// exists, else defaults. Environment overrides apply in every case.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Self::default_path();
                if default.exists() {
                    return Self::load(default);
                }
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Default config file (~/.config/sample-enrichment/config.yaml)
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".config"));
        config_dir.join("sample-enrichment").join("config.yaml")
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for domain in KNOWN_DOMAINS {
            let key = format!("SAMPLES_{}_URL", domain.to_uppercase());
            if let Some(url) = lookup(&key).filter(|u| !u.trim().is_empty()) {
                self.domains
                    .entry(domain.to_string())
                    .and_modify(|e| e.base_url = url.clone())
                    .or_insert_with(|| DomainEndpoint::new(url.clone()));
            }
        }

        if let Some(url) = lookup("SAMPLES_EVENTS_URL").filter(|u| !u.trim().is_empty()) {
            match self.events.as_mut() {
                Some(events) => events.url = url,
                None => self.events = Some(EventsConfig::new(url)),
            }
        }

        if let Some(ms) = lookup("SAMPLES_ENRICHMENT_TIMEOUT_MS").and_then(|s| s.parse().ok()) {
            self.enrichment.timeout_ms = ms;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, endpoint) in &self.domains {
            if !KNOWN_DOMAINS.contains(&name.as_str()) {
                return Err(ConfigError::Invalid(format!("unknown domain '{}'", name)));
            }
            if !is_http_url(&endpoint.base_url) {
                return Err(ConfigError::Invalid(format!(
                    "domain '{}' has invalid base_url '{}'",
                    name, endpoint.base_url
                )));
            }
        }
        if let Some(events) = &self.events {
            if !is_http_url(&events.url) {
                return Err(ConfigError::Invalid(format!("invalid events url '{}'", events.url)));
            }
        }
        if self.enrichment.timeout_ms == 0 {
            return Err(ConfigError::Invalid("enrichment.timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
