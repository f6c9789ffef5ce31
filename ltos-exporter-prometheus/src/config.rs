//! Configuration for the Prometheus exporter.

use chrono::{FixedOffset, Offset, Utc};
use ltos_common::{LoggingConfig, TargetConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::ToSocketAddrs;
use std::path::Path;
use thiserror::Error;

use crate::mapping::{Labels, sanitize_label_name};

/// Default metric name prefix.
pub const DEFAULT_PREFIX: &str = "mbg_ltos";

const MAX_UTC_OFFSET_SECS: u32 = 86_399;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] ltos_common::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// The polled LTOS device.
    #[serde(default)]
    pub target: TargetConfig,

    /// Prometheus exporter settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    /// Status document extraction settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Prometheus HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Address to listen on as `host:port` (default: "127.0.0.1:10123").
    ///
    /// The host may be a name such as `localhost`; it is resolved at bind time.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,

    /// Default labels to add to all metrics.
    #[serde(default)]
    pub default_labels: HashMap<String, String>,

    /// Metric name prefix (default: "mbg_ltos").
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_listen() -> String {
    "127.0.0.1:10123".to_string()
}

fn default_path() -> String {
    "/metrics".to_string()
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
            default_labels: HashMap::new(),
            prefix: default_prefix(),
        }
    }
}

impl PrometheusConfig {
    /// Default labels with sanitized names.
    pub fn sanitized_default_labels(&self) -> Labels {
        self.default_labels
            .iter()
            .map(|(k, v)| (sanitize_label_name(k), v.clone()))
            .collect()
    }

    /// Replace the host and/or port part of the listen address.
    pub fn override_listen(&mut self, addr: Option<&str>, port: Option<&str>) {
        if addr.is_none() && port.is_none() {
            return;
        }

        let (current_addr, current_port) = self
            .listen
            .rsplit_once(':')
            .unwrap_or((self.listen.as_str(), "10123"));

        let addr = addr.unwrap_or(current_addr);
        let port = port.unwrap_or(current_port);

        self.listen = if addr.contains(':') && !addr.starts_with('[') {
            format!("[{}]:{}", addr, port)
        } else {
            format!("{}:{}", addr, port)
        };
    }
}

/// Status document extraction settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// UTC offset (seconds east) of event `last-triggered` timestamps.
    ///
    /// LTOS reports these without a zone designator; 0 treats them as UTC.
    #[serde(default)]
    pub event_utc_offset_secs: i32,

    /// Also label slot-scoped metrics with the deprecated `clock_id` label.
    #[serde(default)]
    pub clock_id_label: bool,
}

impl ExtractionConfig {
    /// The event timestamp offset. Falls back to UTC if out of range.
    pub fn event_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.event_utc_offset_secs)
            .unwrap_or_else(|| Utc.fix())
    }
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    ///
    /// The target URL may still be empty afterwards; it can be supplied on
    /// the command line before calling [`ExporterConfig::validate`].
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: ExporterConfig = ltos_common::load_config(path)?;
        config.validate_settings()?;
        Ok(config)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = ltos_common::parse_config(content)?;
        config.validate_settings()?;
        Ok(config)
    }

    /// Validate the complete configuration, including the target URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target.url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Target URL is required (target.url, --ltos-api-url or LTOS_API_URL)".to_string(),
            ));
        }
        self.validate_settings()
    }

    /// Validate everything except the presence of the target URL.
    fn validate_settings(&self) -> Result<(), ConfigError> {
        let url = self.target.url.trim();
        if !url.is_empty() && !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "Target URL must start with http:// or https://: {}",
                url
            )));
        }

        if !(self.target.timeout_secs.is_finite() && self.target.timeout_secs > 0.0) {
            return Err(ConfigError::Validation(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        let resolves = self
            .prometheus
            .listen
            .to_socket_addrs()
            .is_ok_and(|mut addrs| addrs.next().is_some());
        if !resolves {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.prometheus.listen
            )));
        }

        if !self.prometheus.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }

        if self.prometheus.path == "/" || self.prometheus.path == "/health" {
            return Err(ConfigError::Validation(format!(
                "Metrics path {} is reserved",
                self.prometheus.path
            )));
        }

        if self.prometheus.prefix.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Metric prefix must not be empty".to_string(),
            ));
        }

        if self.extraction.event_utc_offset_secs.unsigned_abs() > MAX_UTC_OFFSET_SECS {
            return Err(ConfigError::Validation(format!(
                "event_utc_offset_secs must be within ±{}",
                MAX_UTC_OFFSET_SECS
            )));
        }

        Ok(())
    }
}
