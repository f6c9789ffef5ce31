use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Connection settings for the polled LTOS device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Base URL of the LTOS REST API (e.g. "https://ltos.example.net").
    #[serde(default)]
    pub url: String,

    /// Per-request timeout in seconds. Fractions are allowed.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,

    /// Basic auth username.
    #[serde(default)]
    pub username: Option<String>,

    /// Basic auth password.
    #[serde(default)]
    pub password: Option<String>,

    /// Accept invalid TLS certificates (self-signed appliance certs).
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

fn default_timeout_secs() -> f64 {
    10.0
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: default_timeout_secs(),
            username: None,
            password: None,
            insecure_skip_verify: false,
        }
    }
}

impl TargetConfig {
    /// Create a target config for the given base URL with default settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Request timeout as a [`Duration`].
    ///
    /// Falls back to the default when `timeout_secs` is negative or not finite.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_timeout_secs()))
    }

    /// Credentials to send, if a non-empty username is configured.
    pub fn credentials(&self) -> Option<(&str, Option<&str>)> {
        match self.username.as_deref() {
            Some(user) if !user.is_empty() => Some((user, self.password.as_deref())),
            _ => None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Common logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Load a configuration file in JSON5 format.
pub fn load_config<T: for<'de> Deserialize<'de>>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    json5::from_str(&content).map_err(|e| {
        Error::Config(format!(
            "Failed to parse config file '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Load a configuration from a JSON5 string.
pub fn parse_config<T: for<'de> Deserialize<'de>>(content: &str) -> Result<T> {
    json5::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    struct Wrapper {
        #[serde(default)]
        target: TargetConfig,
        #[serde(default)]
        logging: LoggingConfig,
    }

    #[test]
    fn test_parse_target_config() {
        let json5 = r#"
        {
            target: {
                url: "https://ltos.example.net",
                timeout_secs: 3,
                username: "admin",
                password: "secret",
                insecure_skip_verify: true,
            },
        }
        "#;

        let config: Wrapper = parse_config(json5).unwrap();

        assert_eq!(config.target.url, "https://ltos.example.net");
        assert_eq!(config.target.timeout(), Duration::from_secs(3));
        assert_eq!(config.target.credentials(), Some(("admin", Some("secret"))));
        assert!(config.target.insecure_skip_verify);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config::<Wrapper>("/nonexistent/ltos-exporter.json5").unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("/nonexistent/ltos-exporter.json5")));
    }

    #[test]
    fn test_fractional_timeout() {
        let config: Wrapper = parse_config("{ target: { timeout_secs: 0.5 } }").unwrap();
        assert_eq!(config.target.timeout(), Duration::from_millis(500));

        let target = TargetConfig {
            timeout_secs: -1.0,
            ..TargetConfig::default()
        };
        assert_eq!(target.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_default_config() {
        let config: Wrapper = parse_config("{}").unwrap();

        assert!(config.target.url.is_empty());
        assert_eq!(config.target.timeout_secs, 10.0);
        assert_eq!(config.target.credentials(), None);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_empty_username_sends_no_credentials() {
        let target = TargetConfig {
            username: Some(String::new()),
            password: Some("secret".to_string()),
            ..TargetConfig::new("http://localhost")
        };

        assert_eq!(target.credentials(), None);
    }

    #[test]
    fn test_json_logging_format() {
        let json5 = r#"
        {
            logging: {
                level: "debug",
                format: "json",
            },
        }
        "#;

        let config: Wrapper = parse_config(json5).unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result: Result<Wrapper> = parse_config("{ target: ");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
