//! LTOS Common Library
//!
//! Shared building blocks for the Meinberg LTOS exporter:
//!
//! - [`client`] - REST client for the `/api/status` endpoint
//! - [`document`] - Decoded status document with checked field accessors
//! - [`config`] - Target and logging configuration, JSON5 loading
//! - [`error`] - Error types

pub mod client;
pub mod config;
pub mod document;
pub mod error;

// Re-export commonly used types at the crate root
pub use client::{LtosClient, STATUS_PATH};
pub use config::{LogFormat, LoggingConfig, TargetConfig, load_config, parse_config};
pub use document::{FieldError, Node, StatusDocument};
pub use error::{Error, FetchError, Result};

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over `config.level` when set.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
    }

    Ok(())
}
