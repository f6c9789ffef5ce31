//! Prometheus exporter for Meinberg LTOS time servers.
//!
//! Every request to the metrics endpoint polls the device's `/api/status`
//! REST endpoint once and translates the returned document into Prometheus
//! metrics. Nothing is cached between scrapes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   LTOS device   │<────│    Collector    │<────│   HTTP Server   │
//! │  (/api/status)  │     │ (fetch+extract) │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! ltos-exporter-prometheus --ltos-api-url https://ltos.example --listen-port 10123
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod catalog;
pub mod collector;
pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod mapping;
pub mod parse;

pub use catalog::MetricCatalog;
pub use collector::{MetricCollector, ScrapeReport, ScrapeStats, SharedCollector};
pub use config::ExporterConfig;
pub use error::ScrapeError;
pub use extract::{DeviceIdentity, Extraction, Extractor};
pub use http::HttpServer;
