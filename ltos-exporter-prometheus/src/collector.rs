//! Scrape pipeline: fetch, extract, render.

use std::io::Write;
use std::sync::Arc;

use ltos_common::{FetchError, LtosClient, StatusDocument};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::catalog::MetricCatalog;
use crate::error::ScrapeError;
use crate::extract::Extractor;
use crate::mapping::{Labels, Observation, build_metric_name, format_value, labels};

/// `host` label value when the device could not be identified.
pub const UNKNOWN_HOST: &str = "unknown";

/// Outcome of one scrape.
#[derive(Debug)]
pub struct ScrapeReport {
    /// Device observations in emission order, `up` last.
    pub observations: Vec<Observation>,
    /// Whether the device was fetched and identified.
    pub up: bool,
    /// Every error met during the scrape, including skipped groups.
    pub errors: Vec<ScrapeError>,
}

/// Exporter statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeStats {
    /// Total scrapes performed.
    pub scrapes: u64,
    /// Scrapes where the status document could not be fetched.
    pub fetch_failures: u64,
    /// Scrapes where the device identity could not be resolved.
    pub identity_failures: u64,
    /// Optional metric groups skipped across all scrapes.
    pub skipped_groups: u64,
}

/// Turns status documents of one LTOS device into exposition text.
pub struct MetricCollector {
    client: LtosClient,
    extractor: Extractor,
    default_labels: Labels,
    stats: RwLock<ScrapeStats>,
}

impl MetricCollector {
    /// Create a new collector.
    pub fn new(client: LtosClient, extractor: Extractor, default_labels: Labels) -> Self {
        Self {
            client,
            extractor,
            default_labels,
            stats: RwLock::new(ScrapeStats::default()),
        }
    }

    pub fn client(&self) -> &LtosClient {
        &self.client
    }

    pub fn catalog(&self) -> &MetricCatalog {
        self.extractor.catalog()
    }

    /// Fetch the status document and turn it into a report.
    pub async fn scrape(&self) -> ScrapeReport {
        let result = self.client.fetch_status().await;
        self.observe(result)
    }

    /// Scrape and render in one step.
    pub async fn scrape_and_render(&self) -> String {
        let report = self.scrape().await;
        self.render(&report)
    }

    /// Turn a fetch result into a report and update statistics.
    ///
    /// Always yields exactly one `up` observation.
    pub fn observe(&self, result: Result<StatusDocument, FetchError>) -> ScrapeReport {
        let target = self.client.target();
        let mut errors = Vec::new();
        let mut observations = Vec::new();
        let mut host = None;
        let mut fetch_failed = false;

        match result {
            Ok(document) => match self.extractor.extract(&document) {
                Ok(extraction) => {
                    host = Some(extraction.identity.hostname);
                    observations = extraction.observations;
                    errors = extraction.skipped;
                }
                Err(e) => {
                    debug!(
                        url = target,
                        kind = e.kind(),
                        path = e.path().unwrap_or_default(),
                        error = %e,
                        "Device identity could not be resolved"
                    );
                    errors.push(e);
                }
            },
            Err(e) => {
                debug!(url = target, error = %e, "Failed to fetch status document");
                fetch_failed = true;
                errors.push(ScrapeError::FetchFailed(e));
            }
        }

        let up = host.is_some();
        observations.push(self.catalog().up.observe(
            labels([
                ("host", host.as_deref().unwrap_or(UNKNOWN_HOST)),
                ("target", target),
            ]),
            if up { 1.0 } else { 0.0 },
        ));

        {
            let mut stats = self.stats.write();
            stats.scrapes += 1;
            if fetch_failed {
                stats.fetch_failures += 1;
            } else if !up {
                stats.identity_failures += 1;
            } else {
                stats.skipped_groups += errors.len() as u64;
            }
        }

        trace!(
            url = target,
            up,
            observations = observations.len(),
            errors = errors.len(),
            "Scrape complete"
        );

        ScrapeReport {
            observations,
            up,
            errors,
        }
    }

    /// Get exporter statistics.
    pub fn stats(&self) -> ScrapeStats {
        self.stats.read().clone()
    }

    /// Render a report in Prometheus exposition format.
    ///
    /// Families appear in catalog order, samples in emission order.
    pub fn render(&self, report: &ScrapeReport) -> String {
        let mut output = Vec::with_capacity(report.observations.len() * 100);

        for desc in self.catalog().descriptors() {
            let mut series = report
                .observations
                .iter()
                .filter(|o| o.name == desc.name)
                .peekable();
            if series.peek().is_none() {
                continue;
            }

            writeln!(output, "# HELP {} {}", desc.name, desc.help).ok();
            writeln!(output, "# TYPE {} {}", desc.name, desc.kind.as_str()).ok();

            for obs in series {
                writeln!(
                    output,
                    "{}{} {}",
                    obs.name,
                    obs.format_labels(&self.default_labels),
                    format_value(obs.value)
                )
                .ok();
            }
        }

        // Exporter stats
        let stats = self.stats.read();
        let prefix = self.catalog().prefix();
        writeln!(output).ok();
        for (name, help, value) in [
            (
                "exporter_scrapes_total",
                "Total scrapes of the LTOS device",
                stats.scrapes,
            ),
            (
                "exporter_fetch_failures_total",
                "Scrapes where the status document could not be fetched",
                stats.fetch_failures,
            ),
            (
                "exporter_identity_failures_total",
                "Scrapes where the device identity could not be resolved",
                stats.identity_failures,
            ),
            (
                "exporter_skipped_groups_total",
                "Metric groups skipped because of missing or malformed fields",
                stats.skipped_groups,
            ),
        ] {
            let name = build_metric_name(prefix, name);
            writeln!(output, "# HELP {} {}", name, help).ok();
            writeln!(output, "# TYPE {} counter", name).ok();
            writeln!(output, "{} {}", name, value).ok();
        }

        String::from_utf8(output).unwrap_or_default()
    }
}

/// Create a shareable collector handle.
pub type SharedCollector = Arc<MetricCollector>;
