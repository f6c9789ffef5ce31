//! Prometheus exporter for Meinberg LTOS time servers.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ltos_common::LtosClient;
use tokio::sync::watch;
use tracing::{error, info, warn};

use ltos_exporter_prometheus::{
    ExporterConfig, Extractor, HttpServer, MetricCatalog, MetricCollector,
};

/// Prometheus exporter for Meinberg LTOS time servers.
#[derive(Parser, Debug)]
#[command(name = "ltos-exporter-prometheus")]
#[command(about = "Export Meinberg LTOS status as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// Base URL of the LTOS REST API (overrides config).
    #[arg(long, env = "LTOS_API_URL")]
    ltos_api_url: Option<String>,

    /// HTTP listen address (overrides config).
    #[arg(long, env = "LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// HTTP listen port (overrides config).
    #[arg(long, env = "LISTEN_PORT")]
    listen_port: Option<u16>,

    /// Request timeout, e.g. "10" (seconds), "10s", "500ms" or "1m" (overrides config).
    #[arg(long, env = "TIMEOUT", value_parser = parse_timeout)]
    timeout: Option<Duration>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Basic auth username for the LTOS API.
    #[arg(long, env = "AUTH_USER")]
    auth_user: Option<String>,

    /// Basic auth password for the LTOS API.
    #[arg(long, env = "AUTH_PASS", hide_env_values = true)]
    auth_pass: Option<String>,

    /// Skip TLS certificate verification.
    #[arg(
        long,
        env = "IGNORE_SSL_VERIFY",
        action = clap::ArgAction::SetTrue,
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    ignore_ssl_verify: bool,
}

/// Parse a timeout: bare integers are seconds, anything else a duration like "1m30s".
fn parse_timeout(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let timeout = match value.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(value)
            .map_err(|e| format!("invalid timeout {:?}: {}", value, e))?,
    };

    if timeout.is_zero() {
        return Err(format!("invalid timeout {:?}: must be > 0", value));
    }
    Ok(timeout)
}

impl Args {
    fn apply(self, config: &mut ExporterConfig) {
        if let Some(url) = self.ltos_api_url {
            config.target.url = url;
        }
        if let Some(timeout) = self.timeout {
            config.target.timeout_secs = timeout.as_secs_f64();
        }
        if let Some(user) = self.auth_user {
            config.target.username = Some(user);
        }
        if let Some(pass) = self.auth_pass {
            config.target.password = Some(pass);
        }
        if self.ignore_ssl_verify {
            config.target.insecure_skip_verify = true;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }

        let port = self.listen_port.map(|p| p.to_string());
        config
            .prometheus
            .override_listen(self.listen_addr.as_deref(), port.as_deref());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };
    args.apply(&mut config);
    config.validate()?;

    ltos_common::init_tracing(&config.logging)?;

    info!(target_url = %config.target.url, "Starting Meinberg LTOS Prometheus Exporter");

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let client = LtosClient::new(&config.target)?;

    match client.check_health().await {
        Ok(true) => info!(target_url = %client.target(), "LTOS API reachable"),
        Ok(false) => warn!(
            target_url = %client.target(),
            "LTOS API reachable but the status document lacks system information"
        ),
        Err(e) => warn!(target_url = %client.target(), error = %e, "LTOS API not reachable at startup"),
    }

    let catalog = Arc::new(MetricCatalog::new(&config.prometheus.prefix));
    let extractor = Extractor::new(catalog, &config.extraction);
    let collector = Arc::new(MetricCollector::new(
        client,
        extractor,
        config.prometheus.sanitized_default_labels(),
    ));

    let http_server = HttpServer::new(
        collector.clone(),
        config.prometheus.listen.clone(),
        config.prometheus.path.clone(),
    );

    // Start HTTP server
    let http_shutdown = shutdown_rx.clone();
    let mut http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(http_shutdown).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal, or for the server to exit on its own
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = &mut http_task => {
            anyhow::bail!("HTTP server exited unexpectedly");
        }
    }

    // Signal shutdown
    shutdown_tx.send(true)?;

    // Wait for the server to drain
    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    // Print final stats
    let stats = collector.stats();
    info!(
        scrapes = stats.scrapes,
        fetch_failures = stats.fetch_failures,
        identity_failures = stats.identity_failures,
        skipped_groups = stats.skipped_groups,
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
