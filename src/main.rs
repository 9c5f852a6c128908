//! Prometheus exporter for Tencent Cloud resource inventory.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use tcinfo_exporter::{
    ApiTransport, CbsDisks, CloudClient, Credentials, EsInstances, ExporterConfig, HttpServer,
    Registry, ResourceCollector,
};

/// Prometheus exporter for Tencent Cloud resource inventory.
#[derive(Parser, Debug)]
#[command(name = "tcinfo-exporter")]
#[command(about = "Export Tencent Cloud resource inventory as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Path under which to expose metrics (overrides config).
    #[arg(long)]
    metrics_path: Option<String>,

    /// Tencent Cloud region (overrides config).
    #[arg(long)]
    region: Option<String>,

    /// Enable or disable the Elasticsearch instance collector (overrides config).
    #[arg(long, value_name = "BOOL")]
    enable_es: Option<bool>,

    /// Enable or disable the Cloud Block Storage disk collector (overrides config).
    #[arg(long, value_name = "BOOL")]
    enable_cbs: Option<bool>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
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

    // CLI overrides
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(path) = args.metrics_path {
        config.server.path = path;
    }
    if let Some(region) = args.region {
        config.cloud.region = region;
    }
    if let Some(es) = args.enable_es {
        config.collectors.es = es;
    }
    if let Some(cbs) = args.enable_cbs {
        config.collectors.cbs = cbs;
    }
    config.validate()?;

    // Initialize logging
    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("tcinfo_exporter={}", log_level).parse()?);

    match config.logging.format {
        tcinfo_exporter::config::LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        tcinfo_exporter::config::LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    info!("Starting tcinfo-exporter");

    // Credentials are resolved exactly once; without them there is nothing
    // the exporter can serve.
    let credentials = match Credentials::from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            error!(error = %e, "Failed to resolve Tencent Cloud credentials");
            std::process::exit(1);
        }
    };

    let transport: Arc<dyn ApiTransport> = Arc::new(CloudClient::new(credentials)?);

    let mut registry = Registry::new(
        transport,
        config.metrics.prefix.clone(),
        Duration::from_secs(config.cloud.scrape_timeout_secs),
    );

    let prefix = &config.metrics.prefix;
    let region = &config.cloud.region;
    let page_size = config.cloud.page_size;

    if config.collectors.es {
        registry.register(Box::new(ResourceCollector::new(
            EsInstances::new(prefix),
            region,
            page_size,
        )))?;
    }
    if config.collectors.cbs {
        registry.register(Box::new(ResourceCollector::new(
            CbsDisks::new(prefix),
            region,
            page_size,
        )))?;
    }

    let enabled: Vec<String> = registry
        .describe()
        .iter()
        .map(|d| d.name().to_string())
        .collect();
    if enabled.is_empty() {
        warn!("No collectors enabled; scrapes will only expose exporter self-metrics");
    } else {
        info!(collectors = ?enabled, region = %region, "Collectors registered");
    }

    // Parse listen address
    let listen_addr = config
        .server
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let registry = Arc::new(registry);
    let server = HttpServer::new(registry.clone(), listen_addr, config.server.path.clone());

    let http_task = tokio::spawn(async move {
        if let Err(e) = server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate()
                ).unwrap();
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    // Signal shutdown
    shutdown_tx.send(true)?;

    // Wait for the server to drain
    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    // Print final stats
    let stats = registry.stats();
    info!(
        scrapes = stats.scrapes,
        collector_failures = stats.collector_failures,
        items_skipped = stats.items_skipped,
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}
