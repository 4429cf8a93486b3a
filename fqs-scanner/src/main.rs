//! fqs-scanner - Fruit quality scanner web service
//!
//! Detects fruits in uploaded images, fuses each detection with a NIR
//! reading of the same region, and keeps every scan for review and export.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fqs_common::config::ScannerConfig;
use fqs_common::db::connect_store;
use fqs_scanner::detector::load_detector;
use fqs_scanner::fusion::{FusionEngine, FusionWeights};
use fqs_scanner::nir::create_sensor;
use fqs_scanner::{build_router, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for fqs-scanner
#[derive(Parser, Debug)]
#[command(name = "fqs-scanner")]
#[command(about = "Fruit quality scanner: detection + NIR fusion web service")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "FQS_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind (overrides configuration)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides configuration)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ScannerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // RUST_LOG wins over the configured level
    let default_filter = format!(
        "fqs_scanner={level},fqs_common={level},tower_http={level}",
        level = config.logging.level
    );
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Fruit Quality Scanner (fqs-scanner) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match ScannerConfig::resolve_path(args.config.as_deref()) {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }

    // Invalid weights are a startup error
    let weights = FusionWeights::try_from(config.fusion).context("Invalid fusion configuration")?;
    info!("Fusion weights: detector {:.2}, NIR {:.2}", weights.yolo(), weights.nir());
    let fusion = FusionEngine::new(weights);

    let store = connect_store(&config.storage)
        .await
        .with_context(|| format!("Failed to open {}", config.storage_description()))?;
    info!("✓ Connected to database ({})", config.storage_description());

    let detector = match load_detector(&config.detector) {
        Ok(detector) => {
            info!("✓ Detector ready ({})", detector.backend());
            Some(detector)
        }
        Err(e) => {
            warn!("Detector not available, uploads will fail: {}", e);
            None
        }
    };

    let sensor = create_sensor(&config.nir);
    match &sensor {
        Some(sensor) => match sensor.connect().await {
            Ok(()) => info!("✓ NIR sensor connected ({})", sensor.kind()),
            Err(e) => error!("NIR sensor ({}) failed to connect: {}", sensor.kind(), e),
        },
        None => info!("NIR sensor disabled, results will be detector-only"),
    }

    tokio::fs::create_dir_all(&config.upload.upload_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.upload.upload_dir.display()))?;
    tokio::fs::create_dir_all(&config.upload.processed_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.upload.processed_dir.display()))?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, detector, sensor.clone(), fusion, store);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("fqs-scanner listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(sensor) = &sensor {
        if let Err(e) = sensor.disconnect().await {
            warn!("NIR sensor ({}) failed to disconnect: {}", sensor.kind(), e);
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
