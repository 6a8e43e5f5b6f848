//! Raster API Server
//!
//! Point, transect, time series and polygon queries over cloud-hosted
//! GeoTIFFs.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use raster_api::config::ServiceConfig;
use raster_api::insitu::InsituTable;
use raster_api::state::AppState;

/// Raster API Server
#[derive(Parser, Debug)]
#[command(name = "raster-api")]
#[command(about = "Sampling API for cloud-optimized ocean-color GeoTIFFs")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8080", env = "RASTER_API_LISTEN_ADDR")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "RASTER_API_WORKER_THREADS")]
    worker_threads: Option<usize>,

    /// Path to the YAML service configuration
    #[arg(short, long, env = "RASTER_API_CONFIG")]
    config: Option<PathBuf>,

    /// In-situ pickle (HTTP URL or local path)
    #[arg(long, env = "INSITU_URL")]
    insitu_url: Option<String>,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Build runtime with configured threads
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(run_server(args))
}

async fn run_server(args: Args) -> Result<()> {
    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    info!("Prometheus metrics exporter initialized");

    info!("Starting raster API server");

    let config = ServiceConfig::load(args.config.as_deref())?;
    info!(
        url_template = %config.url_template,
        nodata_sentinel = config.sampler.nodata_sentinel,
        transect_spacing = config.sampler.transect_spacing,
        "Transect distances are raster index steps scaled by transect_spacing (nominal units)"
    );

    // A failed in-situ load disables those routes but is not fatal
    let insitu = match args.insitu_url.as_deref() {
        Some(source) => match InsituTable::load(source, config.request_timeout()).await {
            Ok(table) => Some(table),
            Err(e) => {
                warn!(error = %e, "In-situ data unavailable");
                None
            }
        },
        None => {
            info!("INSITU_URL not set, in-situ endpoints disabled");
            None
        }
    };

    let state = Arc::new(AppState::from_config(config, insitu)?);
    let app = raster_api::build_router(state, Some(prometheus_handle));

    // Parse listen address
    let addr: SocketAddr = args
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", args.listen))?;

    info!("Raster API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server failed")?;

    Ok(())
}
