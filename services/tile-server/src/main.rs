//! Tile server binary.

use anyhow::{Context, Result};
use clap::Parser;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tile_server::{admin_router, tile_router, AppState, LayerRegistry, LayersConfig};

#[derive(Parser, Debug)]
#[command(name = "tile-server")]
#[command(about = "Slippy map tile server for rasters and arrays")]
struct Args {
    /// Listen address for tiles
    #[arg(short, long, env = "LIVEMAP_LISTEN", default_value = "127.0.0.1:8080")]
    listen: String,

    /// Listen address for /health and /metrics (disabled when unset)
    #[arg(long, env = "LIVEMAP_ADMIN_LISTEN")]
    admin_listen: Option<String>,

    /// Layers YAML file
    #[arg(short, long, env = "LIVEMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "LIVEMAP_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Number of tokio worker threads (default: number of CPU cores)
    #[arg(long, env = "LIVEMAP_WORKER_THREADS")]
    worker_threads: Option<usize>,
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(args))?;
    Ok(())
}

async fn async_main(args: Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    info!(worker_threads = ?args.worker_threads, "Starting tile server");

    let registry = LayerRegistry::with_debug_layer();
    if let Some(path) = &args.config {
        LayersConfig::load(path)?.apply(&registry)?;
    }
    info!(layers = ?registry.names(), "Layers ready");

    let state = Arc::new(AppState::new(registry));
    let app = tile_router(state);

    if let Some(admin_listen) = &args.admin_listen {
        let admin_addr: SocketAddr = admin_listen.parse()?;
        let admin_listener = tokio::net::TcpListener::bind(admin_addr).await?;
        info!(address = %admin_addr, "Admin listening");
        let admin = admin_router(prometheus_handle);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(admin_listener, admin).await {
                tracing::error!(error = %e, "Admin server stopped");
            }
        });
    }

    let addr: SocketAddr = args.listen.parse()?;
    info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
