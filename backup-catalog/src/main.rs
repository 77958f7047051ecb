use backup_catalog::models::CatalogLayout;
use backup_catalog::state::AppState;
use backup_catalog::{routes, utils, AppConfig};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory holding the daily/weekly/monthly/yearly tiers (overrides BACKUPS_DIR)
    #[arg(short, long, value_name = "DIR")]
    backups_dir: Option<PathBuf>,

    /// Response layout: sized or checksums (overrides CATALOG_LAYOUT)
    #[arg(long)]
    layout: Option<CatalogLayout>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(dir) = args.backups_dir {
        config.backups_dir = Some(dir);
    }
    if let Some(layout) = args.layout {
        config.layout = layout;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    utils::logger::init(&config.log_level)?;

    match &config.backups_dir {
        Some(dir) => tracing::info!("Serving backups from {}", dir.display()),
        None => tracing::warn!("BACKUPS_DIR is not set; catalog requests will fail"),
    }
    tracing::info!(layout = %config.layout, "Starting backup catalog on port {}", config.port);

    let state = Arc::new(AppState::new(config.clone()));
    let app = routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
