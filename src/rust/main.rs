use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::info;
use tokio::net::TcpListener;

use sentiment_service::{create_router, init_logger, startup_load, AppState, ModelWrapper, ServiceConfig};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::parse();
    init_logger(&config.log_level);

    info!("=== Starting sentiment service v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Backend: {:?}, artifact: {}", config.backend, config.artifact_path().display());

    let loader = config.loader().await?;
    let model = Arc::new(ModelWrapper::from_boxed(loader));

    // Load before binding so no request ever races the first load
    if startup_load(model.clone()).await {
        info!("Ready to accept requests");
    }

    let app = create_router(AppState::new(model));
    let (host, port) = config.bind_address();
    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("failed to bind {}:{}", host, port))?;
    info!("HTTP server listening on {}:{}", host, port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutting down");
    Ok(())
}
