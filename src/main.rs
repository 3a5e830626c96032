use anchor_registry::anchors::AnchorKeyCache;
use anchor_registry::anchors::handlers::router;
use anchor_registry::config::Config;
use anchor_registry::table::MemoryTable;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    config.validate()?;

    tracing::info!("Starting anchor registry on {}", config.bind);

    // 1. Table store:
    let table = match &config.data_file {
        Some(path) => {
            tracing::info!("Persisting anchors to {}", path.display());
            MemoryTable::with_data_file(config.page_size, path)
        }
        None => {
            tracing::warn!("No --data-file given, anchors will not survive a restart");
            MemoryTable::new(config.page_size)
        }
    };

    // 2. Anchor cache:
    let cache = Arc::new(AnchorKeyCache::new(Arc::new(table), config.cache_options()));

    // Warm-up only; a failure here is retried by the first request.
    if let Err(e) = cache.ensure_initialized().await {
        tracing::error!("Anchor table not ready at startup: {}", e);
    }

    // 3. HTTP Router:
    let app = router(cache);

    // 4. Start HTTP server:
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!("HTTP server listening on {}", listener.local_addr()?);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Anchor registry stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
