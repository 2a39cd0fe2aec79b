use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::api::{router, AppState};
use crate::config::AppConfig;
use crate::database::DatabaseManager;

pub async fn handle(config: AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    let store = DatabaseManager::open(&config.database)
        .await
        .context("failed to open document store")?;
    let state = AppState::init(store)
        .await
        .context("failed to prepare document store")?;

    let app = router(state, &config.api);

    let bind_addr = format!("{}:{}", config.api.host, port.unwrap_or(config.api.port));
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("clientdb listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server exited");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
