use anyhow::Result;
use relay_core::{RelayConfig, RelayServer};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod console;

#[tokio::main]
async fn main() -> Result<()> {
    // 0. Load .env (RELAY_HOST, RELAY_PORT, RELAY_STORAGE_DIR, RUST_LOG)
    let _ = dotenvy::dotenv();

    // 1. Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // 2. Bind the relay
    let config = RelayConfig::load();
    let server = Arc::new(RelayServer::bind(&config).await?);
    tracing::info!("Waiting for client connections...");
    tracing::info!("Type messages to broadcast to all clients, or 'quit' to exit");

    // 3. Accept loop
    let shutdown = CancellationToken::new();
    let accept = {
        let server = server.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { server.run(shutdown).await })
    };

    // 4. Server-originated broadcasts from stdin
    tokio::spawn(console::run(server.clone(), shutdown.clone()));

    tokio::select! {
        res = accept => {
            // The listener died on its own
            shutdown.cancel();
            res??;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Server shutting down...");
            shutdown.cancel();
        }
        _ = shutdown.cancelled() => {}
    }

    Ok(())
}
