//! Registrar - Discord intro-roster bot
//!
//! Watches an introduction channel for messages carrying an in-game
//! name, and maintains a paginated, role-grouped member roster in a
//! summary channel.

mod common;
mod config;
mod discord;
mod keepalive;
mod roster;
mod sync;

use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use config::env::get_config_path;
use config::load_and_validate;
use sync::{JsonFileStore, SettingsStore, SyncEngine};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Registrar v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Provide {} or set REGISTRAR_DISCORD_TOKEN.", config_path);
        e
    })?;

    info!("Configuration loaded successfully");

    // Settings store, optionally backed by a JSON state file
    let store = match &config.state_file {
        Some(path) => {
            info!("Persisting settings to {}", path);
            let store = SettingsStore::with_persistence(Box::new(JsonFileStore::new(path)))
                .map_err(|e| {
                    error!("Failed to load settings state from {}: {}", path, e);
                    e
                })?;
            Arc::new(store)
        }
        None => {
            warn!("No state_file configured - settings are lost on restart");
            Arc::new(SettingsStore::new())
        }
    };

    let engine = Arc::new(SyncEngine::new(store, &config.sync));

    // Keep-alive endpoint for hosts that probe over HTTP
    if config.health.enabled {
        let port = config.health.port;
        tokio::spawn(async move {
            if let Err(e) = keepalive::serve(port).await {
                error!("Keep-alive endpoint failed: {}", e);
            }
        });
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut discord_task = tokio::spawn(discord::run(
        config.discord.token.clone(),
        engine.clone(),
        shutdown_rx,
    ));

    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - stopping Discord client...");
            true
        }
        _ = &mut discord_task => false,
    };

    if shutdown {
        if let Err(e) = shutdown_tx.send(true) {
            warn!("Shutdown channel closed (Discord task already exited): {}", e);
        }
        let timeout = tokio::time::Duration::from_secs(5);
        match tokio::time::timeout(timeout, discord_task).await {
            Ok(Ok(())) => info!("Discord client stopped gracefully"),
            Ok(Err(e)) => warn!("Discord task panicked: {}", e),
            Err(_) => warn!("Discord shutdown timed out"),
        }
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
