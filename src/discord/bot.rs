//! Discord client setup and run loop.
//!
//! Builds the serenity client with the intents and HTTP timeouts the
//! bot needs, and keeps it running with exponential-backoff rebuilds on
//! connection errors until shutdown is signalled.

use std::sync::Arc;
use std::time::Duration;

use backon::BackoffBuilder;
use serenity::http::HttpBuilder;
use serenity::prelude::*;
use serenity::Client;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::discord::handler::RosterEventHandler;
use crate::sync::SyncEngine;

async fn build_client(token: &str, engine: Arc<SyncEngine>) -> anyhow::Result<Client> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    // Custom reqwest client with timeout settings
    let reqwest_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let http = HttpBuilder::new(token).client(reqwest_client).build();

    let client = serenity::client::ClientBuilder::new_with_http(http, intents)
        .event_handler(RosterEventHandler::new(engine))
        .await?;
    Ok(client)
}

/// Create an exponential backoff iterator for Discord reconnection.
/// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
fn discord_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(5))
        .with_max_delay(Duration::from_secs(300))
        .with_factor(1.1)
        .with_jitter()
        .without_max_times()
        .build()
}

/// Run the Discord bot until the shutdown signal fires.
///
/// serenity handles gateway reconnects itself; this loop only rebuilds
/// the client when `start` returns an error (e.g. invalid session
/// handshakes that serenity gives up on).
pub async fn run(token: String, engine: Arc<SyncEngine>, mut shutdown_rx: watch::Receiver<bool>) {
    let mut backoff = discord_backoff();

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        info!("Connecting to Discord...");
        let mut client = match build_client(&token, engine.clone()).await {
            Ok(client) => {
                backoff = discord_backoff();
                client
            }
            Err(e) => {
                error!("Failed to build Discord client: {}", e);
                let delay = backoff.next().unwrap_or(Duration::from_secs(300));
                warn!("Retrying in {:.1}s...", delay.as_secs_f64());
                sleep(delay).await;
                continue;
            }
        };

        let shard_manager = client.shard_manager.clone();

        tokio::select! {
            result = client.start() => {
                match result {
                    Ok(()) => {
                        info!("Discord client disconnected normally");
                        break;
                    }
                    Err(e) => {
                        error!("Discord client error: {}", e);
                        let delay = backoff.next().unwrap_or(Duration::from_secs(300));
                        warn!("Discord disconnected. Reconnecting in {:.1}s...", delay.as_secs_f64());
                        sleep(delay).await;
                    }
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("Initiating graceful Discord shutdown...");
                    shard_manager.shutdown_all().await;
                    info!("Discord shutdown complete");
                    break;
                }
            }
        }
    }

    info!("Discord task ended");
}
