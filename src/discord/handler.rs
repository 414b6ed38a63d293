//! Discord event handling.
//!
//! Forwards gateway events into the sync engine: the ready event
//! registers the global `/roster` command, message-create feeds the
//! incremental hook, and interactions go to the command dispatcher.
//! Event handlers never propagate errors; failures are logged or
//! reported to the invoker.

use std::sync::Arc;

use serenity::async_trait;
use serenity::model::application::{Command, Interaction};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::guild::Guild;
use serenity::prelude::*;
use tracing::{debug, error, info};

use crate::discord::commands::{build_roster_command, ROSTER_COMMAND};
use crate::sync::SyncEngine;

pub struct RosterEventHandler {
    engine: Arc<SyncEngine>,
}

impl RosterEventHandler {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl EventHandler for RosterEventHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Discord bot connected as {} (ID: {})", ready.user.name, ready.user.id);

        // Global command: works for every server that added the bot.
        match Command::create_global_command(&ctx.http, build_roster_command()).await {
            Ok(command) => info!("Synced global command /{}", command.name),
            Err(e) => error!("Failed to sync global commands: {}", e),
        }
    }

    async fn message(&self, ctx: Context, message: Message) {
        // DMs and bot messages never qualify.
        if message.guild_id.is_none() || message.author.bot {
            return;
        }

        if let Err(e) = self.engine.handle_message(&ctx, &message).await {
            error!(
                "Intro message handling failed in {:?}: {}",
                message.guild_id, e
            );
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            if command.data.name == ROSTER_COMMAND {
                crate::discord::commands::dispatch(&self.engine, &ctx, &command).await;
            }
        }
    }

    async fn guild_create(&self, _ctx: Context, guild: Guild, _is_new: Option<bool>) {
        debug!(
            "Received guild data for '{}' ({} members)",
            guild.name,
            guild.members.len()
        );
    }
}
