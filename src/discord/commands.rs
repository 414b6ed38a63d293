//! The `/roster` slash-command surface.
//!
//! Command registration, option parsing, and the admin-gated handlers
//! that mutate settings and drive the sync engine. Handlers report
//! failures back to the invoker instead of letting them escape.

use serenity::builder::{
    CreateCommand, CreateCommandOption, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage,
};
use serenity::client::Context;
use serenity::model::application::{
    CommandInteraction, CommandOptionType, ResolvedOption, ResolvedValue,
};
use serenity::model::id::{ChannelId, GuildId, RoleId};
use tracing::{error, warn};

use crate::sync::settings::GuildSettings;
use crate::sync::SyncEngine;

pub const ROSTER_COMMAND: &str = "roster";

const NO_PERMISSION: &str = "⛔ You need Administrator permission to use this command.";

/// Parsed `/roster` subcommand.
#[derive(Debug)]
enum RosterCommand {
    Enable {
        source: ChannelId,
        summary: ChannelId,
        keywords: Option<String>,
        auto_role: Option<RoleId>,
        newbie_role: Option<RoleId>,
    },
    Disable,
    Set {
        source: Option<ChannelId>,
        summary: Option<ChannelId>,
        keywords: Option<String>,
        auto_role: Option<RoleId>,
        newbie_role: Option<RoleId>,
    },
    Status,
    Update,
    Clear,
}

/// Build the global `/roster` command definition.
pub fn build_roster_command() -> CreateCommand {
    CreateCommand::new(ROSTER_COMMAND)
        .description("Sync and summarize members' in-game names from the intro channel")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::SubCommand,
                "enable",
                "Enable guild name sync and set channels/keywords",
            )
            .add_sub_option(
                CreateCommandOption::new(
                    CommandOptionType::Channel,
                    "source_channel",
                    "Intro channel",
                )
                .required(true),
            )
            .add_sub_option(
                CreateCommandOption::new(
                    CommandOptionType::Channel,
                    "summary_channel",
                    "Summary channel",
                )
                .required(true),
            )
            .add_sub_option(CreateCommandOption::new(
                CommandOptionType::String,
                "keywords",
                "Comma-separated IGN keywords, e.g. 'ชื่อในเกม, IGN'",
            ))
            .add_sub_option(CreateCommandOption::new(
                CommandOptionType::Role,
                "auto_role",
                "Role granted after a valid intro",
            ))
            .add_sub_option(CreateCommandOption::new(
                CommandOptionType::Role,
                "newbie_role",
                "Role marking newcomers",
            )),
        )
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "disable",
            "Disable guild name sync for this server",
        ))
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::SubCommand,
                "set",
                "Configure channels and IGN keywords",
            )
            .add_sub_option(CreateCommandOption::new(
                CommandOptionType::Channel,
                "source_channel",
                "Intro channel",
            ))
            .add_sub_option(CreateCommandOption::new(
                CommandOptionType::Channel,
                "summary_channel",
                "Summary channel",
            ))
            .add_sub_option(CreateCommandOption::new(
                CommandOptionType::String,
                "keywords",
                "Comma-separated IGN keywords",
            ))
            .add_sub_option(CreateCommandOption::new(
                CommandOptionType::Role,
                "auto_role",
                "Role granted after a valid intro",
            ))
            .add_sub_option(CreateCommandOption::new(
                CommandOptionType::Role,
                "newbie_role",
                "Role marking newcomers",
            )),
        )
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "status",
            "Show current guild name sync settings",
        ))
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "update",
            "Manually rebuild the member summary now",
        ))
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "clear",
            "Clear the summary messages created by this bot",
        ))
}

/// Dispatch a `/roster` interaction.
pub async fn dispatch(engine: &SyncEngine, ctx: &Context, command: &CommandInteraction) {
    let Some(guild_id) = command.guild_id else {
        let _ = respond(ctx, command, "ℹ This command only works in a server.").await;
        return;
    };

    let Some(parsed) = parse_command(command) else {
        warn!("Unrecognized /roster invocation: {:?}", command.data.name);
        return;
    };

    let result = match parsed {
        RosterCommand::Enable {
            source,
            summary,
            keywords,
            auto_role,
            newbie_role,
        } => {
            handle_enable(engine, ctx, command, guild_id, source, summary, keywords, auto_role, newbie_role)
                .await
        }
        RosterCommand::Disable => handle_disable(engine, ctx, command, guild_id).await,
        RosterCommand::Set {
            source,
            summary,
            keywords,
            auto_role,
            newbie_role,
        } => {
            handle_set(engine, ctx, command, guild_id, source, summary, keywords, auto_role, newbie_role)
                .await
        }
        RosterCommand::Status => handle_status(engine, ctx, command, guild_id).await,
        RosterCommand::Update => handle_update(engine, ctx, command, guild_id).await,
        RosterCommand::Clear => handle_clear(engine, ctx, command, guild_id).await,
    };

    if let Err(e) = result {
        error!("/roster command failed in {}: {}", guild_id, e);
        report_error(ctx, command, &e).await;
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_enable(
    engine: &SyncEngine,
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    source: ChannelId,
    summary: ChannelId,
    keywords: Option<String>,
    auto_role: Option<RoleId>,
    newbie_role: Option<RoleId>,
) -> anyhow::Result<()> {
    if !ensure_admin(command) {
        respond(ctx, command, NO_PERMISSION).await?;
        return Ok(());
    }

    let settings = engine
        .store()
        .update(guild_id, |s| {
            s.enabled = true;
            s.source_channel_id = Some(source);
            s.summary_channel_id = Some(summary);
            if let Some(role) = auto_role {
                s.auto_role_id = Some(role);
            }
            if let Some(role) = newbie_role {
                s.newbie_role_id = Some(role);
            }
            if let Some(raw) = &keywords {
                let parts = parse_keywords(raw);
                if !parts.is_empty() {
                    s.ign_keywords = parts;
                }
            }
        })
        .await;

    respond(
        ctx,
        command,
        &format!(
            "✅ Guild name sync **enabled**.\n\n{}",
            describe_settings(&settings)
        ),
    )
    .await?;

    engine.full_rescan(ctx, guild_id).await?;
    Ok(())
}

async fn handle_disable(
    engine: &SyncEngine,
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
) -> anyhow::Result<()> {
    if !ensure_admin(command) {
        respond(ctx, command, NO_PERMISSION).await?;
        return Ok(());
    }

    engine.store().update(guild_id, |s| s.enabled = false).await;
    respond(ctx, command, "⛔ Guild name sync disabled.").await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn handle_set(
    engine: &SyncEngine,
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    source: Option<ChannelId>,
    summary: Option<ChannelId>,
    keywords: Option<String>,
    auto_role: Option<RoleId>,
    newbie_role: Option<RoleId>,
) -> anyhow::Result<()> {
    if !ensure_admin(command) {
        respond(ctx, command, NO_PERMISSION).await?;
        return Ok(());
    }

    let settings = engine
        .store()
        .update(guild_id, |s| {
            if let Some(channel) = source {
                s.source_channel_id = Some(channel);
            }
            if let Some(channel) = summary {
                s.summary_channel_id = Some(channel);
            }
            if let Some(role) = auto_role {
                s.auto_role_id = Some(role);
            }
            if let Some(role) = newbie_role {
                s.newbie_role_id = Some(role);
            }
            if let Some(raw) = &keywords {
                let parts = parse_keywords(raw);
                if !parts.is_empty() {
                    s.ign_keywords = parts;
                }
            }
        })
        .await;

    respond(
        ctx,
        command,
        &format!("✅ Settings updated.\n\n{}", describe_settings(&settings)),
    )
    .await?;

    if settings.enabled {
        engine.full_rescan(ctx, guild_id).await?;
    }
    Ok(())
}

async fn handle_status(
    engine: &SyncEngine,
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
) -> anyhow::Result<()> {
    let settings = engine.store().snapshot(guild_id).await;

    let last_sync = settings
        .last_synced_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "Never".to_string());

    respond(
        ctx,
        command,
        &format!(
            "**Guild name sync**\n**Enabled:** {}\n{}\n**Tracked summary messages:** {}\n**Last sync:** {}",
            settings.enabled,
            describe_settings(&settings),
            settings.summary_message_ids.len(),
            last_sync,
        ),
    )
    .await?;
    Ok(())
}

async fn handle_update(
    engine: &SyncEngine,
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
) -> anyhow::Result<()> {
    if !ensure_admin(command) {
        respond(ctx, command, NO_PERMISSION).await?;
        return Ok(());
    }

    command.defer_ephemeral(&ctx.http).await?;
    let posted = engine.full_rescan(ctx, guild_id).await?;

    let text = if posted {
        "✅ Summary updated manually."
    } else {
        "ℹ Nothing to update (no intro data or channels not set)."
    };
    followup(ctx, command, text).await?;
    Ok(())
}

async fn handle_clear(
    engine: &SyncEngine,
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
) -> anyhow::Result<()> {
    if !ensure_admin(command) {
        respond(ctx, command, NO_PERMISSION).await?;
        return Ok(());
    }

    command.defer_ephemeral(&ctx.http).await?;
    let deleted = engine.clear_summary(ctx, guild_id).await;
    followup(ctx, command, &format!("✅ Cleared {} summary message(s).", deleted)).await?;
    Ok(())
}

/// Check that the invoker holds Administrator in the issuing guild.
fn ensure_admin(command: &CommandInteraction) -> bool {
    command
        .member
        .as_deref()
        .and_then(|member| member.permissions)
        .map(|permissions| permissions.administrator())
        .unwrap_or(false)
}

fn parse_command(command: &CommandInteraction) -> Option<RosterCommand> {
    let options = command.data.options();
    let first = options.first()?;
    let sub_options: &[ResolvedOption] = match &first.value {
        ResolvedValue::SubCommand(options) => options,
        _ => return None,
    };

    match first.name {
        "enable" => Some(RosterCommand::Enable {
            source: channel_option(sub_options, "source_channel")?,
            summary: channel_option(sub_options, "summary_channel")?,
            keywords: string_option(sub_options, "keywords"),
            auto_role: role_option(sub_options, "auto_role"),
            newbie_role: role_option(sub_options, "newbie_role"),
        }),
        "disable" => Some(RosterCommand::Disable),
        "set" => Some(RosterCommand::Set {
            source: channel_option(sub_options, "source_channel"),
            summary: channel_option(sub_options, "summary_channel"),
            keywords: string_option(sub_options, "keywords"),
            auto_role: role_option(sub_options, "auto_role"),
            newbie_role: role_option(sub_options, "newbie_role"),
        }),
        "status" => Some(RosterCommand::Status),
        "update" => Some(RosterCommand::Update),
        "clear" => Some(RosterCommand::Clear),
        _ => None,
    }
}

fn channel_option(options: &[ResolvedOption], name: &str) -> Option<ChannelId> {
    options.iter().find(|o| o.name == name).and_then(|o| match &o.value {
        ResolvedValue::Channel(channel) => Some(channel.id),
        _ => None,
    })
}

fn role_option(options: &[ResolvedOption], name: &str) -> Option<RoleId> {
    options.iter().find(|o| o.name == name).and_then(|o| match &o.value {
        ResolvedValue::Role(role) => Some(role.id),
        _ => None,
    })
}

fn string_option(options: &[ResolvedOption], name: &str) -> Option<String> {
    options.iter().find(|o| o.name == name).and_then(|o| match &o.value {
        ResolvedValue::String(value) => Some(value.to_string()),
        _ => None,
    })
}

/// Split a comma-separated keyword string, dropping blank items.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(|k| k.to_string())
        .collect()
}

fn describe_settings(settings: &GuildSettings) -> String {
    let source = settings
        .source_channel_id
        .map(|id| format!("<#{}>", id.get()))
        .unwrap_or_else(|| "Not set".to_string());
    let summary = settings
        .summary_channel_id
        .map(|id| format!("<#{}>", id.get()))
        .unwrap_or_else(|| "Not set".to_string());
    let keywords = if settings.ign_keywords.is_empty() {
        "None".to_string()
    } else {
        settings.ign_keywords.join(", ")
    };
    let auto_role = settings
        .auto_role_id
        .map(|id| format!("<@&{}>", id.get()))
        .unwrap_or_else(|| "None".to_string());
    let newbie_role = settings
        .newbie_role_id
        .map(|id| format!("<@&{}>", id.get()))
        .unwrap_or_else(|| "None".to_string());

    format!(
        "**Intro channel:** {}\n**Summary channel:** {}\n**Role grouping:** automatic (Discord role hierarchy)\n**IGN keywords:** {}\n**Auto role:** {}\n**Newbie role:** {}",
        source, summary, keywords, auto_role, newbie_role,
    )
}

async fn respond(
    ctx: &Context,
    command: &CommandInteraction,
    text: &str,
) -> Result<(), serenity::Error> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(text)
                    .ephemeral(true),
            ),
        )
        .await
}

async fn followup(
    ctx: &Context,
    command: &CommandInteraction,
    text: &str,
) -> Result<(), serenity::Error> {
    command
        .create_followup(
            &ctx.http,
            CreateInteractionResponseFollowup::new()
                .content(text)
                .ephemeral(true),
        )
        .await
        .map(|_| ())
}

/// Best-effort user-visible failure report; tries a followup first in
/// case the interaction was already acknowledged.
async fn report_error(ctx: &Context, command: &CommandInteraction, error: &anyhow::Error) {
    let text = format!("⚠ Command failed: {}", error);
    if followup(ctx, command, &text).await.is_err() {
        let _ = respond(ctx, command, &text).await;
    }
}
