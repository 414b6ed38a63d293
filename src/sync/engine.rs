//! Roster synchronization engine.
//!
//! Orchestrates a rescan: scan the intro channel's history, extract
//! IGNs, backfill the auto role, render the roster, and converge the
//! summary channel's message set onto the new chunks by editing in
//! place, sending extras, and deleting leftovers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serenity::builder::{EditMessage, GetMessages};
use serenity::client::Context;
use serenity::model::channel::Message;
use serenity::model::id::{GuildId, MessageId, RoleId, UserId};
use serenity::model::Permissions;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::common::error::{classify_api_error, ApiFailure};
use crate::config::SyncConfig;
use crate::roster::builder::{build_roster, MemberProfile, RoleInfo};
use crate::roster::matcher::extract_ign;
use crate::roster::paginate::{split_text_lines, DISCORD_MESSAGE_LIMIT};
use crate::sync::settings::{GuildSettings, SettingsStore};

/// Default cap on scanned intro-channel history.
pub const DEFAULT_HISTORY_CAP: usize = 3000;

/// Default pause between consecutive auto-role grants.
pub const DEFAULT_ROLE_GRANT_DELAY: Duration = Duration::from_millis(200);

/// Owned snapshot of the guild's member/role graph, taken from the
/// serenity cache. Cache references cannot be held across await points,
/// so the engine copies what it needs up front.
struct GuildSnapshot {
    profiles: HashMap<UserId, MemberProfile>,
    roles: HashMap<RoleId, RoleInfo>,
    bot_can_manage_roles: bool,
    bot_top_role_position: u16,
}

/// What to do with each new chunk during convergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkAction {
    /// Edit this previously-posted message in place.
    Edit(MessageId),
    /// Send a new message.
    Send,
}

/// Compute the convergence plan: per-index actions for the new chunks
/// plus the trailing old messages to delete.
pub fn plan_convergence(
    old_ids: &[MessageId],
    chunk_count: usize,
) -> (Vec<ChunkAction>, Vec<MessageId>) {
    let actions = (0..chunk_count)
        .map(|i| match old_ids.get(i) {
            Some(id) => ChunkAction::Edit(*id),
            None => ChunkAction::Send,
        })
        .collect();
    let stale = old_ids.get(chunk_count..).unwrap_or(&[]).to_vec();
    (actions, stale)
}

pub struct SyncEngine {
    store: Arc<SettingsStore>,
    history_cap: usize,
    role_grant_delay: Duration,
}

impl SyncEngine {
    pub fn new(store: Arc<SettingsStore>, config: &SyncConfig) -> Self {
        Self {
            store,
            history_cap: config.history_cap.unwrap_or(DEFAULT_HISTORY_CAP),
            role_grant_delay: config
                .role_grant_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_ROLE_GRANT_DELAY),
        }
    }

    pub fn store(&self) -> &Arc<SettingsStore> {
        &self.store
    }

    /// Rebuild the summary from the full intro-channel history.
    ///
    /// Returns whether a summary was posted. Unconfigured or disabled
    /// guilds are a silent no-op. The tracked message id list is
    /// committed only after the whole edit/send loop succeeds, so a
    /// mid-loop failure keeps the previous baseline for the next run.
    pub async fn full_rescan(
        &self,
        ctx: &Context,
        guild_id: GuildId,
    ) -> Result<bool, serenity::Error> {
        let _guard = self.store.rescan_lock(guild_id).await;

        let settings = self.store.snapshot(guild_id).await;
        if !settings.is_runnable() {
            return Ok(false);
        }
        let Some(summary_channel) = settings.summary_channel_id else {
            return Ok(false);
        };

        let Some(mut snapshot) = snapshot_guild(ctx, guild_id) else {
            debug!("Guild {} not in cache, skipping rescan", guild_id);
            return Ok(false);
        };

        let intro_map = self.collect_intro_map(ctx, &settings, &snapshot).await?;
        if intro_map.is_empty() {
            info!("No intro data found for guild {}", guild_id);
            return Ok(false);
        }

        // Role backfill runs before rendering and never aborts it.
        if settings.auto_role_id.is_some() {
            let mut granted = 0;
            for user_id in intro_map.keys() {
                if self
                    .apply_auto_role(ctx, guild_id, *user_id, &settings, &snapshot)
                    .await
                {
                    granted += 1;
                    sleep(self.role_grant_delay).await;
                }
            }
            if granted > 0 {
                info!("Auto role applied to {} member(s) in {}", granted, guild_id);
                // Top roles may have changed; regroup against fresh data.
                if let Some(fresh) = snapshot_guild(ctx, guild_id) {
                    snapshot = fresh;
                }
            }
        }

        let Some(text) = build_roster(
            &snapshot.profiles,
            &intro_map,
            &snapshot.roles,
            &settings.excluded_role_ids,
        ) else {
            return Ok(false);
        };

        let chunks = split_text_lines(&text, DISCORD_MESSAGE_LIMIT);

        // Confirm which tracked messages still exist. A vanished message
        // is dropped; a forbidden fetch abandons reuse of the whole set
        // so we never leave a partially edited mix behind.
        let mut old_ids: Vec<MessageId> = Vec::new();
        for message_id in &settings.summary_message_ids {
            match summary_channel.message(&ctx.http, *message_id).await {
                Ok(message) => old_ids.push(message.id),
                Err(e) => match classify_api_error(&e) {
                    ApiFailure::NotFound => continue,
                    ApiFailure::Forbidden => {
                        warn!(
                            "Summary channel fetch forbidden in {}, reposting from scratch",
                            guild_id
                        );
                        old_ids.clear();
                        break;
                    }
                    ApiFailure::Other => return Err(e),
                },
            }
        }

        let (actions, stale) = plan_convergence(&old_ids, chunks.len());

        let mut used_ids: Vec<MessageId> = Vec::with_capacity(chunks.len());
        for (chunk, action) in chunks.iter().zip(&actions) {
            match action {
                ChunkAction::Edit(message_id) => {
                    summary_channel
                        .edit_message(
                            &ctx.http,
                            *message_id,
                            EditMessage::new().content(chunk.as_str()),
                        )
                        .await?;
                    used_ids.push(*message_id);
                }
                ChunkAction::Send => {
                    let message = summary_channel.say(&ctx.http, chunk.as_str()).await?;
                    used_ids.push(message.id);
                }
            }
        }

        for message_id in stale {
            if let Err(e) = summary_channel.delete_message(&ctx.http, message_id).await {
                debug!("Failed to delete stale summary message {}: {}", message_id, e);
            }
        }

        let chunk_count = used_ids.len();
        self.store
            .update(guild_id, |s| {
                s.summary_message_ids = used_ids;
                s.last_synced_at = Some(chrono::Utc::now());
            })
            .await;

        info!("Summary updated for {}. chunks={}", guild_id, chunk_count);
        Ok(true)
    }

    /// Incremental hook for a new message in the intro channel.
    ///
    /// A qualifying message applies the single-member auto-role grant
    /// and then triggers the same full rescan.
    pub async fn handle_message(
        &self,
        ctx: &Context,
        message: &Message,
    ) -> Result<(), serenity::Error> {
        let Some(guild_id) = message.guild_id else {
            return Ok(());
        };
        if message.author.bot {
            return Ok(());
        }

        let settings = self.store.snapshot(guild_id).await;
        if !settings.enabled {
            return Ok(());
        }
        if Some(message.channel_id) != settings.source_channel_id {
            return Ok(());
        }
        if extract_ign(&message.content, &settings.ign_keywords, settings.ign_max_length)
            .is_none()
        {
            return Ok(());
        }

        if let Some(snapshot) = snapshot_guild(ctx, guild_id) {
            self.apply_auto_role(ctx, guild_id, message.author.id, &settings, &snapshot)
                .await;
        }

        self.full_rescan(ctx, guild_id).await?;
        Ok(())
    }

    /// Delete all tracked summary messages, counting successes.
    ///
    /// Per-message failures are swallowed; the tracked id list is reset
    /// unconditionally.
    pub async fn clear_summary(&self, ctx: &Context, guild_id: GuildId) -> usize {
        let settings = self.store.snapshot(guild_id).await;

        let mut deleted = 0;
        if let Some(summary_channel) = settings.summary_channel_id {
            for message_id in &settings.summary_message_ids {
                match summary_channel.message(&ctx.http, *message_id).await {
                    Ok(_) => {
                        if summary_channel
                            .delete_message(&ctx.http, *message_id)
                            .await
                            .is_ok()
                        {
                            deleted += 1;
                        }
                    }
                    Err(e) => debug!("Skipping summary message {}: {}", message_id, e),
                }
            }
        }

        self.store
            .update(guild_id, |s| s.summary_message_ids.clear())
            .await;

        deleted
    }

    /// Scan the intro channel's history oldest-first, mapping each
    /// member to their latest matched IGN.
    async fn collect_intro_map(
        &self,
        ctx: &Context,
        settings: &GuildSettings,
        snapshot: &GuildSnapshot,
    ) -> Result<HashMap<UserId, String>, serenity::Error> {
        let Some(source_channel) = settings.source_channel_id else {
            return Ok(HashMap::new());
        };

        let mut intro_map: HashMap<UserId, String> = HashMap::new();
        let mut after = MessageId::new(1);
        let mut scanned = 0usize;

        'scan: loop {
            let mut batch = source_channel
                .messages(&ctx.http, GetMessages::new().after(after).limit(100))
                .await?;
            if batch.is_empty() {
                break;
            }
            // Discord returns newest-first within a page.
            batch.sort_unstable_by_key(|m| m.id);
            after = batch[batch.len() - 1].id;

            for message in &batch {
                scanned += 1;
                if !message.author.bot {
                    if let Some(profile) = snapshot.profiles.get(&message.author.id) {
                        if let Some(ign) = extract_ign(
                            &message.content,
                            &settings.ign_keywords,
                            settings.ign_max_length,
                        ) {
                            let excluded = profile
                                .role_ids
                                .iter()
                                .any(|r| settings.excluded_role_ids.contains(r));
                            if !excluded {
                                // Oldest-first scan, so the newest
                                // introduction overwrites earlier ones.
                                intro_map.insert(message.author.id, ign);
                            }
                        }
                    }
                }
                if scanned >= self.history_cap {
                    break 'scan;
                }
            }
        }

        Ok(intro_map)
    }

    /// Grant the configured auto role to one member if possible.
    ///
    /// Returns whether the role was actually added. Every "cannot"
    /// case, including API rejections, degrades to `false`.
    async fn apply_auto_role(
        &self,
        ctx: &Context,
        guild_id: GuildId,
        user_id: UserId,
        settings: &GuildSettings,
        snapshot: &GuildSnapshot,
    ) -> bool {
        let Some(role_id) = settings.auto_role_id else {
            return false;
        };
        let Some(role) = snapshot.roles.get(&role_id) else {
            return false;
        };
        let Some(profile) = snapshot.profiles.get(&user_id) else {
            return false;
        };
        if profile.role_ids.contains(&role_id) {
            return false;
        }
        if !snapshot.bot_can_manage_roles {
            return false;
        }
        // The bot's own top role must outrank the target role.
        if role.position >= snapshot.bot_top_role_position {
            return false;
        }

        match ctx
            .http
            .add_member_role(
                guild_id,
                user_id,
                role_id,
                Some("Intro completed (auto role)"),
            )
            .await
        {
            Ok(()) => true,
            Err(e) => {
                debug!("Auto role grant failed for {} in {}: {}", user_id, guild_id, e);
                false
            }
        }
    }
}

/// Copy the member/role graph out of the serenity cache.
fn snapshot_guild(ctx: &Context, guild_id: GuildId) -> Option<GuildSnapshot> {
    let bot_user_id = ctx.cache.current_user().id;
    let guild = ctx.cache.guild(guild_id)?;

    let everyone_role_id = RoleId::new(guild_id.get());

    let roles: HashMap<RoleId, RoleInfo> = guild
        .roles
        .iter()
        .filter(|(id, _)| **id != everyone_role_id)
        .map(|(id, role)| {
            (
                *id,
                RoleInfo {
                    name: role.name.clone(),
                    position: role.position,
                },
            )
        })
        .collect();

    let profiles: HashMap<UserId, MemberProfile> = guild
        .members
        .values()
        .map(|member| {
            (
                member.user.id,
                MemberProfile {
                    user_id: member.user.id,
                    display_name: member.display_name().to_string(),
                    is_bot: member.user.bot,
                    role_ids: member.roles.clone(),
                },
            )
        })
        .collect();

    let (bot_can_manage_roles, bot_top_role_position) = match guild.members.get(&bot_user_id) {
        Some(me) => {
            let mut permissions = guild
                .roles
                .get(&everyone_role_id)
                .map(|r| r.permissions)
                .unwrap_or_else(Permissions::empty);
            for role_id in &me.roles {
                if let Some(role) = guild.roles.get(role_id) {
                    permissions |= role.permissions;
                }
            }
            let can_manage =
                permissions.administrator() || permissions.contains(Permissions::MANAGE_ROLES);
            let top_position = me
                .roles
                .iter()
                .filter_map(|id| guild.roles.get(id))
                .map(|role| role.position)
                .max()
                .unwrap_or(0);
            (can_manage, top_position)
        }
        None => (false, 0),
    };

    Some(GuildSnapshot {
        profiles,
        roles,
        bot_can_manage_roles,
        bot_top_role_position,
    })
}
