//! Guild XP engine: awards, leaderboards, configuration.

use crate::config::{GuildXpConfig, GuildXpConfigUpdate, LevelRole};
use crate::document::XpDocument;
use crate::record::{AwardResult, UserXpRecord};
use caravel_error::{CaravelResult, ValidationError, ValidationErrorKind};
use caravel_store::{AtomicStore, LockManager, validate_key};
use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// One row of a guild leaderboard snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    /// User id.
    pub user_id: String,
    /// Last-observed display name.
    pub username: String,
    /// Derived level.
    pub level: u32,
    /// Lifetime XP; the sort key.
    pub total_xp: u64,
    /// Current-level XP.
    pub xp: u64,
    /// Messages that earned XP.
    pub message_count: u64,
}

#[derive(Clone, Copy)]
enum AwardKind {
    Message,
    Command,
}

/// The XP/leveling engine for all guilds.
///
/// Owns the in-memory XP document and an injected [`AtomicStore`] for
/// persistence. Every mutation updates memory first and enqueues a commit
/// without awaiting it: persistence failures are logged by the store worker
/// and never surface to chat-facing callers, who always see an
/// in-memory-consistent result. Award pipelines run inside a per-guild
/// [`LockManager`] critical section so multi-step read-gate-mutate sequences
/// for one guild never interleave.
///
/// All read contracts return owned copies; no caller can mutate engine state
/// through a returned value.
pub struct XpEngine {
    store: AtomicStore<XpDocument>,
    locks: LockManager,
    document: Mutex<XpDocument>,
}

impl XpEngine {
    /// Load the persisted document and build an engine over it.
    ///
    /// # Errors
    ///
    /// Returns error if the store file exists but cannot be read or parsed.
    #[tracing::instrument(skip(store, locks))]
    pub async fn new(store: AtomicStore<XpDocument>, locks: LockManager) -> CaravelResult<Self> {
        let document = store.load().await?;
        tracing::info!(guilds = document.guilds.len(), "Loaded XP document");
        Ok(Self {
            store,
            locks,
            document: Mutex::new(document),
        })
    }

    /// The lock manager this engine serializes guild awards with.
    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    /// Commit the current document and wait for it to be durable.
    ///
    /// The write queue is FIFO, so this also flushes every earlier
    /// fire-and-forget commit. Intended for shutdown paths and tests.
    ///
    /// # Errors
    ///
    /// Returns the persistence error of the flushing commit.
    pub async fn flush(&self) -> CaravelResult<()> {
        let snapshot = self.document.lock().await.clone();
        self.store.commit(snapshot).wait().await
    }

    /// Enqueue a best-effort commit of the current document state.
    fn persist(&self, document: &XpDocument) {
        // Dropped ticket: fire-and-forget, worker logs any failure.
        drop(self.store.commit(document.clone()));
    }

    fn log_rejected(operation: &str, err: &caravel_error::CaravelError) {
        tracing::warn!(operation, error = %err, "Rejected input, operation is a no-op");
    }

    /// Guild configuration, created with defaults and persisted if absent.
    #[tracing::instrument(skip(self))]
    pub async fn guild_config(&self, guild_id: &str) -> GuildXpConfig {
        if let Err(e) = validate_key("guild id", guild_id) {
            Self::log_rejected("guild_config", &e);
            return GuildXpConfig::default();
        }

        let mut document = self.document.lock().await;
        let created = document.guild(guild_id).is_none();
        let config = document.guild_mut(guild_id).config.clone();
        if created {
            self.persist(&document);
        }
        config
    }

    /// Shallow-merge `update` onto the guild's config and persist the result.
    ///
    /// An update that violates the config rules (inverted XP bounds, negative
    /// multiplier) is logged and dropped whole; the existing config is
    /// returned unchanged.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_guild_config(
        &self,
        guild_id: &str,
        update: GuildXpConfigUpdate,
    ) -> GuildXpConfig {
        if let Err(e) = validate_key("guild id", guild_id) {
            Self::log_rejected("update_guild_config", &e);
            return GuildXpConfig::default();
        }

        let mut document = self.document.lock().await;
        let guild = document.guild_mut(guild_id);
        match guild.config.merged(update) {
            Ok(merged) => {
                guild.config = merged.clone();
                self.persist(&document);
                tracing::info!(guild_id, "Updated guild XP config");
                merged
            }
            Err(e) => {
                Self::log_rejected("update_guild_config", &e);
                guild.config.clone()
            }
        }
    }

    /// User record, created with defaults and persisted if absent.
    ///
    /// A supplied `username` differing from the stored one updates the stored
    /// name as a side effect, keeping display names fresh without a separate
    /// call.
    #[tracing::instrument(skip(self))]
    pub async fn user_data(&self, guild_id: &str, user_id: &str, username: &str) -> UserXpRecord {
        if let Err(e) = validate_key("guild id", guild_id)
            .and_then(|()| validate_key("user id", user_id))
        {
            Self::log_rejected("user_data", &e);
            return UserXpRecord::fresh(username);
        }

        let mut document = self.document.lock().await;
        let guild = document.guild_mut(guild_id);
        let (record, dirty) = match guild.users.get_mut(user_id) {
            Some(record) => {
                let renamed = record.observe_username(username);
                (record.clone(), renamed)
            }
            None => {
                let record = UserXpRecord::fresh(username);
                guild.users.insert(user_id.to_string(), record.clone());
                (record, true)
            }
        };
        if dirty {
            self.persist(&document);
        }
        record
    }

    /// Award message XP, if every gate passes.
    ///
    /// Returns `None` with no side effects when the guild's XP system is
    /// disabled, the user holds a no-XP role, the channel is blocked or
    /// outside a non-empty allow-list, or the user is still in cooldown.
    /// Otherwise draws a uniform amount in `[min, max]`, applies the stacked
    /// multipliers, and persists best-effort.
    #[tracing::instrument(skip(self, role_ids))]
    pub async fn award_message_xp(
        &self,
        guild_id: &str,
        user_id: &str,
        username: &str,
        channel_id: &str,
        role_ids: &[String],
    ) -> Option<AwardResult> {
        self.award(guild_id, user_id, username, channel_id, role_ids, AwardKind::Message)
            .await
    }

    /// Award the fixed per-command XP amount.
    ///
    /// Same block rules as message XP, but the cooldown is ignored entirely:
    /// a command always grants XP when the system is enabled and nothing is
    /// blocked.
    #[tracing::instrument(skip(self, role_ids))]
    pub async fn award_command_xp(
        &self,
        guild_id: &str,
        user_id: &str,
        username: &str,
        channel_id: &str,
        role_ids: &[String],
    ) -> Option<AwardResult> {
        self.award(guild_id, user_id, username, channel_id, role_ids, AwardKind::Command)
            .await
    }

    async fn award(
        &self,
        guild_id: &str,
        user_id: &str,
        username: &str,
        channel_id: &str,
        role_ids: &[String],
        kind: AwardKind,
    ) -> Option<AwardResult> {
        if let Err(e) = validate_key("guild id", guild_id)
            .and_then(|()| validate_key("user id", user_id))
            .and_then(|()| validate_key("channel id", channel_id))
        {
            Self::log_rejected("award", &e);
            return None;
        }

        self.locks
            .with_lock(guild_id, || async {
                let mut document = self.document.lock().await;
                let guild = document.guild_mut(guild_id);
                let config = &guild.config;

                if !*config.enabled() {
                    return None;
                }
                if role_ids.iter().any(|role| config.no_xp_roles().contains(role)) {
                    tracing::debug!(guild_id, user_id, "XP blocked by role");
                    return None;
                }
                if config.no_xp_channels().contains(channel_id) {
                    tracing::debug!(guild_id, channel_id, "XP blocked in channel");
                    return None;
                }
                if !config.xp_gain_channels().is_empty()
                    && !config.xp_gain_channels().contains(channel_id)
                {
                    tracing::debug!(guild_id, channel_id, "Channel not in XP allow-list");
                    return None;
                }

                let now = Utc::now();
                let base = match kind {
                    AwardKind::Message => {
                        let cooldown = *config.cooldown_seconds();
                        if let Some(record) = guild.users.get(user_id)
                            && record.in_cooldown(cooldown, now)
                        {
                            tracing::debug!(guild_id, user_id, "XP gain still in cooldown");
                            return None;
                        }
                        let (min, max) =
                            (*config.min_xp_per_message(), *config.max_xp_per_message());
                        // A legacy-written document may carry inverted bounds
                        // that `merged` never saw; sampling that range panics.
                        if min > max {
                            Self::log_rejected(
                                "award",
                                &ValidationError::new(ValidationErrorKind::InvalidRange(
                                    format!("min XP per message {min} exceeds max {max}"),
                                ))
                                .into(),
                            );
                            return None;
                        }
                        u64::from(rand::thread_rng().gen_range(min..=max))
                    }
                    AwardKind::Command => u64::from(*config.xp_per_command()),
                };

                // Multipliers stack multiplicatively: the channel's (if any)
                // times every matching role's, not just the highest.
                let mut multiplier = config
                    .channel_multipliers()
                    .get(channel_id)
                    .copied()
                    .unwrap_or(1.0);
                for role in role_ids {
                    if let Some(role_multiplier) = config.role_multipliers().get(role) {
                        multiplier *= role_multiplier;
                    }
                }
                let xp_gained = (base as f64 * multiplier).floor() as u64;

                let record = guild
                    .users
                    .entry(user_id.to_string())
                    .or_insert_with(|| UserXpRecord::fresh(username));
                record.observe_username(username);
                let (old_level, new_level) = record.apply_gain(xp_gained, now);
                if matches!(kind, AwardKind::Message) {
                    record.count_message();
                }

                let result = AwardResult {
                    xp_gained,
                    total_xp: *record.total_xp(),
                    current_xp: *record.current_level_xp(),
                    level: new_level,
                    leveled_up: new_level > old_level,
                    old_level,
                    new_level,
                };

                if result.leveled_up {
                    tracing::info!(guild_id, user_id, old_level, new_level, "User leveled up");
                }

                self.persist(&document);
                Some(result)
            })
            .await
    }

    /// Snapshot of the top `limit` users by lifetime XP.
    ///
    /// Sorted descending by `total_xp`; ties break by user id ascending so
    /// the ordering is stable across calls.
    #[tracing::instrument(skip(self))]
    pub async fn leaderboard(&self, guild_id: &str, limit: usize) -> Vec<LeaderboardEntry> {
        let mut entries = self.ranked_entries(guild_id).await;
        entries.truncate(limit);
        entries
    }

    /// 1-based position of `user_id` in the full descending-XP ordering.
    ///
    /// `None` if the user has no record in this guild.
    #[tracing::instrument(skip(self))]
    pub async fn user_rank(&self, guild_id: &str, user_id: &str) -> Option<usize> {
        self.ranked_entries(guild_id)
            .await
            .iter()
            .position(|entry| entry.user_id == user_id)
            .map(|position| position + 1)
    }

    async fn ranked_entries(&self, guild_id: &str) -> Vec<LeaderboardEntry> {
        if let Err(e) = validate_key("guild id", guild_id) {
            Self::log_rejected("leaderboard", &e);
            return Vec::new();
        }

        let document = self.document.lock().await;
        let Some(guild) = document.guild(guild_id) else {
            return Vec::new();
        };
        let mut entries: Vec<LeaderboardEntry> = guild
            .users
            .iter()
            .map(|(user_id, record)| LeaderboardEntry {
                user_id: user_id.clone(),
                username: record.username().clone(),
                level: *record.level(),
                total_xp: *record.total_xp(),
                xp: *record.current_level_xp(),
                message_count: *record.message_count(),
            })
            .collect();
        entries.sort_by(|a, b| {
            b.total_xp
                .cmp(&a.total_xp)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        entries
    }

    /// Insert or replace the role reward for `level`.
    ///
    /// Returns the reward list after the change, sorted ascending by level.
    #[tracing::instrument(skip(self))]
    pub async fn set_level_role(
        &self,
        guild_id: &str,
        level: u32,
        role_id: &str,
    ) -> Vec<LevelRole> {
        if let Err(e) = validate_key("guild id", guild_id)
            .and_then(|()| validate_key("role id", role_id))
            .and_then(|()| {
                if level == 0 {
                    Err(ValidationError::new(ValidationErrorKind::InvalidRange(
                        "level role threshold must be positive".to_string(),
                    ))
                    .into())
                } else {
                    Ok(())
                }
            })
        {
            Self::log_rejected("set_level_role", &e);
            return self.current_level_roles(guild_id).await;
        }

        let mut document = self.document.lock().await;
        let guild = document.guild_mut(guild_id);
        guild.config.set_level_role(level, role_id.to_string());
        let roles = guild.config.level_roles().clone();
        self.persist(&document);
        roles
    }

    /// Remove the role reward for `level`, if any.
    #[tracing::instrument(skip(self))]
    pub async fn remove_level_role(&self, guild_id: &str, level: u32) -> Vec<LevelRole> {
        if let Err(e) = validate_key("guild id", guild_id) {
            Self::log_rejected("remove_level_role", &e);
            return Vec::new();
        }

        let mut document = self.document.lock().await;
        let guild = document.guild_mut(guild_id);
        let removed = guild.config.remove_level_role(level);
        let roles = guild.config.level_roles().clone();
        if removed {
            self.persist(&document);
        }
        roles
    }

    async fn current_level_roles(&self, guild_id: &str) -> Vec<LevelRole> {
        let document = self.document.lock().await;
        document
            .guild(guild_id)
            .map(|guild| guild.config.level_roles().clone())
            .unwrap_or_default()
    }

    /// Every configured reward whose threshold is ≤ `level`, ascending.
    #[tracing::instrument(skip(self))]
    pub async fn roles_for_level(&self, guild_id: &str, level: u32) -> Vec<String> {
        if let Err(e) = validate_key("guild id", guild_id) {
            Self::log_rejected("roles_for_level", &e);
            return Vec::new();
        }

        let document = self.document.lock().await;
        document
            .guild(guild_id)
            .map(|guild| guild.config.roles_for_level(level))
            .unwrap_or_default()
    }

    /// Set a channel XP multiplier; exactly 1.0 removes the entry.
    ///
    /// Returns the channel-multiplier map after the change.
    #[tracing::instrument(skip(self))]
    pub async fn set_channel_multiplier(
        &self,
        guild_id: &str,
        channel_id: &str,
        multiplier: f64,
    ) -> BTreeMap<String, f64> {
        self.set_multiplier(guild_id, channel_id, multiplier, true).await
    }

    /// Set a role XP multiplier; exactly 1.0 removes the entry.
    ///
    /// Returns the role-multiplier map after the change.
    #[tracing::instrument(skip(self))]
    pub async fn set_role_multiplier(
        &self,
        guild_id: &str,
        role_id: &str,
        multiplier: f64,
    ) -> BTreeMap<String, f64> {
        self.set_multiplier(guild_id, role_id, multiplier, false).await
    }

    async fn set_multiplier(
        &self,
        guild_id: &str,
        key: &str,
        multiplier: f64,
        channel: bool,
    ) -> BTreeMap<String, f64> {
        let field = if channel { "channel id" } else { "role id" };
        if let Err(e) =
            validate_key("guild id", guild_id).and_then(|()| validate_key(field, key))
        {
            Self::log_rejected("set_multiplier", &e);
            return BTreeMap::new();
        }

        let mut document = self.document.lock().await;
        let guild = document.guild_mut(guild_id);
        let outcome = if channel {
            guild.config.set_channel_multiplier(key.to_string(), multiplier)
        } else {
            guild.config.set_role_multiplier(key.to_string(), multiplier)
        };
        let map = if channel {
            guild.config.channel_multipliers().clone()
        } else {
            guild.config.role_multipliers().clone()
        };
        match outcome {
            Ok(()) => self.persist(&document),
            Err(e) => Self::log_rejected("set_multiplier", &e),
        }
        map
    }

    /// Replace one user's record with defaults, preserving the username.
    #[tracing::instrument(skip(self))]
    pub async fn reset_user_xp(&self, guild_id: &str, user_id: &str) -> UserXpRecord {
        if let Err(e) = validate_key("guild id", guild_id)
            .and_then(|()| validate_key("user id", user_id))
        {
            Self::log_rejected("reset_user_xp", &e);
            return UserXpRecord::fresh("");
        }

        let mut document = self.document.lock().await;
        let guild = document.guild_mut(guild_id);
        let username = guild
            .users
            .get(user_id)
            .map(|record| record.username().clone())
            .unwrap_or_default();
        let fresh = UserXpRecord::fresh(username);
        guild.users.insert(user_id.to_string(), fresh.clone());
        self.persist(&document);
        tracing::info!(guild_id, user_id, "Reset user XP");
        fresh
    }

    /// Replace every record in the guild with defaults, preserving usernames.
    ///
    /// Returns the number of records reset. The guild config is untouched.
    #[tracing::instrument(skip(self))]
    pub async fn reset_guild_xp(&self, guild_id: &str) -> usize {
        if let Err(e) = validate_key("guild id", guild_id) {
            Self::log_rejected("reset_guild_xp", &e);
            return 0;
        }

        let mut document = self.document.lock().await;
        let guild = document.guild_mut(guild_id);
        let count = guild.users.len();
        for record in guild.users.values_mut() {
            let username = record.username().clone();
            *record = UserXpRecord::fresh(username);
        }
        self.persist(&document);
        tracing::info!(guild_id, count, "Reset guild XP");
        count
    }
}
