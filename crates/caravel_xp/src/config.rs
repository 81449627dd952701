//! Per-guild XP configuration and its merge rules.

use caravel_error::{CaravelResult, ValidationError, ValidationErrorKind};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A role reward granted once a user's level reaches `level`.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_new::new,
)]
pub struct LevelRole {
    /// Level threshold at which the reward applies.
    level: u32,
    /// Role granted at and above the threshold.
    role_id: String,
}

fn default_enabled() -> bool {
    true
}

fn default_min_xp_per_message() -> u32 {
    15
}

fn default_max_xp_per_message() -> u32 {
    25
}

fn default_xp_per_command() -> u32 {
    5
}

fn default_cooldown_seconds() -> u64 {
    60
}

fn default_level_up_message_template() -> String {
    "Congratulations {user}, you reached level {level}!".to_string()
}

fn default_announce_level_up() -> bool {
    true
}

/// Per-guild XP configuration.
///
/// Fields are private; callers read through getters and mutate through
/// [`GuildXpConfig::merged`] or the dedicated setters, so the business rules
/// (min ≤ max, multiplier 1.0 never persisted, `level_roles` sorted
/// ascending) are enforced in one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct GuildXpConfig {
    /// Whether the XP system is active for this guild.
    #[serde(default = "default_enabled")]
    enabled: bool,
    /// Lower bound of the per-message XP draw.
    #[serde(default = "default_min_xp_per_message")]
    min_xp_per_message: u32,
    /// Upper bound of the per-message XP draw.
    #[serde(default = "default_max_xp_per_message")]
    max_xp_per_message: u32,
    /// Fixed XP granted per command invocation.
    #[serde(default = "default_xp_per_command")]
    xp_per_command: u32,
    /// Minimum seconds between message XP gains for one user.
    #[serde(default = "default_cooldown_seconds")]
    cooldown_seconds: u64,
    /// Channel for level-up announcements; the source channel when absent.
    #[serde(default)]
    level_up_channel_id: Option<String>,
    /// Announcement template; `{user}` and `{level}` are substituted.
    #[serde(default = "default_level_up_message_template")]
    level_up_message_template: String,
    /// Whether level-ups are announced at all.
    #[serde(default = "default_announce_level_up")]
    announce_level_up: bool,
    /// Role rewards, kept sorted ascending by level, unique per level.
    #[serde(default)]
    level_roles: Vec<LevelRole>,
    /// Per-channel XP multipliers; an entry of exactly 1.0 is never stored.
    #[serde(default)]
    channel_multipliers: BTreeMap<String, f64>,
    /// Per-role XP multipliers; an entry of exactly 1.0 is never stored.
    #[serde(default)]
    role_multipliers: BTreeMap<String, f64>,
    /// Channels where XP can be gained; empty means all channels.
    #[serde(default)]
    xp_gain_channels: BTreeSet<String>,
    /// Channels where XP is never gained.
    #[serde(default)]
    no_xp_channels: BTreeSet<String>,
    /// Roles whose holders never gain XP.
    #[serde(default)]
    no_xp_roles: BTreeSet<String>,
}

impl Default for GuildXpConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            min_xp_per_message: default_min_xp_per_message(),
            max_xp_per_message: default_max_xp_per_message(),
            xp_per_command: default_xp_per_command(),
            cooldown_seconds: default_cooldown_seconds(),
            level_up_channel_id: None,
            level_up_message_template: default_level_up_message_template(),
            announce_level_up: default_announce_level_up(),
            level_roles: Vec::new(),
            channel_multipliers: BTreeMap::new(),
            role_multipliers: BTreeMap::new(),
            xp_gain_channels: BTreeSet::new(),
            no_xp_channels: BTreeSet::new(),
            no_xp_roles: BTreeSet::new(),
        }
    }
}

/// Partial configuration update; `None` fields keep their current value.
///
/// # Example
///
/// ```
/// use caravel_xp::GuildXpConfigUpdate;
///
/// let update = GuildXpConfigUpdate::default()
///     .with_cooldown_seconds(0)
///     .with_min_xp_per_message(10)
///     .with_max_xp_per_message(10);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, derive_setters::Setters)]
#[setters(prefix = "with_", strip_option)]
pub struct GuildXpConfigUpdate {
    /// New enabled flag.
    pub enabled: Option<bool>,
    /// New per-message draw lower bound.
    pub min_xp_per_message: Option<u32>,
    /// New per-message draw upper bound.
    pub max_xp_per_message: Option<u32>,
    /// New per-command XP amount.
    pub xp_per_command: Option<u32>,
    /// New cooldown window.
    pub cooldown_seconds: Option<u64>,
    /// New announcement channel (`Some(None)` clears it).
    pub level_up_channel_id: Option<Option<String>>,
    /// New announcement template.
    pub level_up_message_template: Option<String>,
    /// New announcement flag.
    pub announce_level_up: Option<bool>,
    /// Replacement role-reward list; re-sorted and deduplicated on merge.
    pub level_roles: Option<Vec<LevelRole>>,
    /// Replacement channel multipliers; 1.0 entries are stripped on merge.
    pub channel_multipliers: Option<BTreeMap<String, f64>>,
    /// Replacement role multipliers; 1.0 entries are stripped on merge.
    pub role_multipliers: Option<BTreeMap<String, f64>>,
    /// Replacement XP allow-list.
    pub xp_gain_channels: Option<BTreeSet<String>>,
    /// Replacement blocked-channel set.
    pub no_xp_channels: Option<BTreeSet<String>>,
    /// Replacement blocked-role set.
    pub no_xp_roles: Option<BTreeSet<String>>,
}

impl GuildXpConfig {
    /// Shallow-merge `update` onto this config, returning the merged result.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the merged bounds would violate
    /// `min_xp_per_message <= max_xp_per_message` or a supplied multiplier is
    /// negative; the existing config is untouched in that case.
    pub fn merged(&self, update: GuildXpConfigUpdate) -> CaravelResult<GuildXpConfig> {
        let mut next = self.clone();

        if let Some(enabled) = update.enabled {
            next.enabled = enabled;
        }
        if let Some(min) = update.min_xp_per_message {
            next.min_xp_per_message = min;
        }
        if let Some(max) = update.max_xp_per_message {
            next.max_xp_per_message = max;
        }
        if let Some(amount) = update.xp_per_command {
            next.xp_per_command = amount;
        }
        if let Some(cooldown) = update.cooldown_seconds {
            next.cooldown_seconds = cooldown;
        }
        if let Some(channel) = update.level_up_channel_id {
            next.level_up_channel_id = channel;
        }
        if let Some(template) = update.level_up_message_template {
            next.level_up_message_template = template;
        }
        if let Some(announce) = update.announce_level_up {
            next.announce_level_up = announce;
        }
        if let Some(roles) = update.level_roles {
            next.level_roles = roles;
        }
        if let Some(multipliers) = update.channel_multipliers {
            next.channel_multipliers = normalized_multipliers("channel", multipliers)?;
        }
        if let Some(multipliers) = update.role_multipliers {
            next.role_multipliers = normalized_multipliers("role", multipliers)?;
        }
        if let Some(channels) = update.xp_gain_channels {
            next.xp_gain_channels = channels;
        }
        if let Some(channels) = update.no_xp_channels {
            next.no_xp_channels = channels;
        }
        if let Some(roles) = update.no_xp_roles {
            next.no_xp_roles = roles;
        }

        if next.min_xp_per_message > next.max_xp_per_message {
            return Err(ValidationError::new(ValidationErrorKind::InvalidRange(format!(
                "min XP per message {} exceeds max {}",
                next.min_xp_per_message, next.max_xp_per_message
            )))
            .into());
        }

        next.normalize_level_roles();
        Ok(next)
    }

    /// Insert or replace the reward for `level`, keeping the list sorted.
    pub fn set_level_role(&mut self, level: u32, role_id: String) {
        self.level_roles.retain(|role| *role.level() != level);
        self.level_roles.push(LevelRole::new(level, role_id));
        self.normalize_level_roles();
    }

    /// Remove the reward for `level`; returns whether one existed.
    pub fn remove_level_role(&mut self, level: u32) -> bool {
        let before = self.level_roles.len();
        self.level_roles.retain(|role| *role.level() != level);
        self.level_roles.len() != before
    }

    /// Every reward whose threshold is at or below `level`, ascending.
    ///
    /// A user reaching level 10 receives every reward up to and including
    /// level 10, not only an exact match.
    pub fn roles_for_level(&self, level: u32) -> Vec<String> {
        self.level_roles
            .iter()
            .filter(|role| *role.level() <= level)
            .map(|role| role.role_id().clone())
            .collect()
    }

    /// Set the XP multiplier for `channel_id`.
    ///
    /// A multiplier of exactly 1.0 removes the entry; storing a no-op
    /// multiplier and storing nothing are the same state.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a negative multiplier.
    pub fn set_channel_multiplier(&mut self, channel_id: String, multiplier: f64) -> CaravelResult<()> {
        set_multiplier(&mut self.channel_multipliers, channel_id, multiplier)
    }

    /// Set the XP multiplier for `role_id`; same rules as channels.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a negative multiplier.
    pub fn set_role_multiplier(&mut self, role_id: String, multiplier: f64) -> CaravelResult<()> {
        set_multiplier(&mut self.role_multipliers, role_id, multiplier)
    }

    fn normalize_level_roles(&mut self) {
        self.level_roles.sort_by_key(|role| *role.level());
        self.level_roles.dedup_by_key(|role| *role.level());
    }
}

fn set_multiplier(
    multipliers: &mut BTreeMap<String, f64>,
    key: String,
    multiplier: f64,
) -> CaravelResult<()> {
    if multiplier < 0.0 || !multiplier.is_finite() {
        return Err(ValidationError::new(ValidationErrorKind::NegativeMultiplier(
            key, multiplier,
        ))
        .into());
    }
    if multiplier == 1.0 {
        multipliers.remove(&key);
    } else {
        multipliers.insert(key, multiplier);
    }
    Ok(())
}

fn normalized_multipliers(
    scope: &str,
    multipliers: BTreeMap<String, f64>,
) -> CaravelResult<BTreeMap<String, f64>> {
    let mut normalized = BTreeMap::new();
    for (key, multiplier) in multipliers {
        if multiplier < 0.0 || !multiplier.is_finite() {
            return Err(ValidationError::new(ValidationErrorKind::NegativeMultiplier(
                format!("{scope} {key}"),
                multiplier,
            ))
            .into());
        }
        if multiplier != 1.0 {
            normalized.insert(key, multiplier);
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overrides_only_supplied_fields() {
        let config = GuildXpConfig::default();
        let merged = config
            .merged(
                GuildXpConfigUpdate::default()
                    .with_cooldown_seconds(0)
                    .with_min_xp_per_message(10)
                    .with_max_xp_per_message(10),
            )
            .unwrap();

        assert_eq!(*merged.cooldown_seconds(), 0);
        assert_eq!(*merged.min_xp_per_message(), 10);
        assert_eq!(*merged.max_xp_per_message(), 10);
        assert_eq!(*merged.enabled(), *config.enabled());
        assert_eq!(merged.level_up_message_template(), config.level_up_message_template());
    }

    #[test]
    fn merge_rejects_inverted_bounds() {
        let config = GuildXpConfig::default();
        let result = config.merged(
            GuildXpConfigUpdate::default()
                .with_min_xp_per_message(50)
                .with_max_xp_per_message(10),
        );
        assert!(result.is_err());
    }

    #[test]
    fn merge_strips_identity_multipliers() {
        let mut multipliers = BTreeMap::new();
        multipliers.insert("chan-a".to_string(), 2.0);
        multipliers.insert("chan-b".to_string(), 1.0);

        let merged = GuildXpConfig::default()
            .merged(GuildXpConfigUpdate::default().with_channel_multipliers(multipliers))
            .unwrap();

        assert_eq!(merged.channel_multipliers().get("chan-a"), Some(&2.0));
        assert!(!merged.channel_multipliers().contains_key("chan-b"));
    }

    #[test]
    fn multiplier_of_one_removes_entry() {
        let mut config = GuildXpConfig::default();
        config.set_role_multiplier("role-1".to_string(), 2.0).unwrap();
        assert_eq!(config.role_multipliers().get("role-1"), Some(&2.0));

        config.set_role_multiplier("role-1".to_string(), 1.0).unwrap();
        assert!(config.role_multipliers().is_empty());
    }

    #[test]
    fn negative_multiplier_is_rejected() {
        let mut config = GuildXpConfig::default();
        assert!(config.set_channel_multiplier("chan".to_string(), -0.5).is_err());
        assert!(config.channel_multipliers().is_empty());
    }

    #[test]
    fn level_roles_stay_sorted_and_unique() {
        let mut config = GuildXpConfig::default();
        config.set_level_role(10, "role-ten".to_string());
        config.set_level_role(5, "role-five".to_string());
        config.set_level_role(10, "role-ten-replaced".to_string());

        let levels: Vec<u32> = config.level_roles().iter().map(|r| *r.level()).collect();
        assert_eq!(levels, vec![5, 10]);
        assert_eq!(config.level_roles()[1].role_id(), "role-ten-replaced");
    }

    #[test]
    fn roles_for_level_is_cumulative() {
        let mut config = GuildXpConfig::default();
        config.set_level_role(5, "five".to_string());
        config.set_level_role(10, "ten".to_string());
        config.set_level_role(20, "twenty".to_string());

        assert_eq!(config.roles_for_level(10), vec!["five", "ten"]);
        assert!(config.roles_for_level(4).is_empty());
    }
}
