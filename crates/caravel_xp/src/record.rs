//! Per-user progression records and award results.

use crate::level::level_for_xp;
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// One user's progression within one guild.
///
/// `level` is always derived from `total_xp`; it is recomputed after every
/// mutation and never settable on its own. `username` is the last-observed
/// display name, not identity; the user id keys the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct UserXpRecord {
    /// XP accumulated since the record was created or last reset.
    #[serde(default)]
    current_level_xp: u64,
    /// Lifetime XP; monotonically non-decreasing outside resets.
    #[serde(default)]
    total_xp: u64,
    /// Derived level, `floor(sqrt(total_xp / 100)) + 1`.
    #[serde(default = "default_level")]
    level: u32,
    /// Timestamp of the most recent XP gain, for cooldown gating.
    #[serde(default)]
    last_xp_gain_at: Option<DateTime<Utc>>,
    /// Messages that earned XP.
    #[serde(default)]
    message_count: u64,
    /// Last-observed display name.
    #[serde(default)]
    username: String,
}

fn default_level() -> u32 {
    1
}

impl UserXpRecord {
    /// A fresh record for `username` at level 1 with no XP.
    pub fn fresh(username: impl Into<String>) -> Self {
        Self {
            current_level_xp: 0,
            total_xp: 0,
            level: 1,
            last_xp_gain_at: None,
            message_count: 0,
            username: username.into(),
        }
    }

    /// Update the stored display name.
    pub(crate) fn observe_username(&mut self, username: &str) -> bool {
        if self.username != username {
            self.username = username.to_string();
            return true;
        }
        false
    }

    /// Whether the cooldown window is still open at `now`.
    pub(crate) fn in_cooldown(&self, cooldown_seconds: u64, now: DateTime<Utc>) -> bool {
        match self.last_xp_gain_at {
            Some(last) => {
                let elapsed = now.signed_duration_since(last);
                elapsed < chrono::Duration::seconds(cooldown_seconds as i64)
            }
            None => false,
        }
    }

    /// Apply an XP gain, recomputing the derived level.
    ///
    /// Returns `(old_level, new_level)`.
    pub(crate) fn apply_gain(&mut self, xp: u64, now: DateTime<Utc>) -> (u32, u32) {
        let old_level = self.level;
        self.total_xp += xp;
        self.current_level_xp += xp;
        self.last_xp_gain_at = Some(now);
        self.level = level_for_xp(self.total_xp);
        (old_level, self.level)
    }

    /// Count one XP-earning message.
    pub(crate) fn count_message(&mut self) {
        self.message_count += 1;
    }
}

/// Outcome of a successful XP award.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AwardResult {
    /// XP granted by this award, after multipliers.
    pub xp_gained: u64,
    /// Lifetime XP after the award.
    pub total_xp: u64,
    /// Current-level XP after the award.
    pub current_xp: u64,
    /// Level after the award.
    pub level: u32,
    /// Whether the award crossed a level boundary.
    pub leveled_up: bool,
    /// Level before the award.
    pub old_level: u32,
    /// Level after the award (equals `level`; kept for callers formatting
    /// "{old} -> {new}" announcements).
    pub new_level: u32,
}
