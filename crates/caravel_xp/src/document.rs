//! On-disk document shape for the XP store.

use crate::config::GuildXpConfig;
use crate::record::UserXpRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One guild's slice of the XP document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuildXpData {
    /// Guild configuration.
    #[serde(default)]
    pub config: GuildXpConfig,
    /// Per-user progression records, keyed by user id.
    #[serde(default)]
    pub users: BTreeMap<String, UserXpRecord>,
}

/// The whole XP store document: every guild, keyed by guild id.
///
/// Serializes transparently as `{guild_id: {config, users}}`, the shape the
/// legacy deployment wrote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct XpDocument {
    /// All guilds.
    pub guilds: BTreeMap<String, GuildXpData>,
}

impl XpDocument {
    /// Guild entry, created with defaults on first access.
    pub fn guild_mut(&mut self, guild_id: &str) -> &mut GuildXpData {
        self.guilds.entry(guild_id.to_string()).or_default()
    }

    /// Guild entry, if it exists.
    pub fn guild(&self, guild_id: &str) -> Option<&GuildXpData> {
        self.guilds.get(guild_id)
    }
}
