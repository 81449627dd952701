//! XP and leveling engine for Caravel guilds.
//!
//! Tracks per-guild configuration and per-user progression on top of
//! [`caravel_store::AtomicStore`]. Message and command awards run through a
//! gating pipeline (enabled flag, blocked roles/channels, allow-list,
//! cooldown), stack channel and role multipliers multiplicatively, and keep
//! the derived level in lock-step with total XP via a fixed formula.
//!
//! Persistence is best-effort by design: every mutation updates the
//! in-memory document and enqueues a commit without waiting for it, so a
//! slow or failing disk never delays a chat response. Call
//! [`XpEngine::flush`] where durability matters (shutdown, tests).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod document;
mod engine;
mod level;
mod record;

pub use config::{GuildXpConfig, GuildXpConfigUpdate, LevelRole};
pub use document::{GuildXpData, XpDocument};
pub use engine::{LeaderboardEntry, XpEngine};
pub use level::{level_for_xp, xp_required_for_level};
pub use record::{AwardResult, UserXpRecord};
