//! Caravel: persistent guild-state core for a chat bot.
//!
//! Caravel is the subsystem a bot's command handlers, event handlers, and
//! dashboard routes call into for durable per-guild state: an atomic JSON
//! document store, a cooperative lock manager, a versioned migration runner,
//! and the XP/leveling engine built on top of them.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use caravel::{
//!     AtomicStore, BirthdayDocument, LockManager, MigrationContext,
//!     MigrationRunner, XpDocument, XpEngine,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     caravel::init_telemetry()?;
//!
//!     // Migrations first; a failure here must halt startup.
//!     let status_store = AtomicStore::open("data/migration-status.json").await?;
//!     let birthday_store: AtomicStore<BirthdayDocument> =
//!         AtomicStore::open("data/birthdays.json").await?;
//!     let runner = MigrationRunner::new(status_store);
//!     runner
//!         .run(&MigrationContext::new(known_guild_ids(), birthday_store))
//!         .await?;
//!
//!     let xp_store: AtomicStore<XpDocument> = AtomicStore::open("data/xp.json").await?;
//!     let engine = XpEngine::new(xp_store, LockManager::new()).await?;
//!
//!     let result = engine
//!         .award_message_xp("guild", "user", "display-name", "channel", &[])
//!         .await;
//!     println!("awarded: {result:?}");
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! Caravel is organized as a workspace with focused crates:
//!
//! - `caravel_error` - Error types
//! - `caravel_store` - Atomic document store and lock manager
//! - `caravel_birthdays` - Birthday domain store
//! - `caravel_xp` - XP/leveling engine
//! - `caravel_migrate` - Versioned data migrations
//!
//! This crate (`caravel`) re-exports everything for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod telemetry;

pub use telemetry::init_telemetry;

pub use caravel_error::{
    CaravelError, CaravelErrorKind, CaravelResult, MigrationError, MigrationErrorKind,
    PersistenceError, PersistenceErrorKind, StateConflictError, StateConflictErrorKind,
    ValidationError, ValidationErrorKind,
};

pub use caravel_store::{
    AtomicStore, CommitTicket, LockGuard, LockManager, LockStats, validate_key,
};

pub use caravel_birthdays::{Birthday, BirthdayDocument, BirthdayStore};

pub use caravel_xp::{
    AwardResult, GuildXpConfig, GuildXpConfigUpdate, GuildXpData, LeaderboardEntry, LevelRole,
    UserXpRecord, XpDocument, XpEngine, level_for_xp, xp_required_for_level,
};

pub use caravel_migrate::{
    AppliedMigration, CURRENT_VERSION, FlattenBirthdays, Migration, MigrationContext,
    MigrationRecord, MigrationReport, MigrationRunner, MigrationState, MigrationStatus,
    ReserveSchemaSlot, RunOutcome,
};
