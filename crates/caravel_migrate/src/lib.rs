//! Versioned, idempotent data migrations for Caravel stores.
//!
//! A migration is a one-time transformation of persisted data, guarded by a
//! monotonic version counter in its own status document. The runner executes
//! every migration above the persisted version in ascending id order and
//! durably records each completion before starting the next, so a crash
//! mid-sequence resumes at the first unrun migration instead of repeating
//! finished ones. A failed migration is fatal: startup must halt rather than
//! serve guild operations on a half-migrated schema.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod migrations;
mod runner;
mod status;

pub use migrations::{FlattenBirthdays, ReserveSchemaSlot};
pub use runner::{
    AppliedMigration, CURRENT_VERSION, Migration, MigrationContext, MigrationReport,
    MigrationRunner, MigrationState, RunOutcome,
};
pub use status::{MigrationRecord, MigrationStatus};
