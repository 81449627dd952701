//! Persisted migration bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Completion record for one migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_new::new)]
pub struct MigrationRecord {
    /// When the migration finished.
    pub completed_at: DateTime<Utc>,
    /// The result payload the migration function returned.
    pub result: serde_json::Value,
}

/// The global migration status document.
///
/// `version` is the id of the last completed migration and only ever
/// increases during normal operation; an operator `reset` is the single,
/// loudly logged exception.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationStatus {
    /// Id of the last completed migration; 0 means none have run.
    #[serde(default)]
    pub version: u32,
    /// Completion records, keyed by migration id.
    #[serde(default)]
    pub migrations: BTreeMap<String, MigrationRecord>,
    /// When the runner last executed anything.
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
}
