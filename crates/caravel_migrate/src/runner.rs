//! Migration runner.

use crate::migrations::{FlattenBirthdays, ReserveSchemaSlot};
use crate::status::{MigrationRecord, MigrationStatus};
use caravel_birthdays::BirthdayDocument;
use caravel_error::{CaravelResult, MigrationError, MigrationErrorKind};
use caravel_store::AtomicStore;
use chrono::Utc;
use derive_getters::Getters;

/// Schema version this build of the runner brings data up to.
pub const CURRENT_VERSION: u32 = 2;

/// Runner lifecycle, used for logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum MigrationState {
    /// Persisted version matches the latest known migration.
    #[display("up to date")]
    UpToDate,
    /// Migrations from `from` (exclusive) to `to` (inclusive) must run.
    #[display("pending {from} -> {to}")]
    Pending {
        /// Persisted version.
        from: u32,
        /// Latest known migration id.
        to: u32,
    },
    /// The named migration is currently executing.
    #[display("running migration {_0}")]
    Running(u32),
    /// The named migration failed; the sequence stopped there.
    #[display("failed at migration {_0}")]
    Failed(u32),
}

/// Read-only answer to "does anything need to run?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters)]
pub struct MigrationReport {
    /// Persisted schema version.
    current_version: u32,
    /// Highest migration id this runner knows.
    latest_version: u32,
    /// Whether `run` would execute anything.
    needs_migration: bool,
}

impl MigrationReport {
    /// The lifecycle state this report describes.
    pub fn state(&self) -> MigrationState {
        if self.needs_migration {
            MigrationState::Pending {
                from: self.current_version,
                to: self.latest_version,
            }
        } else {
            MigrationState::UpToDate
        }
    }
}

/// Caller-supplied inputs a migration may need.
///
/// The core never discovers guilds or stores on its own; whoever invokes the
/// runner provides them.
#[derive(derive_new::new)]
pub struct MigrationContext {
    /// Guild ids known to the caller at startup.
    pub guild_ids: Vec<String>,
    /// The birthdays store, target of the flattening migration.
    pub birthday_store: AtomicStore<BirthdayDocument>,
}

/// A one-time, versioned, idempotent transformation of persisted data.
#[async_trait::async_trait]
pub trait Migration: Send + Sync {
    /// Monotonic id; migrations run in ascending id order.
    fn id(&self) -> u32;
    /// Stable human-readable name, used as the status-record key context.
    fn name(&self) -> &'static str;
    /// Perform the transformation and return a result payload for the
    /// completion record.
    async fn run(&self, context: &MigrationContext) -> CaravelResult<serde_json::Value>;
}

/// One migration the runner completed during a [`MigrationRunner::run`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedMigration {
    /// Migration id.
    pub id: u32,
    /// Migration name.
    pub name: &'static str,
    /// Result payload.
    pub result: serde_json::Value,
}

/// Outcome of a [`MigrationRunner::run`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// True when nothing was pending and the call had no side effects.
    pub up_to_date: bool,
    /// Migrations completed by this call, in execution order.
    pub applied: Vec<AppliedMigration>,
}

/// Executes pending migrations against their own status document.
///
/// After each individual migration succeeds, the bumped version and its
/// completion record are committed and awaited before the next migration
/// starts; a crash mid-sequence therefore resumes at the first unrun
/// migration. A migration failure propagates and is fatal to the caller.
pub struct MigrationRunner {
    status_store: AtomicStore<MigrationStatus>,
    migrations: Vec<Box<dyn Migration>>,
}

impl MigrationRunner {
    /// Runner with the shipped migration set.
    pub fn new(status_store: AtomicStore<MigrationStatus>) -> Self {
        Self::with_migrations(
            status_store,
            vec![Box::new(FlattenBirthdays), Box::new(ReserveSchemaSlot)],
        )
    }

    /// Runner with an explicit migration set; ids must be unique.
    pub fn with_migrations(
        status_store: AtomicStore<MigrationStatus>,
        mut migrations: Vec<Box<dyn Migration>>,
    ) -> Self {
        migrations.sort_by_key(|migration| migration.id());
        Self {
            status_store,
            migrations,
        }
    }

    /// Highest migration id this runner knows.
    pub fn latest_version(&self) -> u32 {
        self.migrations
            .iter()
            .map(|migration| migration.id())
            .max()
            .unwrap_or(0)
    }

    async fn load_status(&self) -> CaravelResult<MigrationStatus> {
        self.status_store.load().await.map_err(|e| {
            MigrationError::new(MigrationErrorKind::StatusUnavailable(e.to_string())).into()
        })
    }

    /// Compare the persisted version against the latest known migration.
    ///
    /// Read-only; never mutates anything.
    ///
    /// # Errors
    ///
    /// Returns error if the status document cannot be loaded.
    #[tracing::instrument(skip(self))]
    pub async fn check_status(&self) -> CaravelResult<MigrationReport> {
        let status = self.load_status().await?;
        let latest = self.latest_version();
        Ok(MigrationReport {
            current_version: status.version,
            latest_version: latest,
            needs_migration: status.version < latest,
        })
    }

    /// Execute every migration above the persisted version, ascending.
    ///
    /// # Errors
    ///
    /// Propagates the first migration failure, leaving the persisted version
    /// at the last success. The caller's startup sequence must treat that as
    /// fatal: continuing on a partially migrated schema is unsafe.
    #[tracing::instrument(skip(self, context), fields(guilds = context.guild_ids.len()))]
    pub async fn run(&self, context: &MigrationContext) -> CaravelResult<RunOutcome> {
        let mut status = self.load_status().await?;
        let pending: Vec<&dyn Migration> = self
            .migrations
            .iter()
            .filter(|migration| migration.id() > status.version)
            .map(|migration| migration.as_ref())
            .collect();

        if pending.is_empty() {
            tracing::info!(version = status.version, "Migrations {}", MigrationState::UpToDate);
            return Ok(RunOutcome {
                up_to_date: true,
                applied: Vec::new(),
            });
        }

        let mut applied = Vec::new();
        for migration in pending {
            let id = migration.id();
            tracing::info!(id, name = migration.name(), "Migration {}", MigrationState::Running(id));

            let result = migration.run(context).await.map_err(|e| {
                tracing::error!(id, error = %e, "Migration {}", MigrationState::Failed(id));
                MigrationError::new(MigrationErrorKind::Failed {
                    id,
                    name: migration.name().to_string(),
                    message: e.to_string(),
                })
            })?;

            let now = Utc::now();
            status.version = id;
            status
                .migrations
                .insert(id.to_string(), MigrationRecord::new(now, result.clone()));
            status.last_run = Some(now);

            // Durable before the next migration starts, so a crash here
            // resumes after this migration rather than repeating it.
            self.status_store.commit(status.clone()).wait().await?;

            tracing::info!(id, name = migration.name(), "Migration complete");
            applied.push(AppliedMigration {
                id,
                name: migration.name(),
                result,
            });
        }

        Ok(RunOutcome {
            up_to_date: false,
            applied,
        })
    }

    /// Force the persisted version back to `version`. Operators only.
    ///
    /// Destructive: completion records above `version` are discarded and
    /// those migrations will run again.
    ///
    /// # Errors
    ///
    /// Refuses a version above the latest known migration; also fails if the
    /// status document cannot be loaded or committed.
    #[tracing::instrument(skip(self))]
    pub async fn reset(&self, version: u32) -> CaravelResult<MigrationStatus> {
        let latest = self.latest_version();
        if version > latest {
            return Err(MigrationError::new(MigrationErrorKind::VersionRegression {
                requested: version,
                latest,
            })
            .into());
        }

        let mut status = self.load_status().await?;
        tracing::warn!(
            from = status.version,
            to = version,
            "Operator reset of migration version; later migrations will run again"
        );

        status.version = version;
        status
            .migrations
            .retain(|id, _| id.parse::<u32>().is_ok_and(|id| id <= version));
        self.status_store.commit(status.clone()).wait().await?;
        Ok(status)
    }
}
