//! Tests for the migration runner.

use caravel_birthdays::BirthdayDocument;
use caravel_error::CaravelResult;
use caravel_migrate::{
    CURRENT_VERSION, Migration, MigrationContext, MigrationRunner, MigrationState,
    MigrationStatus,
};
use caravel_store::AtomicStore;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

async fn status_store(dir: &Path) -> AtomicStore<MigrationStatus> {
    AtomicStore::open(dir.join("migration-status.json")).await.unwrap()
}

async fn context(dir: &Path) -> MigrationContext {
    let birthday_store: AtomicStore<BirthdayDocument> =
        AtomicStore::open(dir.join("birthdays.json")).await.unwrap();
    MigrationContext::new(vec!["g1".to_string(), "g2".to_string()], birthday_store)
}

#[tokio::test]
async fn test_fresh_run_applies_all_then_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let legacy = json!({
        "g1": {"u1": {"month": 6, "day": 15}},
        "g2": {"u2": {"month": 12, "day": 24, "year": 1990}},
    });
    std::fs::write(
        temp_dir.path().join("birthdays.json"),
        serde_json::to_vec_pretty(&legacy).unwrap(),
    )
    .unwrap();

    let runner = MigrationRunner::new(status_store(temp_dir.path()).await);
    let context = context(temp_dir.path()).await;

    let report = runner.check_status().await.unwrap();
    assert_eq!(*report.current_version(), 0);
    assert_eq!(*report.latest_version(), CURRENT_VERSION);
    assert!(*report.needs_migration());
    assert_eq!(
        report.state(),
        MigrationState::Pending { from: 0, to: CURRENT_VERSION }
    );

    let outcome = runner.run(&context).await.unwrap();
    assert!(!outcome.up_to_date);
    let ids: Vec<u32> = outcome.applied.iter().map(|applied| applied.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(outcome.applied[1].result, json!({"noop": true}));

    // The birthday document is flat now.
    let flat: BirthdayDocument = serde_json::from_slice(
        &std::fs::read(temp_dir.path().join("birthdays.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(flat.len(), 2);
    assert!(flat.contains_key("u1"));
    assert!(flat.contains_key("u2"));

    // Second call: no pending work, no side effects.
    let before = std::fs::read(temp_dir.path().join("birthdays.json")).unwrap();
    let second = runner.run(&context).await.unwrap();
    assert!(second.up_to_date);
    assert!(second.applied.is_empty());
    let after = std::fs::read(temp_dir.path().join("birthdays.json")).unwrap();
    assert_eq!(before, after);

    let report = runner.check_status().await.unwrap();
    assert_eq!(*report.current_version(), CURRENT_VERSION);
    assert!(!*report.needs_migration());
    assert_eq!(report.state(), MigrationState::UpToDate);
}

#[tokio::test]
async fn test_mixed_format_aborts_without_mutation() {
    let temp_dir = TempDir::new().unwrap();
    let mixed = json!({
        "u9": {"month": 1, "day": 1},
        "g1": {"u1": {"month": 6, "day": 15}},
    });
    let bytes = serde_json::to_vec_pretty(&mixed).unwrap();
    std::fs::write(temp_dir.path().join("birthdays.json"), &bytes).unwrap();

    let runner = MigrationRunner::new(status_store(temp_dir.path()).await);
    let context = context(temp_dir.path()).await;

    let outcome = runner.run(&context).await;
    assert!(outcome.is_err());

    // Nothing was mutated: not the data, not the version.
    assert_eq!(
        std::fs::read(temp_dir.path().join("birthdays.json")).unwrap(),
        bytes
    );
    let report = runner.check_status().await.unwrap();
    assert_eq!(*report.current_version(), 0);
}

#[tokio::test]
async fn test_duplicate_users_resolve_by_guild_order() {
    let temp_dir = TempDir::new().unwrap();
    let legacy = json!({
        "200": {"u1": {"month": 2, "day": 2}},
        "100": {"u1": {"month": 1, "day": 1}},
    });
    std::fs::write(
        temp_dir.path().join("birthdays.json"),
        serde_json::to_vec_pretty(&legacy).unwrap(),
    )
    .unwrap();

    let runner = MigrationRunner::new(status_store(temp_dir.path()).await);
    let outcome = runner.run(&context(temp_dir.path()).await).await.unwrap();
    assert_eq!(outcome.applied[0].result["overridden"], json!(1));

    // Guild "200" sorts after "100", so its entry wins.
    let flat: BirthdayDocument = serde_json::from_slice(
        &std::fs::read(temp_dir.path().join("birthdays.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(*flat["u1"].month(), 2);
}

struct Recorded {
    id: u32,
    fail: bool,
}

#[async_trait::async_trait]
impl Migration for Recorded {
    fn id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &'static str {
        "recorded"
    }

    async fn run(&self, _context: &MigrationContext) -> CaravelResult<serde_json::Value> {
        if self.fail {
            Err(caravel_error::MigrationError::new(
                caravel_error::MigrationErrorKind::Failed {
                    id: self.id,
                    name: "recorded".to_string(),
                    message: "simulated".to_string(),
                },
            ))?
        } else {
            Ok(json!({"ran": self.id}))
        }
    }
}

#[tokio::test]
async fn test_failure_stops_sequence_and_resume_skips_completed() {
    let temp_dir = TempDir::new().unwrap();
    let context = context(temp_dir.path()).await;

    let failing = MigrationRunner::with_migrations(
        status_store(temp_dir.path()).await,
        vec![
            Box::new(Recorded { id: 1, fail: false }),
            Box::new(Recorded { id: 2, fail: true }),
            Box::new(Recorded { id: 3, fail: false }),
        ],
    );
    assert!(failing.run(&context).await.is_err());

    // Version stuck at the last success.
    let report = failing.check_status().await.unwrap();
    assert_eq!(*report.current_version(), 1);

    // A fixed deployment resumes at migration 2; migration 1 never reruns.
    let fixed = MigrationRunner::with_migrations(
        status_store(temp_dir.path()).await,
        vec![
            Box::new(Recorded { id: 1, fail: false }),
            Box::new(Recorded { id: 2, fail: false }),
            Box::new(Recorded { id: 3, fail: false }),
        ],
    );
    let outcome = fixed.run(&context).await.unwrap();
    let ids: Vec<u32> = outcome.applied.iter().map(|applied| applied.id).collect();
    assert_eq!(ids, vec![2, 3]);
}

#[tokio::test]
async fn test_reset_discards_later_records_and_reruns() {
    let temp_dir = TempDir::new().unwrap();
    let context = context(temp_dir.path()).await;
    let runner = MigrationRunner::new(status_store(temp_dir.path()).await);

    runner.run(&context).await.unwrap();
    assert_eq!(*runner.check_status().await.unwrap().current_version(), 2);

    // Refuses to fabricate completion of unknown migrations.
    assert!(runner.reset(99).await.is_err());

    let status = runner.reset(1).await.unwrap();
    assert_eq!(status.version, 1);
    assert!(status.migrations.contains_key("1"));
    assert!(!status.migrations.contains_key("2"));

    let outcome = runner.run(&context).await.unwrap();
    let ids: Vec<u32> = outcome.applied.iter().map(|applied| applied.id).collect();
    assert_eq!(ids, vec![2]);
}
