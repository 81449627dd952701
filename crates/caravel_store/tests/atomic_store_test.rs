//! Tests for the atomic document store.

use caravel_store::AtomicStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tempfile::TempDir;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct TestDocument {
    revision: u64,
    entries: BTreeMap<String, String>,
}

#[tokio::test]
async fn test_load_seeds_default_document() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.json");
    let store: AtomicStore<TestDocument> = AtomicStore::open(&path).await.unwrap();

    let document = store.load().await.unwrap();
    assert_eq!(document, TestDocument::default());

    // First use created the file, and it is valid pretty-printed JSON.
    let on_disk = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&on_disk).unwrap();
    assert!(parsed.is_object());
    assert!(on_disk.contains('\n'));
}

#[tokio::test]
async fn test_commit_then_load_round_trips() {
    let temp_dir = TempDir::new().unwrap();
    let store: AtomicStore<TestDocument> =
        AtomicStore::open(temp_dir.path().join("data.json")).await.unwrap();

    let mut document = store.load().await.unwrap();
    document.revision = 7;
    document
        .entries
        .insert("guild".to_string(), "417".to_string());
    store.commit(document.clone()).wait().await.unwrap();

    let reloaded = store.load().await.unwrap();
    assert_eq!(reloaded, document);
}

#[tokio::test]
async fn test_commits_apply_in_call_order() {
    let temp_dir = TempDir::new().unwrap();
    let store: AtomicStore<TestDocument> =
        AtomicStore::open(temp_dir.path().join("data.json")).await.unwrap();

    // Enqueue fifty commits without awaiting any of them; the queue is FIFO,
    // so the last enqueued document must be the one left on disk.
    let mut last = None;
    for revision in 1..=50 {
        let document = TestDocument {
            revision,
            entries: BTreeMap::new(),
        };
        last = Some(store.commit(document));
    }
    last.unwrap().wait().await.unwrap();

    let reloaded = store.load().await.unwrap();
    assert_eq!(reloaded.revision, 50);
}

#[tokio::test]
async fn test_failed_commit_rejects_ticket_but_queue_continues() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.json");
    let store: AtomicStore<TestDocument> = AtomicStore::open(&path).await.unwrap();

    let mut document = store.load().await.unwrap();
    document.revision = 1;
    store.commit(document.clone()).wait().await.unwrap();

    // Sabotage the next write: a directory squatting on the temp path makes
    // the temp-file write fail regardless of process privileges.
    let temp_path = path.with_extension("tmp");
    std::fs::create_dir(&temp_path).unwrap();

    document.revision = 2;
    let failed = store.commit(document.clone()).wait().await;
    assert!(failed.is_err());

    // The original document is untouched: the rename never happened.
    let on_disk: TestDocument =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(on_disk.revision, 1);

    // A single failed commit does not wedge the queue.
    std::fs::remove_dir(&temp_path).unwrap();
    document.revision = 3;
    store.commit(document).wait().await.unwrap();
    assert_eq!(store.load().await.unwrap().revision, 3);
}

#[tokio::test]
async fn test_load_rejects_malformed_document() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.json");
    std::fs::write(&path, b"{ this is not json").unwrap();

    let store: AtomicStore<TestDocument> = AtomicStore::open(&path).await.unwrap();
    let loaded = store.load().await;
    assert!(loaded.is_err());
    let raw = store.load_raw().await;
    assert!(raw.is_err());
}

#[tokio::test]
async fn test_load_raw_exposes_untyped_shape() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.json");
    // A document that does NOT parse as TestDocument but is valid JSON,
    // the situation a migration precondition check inspects.
    std::fs::write(&path, br#"{"legacy": {"nested": true}}"#).unwrap();

    let store: AtomicStore<TestDocument> = AtomicStore::open(&path).await.unwrap();
    assert!(store.load().await.is_err());

    let raw = store.load_raw().await.unwrap();
    assert_eq!(raw["legacy"]["nested"], serde_json::json!(true));
}
