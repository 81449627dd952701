//! Tests for the birthday store.

use caravel_birthdays::{Birthday, BirthdayDocument, BirthdayStore};
use caravel_store::AtomicStore;
use chrono::NaiveDate;
use tempfile::TempDir;

async fn store_at(dir: &TempDir) -> BirthdayStore {
    let store: AtomicStore<BirthdayDocument> =
        AtomicStore::open(dir.path().join("birthdays.json")).await.unwrap();
    BirthdayStore::new(store).await.unwrap()
}

#[tokio::test]
async fn test_set_get_remove_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_at(&temp_dir).await;

    let stored = store.set("u1", Birthday::new(6, 15)).await.unwrap();
    assert_eq!(*stored.month(), 6);
    assert_eq!(store.get("u1").await, Some(stored));

    assert!(store.remove("u1").await);
    assert!(!store.remove("u1").await);
    assert!(store.get("u1").await.is_none());
}

#[tokio::test]
async fn test_invalid_birthday_is_noop() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_at(&temp_dir).await;

    assert!(store.set("u1", Birthday::new(13, 1)).await.is_none());
    assert!(store.set("u1", Birthday::new(6, 0)).await.is_none());
    assert!(store.set("__proto__", Birthday::new(6, 15)).await.is_none());
    assert!(store.all().await.is_empty());
}

#[tokio::test]
async fn test_on_date_matches_month_and_day() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_at(&temp_dir).await;

    store.set("u1", Birthday::new(6, 15)).await.unwrap();
    store.set("u2", Birthday::new(6, 15)).await.unwrap();
    store.set("u3", Birthday::new(12, 24)).await.unwrap();

    let date = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
    let celebrants = store.on_date(date).await;
    let ids: Vec<&str> = celebrants.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["u1", "u2"]);
}

#[tokio::test]
async fn test_state_survives_restart_after_flush() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = store_at(&temp_dir).await;
        store.set("u1", Birthday::new(3, 3)).await.unwrap();
        store.flush().await.unwrap();
    }

    let reopened = store_at(&temp_dir).await;
    assert_eq!(reopened.get("u1").await, Some(Birthday::new(3, 3)));
}
