//! Birthday store over the atomic document store.

use crate::birthday::{Birthday, BirthdayDocument};
use caravel_error::CaravelResult;
use caravel_store::{AtomicStore, validate_key};
use chrono::{Datelike, NaiveDate};
use tokio::sync::Mutex;

/// Global birthday store, one record per user id.
///
/// Same persistence policy as the XP engine: mutations update the in-memory
/// document and enqueue a best-effort commit; [`BirthdayStore::flush`] waits
/// for durability where it matters.
pub struct BirthdayStore {
    store: AtomicStore<BirthdayDocument>,
    document: Mutex<BirthdayDocument>,
}

impl BirthdayStore {
    /// Load the persisted document and build a store over it.
    ///
    /// # Errors
    ///
    /// Returns error if the store file exists but cannot be read or parsed.
    /// Run the birthday migrations first: a legacy guild-nested file fails
    /// the typed parse here by design.
    #[tracing::instrument(skip(store))]
    pub async fn new(store: AtomicStore<BirthdayDocument>) -> CaravelResult<Self> {
        let document = store.load().await?;
        tracing::info!(users = document.len(), "Loaded birthday document");
        Ok(Self {
            store,
            document: Mutex::new(document),
        })
    }

    /// Set a user's birthday.
    ///
    /// Returns the stored value, or `None` if the user id or calendar values
    /// were rejected (logged no-op).
    #[tracing::instrument(skip(self))]
    pub async fn set(&self, user_id: &str, birthday: Birthday) -> Option<Birthday> {
        if let Err(e) = validate_key("user id", user_id).and_then(|()| birthday.validate()) {
            tracing::warn!(error = %e, "Rejected birthday, operation is a no-op");
            return None;
        }

        let mut document = self.document.lock().await;
        document.insert(user_id.to_string(), birthday.clone());
        drop(self.store.commit(document.clone()));
        Some(birthday)
    }

    /// A user's birthday, if any.
    pub async fn get(&self, user_id: &str) -> Option<Birthday> {
        self.document.lock().await.get(user_id).cloned()
    }

    /// Remove a user's birthday; returns whether one existed.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, user_id: &str) -> bool {
        let mut document = self.document.lock().await;
        let removed = document.remove(user_id).is_some();
        if removed {
            drop(self.store.commit(document.clone()));
        }
        removed
    }

    /// Snapshot of every stored birthday.
    pub async fn all(&self) -> BirthdayDocument {
        self.document.lock().await.clone()
    }

    /// Users whose birthday falls on `date`, for announcement sweeps.
    pub async fn on_date(&self, date: NaiveDate) -> Vec<(String, Birthday)> {
        self.document
            .lock()
            .await
            .iter()
            .filter(|(_, birthday)| {
                u32::from(*birthday.month()) == date.month()
                    && u32::from(*birthday.day()) == date.day()
            })
            .map(|(user_id, birthday)| (user_id.clone(), birthday.clone()))
            .collect()
    }

    /// Commit the current document and wait for it to be durable.
    ///
    /// # Errors
    ///
    /// Returns the persistence error of the flushing commit.
    pub async fn flush(&self) -> CaravelResult<()> {
        let snapshot = self.document.lock().await.clone();
        self.store.commit(snapshot).wait().await
    }
}
