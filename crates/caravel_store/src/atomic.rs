//! Atomic JSON document store with serialized writes.
//!
//! Each store owns one on-disk JSON document and one spawned write worker.
//! Commits are enqueued on an unbounded FIFO channel and drained by the
//! worker in call order; each job serializes the document, writes it to a
//! temporary file in the same directory, then renames the temporary file
//! over the target path. The rename is the only step that makes a write
//! visible, so the live file always parses as a complete document.

use caravel_error::{
    CaravelResult, PersistenceError, PersistenceErrorKind, ValidationError, ValidationErrorKind,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};

struct WriteJob<T> {
    document: T,
    done: oneshot::Sender<CaravelResult<()>>,
}

/// A handle to one enqueued commit.
///
/// Awaiting [`CommitTicket::wait`] resolves once that document version has
/// been durably renamed into place, or rejects with the persistence error
/// that sank the job. Dropping the ticket makes the commit fire-and-forget:
/// the write still happens (failures are logged by the worker), the caller
/// just stops watching.
pub struct CommitTicket {
    receiver: oneshot::Receiver<CaravelResult<()>>,
}

impl CommitTicket {
    /// Wait for the commit to become durable.
    ///
    /// # Errors
    ///
    /// Returns the `PersistenceError` for the failed write, or `QueueClosed`
    /// if the store's worker stopped before handling the job.
    pub async fn wait(self) -> CaravelResult<()> {
        match self.receiver.await {
            Ok(outcome) => outcome,
            Err(_) => Err(PersistenceError::new(PersistenceErrorKind::QueueClosed(
                "write worker stopped before completing the commit".to_string(),
            ))
            .into()),
        }
    }
}

/// Typed JSON document store with atomic, strictly ordered commits.
///
/// One store owns one file. `commit` calls for the same store execute in
/// call order; a second commit never races ahead of or interleaves with the
/// first. Concurrent callers that read, mutate, and commit stale base
/// documents are not reconciled here: the last enqueued commit wins whole,
/// and field-level merging is the calling component's job.
///
/// # Example
///
/// ```rust,ignore
/// let store: AtomicStore<XpDocument> = AtomicStore::open("data/xp.json").await?;
/// let mut doc = store.load().await?;
/// doc.touch();
/// store.commit(doc).wait().await?;
/// ```
pub struct AtomicStore<T> {
    path: PathBuf,
    sender: mpsc::UnboundedSender<WriteJob<T>>,
}

impl<T> AtomicStore<T>
where
    T: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static,
{
    /// Open a store and spawn its write worker.
    ///
    /// Creates the parent directory if it doesn't exist. The file itself is
    /// created lazily by the first `load` or `commit`.
    ///
    /// # Errors
    ///
    /// Returns error if the parent directory cannot be created.
    #[tracing::instrument(skip(path))]
    pub async fn open(path: impl Into<PathBuf>) -> CaravelResult<Self> {
        let path = path.into();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                PersistenceError::new(PersistenceErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(write_worker(path.clone(), receiver));

        tracing::info!(path = %path.display(), "Opened atomic store");
        Ok(Self { path, sender })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the backing file into a fresh, typed document.
    ///
    /// A missing file is first use: the default document is committed and
    /// returned. The returned value is always freshly deserialized, never a
    /// shared reference to live state.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the file exists but does not parse into
    /// `T` (the shape check happens here at the boundary, not deep inside
    /// business logic), or `PersistenceError` on I/O failure.
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> CaravelResult<T> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                ValidationError::new(ValidationErrorKind::DocumentShape(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
                .into()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "Store file absent, seeding default document");
                let document = T::default();
                self.commit(document.clone()).wait().await?;
                Ok(document)
            }
            Err(e) => Err(PersistenceError::new(PersistenceErrorKind::FileRead(
                format!("{}: {}", self.path.display(), e),
            ))
            .into()),
        }
    }

    /// Read the backing file as untyped JSON.
    ///
    /// Used by migrations to inspect legacy document shapes before the typed
    /// parse would reject them. A missing file yields the default document's
    /// JSON form.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the file is not valid JSON, or
    /// `PersistenceError` on I/O failure.
    pub async fn load_raw(&self) -> CaravelResult<serde_json::Value> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                ValidationError::new(ValidationErrorKind::DocumentShape(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
                .into()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                serde_json::to_value(T::default()).map_err(|e| {
                    PersistenceError::new(PersistenceErrorKind::Serialize(e.to_string())).into()
                })
            }
            Err(e) => Err(PersistenceError::new(PersistenceErrorKind::FileRead(
                format!("{}: {}", self.path.display(), e),
            ))
            .into()),
        }
    }

    /// Enqueue a durable write of `document`.
    ///
    /// Jobs execute strictly in call order. A failed job is logged by the
    /// worker and the queue continues with the next one; only the returned
    /// ticket observes the failure.
    pub fn commit(&self, document: T) -> CommitTicket {
        let (done, receiver) = oneshot::channel();
        if self.sender.send(WriteJob { document, done }).is_err() {
            // Worker already gone; the dropped sender rejects the ticket.
            tracing::warn!(path = %self.path.display(), "Commit after write worker shutdown");
        }
        CommitTicket { receiver }
    }
}

// The worker borrows each job's document across its file writes, so the
// future is only `Send` when `T: Sync`.
async fn write_worker<T: Serialize + Send + Sync + 'static>(
    path: PathBuf,
    mut receiver: mpsc::UnboundedReceiver<WriteJob<T>>,
) {
    let temp_path = path.with_extension("tmp");

    while let Some(job) = receiver.recv().await {
        let outcome = write_document(&path, &temp_path, &job.document).await;
        if let Err(e) = &outcome {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "Commit failed, continuing with next queued job"
            );
        }
        // Receiver may have been dropped (fire-and-forget commit).
        let _ = job.done.send(outcome);
    }

    tracing::debug!(path = %path.display(), "Write worker drained, shutting down");
}

async fn write_document<T: Serialize>(
    path: &Path,
    temp_path: &Path,
    document: &T,
) -> CaravelResult<()> {
    let bytes = serde_json::to_vec_pretty(document)
        .map_err(|e| PersistenceError::new(PersistenceErrorKind::Serialize(e.to_string())))?;

    tokio::fs::write(temp_path, &bytes).await.map_err(|e| {
        PersistenceError::new(PersistenceErrorKind::TempWrite(format!(
            "{}: {}",
            temp_path.display(),
            e
        )))
    })?;

    tokio::fs::rename(temp_path, path).await.map_err(|e| {
        PersistenceError::new(PersistenceErrorKind::Rename(format!(
            "{} -> {}: {}",
            temp_path.display(),
            path.display(),
            e
        )))
    })?;

    tracing::debug!(
        path = %path.display(),
        size = bytes.len(),
        "Committed document"
    );
    Ok(())
}
