//! Cooperative FIFO lock manager over string keys.

use derive_getters::Getters;
use std::collections::{HashMap, VecDeque};
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

struct LockEntry {
    acquired_at: Instant,
    waiters: VecDeque<oneshot::Sender<()>>,
}

#[derive(Default)]
struct LockTable {
    entries: HashMap<String, LockEntry>,
}

/// Snapshot of lock-manager occupancy, for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters)]
pub struct LockStats {
    /// Number of keys currently held.
    held: usize,
    /// Total waiters queued across all keys.
    waiting: usize,
}

/// Cooperative mutual exclusion over arbitrary string keys.
///
/// Locks are per-process and in-memory only; they do not survive restart and
/// provide no cross-process guarantee. Waiters for the same key are granted
/// the lock strictly in arrival order, and ownership transfers to the next
/// waiter without a gap: no other caller can slip in between a release and
/// the queued acquire it wakes.
///
/// There is no built-in timeout: `acquire` waits as long as it takes.
/// Callers wanting bounded waits wrap it with their own cancellation.
///
/// # Example
///
/// ```rust,ignore
/// let locks = LockManager::default();
/// locks
///     .with_lock("guild:123", || async {
///         // multi-step critical section
///     })
///     .await;
/// ```
#[derive(Clone, Default)]
pub struct LockManager {
    table: Arc<Mutex<LockTable>>,
}

impl LockManager {
    /// Create an empty lock manager.
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, LockTable> {
        // A panic while holding the table mutex only poisons bookkeeping
        // state that the next operation rewrites anyway.
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Acquire the lock for `key`, suspending until no other holder exists.
    ///
    /// Dropping the returned guard releases the lock and wakes the oldest
    /// waiter.
    pub async fn acquire(&self, key: &str) -> LockGuard {
        let waiter = {
            let mut table = self.table();
            match table.entries.entry(key.to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(LockEntry {
                        acquired_at: Instant::now(),
                        waiters: VecDeque::new(),
                    });
                    None
                }
                Entry::Occupied(mut slot) => {
                    let (grant, granted) = oneshot::channel();
                    slot.get_mut().waiters.push_back(grant);
                    Some(granted)
                }
            }
        };

        if let Some(granted) = waiter {
            tracing::trace!(key, "Queued for lock");
            // The grant sender is dropped without firing only if this waiter
            // was skipped after cancellation, which cannot reach this await.
            let _ = granted.await;
        }

        tracing::trace!(key, "Lock acquired");
        LockGuard {
            table: Arc::clone(&self.table),
            key: key.to_string(),
        }
    }

    /// Run `action` while holding the lock for `key`.
    ///
    /// The lock is released on every exit path, including errors returned
    /// from `action`.
    pub async fn with_lock<F, Fut, R>(&self, key: &str, action: F) -> R
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = R>,
    {
        let _guard = self.acquire(key).await;
        action().await
    }

    /// Keys held longer than `threshold`, sorted, for diagnostics only.
    ///
    /// A stale lock is reported, never force-released; a deadlocked holder
    /// stays deadlocked until its owner resolves it.
    pub fn stale_keys(&self, threshold: Duration) -> Vec<String> {
        let table = self.table();
        let mut stale: Vec<String> = table
            .entries
            .iter()
            .filter(|(_, entry)| entry.acquired_at.elapsed() > threshold)
            .map(|(key, _)| key.clone())
            .collect();
        stale.sort();
        if !stale.is_empty() {
            tracing::warn!(count = stale.len(), "Locks held past staleness threshold");
        }
        stale
    }

    /// Current held-lock and queued-waiter counts.
    pub fn stats(&self) -> LockStats {
        let table = self.table();
        LockStats {
            held: table.entries.len(),
            waiting: table.entries.values().map(|e| e.waiters.len()).sum(),
        }
    }
}

/// Exclusive hold on one key; releasing is dropping.
pub struct LockGuard {
    table: Arc<Mutex<LockTable>>,
    key: String,
}

impl LockGuard {
    /// The key this guard holds.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        let Some(entry) = table.entries.get_mut(&self.key) else {
            return;
        };
        loop {
            match entry.waiters.pop_front() {
                Some(next) => {
                    // Transfer ownership in place so no interloper can grab
                    // the key between release and wakeup.
                    if next.send(()).is_ok() {
                        entry.acquired_at = Instant::now();
                        tracing::trace!(key = %self.key, "Lock handed to next waiter");
                        return;
                    }
                    // Waiter cancelled while queued; try the next in line.
                }
                None => {
                    table.entries.remove(&self.key);
                    tracing::trace!(key = %self.key, "Lock released");
                    return;
                }
            }
        }
    }
}
