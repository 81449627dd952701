//! Persistence and mutual-exclusion primitives for the Caravel guild-state core.
//!
//! Two independent building blocks live here:
//!
//! - [`AtomicStore`]: a typed JSON document store with a per-store FIFO write
//!   queue and a temp-file + rename commit protocol, so a crash can never
//!   leave a partially written document behind.
//! - [`LockManager`]: a cooperative, strictly FIFO lock over arbitrary string
//!   keys, for callers that need multi-step critical sections spanning more
//!   than one commit.
//!
//! The store assumes a single writer process per data file; it provides no
//! cross-process coordination.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod atomic;
mod key;
mod lock;

pub use atomic::{AtomicStore, CommitTicket};
pub use key::validate_key;
pub use lock::{LockGuard, LockManager, LockStats};
