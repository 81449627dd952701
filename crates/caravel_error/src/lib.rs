//! Error types for the Caravel guild-state core.
//!
//! This crate provides the foundation error types used throughout the Caravel
//! workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern for clean error
//! handling:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use caravel_error::{CaravelResult, PersistenceError, PersistenceErrorKind};
//!
//! fn write_document() -> CaravelResult<()> {
//!     Err(PersistenceError::new(PersistenceErrorKind::TempWrite(
//!         "disk full".to_string(),
//!     )))?
//! }
//!
//! match write_document() {
//!     Ok(()) => println!("Committed"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod conflict;
mod error;
mod migration;
mod persistence;
mod validation;

pub use conflict::{StateConflictError, StateConflictErrorKind};
pub use error::{CaravelError, CaravelErrorKind, CaravelResult};
pub use migration::{MigrationError, MigrationErrorKind};
pub use persistence::{PersistenceError, PersistenceErrorKind};
pub use validation::{ValidationError, ValidationErrorKind};
