//! Persistence error types.

/// Kinds of persistence errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum PersistenceErrorKind {
    /// Failed to create the store directory
    #[display("Failed to create store directory: {}", _0)]
    DirectoryCreation(String),
    /// Failed to serialize a document to JSON
    #[display("Failed to serialize document: {}", _0)]
    Serialize(String),
    /// Failed to write the temporary file
    #[display("Failed to write temp file: {}", _0)]
    TempWrite(String),
    /// Failed to rename the temporary file over the store file
    #[display("Failed to rename temp file: {}", _0)]
    Rename(String),
    /// Failed to read the store file
    #[display("Failed to read store file: {}", _0)]
    FileRead(String),
    /// The write queue for this store is no longer accepting jobs
    #[display("Write queue closed: {}", _0)]
    QueueClosed(String),
}

/// Persistence error with location tracking.
///
/// Commit failures are logged by the store worker and surfaced only through
/// the commit ticket; fire-and-forget callers are unaffected.
///
/// # Examples
///
/// ```
/// use caravel_error::{PersistenceError, PersistenceErrorKind};
///
/// let err = PersistenceError::new(PersistenceErrorKind::Rename(
///     "xp.json: permission denied".to_string(),
/// ));
/// assert!(format!("{}", err).contains("rename"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Persistence Error: {} at line {} in {}", kind, line, file)]
pub struct PersistenceError {
    /// The kind of error that occurred
    pub kind: PersistenceErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl PersistenceError {
    /// Create a new persistence error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PersistenceErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
