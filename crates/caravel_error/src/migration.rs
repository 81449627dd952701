//! Migration error types.

/// Kinds of migration errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum MigrationErrorKind {
    /// A migration function failed
    #[display("Migration {} ({}) failed: {}", id, name, message)]
    Failed {
        /// Numeric migration id
        id: u32,
        /// Human-readable migration name
        name: String,
        /// Failure description
        message: String,
    },
    /// The migration status document could not be loaded or persisted
    #[display("Migration status unavailable: {}", _0)]
    StatusUnavailable(String),
    /// An operator reset targeted a version the runner does not know
    #[display("Refusing version {}: latest known is {}", requested, latest)]
    VersionRegression {
        /// Version the operator asked for
        requested: u32,
        /// Highest version the runner ships
        latest: u32,
    },
}

/// Migration error with location tracking.
///
/// Migration errors are fatal by design: running business logic on a
/// half-migrated schema would silently corrupt data, so whatever startup
/// sequence invoked the runner must halt.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Migration Error: {} at line {} in {}", kind, line, file)]
pub struct MigrationError {
    /// The kind of error that occurred
    pub kind: MigrationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl MigrationError {
    /// Create a new migration error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: MigrationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
