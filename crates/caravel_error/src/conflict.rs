//! State conflict error types.

/// Kinds of state conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StateConflictErrorKind {
    /// A document holds both the legacy and the current shape at once
    #[display("Mixed-format document: {}", _0)]
    MixedFormat(String),
}

/// State conflict detected during a migration precondition check.
///
/// The migration aborts without mutating anything and reports the conflict
/// for manual resolution; the runner never guesses which format is
/// authoritative.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("State Conflict: {} at line {} in {}", kind, line, file)]
pub struct StateConflictError {
    /// The kind of conflict that was detected
    pub kind: StateConflictErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StateConflictError {
    /// Create a new state conflict error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StateConflictErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
