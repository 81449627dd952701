//! Top-level error wrapper types.

use crate::{MigrationError, PersistenceError, StateConflictError, ValidationError};

/// The foundation error enum for the Caravel workspace.
///
/// # Examples
///
/// ```
/// use caravel_error::{CaravelError, ValidationError, ValidationErrorKind};
///
/// let val_err = ValidationError::new(ValidationErrorKind::EmptyKey("guild id".to_string()));
/// let err: CaravelError = val_err.into();
/// assert!(format!("{}", err).contains("Validation Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum CaravelErrorKind {
    /// Malformed or unsafe input rejected before any mutation
    #[from(ValidationError)]
    Validation(ValidationError),
    /// I/O failure while committing or loading a document
    #[from(PersistenceError)]
    Persistence(PersistenceError),
    /// A versioned migration failed; fatal to startup
    #[from(MigrationError)]
    Migration(MigrationError),
    /// Mixed-format data detected during a migration precondition check
    #[from(StateConflictError)]
    StateConflict(StateConflictError),
}

/// Caravel error with kind discrimination.
///
/// # Examples
///
/// ```
/// use caravel_error::{CaravelResult, PersistenceError, PersistenceErrorKind};
///
/// fn might_fail() -> CaravelResult<()> {
///     Err(PersistenceError::new(PersistenceErrorKind::FileRead(
///         "xp.json: not found".to_string(),
///     )))?
/// }
///
/// match might_fail() {
///     Ok(_) => println!("Success"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Caravel Error: {}", _0)]
pub struct CaravelError(Box<CaravelErrorKind>);

impl CaravelError {
    /// Create a new error from a kind.
    pub fn new(kind: CaravelErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &CaravelErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to CaravelErrorKind
impl<T> From<T> for CaravelError
where
    T: Into<CaravelErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Caravel operations.
///
/// # Examples
///
/// ```
/// use caravel_error::{CaravelResult, ValidationError, ValidationErrorKind};
///
/// fn parse_document() -> CaravelResult<()> {
///     Err(ValidationError::new(ValidationErrorKind::DocumentShape(
///         "expected object".to_string(),
///     )))?
/// }
/// ```
pub type CaravelResult<T> = std::result::Result<T, CaravelError>;
