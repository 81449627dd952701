//! Validation error types.

/// Kinds of validation errors.
///
/// The multiplier payload is an `f64`, so this enum is only `PartialEq`.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum ValidationErrorKind {
    /// A guild/user/channel/role key was empty
    #[display("Empty key for {}", _0)]
    EmptyKey(String),
    /// Key collides with a reserved object-prototype name from the legacy runtime
    #[display("Reserved key rejected: {}", _0)]
    ReservedKey(String),
    /// Persisted document does not parse into the expected shape
    #[display("Document shape mismatch: {}", _0)]
    DocumentShape(String),
    /// A numeric field was outside its allowed range
    #[display("Value out of range: {}", _0)]
    InvalidRange(String),
    /// A multiplier was negative
    #[display("Negative multiplier {} for {}", _1, _0)]
    NegativeMultiplier(String, f64),
}

/// Validation error with location tracking.
///
/// Validation failures are recovered locally: the offending operation becomes
/// a logged no-op returning a default value, it never crashes a caller.
///
/// # Examples
///
/// ```
/// use caravel_error::{ValidationError, ValidationErrorKind};
///
/// let err = ValidationError::new(ValidationErrorKind::ReservedKey(
///     "__proto__".to_string(),
/// ));
/// assert!(format!("{}", err).contains("Reserved key"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Validation Error: {} at line {} in {}", kind, line, file)]
pub struct ValidationError {
    /// The kind of error that occurred
    pub kind: ValidationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ValidationError {
    /// Create a new validation error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ValidationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_clone_compare_and_display() {
        let kind = ValidationErrorKind::NegativeMultiplier("chan".to_string(), -0.5);
        assert_eq!(kind.clone(), kind);
        assert!(kind.to_string().contains("-0.5"));

        let err = ValidationError::new(kind);
        assert!(format!("{}", err).contains("Negative multiplier"));
    }
}
