//! Snowflake-id key validation.

use caravel_error::{CaravelResult, ValidationError, ValidationErrorKind};

/// Keys the legacy runtime could not store safely.
///
/// The original deployment persisted documents as prototype-bearing dynamic
/// objects, so these names collided with object internals. The on-disk
/// documents are still shared with that runtime, so the same keys stay
/// rejected here.
const RESERVED_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// Validate a guild/user/channel/role id before it is used as a document key.
///
/// `field` names the id's role for the error message ("guild id", "user id").
///
/// # Errors
///
/// Returns `ValidationError` for an empty or reserved key. Callers treat the
/// failure as a logged no-op, not a crash.
pub fn validate_key(field: &str, key: &str) -> CaravelResult<()> {
    if key.is_empty() {
        return Err(ValidationError::new(ValidationErrorKind::EmptyKey(field.to_string())).into());
    }
    if RESERVED_KEYS.contains(&key) {
        return Err(
            ValidationError::new(ValidationErrorKind::ReservedKey(key.to_string())).into(),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_snowflake_ids() {
        assert!(validate_key("guild id", "417123456789").is_ok());
    }

    #[test]
    fn rejects_empty_and_reserved_keys() {
        assert!(validate_key("guild id", "").is_err());
        for reserved in ["__proto__", "constructor", "prototype"] {
            assert!(validate_key("user id", reserved).is_err());
        }
    }
}
