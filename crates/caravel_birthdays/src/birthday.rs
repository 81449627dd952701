//! Birthday data shapes.

use caravel_error::{CaravelResult, ValidationError, ValidationErrorKind};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A user's birthday; the year is optional (some users withhold it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_new::new)]
pub struct Birthday {
    /// Month, 1–12.
    month: u8,
    /// Day of month, 1–31.
    day: u8,
    /// Birth year, if the user shared one.
    #[serde(default)]
    #[new(default)]
    year: Option<i32>,
}

impl Birthday {
    /// Check that month and day fall inside their calendar ranges.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an out-of-range month or day.
    pub fn validate(&self) -> CaravelResult<()> {
        if !(1..=12).contains(&self.month) {
            return Err(ValidationError::new(ValidationErrorKind::InvalidRange(format!(
                "month {} outside 1-12",
                self.month
            )))
            .into());
        }
        if !(1..=31).contains(&self.day) {
            return Err(ValidationError::new(ValidationErrorKind::InvalidRange(format!(
                "day {} outside 1-31",
                self.day
            )))
            .into());
        }
        Ok(())
    }
}

/// The whole birthday document: every user, keyed by user id.
pub type BirthdayDocument = BTreeMap<String, Birthday>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_calendar_ranges() {
        assert!(Birthday::new(2, 29).validate().is_ok());
        assert!(Birthday::new(0, 10).validate().is_err());
        assert!(Birthday::new(13, 10).validate().is_err());
        assert!(Birthday::new(6, 0).validate().is_err());
        assert!(Birthday::new(6, 32).validate().is_err());
    }
}
