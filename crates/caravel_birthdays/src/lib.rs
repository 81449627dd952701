//! Birthday domain store for Caravel.
//!
//! One global document, keyed by user id. The pre-migration deployment
//! nested entries under guild ids; that legacy shape is understood only by
//! the flattening migration in `caravel_migrate`, never here.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod birthday;
mod store;

pub use birthday::{Birthday, BirthdayDocument};
pub use store::BirthdayStore;
