//! Shared types, models and stock rules for the kitchen stock platform
//!
//! Everything in this crate is pure: no I/O, no clock reads. Callers pass the
//! current time in, which keeps the rules deterministic under test.

pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
