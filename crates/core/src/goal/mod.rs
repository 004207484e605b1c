//! Goals: a committed, time-boxed, recurring obligation with a monetary stake.
//!
//! - `types` - Goal, GoalDraft and VerificationMethod
//! - `error` - Goal validation errors

pub mod error;
pub mod types;

pub use error::GoalError;
pub use types::{Goal, GoalDraft, VerificationMethod};
