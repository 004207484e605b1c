//! Frequency policies.
//!
//! Turns a goal's date range and frequency kind into the dates it obliges and
//! the number of completions it requires.

pub mod policy;

#[cfg(test)]
mod policy_props;

pub use policy::{Frequency, FrequencyPolicy};
