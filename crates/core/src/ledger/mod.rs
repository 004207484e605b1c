//! Completion ledger.
//!
//! This module holds the per-goal record of attested, verified, refunded
//! and missed days:
//! - Completion records and their document layout
//! - The date-keyed ledger with uniqueness and merge rules
//! - Progress and earnings queries
//! - Error types for ledger operations

pub mod completions;
pub mod entry;
pub mod error;

#[cfg(test)]
mod ledger_props;

pub use completions::{CompletionLedger, MergeOutcome};
pub use entry::CompletionRecord;
pub use error::LedgerError;
