//! Missed-day reconciliation.
//!
//! Scans a goal's elapsed obligated dates and synthesizes `Missed` records
//! for days with no ledger entry. Pure computation; persisting the batch is
//! the caller's job.

pub mod engine;

#[cfg(test)]
mod engine_props;

pub use engine::{ReconciliationEngine, ReconciliationOutcome};
