//! Core domain logic for Moneyvate.
//!
//! This crate contains pure logic with ZERO storage, network or async dependencies.
//! Everything that decides whether money is earned back lives here.
//!
//! # Modules
//!
//! - `goal` - Goal model and creation rules
//! - `frequency` - Obligated dates and required completions per frequency
//! - `ledger` - Per-goal, date-keyed completion ledger
//! - `workflow` - Completion status state machine
//! - `reconciliation` - Missed-day backfill
//! - `aggregate` - Progress and balance reducers
//! - `clock` - Injectable notion of "today"

pub mod aggregate;
pub mod clock;
pub mod frequency;
pub mod goal;
pub mod ledger;
pub mod reconciliation;
pub mod workflow;
