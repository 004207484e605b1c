//! Progress and balance reducers over completion ledgers.

pub mod balance;

pub use balance::{GoalAggregator, GoalProgress};
