//! Common types used across the application.

pub mod day;
pub mod id;
pub mod money;

pub use day::{DayParseError, day_key, parse_day};
pub use id::*;
pub use money::{Currency, Money, MoneyError};
