//! Obligated-date enumeration and required-completion counting.
//!
//! Day counting uses a single canonical calendar: every day in the inclusive
//! range `[start, end]`, weekday numbering Sun=1..Sat=7, weekend = Sat ∪ Sun.

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How often a goal obliges its owner to act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Frequency {
    /// Every day in the range.
    #[serde(alias = "Every day")]
    Daily,
    /// A chosen number of days anywhere in the range.
    #[serde(alias = "X days over the period")]
    XDays,
    /// Monday through Friday.
    #[serde(alias = "Weekdays only")]
    Weekdays,
    /// Saturday and Sunday.
    #[serde(alias = "Weekends only")]
    Weekends,
}

impl Frequency {
    /// Returns the canonical string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::XDays => "xDays",
            Self::Weekdays => "weekdays",
            Self::Weekends => "weekends",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stateless frequency policy calculations.
pub struct FrequencyPolicy;

impl FrequencyPolicy {
    /// Every calendar day in `[start, end]`, in order. Empty if `end < start`.
    pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
        start.iter_days().take_while(move |day| *day <= end)
    }

    /// Number of calendar days in `[start, end]`.
    #[must_use]
    pub fn day_count(start: NaiveDate, end: NaiveDate) -> u32 {
        if end < start {
            return 0;
        }
        u32::try_from((end - start).num_days() + 1).unwrap_or(u32::MAX)
    }

    /// Weekday number with Sunday = 1 through Saturday = 7.
    #[must_use]
    pub fn weekday_number(date: NaiveDate) -> u32 {
        date.weekday().number_from_sunday()
    }

    /// Returns true if `date` falls on Saturday or Sunday.
    #[must_use]
    pub fn is_weekend(date: NaiveDate) -> bool {
        matches!(Self::weekday_number(date), 1 | 7)
    }

    /// Returns true if the frequency's calendar filter keeps `date`.
    #[must_use]
    pub fn is_obligated(frequency: Frequency, date: NaiveDate) -> bool {
        match frequency {
            Frequency::Daily | Frequency::XDays => true,
            Frequency::Weekdays => !Self::is_weekend(date),
            Frequency::Weekends => Self::is_weekend(date),
        }
    }

    /// Every obligated date in `[start, end]`, in date order.
    ///
    /// `XDays` keeps the whole range: the completion cap limits how many
    /// completions are required, not which days are scanned.
    #[must_use]
    pub fn obligated_dates(frequency: Frequency, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        Self::days_in_range(start, end)
            .filter(|day| Self::is_obligated(frequency, *day))
            .collect()
    }

    /// Number of completions the goal requires.
    ///
    /// - `Daily` → day count
    /// - `Weekdays` / `Weekends` → filtered day count
    /// - `XDays` → `min(day count, floor(total / amount_per_success))`
    #[must_use]
    pub fn required_completions(
        frequency: Frequency,
        start: NaiveDate,
        end: NaiveDate,
        total_amount: Decimal,
        amount_per_success: Decimal,
    ) -> u32 {
        match frequency {
            Frequency::Daily => Self::day_count(start, end),
            Frequency::Weekdays | Frequency::Weekends => {
                let count = Self::days_in_range(start, end)
                    .filter(|day| Self::is_obligated(frequency, *day))
                    .count();
                u32::try_from(count).unwrap_or(u32::MAX)
            }
            Frequency::XDays => {
                Self::day_count(start, end).min(Self::affordable_completions(total_amount, amount_per_success))
            }
        }
    }

    /// `floor(total / amount_per_success)`, zero for non-positive inputs.
    fn affordable_completions(total_amount: Decimal, amount_per_success: Decimal) -> u32 {
        if total_amount <= Decimal::ZERO || amount_per_success <= Decimal::ZERO {
            return 0;
        }
        total_amount
            .checked_div(amount_per_success)
            .and_then(|ratio| ratio.floor().to_u32())
            .unwrap_or(u32::MAX)
    }
}
