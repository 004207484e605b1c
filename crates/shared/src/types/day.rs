//! Canonical calendar-day keys.
//!
//! Goal documents key completions by calendar day. The canonical form is
//! `YYYY-MM-DD` with no time-of-day and no zone. Older documents stored full
//! ISO-8601 timestamps of a local midnight; those are snapped to the nearest
//! UTC calendar day, which recovers the intended day for any offset within
//! twelve hours of UTC.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use thiserror::Error;

/// Format of canonical day keys.
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Error returned when a day key cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid calendar day: {0}")]
pub struct DayParseError(pub String);

/// Formats a date as a canonical day key.
#[must_use]
pub fn day_key(date: NaiveDate) -> String {
    date.format(DAY_KEY_FORMAT).to_string()
}

/// Parses a canonical day key or a legacy ISO-8601 timestamp.
pub fn parse_day(raw: &str) -> Result<NaiveDate, DayParseError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, DAY_KEY_FORMAT) {
        return Ok(date);
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|instant| (instant.with_timezone(&Utc) + Duration::hours(12)).date_naive())
        .map_err(|_| DayParseError(raw.to_string()))
}

/// Serde adapter for `NaiveDate` fields stored as day keys.
pub mod serde_day {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes as `YYYY-MM-DD`.
    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::day_key(*date))
    }

    /// Deserializes a day key or legacy timestamp.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_day(&raw).map_err(serde::de::Error::custom)
    }
}
