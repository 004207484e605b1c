//! Property-based tests for FrequencyPolicy.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::frequency::policy::{Frequency, FrequencyPolicy};

fn arb_frequency() -> impl Strategy<Value = Frequency> {
    prop_oneof![
        Just(Frequency::Daily),
        Just(Frequency::XDays),
        Just(Frequency::Weekdays),
        Just(Frequency::Weekends),
    ]
}

/// Start dates across several years, ranges up to ~three months.
fn arb_range() -> impl Strategy<Value = (NaiveDate, NaiveDate)> {
    (0i64..2_000, 0i64..90).prop_map(|(offset, span)| {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + Duration::days(offset);
        (start, start + Duration::days(span))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Same inputs always give the same count.
    #[test]
    fn prop_required_completions_deterministic(
        frequency in arb_frequency(),
        (start, end) in arb_range(),
        per_success in 1i64..10_000,
        units in 0i64..200,
    ) {
        let per_success = Decimal::new(per_success, 2);
        let total = per_success * Decimal::from(units);
        let first = FrequencyPolicy::required_completions(frequency, start, end, total, per_success);
        let second = FrequencyPolicy::required_completions(frequency, start, end, total, per_success);
        prop_assert_eq!(first, second);
    }

    /// Obligated dates are ordered, unique, inside the range and never more than the day count.
    #[test]
    fn prop_obligated_dates_within_range(
        frequency in arb_frequency(),
        (start, end) in arb_range(),
    ) {
        let dates = FrequencyPolicy::obligated_dates(frequency, start, end);
        prop_assert!(dates.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(dates.iter().all(|d| *d >= start && *d <= end));
        prop_assert!(dates.len() as u32 <= FrequencyPolicy::day_count(start, end));
    }

    /// Weekday and weekend counts partition the day count.
    #[test]
    fn prop_weekdays_and_weekends_partition_range((start, end) in arb_range()) {
        let zero = Decimal::ZERO;
        let weekdays = FrequencyPolicy::required_completions(Frequency::Weekdays, start, end, zero, zero);
        let weekends = FrequencyPolicy::required_completions(Frequency::Weekends, start, end, zero, zero);
        prop_assert_eq!(weekdays + weekends, FrequencyPolicy::day_count(start, end));
    }

    /// For non-XDays frequencies the count equals the number of obligated dates.
    #[test]
    fn prop_required_matches_obligated_dates(
        frequency in prop_oneof![Just(Frequency::Daily), Just(Frequency::Weekdays), Just(Frequency::Weekends)],
        (start, end) in arb_range(),
    ) {
        let required = FrequencyPolicy::required_completions(frequency, start, end, Decimal::ZERO, Decimal::ONE);
        prop_assert_eq!(required as usize, FrequencyPolicy::obligated_dates(frequency, start, end).len());
    }

    /// XDays never requires more completions than there are days.
    #[test]
    fn prop_x_days_capped_by_day_count(
        (start, end) in arb_range(),
        per_success in 1i64..1_000,
        units in 0i64..500,
    ) {
        let per_success = Decimal::from(per_success);
        let total = per_success * Decimal::from(units);
        let required = FrequencyPolicy::required_completions(Frequency::XDays, start, end, total, per_success);
        let expected = FrequencyPolicy::day_count(start, end).min(u32::try_from(units).unwrap());
        prop_assert_eq!(required, expected);
    }
}
