//! Per-goal completion ledger.
//!
//! An in-memory, date-keyed projection of one goal's completion records.
//! Persistence is the caller's responsibility.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use moneyvate_shared::types::GoalId;
use rust_decimal::Decimal;

use crate::ledger::entry::CompletionRecord;
use crate::ledger::error::LedgerError;
use crate::workflow::types::{CompletionAction, CompletionStatus};

/// Result of merging a record that may collide with an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The date was empty; the record was inserted.
    Inserted,
    /// The existing record already had the same status.
    Unchanged,
    /// A synthesized `Missed` record was replaced by a real attestation.
    ReplacedBackfill,
    /// The existing record won; the incoming one was dropped.
    KeptExisting,
}

/// Mapping from calendar date to completion record for a single goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionLedger {
    goal_id: GoalId,
    amount_per_success: Decimal,
    entries: BTreeMap<NaiveDate, CompletionRecord>,
}

impl CompletionLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new(goal_id: GoalId, amount_per_success: Decimal) -> Self {
        Self {
            goal_id,
            amount_per_success,
            entries: BTreeMap::new(),
        }
    }

    /// Builds a ledger from records, rejecting duplicates.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEntry` or `ForeignRecord` on the first bad record.
    pub fn from_records(
        goal_id: GoalId,
        amount_per_success: Decimal,
        records: impl IntoIterator<Item = CompletionRecord>,
    ) -> Result<Self, LedgerError> {
        let mut ledger = Self::new(goal_id, amount_per_success);
        for record in records {
            ledger.insert(record)?;
        }
        Ok(ledger)
    }

    /// The goal this ledger belongs to.
    #[must_use]
    pub fn goal_id(&self) -> &GoalId {
        &self.goal_id
    }

    /// Amount earned per refunded record.
    #[must_use]
    pub fn amount_per_success(&self) -> Decimal {
        self.amount_per_success
    }

    /// Returns the record for `date`.
    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<&CompletionRecord> {
        self.entries.get(&date)
    }

    /// Returns true if any record exists for `date`.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.entries.contains_key(&date)
    }

    /// Inserts a record into a previously empty date.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEntry` if the date is taken; the existing record is
    /// left untouched. Returns `ForeignRecord` for another goal's record.
    pub fn insert(&mut self, record: CompletionRecord) -> Result<(), LedgerError> {
        self.check_owner(&record)?;
        if self.entries.contains_key(&record.date) {
            return Err(LedgerError::DuplicateEntry { date: record.date });
        }
        self.entries.insert(record.date, record);
        Ok(())
    }

    /// Applies a validated workflow action to the record for `date`.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if the date is empty, or `StatusMismatch` if
    /// the record is no longer in the status the action was validated against.
    pub fn apply(
        &mut self,
        date: NaiveDate,
        action: &CompletionAction,
    ) -> Result<&CompletionRecord, LedgerError> {
        let record = self
            .entries
            .get_mut(&date)
            .ok_or(LedgerError::RecordNotFound { date })?;

        if record.status != action.from_status() {
            return Err(LedgerError::StatusMismatch {
                date,
                expected: action.from_status(),
                actual: record.status,
            });
        }

        record.apply_unchecked(action);
        Ok(record)
    }

    /// Like [`apply`](Self::apply), but a record already in the action's
    /// target status counts as applied.
    ///
    /// Used once the action has been persisted, when a snapshot may have
    /// delivered the result first. Returns `false` if nothing changed.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if the date is empty, or `StatusMismatch` if
    /// the record is in neither the source nor the target status.
    pub fn settle(&mut self, date: NaiveDate, action: &CompletionAction) -> Result<bool, LedgerError> {
        if self
            .entries
            .get(&date)
            .is_some_and(|r| r.status == action.new_status())
        {
            return Ok(false);
        }
        self.apply(date, action)?;
        Ok(true)
    }

    /// Resolves a second creation for a date.
    ///
    /// - empty date → insert
    /// - same status → no-op
    /// - existing `Missed`, incoming attestation → attestation wins
    /// - anything else → existing record wins
    ///
    /// A synthesized backfill never overwrites a real attestation.
    ///
    /// # Errors
    ///
    /// Returns `ForeignRecord` for another goal's record.
    pub fn merge(&mut self, record: CompletionRecord) -> Result<MergeOutcome, LedgerError> {
        self.check_owner(&record)?;
        let Some(existing) = self.entries.get(&record.date) else {
            self.entries.insert(record.date, record);
            return Ok(MergeOutcome::Inserted);
        };

        if existing.status == record.status {
            return Ok(MergeOutcome::Unchanged);
        }
        if existing.status == CompletionStatus::Missed && record.status.is_attested() {
            self.entries.insert(record.date, record);
            return Ok(MergeOutcome::ReplacedBackfill);
        }
        Ok(MergeOutcome::KeptExisting)
    }

    /// Number of records that count toward progress (`Verified` or `Refunded`).
    #[must_use]
    pub fn completed_count(&self) -> u32 {
        let count = self
            .entries
            .values()
            .filter(|r| r.status.counts_as_completed())
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Money earned back: `amount_per_success` for every `Refunded` record.
    #[must_use]
    pub fn earned_amount(&self) -> Decimal {
        self.entries
            .values()
            .filter(|r| r.status.counts_as_earned())
            .map(|_| self.amount_per_success)
            .sum()
    }

    /// True if `date` holds a `Verified` or `PendingVerification` record.
    #[must_use]
    pub fn has_completion_for_date(&self, date: NaiveDate) -> bool {
        self.entries.get(&date).is_some_and(|r| {
            matches!(
                r.status,
                CompletionStatus::Verified | CompletionStatus::PendingVerification
            )
        })
    }

    /// Number of records with the given status.
    #[must_use]
    pub fn count_with_status(&self, status: CompletionStatus) -> usize {
        self.entries.values().filter(|r| r.status == status).count()
    }

    /// Records in date order.
    pub fn iter(&self) -> impl Iterator<Item = &CompletionRecord> {
        self.entries.values()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the ledger holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_owner(&self, record: &CompletionRecord) -> Result<(), LedgerError> {
        if record.goal_id == self.goal_id {
            Ok(())
        } else {
            Err(LedgerError::ForeignRecord {
                expected: self.goal_id.clone(),
                actual: record.goal_id.clone(),
            })
        }
    }
}

#[cfg(test)]
#[path = "completions_tests.rs"]
mod tests;
