//! Reconciliation engine.

use chrono::NaiveDate;

use crate::frequency::FrequencyPolicy;
use crate::goal::Goal;
use crate::ledger::{CompletionLedger, CompletionRecord, LedgerError, MergeOutcome};
use crate::workflow::CompletionWorkflow;

/// Dates applied and dates that still need a retry after one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationOutcome {
    /// Dates whose `Missed` record is now in the ledger.
    pub applied: Vec<NaiveDate>,
    /// Dates whose record could not be persisted; retried next pass.
    pub failed: Vec<NaiveDate>,
}

impl ReconciliationOutcome {
    /// Returns true if nothing is left to retry.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns true if the pass neither applied nor failed anything.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty() && self.failed.is_empty()
    }
}

/// Stateless missed-day backfill.
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    /// Last date eligible for backfill: `min(today - 1, goal.end_date)`.
    ///
    /// Returns `None` while no obligated day of the goal has elapsed.
    #[must_use]
    pub fn scan_end(goal: &Goal, today: NaiveDate) -> Option<NaiveDate> {
        let yesterday = today.pred_opt()?;
        let end = yesterday.min(goal.end_date);
        (goal.start_date <= end).then_some(end)
    }

    /// Synthesizes a `Missed` record for every elapsed obligated date with
    /// no ledger entry.
    ///
    /// Running it again after the batch is applied yields nothing.
    #[must_use]
    pub fn reconcile_missed(
        goal: &Goal,
        ledger: &CompletionLedger,
        today: NaiveDate,
    ) -> Vec<CompletionRecord> {
        let Some(end) = Self::scan_end(goal, today) else {
            return Vec::new();
        };

        FrequencyPolicy::obligated_dates(goal.frequency, goal.start_date, end)
            .into_iter()
            .filter(|date| !ledger.contains(*date))
            .map(|date| CompletionWorkflow::missed(goal.id.clone(), date))
            .collect()
    }

    /// Merges persisted backfill records into the ledger.
    ///
    /// A date that gained a record since the batch was computed keeps that
    /// record. Returns the dates actually inserted.
    ///
    /// # Errors
    ///
    /// Returns `ForeignRecord` if a record belongs to another goal.
    pub fn apply_batch(
        ledger: &mut CompletionLedger,
        batch: impl IntoIterator<Item = CompletionRecord>,
    ) -> Result<Vec<NaiveDate>, LedgerError> {
        let mut inserted = Vec::new();
        for record in batch {
            let date = record.date;
            if ledger.merge(record)? == MergeOutcome::Inserted {
                inserted.push(date);
            }
        }
        Ok(inserted)
    }
}
