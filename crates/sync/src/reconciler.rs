//! Persisting missed-day backfill.
//!
//! Each synthesized record is a compare-then-write on its own date: the
//! current remote document is read first, dates that already hold a record
//! remotely are adopted instead of written, and the rest are written one
//! field per date. Failed dates are reported for the next pass.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::join_all;
use moneyvate_core::ledger::CompletionRecord;
use moneyvate_shared::types::GoalId;
use tracing::{debug, warn};

use crate::document::GoalDocumentCodec;
use crate::store::{DocumentStore, FieldPath, StoreError, bounded};

/// What happened to one backfill batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedBatch {
    /// Records written by this pass.
    pub written: Vec<CompletionRecord>,
    /// Records that already existed remotely; take these instead.
    pub adopted: Vec<CompletionRecord>,
    /// Dates that could not be persisted.
    pub failed: Vec<NaiveDate>,
}

/// Writes backfill batches to the document store.
pub struct MissedBatchWriter;

impl MissedBatchWriter {
    /// Persists `batch` for `goal_id`, bounding each store call by `timeout`.
    ///
    /// A failed read fails every date in the batch; nothing is written blind.
    pub async fn persist(
        store: &dyn DocumentStore,
        goal_id: &GoalId,
        batch: Vec<CompletionRecord>,
        timeout: Duration,
    ) -> PersistedBatch {
        let mut outcome = PersistedBatch::default();
        if batch.is_empty() {
            return outcome;
        }

        let remote = match bounded(timeout, store.read_document(goal_id)).await {
            Ok(Some(document)) => match GoalDocumentCodec::completions_of(&document) {
                Ok(records) => records
                    .into_iter()
                    .map(|r| (r.date, r))
                    .collect::<BTreeMap<_, _>>(),
                Err(e) => {
                    warn!(goal_id = %goal_id, error = %e, "remote completions unreadable, skipping backfill");
                    outcome.failed = batch.iter().map(|r| r.date).collect();
                    return outcome;
                }
            },
            Ok(None) => {
                warn!(goal_id = %goal_id, "goal document vanished, skipping backfill");
                outcome.failed = batch.iter().map(|r| r.date).collect();
                return outcome;
            }
            Err(e) => {
                warn!(goal_id = %goal_id, error = %e, "could not read goal before backfill");
                outcome.failed = batch.iter().map(|r| r.date).collect();
                return outcome;
            }
        };

        let mut to_write = Vec::new();
        for record in batch {
            if let Some(existing) = remote.get(&record.date) {
                debug!(goal_id = %goal_id, date = %record.date, status = %existing.status, "date already recorded remotely");
                outcome.adopted.push(existing.clone());
            } else {
                to_write.push(record);
            }
        }

        let writes = to_write.iter().map(|record| async move {
            let value = GoalDocumentCodec::encode_record(record)
                .map_err(|e| StoreError::Rejected(e.to_string()))?;
            bounded(timeout, store.write_field(goal_id, &FieldPath::completion(record.date), value)).await
        });
        let results = join_all(writes).await;

        for (record, result) in to_write.into_iter().zip(results) {
            match result {
                Ok(()) => outcome.written.push(record),
                Err(e) => {
                    warn!(goal_id = %goal_id, date = %record.date, error = %e, "missed backfill write failed");
                    outcome.failed.push(record.date);
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDocumentStore;
    use moneyvate_core::workflow::CompletionStatus;
    use serde_json::json;

    fn goal_id() -> GoalId {
        GoalId::from_raw("goal-1").unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn missed(d: u32) -> CompletionRecord {
        CompletionRecord::new(goal_id(), day(d), CompletionStatus::Missed)
    }

    fn store() -> InMemoryDocumentStore {
        let store = InMemoryDocumentStore::new();
        store.put_document(
            "goal-1",
            json!({
                "userId": "user-1",
                "completions": { "2024-03-02": { "status": "verified" } }
            }),
        );
        store
    }

    #[tokio::test]
    async fn test_persist_writes_and_adopts() {
        let store = store();
        let batch = vec![missed(1), missed(2), missed(3)];

        let outcome = MissedBatchWriter::persist(&store, &goal_id(), batch, Duration::from_secs(1)).await;

        assert_eq!(outcome.written.len(), 2);
        assert_eq!(outcome.adopted.len(), 1);
        assert_eq!(outcome.adopted[0].status, CompletionStatus::Verified);
        assert!(outcome.failed.is_empty());

        let doc = store.document("goal-1").unwrap();
        assert_eq!(doc["completions"]["2024-03-01"]["status"], "missed");
        assert_eq!(doc["completions"]["2024-03-02"]["status"], "verified");
    }

    #[tokio::test]
    async fn test_partial_failure_reports_dates() {
        let store = store();
        store.fail_writes_containing("2024-03-03");

        let outcome = MissedBatchWriter::persist(
            &store,
            &goal_id(),
            vec![missed(1), missed(3)],
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(outcome.written, vec![missed(1)]);
        assert_eq!(outcome.failed, vec![day(3)]);
    }

    #[tokio::test]
    async fn test_read_failure_fails_whole_batch() {
        let store = store();
        store.set_unavailable(true);

        let outcome = MissedBatchWriter::persist(
            &store,
            &goal_id(),
            vec![missed(1), missed(3)],
            Duration::from_secs(1),
        )
        .await;

        assert!(outcome.written.is_empty());
        assert_eq!(outcome.failed, vec![day(1), day(3)]);
        store.set_unavailable(false);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_store() {
        let store = store();
        store.set_unavailable(true);
        let outcome = MissedBatchWriter::persist(&store, &goal_id(), Vec::new(), Duration::from_secs(1)).await;
        assert_eq!(outcome, PersistedBatch::default());
    }
}
