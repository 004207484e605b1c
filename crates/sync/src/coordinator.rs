//! Sync coordinator.
//!
//! Owns the goal ledgers for one user session. Remote snapshots replace the
//! goal set wholesale; every other mutation is a single-date transition that
//! is written to the store before it is applied locally.
//!
//! Session state sits behind a `std::sync::Mutex` that is never held across
//! an `.await`. Two markers keep concurrent work apart:
//! - a per-goal reconciling flag; a second trigger sets a rerun bit instead
//!   of scanning the same range concurrently
//! - a per-date in-flight set; a second transition on the same date fails
//!   fast with `TransitionInFlight`. A backfill claims its dates the same
//!   way and leaves out dates that are already claimed

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use futures::StreamExt;
use moneyvate_core::aggregate::{GoalAggregator, GoalProgress};
use moneyvate_core::clock::Clock;
use moneyvate_core::goal::{Goal, GoalDraft};
use moneyvate_core::ledger::{CompletionLedger, CompletionRecord, LedgerError, MergeOutcome};
use moneyvate_core::reconciliation::{ReconciliationEngine, ReconciliationOutcome};
use moneyvate_core::workflow::{
    CompletionStatus, CompletionWorkflow, TransitionTrigger, VerificationPayload,
};
use moneyvate_shared::AppConfig;
use moneyvate_shared::types::{GoalId, UserId};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::document::{DecodeError, DecodedGoal, GoalDocumentCodec};
use crate::error::SyncError;
use crate::gateway::{GatewayError, PaymentGateway};
use crate::projection::LedgerProjection;
use crate::reconciler::MissedBatchWriter;
use crate::store::{DocumentStore, FieldPath, GoalSnapshot, StoreError, bounded};

type DateKey = (GoalId, NaiveDate);

/// Timeouts and policies for a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Upper bound for one document-store call.
    pub store_timeout: Duration,
    /// Upper bound for one payment-gateway call.
    pub gateway_timeout: Duration,
    /// How long a local write shields its date from remote snapshots.
    pub dirty_ttl: Duration,
    /// Request the refund as soon as a completion becomes verified.
    pub auto_refund_on_verify: bool,
}

impl CoordinatorSettings {
    /// Settings taken from the application configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            store_timeout: config.sync.store_timeout(),
            gateway_timeout: config.gateway.timeout(),
            dirty_ttl: config.sync.dirty_ttl(),
            auto_refund_on_verify: config.gateway.auto_refund_on_verify,
        }
    }
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Result of applying one remote snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotReport {
    /// Goals decoded and now held in memory.
    pub goals: usize,
    /// Documents skipped because they could not be decoded.
    pub skipped: Vec<(String, DecodeError)>,
    /// True if the goal id set differs from the previous snapshot.
    pub goal_set_changed: bool,
    /// Dates where a newer local write was kept over the remote record.
    pub kept_local: usize,
}

/// Result of one reconciliation pass over all goals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// Per-goal outcome for goals that were scanned.
    pub outcomes: BTreeMap<GoalId, ReconciliationOutcome>,
    /// Goals whose scan was already running and got coalesced.
    pub coalesced: Vec<GoalId>,
    /// Queued writes flushed at the start of the pass.
    pub flushed: usize,
}

impl ReconciliationReport {
    /// Total `Missed` records applied.
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.outcomes.values().map(|o| o.applied.len()).sum()
    }

    /// Total dates left for the next pass.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes.values().map(|o| o.failed.len()).sum()
    }

    /// Outcome for one goal.
    #[must_use]
    pub fn outcome(&self, goal_id: &GoalId) -> Option<&ReconciliationOutcome> {
        self.outcomes.get(goal_id)
    }
}

/// A goal created through the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedGoal {
    /// The stored goal, including its payment reference.
    pub goal: Goal,
    /// Secret the client uses to confirm the charge.
    pub client_secret: String,
}

#[derive(Debug)]
struct GoalBook {
    goal: Goal,
    ledger: CompletionLedger,
}

#[derive(Debug, Default)]
struct SessionState {
    books: BTreeMap<GoalId, GoalBook>,
    snapshot_ids: Option<BTreeSet<GoalId>>,
    reconciling: HashSet<GoalId>,
    rerun: HashSet<GoalId>,
    in_flight: HashSet<DateKey>,
    dirty: HashMap<DateKey, Instant>,
    pending: BTreeMap<DateKey, CompletionRecord>,
}

impl SessionState {
    fn book(&self, goal_id: &GoalId) -> Result<&GoalBook, SyncError> {
        self.books
            .get(goal_id)
            .ok_or_else(|| SyncError::GoalNotFound(goal_id.clone()))
    }

    fn book_mut(&mut self, goal_id: &GoalId) -> Result<&mut GoalBook, SyncError> {
        self.books
            .get_mut(goal_id)
            .ok_or_else(|| SyncError::GoalNotFound(goal_id.clone()))
    }

    fn claim(&mut self, key: &DateKey) -> Result<(), SyncError> {
        if self.in_flight.insert(key.clone()) {
            Ok(())
        } else {
            Err(SyncError::TransitionInFlight {
                goal_id: key.0.clone(),
                date: key.1,
            })
        }
    }

    fn mark_dirty(&mut self, key: DateKey) {
        self.dirty.insert(key, Instant::now());
    }

    fn projection(&self) -> LedgerProjection {
        LedgerProjection::build(self.books.values().map(|b| (&b.goal, &b.ledger)))
    }
}

/// Releases per-date claims on drop.
struct InFlightGuard<'a> {
    state: &'a Mutex<SessionState>,
    keys: Vec<DateKey>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.keys.is_empty() {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        for key in &self.keys {
            state.in_flight.remove(key);
        }
    }
}

/// Clears a goal's reconciling flag on drop.
struct ReconcileGuard<'a> {
    state: &'a Mutex<SessionState>,
    goal_id: GoalId,
}

impl Drop for ReconcileGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.reconciling.remove(&self.goal_id);
        state.rerun.remove(&self.goal_id);
    }
}

/// Keeps the ledgers of one user session consistent with the remote store.
pub struct SyncCoordinator {
    user_id: UserId,
    store: Arc<dyn DocumentStore>,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    settings: CoordinatorSettings,
    state: Mutex<SessionState>,
    projection: watch::Sender<LedgerProjection>,
}

impl SyncCoordinator {
    /// Creates a coordinator with an empty session.
    pub fn new(
        user_id: UserId,
        store: Arc<dyn DocumentStore>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        settings: CoordinatorSettings,
    ) -> Self {
        let (projection, _) = watch::channel(LedgerProjection::default());
        Self {
            user_id,
            store,
            gateway,
            clock,
            settings,
            state: Mutex::new(SessionState::default()),
            projection,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &SessionState) {
        self.projection.send_replace(state.projection());
    }

    /// The session's user.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Receiver for the read-only projection, updated after every change.
    #[must_use]
    pub fn subscribe_projection(&self) -> watch::Receiver<LedgerProjection> {
        self.projection.subscribe()
    }

    /// Subscribes to the user's goals and processes snapshots until the
    /// stream ends.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Persistence` if the subscription cannot be opened.
    pub async fn run(&self) -> Result<(), SyncError> {
        let mut snapshots = bounded(self.settings.store_timeout, self.store.subscribe(&self.user_id)).await?;
        info!(user_id = %self.user_id, "listening for goal snapshots");

        while let Some(next) = snapshots.next().await {
            match next {
                Ok(snapshot) => {
                    self.handle_snapshot(snapshot).await;
                }
                Err(e) => warn!(user_id = %self.user_id, error = %e, "goal snapshot stream error"),
            }
        }

        info!(user_id = %self.user_id, "goal snapshot stream ended");
        Ok(())
    }

    /// Applies a snapshot and reconciles every goal if the goal set changed.
    pub async fn handle_snapshot(&self, snapshot: GoalSnapshot) -> SnapshotReport {
        let report = self.apply_snapshot(snapshot);
        if report.goal_set_changed {
            self.reconcile_all().await;
        }
        report
    }

    /// Replaces the in-memory goal set with `snapshot`.
    ///
    /// Undecodable documents are skipped. Dates with a recent local write
    /// that the snapshot does not reflect yet keep the local record.
    pub fn apply_snapshot(&self, snapshot: GoalSnapshot) -> SnapshotReport {
        let mut decoded = Vec::new();
        let mut skipped = Vec::new();
        for document in &snapshot.documents {
            match GoalDocumentCodec::decode(document) {
                Ok(goal) => decoded.push(goal),
                Err(e) => {
                    warn!(goal_id = %document.id, code = e.error_code(), error = %e, "skipping undecodable goal");
                    skipped.push((document.id.clone(), e));
                }
            }
        }

        let now = Instant::now();
        let ttl = self.settings.dirty_ttl;
        let mut guard = self.lock();
        let state = &mut *guard;

        let mut kept_local = 0;
        let mut books = BTreeMap::new();
        for DecodedGoal { goal, ledger } in decoded {
            let ledger = match state.books.get(&goal.id) {
                Some(local) => {
                    let (merged, kept) =
                        overlay_local(&local.ledger, ledger, &mut state.dirty, &state.pending, now, ttl);
                    kept_local += kept;
                    merged
                }
                None => ledger,
            };
            books.insert(goal.id.clone(), GoalBook { goal, ledger });
        }

        let ids: BTreeSet<GoalId> = books.keys().cloned().collect();
        let goal_set_changed = state.snapshot_ids.as_ref() != Some(&ids);
        state.dirty.retain(|(goal_id, _), _| ids.contains(goal_id));
        state.snapshot_ids = Some(ids);
        state.books = books;
        self.publish(state);

        let report = SnapshotReport {
            goals: state.books.len(),
            skipped,
            goal_set_changed,
            kept_local,
        };
        info!(
            user_id = %self.user_id,
            goals = report.goals,
            skipped = report.skipped.len(),
            kept_local = report.kept_local,
            changed = report.goal_set_changed,
            "applied goal snapshot"
        );
        report
    }

    /// Flushes queued writes, then backfills missed days for every goal.
    pub async fn reconcile_all(&self) -> ReconciliationReport {
        let mut report = ReconciliationReport {
            flushed: self.flush_pending_writes().await,
            ..ReconciliationReport::default()
        };

        let goal_ids: Vec<GoalId> = self.lock().books.keys().cloned().collect();
        for goal_id in goal_ids {
            match self.reconcile_goal(&goal_id).await {
                Ok(Some(outcome)) => {
                    report.outcomes.insert(goal_id, outcome);
                }
                Ok(None) => report.coalesced.push(goal_id),
                Err(e) => warn!(goal_id = %goal_id, error = %e, "goal left before reconciliation"),
            }
        }

        info!(
            user_id = %self.user_id,
            goals = report.outcomes.len(),
            applied = report.applied_count(),
            failed = report.failed_count(),
            flushed = report.flushed,
            "reconciliation pass finished"
        );
        report
    }

    /// Backfills missed days for one goal.
    ///
    /// Returns `Ok(None)` when a scan of the same goal is already running;
    /// that scan runs once more before it finishes.
    ///
    /// # Errors
    ///
    /// Returns `GoalNotFound` for unknown goals.
    pub async fn reconcile_goal(&self, goal_id: &GoalId) -> Result<Option<ReconciliationOutcome>, SyncError> {
        {
            let mut state = self.lock();
            state.book(goal_id)?;
            if !state.reconciling.insert(goal_id.clone()) {
                state.rerun.insert(goal_id.clone());
                debug!(goal_id = %goal_id, "reconciliation already running, coalesced");
                return Ok(None);
            }
        }
        let _reconciling = ReconcileGuard {
            state: &self.state,
            goal_id: goal_id.clone(),
        };

        let mut outcome = ReconciliationOutcome::default();
        loop {
            let today = self.clock.today();
            let (batch, claims) = {
                let mut state = self.lock();
                let Some(book) = state.books.get(goal_id) else {
                    break;
                };
                let mut batch = ReconciliationEngine::reconcile_missed(&book.goal, &book.ledger, today);
                batch.retain(|record| {
                    let claimed = state.in_flight.insert((goal_id.clone(), record.date));
                    if !claimed {
                        debug!(goal_id = %goal_id, date = %record.date, "date in flight, left out of backfill");
                    }
                    claimed
                });
                let claims = InFlightGuard {
                    state: &self.state,
                    keys: batch.iter().map(|r| (goal_id.clone(), r.date)).collect(),
                };
                (batch, claims)
            };

            if !batch.is_empty() {
                let persisted =
                    MissedBatchWriter::persist(self.store.as_ref(), goal_id, batch, self.settings.store_timeout)
                        .await;

                let mut state = self.lock();
                if let Some(book) = state.books.get_mut(goal_id) {
                    for record in persisted.adopted {
                        book.ledger.merge(record)?;
                    }
                    outcome
                        .applied
                        .extend(ReconciliationEngine::apply_batch(&mut book.ledger, persisted.written)?);
                    outcome.failed.extend(persisted.failed);
                }
                self.publish(&state);
            }
            drop(claims);

            if !self.lock().rerun.remove(goal_id) {
                break;
            }
        }

        outcome.failed.sort_unstable();
        outcome.failed.dedup();
        outcome.failed.retain(|date| !outcome.applied.contains(date));
        if !outcome.is_noop() {
            info!(
                goal_id = %goal_id,
                applied = outcome.applied.len(),
                failed = outcome.failed.len(),
                "missed days reconciled"
            );
        }
        Ok(Some(outcome))
    }

    /// Records a user attestation for `date`.
    ///
    /// `date` must lie in `[start, min(end, today)]` and hold no record yet.
    /// The record is persisted before it enters the ledger.
    ///
    /// # Errors
    ///
    /// Returns `DateOutsideGoal`, `DuplicateEntry`, `PhotoRequired`,
    /// `TransitionInFlight` or a persistence failure.
    pub async fn add_completion(
        &self,
        goal_id: &GoalId,
        date: NaiveDate,
        payload: Option<VerificationPayload>,
    ) -> Result<CompletionRecord, SyncError> {
        let today = self.clock.today();
        let now = self.clock.now();
        let key = (goal_id.clone(), date);

        let record = {
            let mut state = self.lock();
            let book = state.book(goal_id)?;
            if date < book.goal.start_date || date > book.goal.end_date.min(today) {
                return Err(SyncError::DateOutsideGoal {
                    goal_id: goal_id.clone(),
                    date,
                });
            }
            if book.ledger.contains(date) {
                return Err(LedgerError::DuplicateEntry { date }.into());
            }
            let record =
                CompletionWorkflow::attest(goal_id.clone(), date, book.goal.verification_method, payload, now)?;
            state.claim(&key)?;
            record
        };
        let in_flight = InFlightGuard {
            state: &self.state,
            keys: vec![key.clone()],
        };

        let value = GoalDocumentCodec::encode_record(&record)?;
        bounded(
            self.settings.store_timeout,
            self.store.write_field(goal_id, &FieldPath::completion(date), value),
        )
        .await?;

        {
            let mut state = self.lock();
            if state.book_mut(goal_id)?.ledger.merge(record.clone())? == MergeOutcome::KeptExisting {
                warn!(goal_id = %goal_id, date = %date, "a different record arrived while attesting");
            }
            state.mark_dirty(key);
            self.publish(&state);
        }
        info!(goal_id = %goal_id, date = %date, status = %record.status, "completion recorded");

        drop(in_flight);
        if self.settings.auto_refund_on_verify && record.status == CompletionStatus::Verified {
            self.auto_refund(goal_id, date).await;
        }
        Ok(record)
    }

    /// Applies a verifier decision to the record for `date`.
    ///
    /// Asking for the status the record already has is a no-op, so a
    /// repeated notification never schedules a second refund.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound`, `InvalidStateTransition`,
    /// `TransitionNotPermitted`, `TransitionInFlight` or a persistence failure.
    pub async fn update_completion_status(
        &self,
        goal_id: &GoalId,
        date: NaiveDate,
        new_status: CompletionStatus,
    ) -> Result<CompletionRecord, SyncError> {
        let now = self.clock.now();
        let key = (goal_id.clone(), date);

        let (current, action) = {
            let mut state = self.lock();
            let current = state
                .book(goal_id)?
                .ledger
                .get(date)
                .cloned()
                .ok_or(LedgerError::RecordNotFound { date })?;
            if current.status == new_status {
                debug!(goal_id = %goal_id, date = %date, status = %new_status, "status already applied");
                return Ok(current);
            }
            let action =
                CompletionWorkflow::transition(current.status, new_status, TransitionTrigger::Verifier, now)?;
            state.claim(&key)?;
            (current, action)
        };
        let in_flight = InFlightGuard {
            state: &self.state,
            keys: vec![key.clone()],
        };

        let updated = current.transitioned(&action);
        let value = GoalDocumentCodec::encode_record(&updated)?;
        bounded(
            self.settings.store_timeout,
            self.store.write_field(goal_id, &FieldPath::completion(date), value),
        )
        .await?;

        {
            let mut state = self.lock();
            if !state.book_mut(goal_id)?.ledger.settle(date, &action)? {
                debug!(goal_id = %goal_id, date = %date, "status arrived with a snapshot first");
            }
            state.mark_dirty(key);
            self.publish(&state);
        }
        info!(
            goal_id = %goal_id,
            date = %date,
            from = %action.from_status(),
            to = %action.new_status(),
            "completion status updated"
        );

        drop(in_flight);
        if self.settings.auto_refund_on_verify && action.schedules_refund() {
            self.auto_refund(goal_id, date).await;
        }
        Ok(updated)
    }

    /// Requests the refund for a verified or previously failed completion.
    ///
    /// The gateway is only called once the state machine allows the refund.
    /// A failed or timed-out call moves the record to `refundFailed`; a
    /// refund outcome that cannot be persisted is queued for the next pass.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` without calling the gateway for
    /// records that are not refundable, and `SyncError::Gateway` after
    /// recording `refundFailed`.
    pub async fn trigger_refund(&self, goal_id: &GoalId, date: NaiveDate) -> Result<CompletionRecord, SyncError> {
        let key = (goal_id.clone(), date);

        let (current, reference, amount) = {
            let mut state = self.lock();
            let book = state.book(goal_id)?;
            let current = book
                .ledger
                .get(date)
                .cloned()
                .ok_or(LedgerError::RecordNotFound { date })?;
            CompletionWorkflow::ensure_refundable(current.status)?;
            let reference = book
                .goal
                .payment_intent_id
                .clone()
                .ok_or_else(|| SyncError::MissingPaymentReference(goal_id.clone()))?;
            let amount = book.goal.per_success().to_minor_units()?;
            state.claim(&key)?;
            (current, reference, amount)
        };
        let in_flight = InFlightGuard {
            state: &self.state,
            keys: vec![key.clone()],
        };

        let timeout = self.settings.gateway_timeout;
        let result = tokio::time::timeout(timeout, self.gateway.refund(&reference, amount))
            .await
            .unwrap_or(Err(GatewayError::Timeout(timeout)));

        let action = match &result {
            Ok(()) => CompletionWorkflow::refund_succeeded(current.status, self.clock.now())?,
            Err(e) => {
                warn!(goal_id = %goal_id, date = %date, error = %e, "refund failed");
                CompletionWorkflow::refund_failed(current.status, e.to_string())?
            }
        };

        let updated = current.transitioned(&action);
        let persisted = match GoalDocumentCodec::encode_record(&updated) {
            Ok(value) => bounded(
                self.settings.store_timeout,
                self.store.write_field(goal_id, &FieldPath::completion(date), value),
            )
            .await
            .map_err(SyncError::from),
            Err(e) => Err(SyncError::from(e)),
        };

        {
            let mut state = self.lock();
            if let Err(e) = persisted {
                warn!(goal_id = %goal_id, date = %date, error = %e, "refund outcome not persisted, queued");
                state.pending.insert(key.clone(), updated.clone());
            }
            let settled = state.books.get_mut(goal_id).map(|book| book.ledger.settle(date, &action));
            match settled {
                Some(Ok(_)) => state.mark_dirty(key),
                Some(Err(e)) => {
                    warn!(goal_id = %goal_id, date = %date, error = %e, "local record moved during refund");
                }
                None => warn!(
                    goal_id = %goal_id,
                    date = %date,
                    payment_reference = %reference,
                    amount_minor_units = amount,
                    status = %action.new_status(),
                    "refund outcome for a goal no longer in the session"
                ),
            }
            self.publish(&state);
        }
        drop(in_flight);

        match result {
            Ok(()) => {
                info!(goal_id = %goal_id, date = %date, amount_minor_units = amount, "refund confirmed");
                Ok(updated)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn auto_refund(&self, goal_id: &GoalId, date: NaiveDate) {
        if let Err(e) = self.trigger_refund(goal_id, date).await {
            warn!(goal_id = %goal_id, date = %date, code = e.error_code(), error = %e, "automatic refund did not complete");
        }
    }

    /// Creates a goal: charge first, then the remote document.
    ///
    /// Nothing is written if the charge fails.
    ///
    /// # Errors
    ///
    /// Returns a `GoalError` for invalid drafts, a gateway failure for the
    /// charge, or a persistence failure for the document.
    pub async fn create_goal(&self, draft: GoalDraft) -> Result<CreatedGoal, SyncError> {
        let mut goal = draft.build(GoalId::new())?;
        let amount = goal.total().to_minor_units()?;

        let timeout = self.settings.gateway_timeout;
        let intent = tokio::time::timeout(timeout, self.gateway.create_charge(amount, goal.currency))
            .await
            .unwrap_or(Err(GatewayError::Timeout(timeout)))?;
        goal.payment_intent_id = Some(intent.payment_reference);

        let ledger = CompletionLedger::new(goal.id.clone(), goal.amount_per_success);
        let document = GoalDocumentCodec::encode_goal(&goal, &ledger)?;
        bounded(self.settings.store_timeout, self.store.create_document(&goal.id, document)).await?;

        {
            let mut state = self.lock();
            state.books.insert(
                goal.id.clone(),
                GoalBook {
                    goal: goal.clone(),
                    ledger,
                },
            );
            self.publish(&state);
        }
        info!(goal_id = %goal.id, total = %goal.total_amount, currency = %goal.currency, "goal created");

        Ok(CreatedGoal {
            goal,
            client_secret: intent.client_secret,
        })
    }

    /// Writes queued refund outcomes. Returns how many were flushed.
    async fn flush_pending_writes(&self) -> usize {
        let pending = std::mem::take(&mut self.lock().pending);
        let mut flushed = 0;

        for ((goal_id, date), record) in pending {
            let result = match GoalDocumentCodec::encode_record(&record) {
                Ok(value) => {
                    bounded(
                        self.settings.store_timeout,
                        self.store.write_field(&goal_id, &FieldPath::completion(date), value),
                    )
                    .await
                }
                Err(e) => Err(StoreError::Rejected(e.to_string())),
            };

            match result {
                Ok(()) => flushed += 1,
                Err(StoreError::NotFound(_)) => {
                    warn!(goal_id = %goal_id, date = %date, "dropping queued write for a deleted goal");
                }
                Err(e) => {
                    warn!(goal_id = %goal_id, date = %date, error = %e, "queued write failed again");
                    self.lock().pending.entry((goal_id, date)).or_insert(record);
                }
            }
        }
        flushed
    }

    /// Drops every ledger and the last snapshot (sign-out).
    pub fn clear(&self) {
        let mut state = self.lock();
        state.books.clear();
        state.snapshot_ids = None;
        state.dirty.clear();
        state.pending.clear();
        self.publish(&state);
        info!(user_id = %self.user_id, "session cleared");
    }

    /// `Σ (earned − committed)` over the session's goals.
    #[must_use]
    pub fn current_balance(&self) -> Decimal {
        let state = self.lock();
        GoalAggregator::balance(state.books.values().map(|b| (&b.goal, &b.ledger)))
    }

    /// Progress of one goal.
    ///
    /// # Errors
    ///
    /// Returns `GoalNotFound` for unknown goals.
    pub fn goal_progress(&self, goal_id: &GoalId) -> Result<GoalProgress, SyncError> {
        let state = self.lock();
        let book = state.book(goal_id)?;
        Ok(GoalAggregator::progress(&book.goal, &book.ledger))
    }

    /// A copy of one goal.
    #[must_use]
    pub fn goal(&self, goal_id: &GoalId) -> Option<Goal> {
        self.lock().books.get(goal_id).map(|b| b.goal.clone())
    }

    /// A copy of one goal's ledger.
    #[must_use]
    pub fn ledger(&self, goal_id: &GoalId) -> Option<CompletionLedger> {
        self.lock().books.get(goal_id).map(|b| b.ledger.clone())
    }

    /// Ids of the goals in the session.
    #[must_use]
    pub fn goal_ids(&self) -> Vec<GoalId> {
        self.lock().books.keys().cloned().collect()
    }

    /// Number of refund outcomes waiting to be persisted.
    #[must_use]
    pub fn pending_write_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Returns true if a local write on `date` is not yet confirmed remotely.
    #[must_use]
    pub fn is_dirty(&self, goal_id: &GoalId, date: NaiveDate) -> bool {
        self.lock().dirty.contains_key(&(goal_id.clone(), date))
    }
}

/// Overlays recent local writes onto a remote ledger.
///
/// A dirty date keeps its local record until the remote copy matches it or
/// the marker expires. Dates with a queued write never expire. Returns the
/// merged ledger and the number of local records kept.
fn overlay_local(
    local: &CompletionLedger,
    remote: CompletionLedger,
    dirty: &mut HashMap<DateKey, Instant>,
    pending: &BTreeMap<DateKey, CompletionRecord>,
    now: Instant,
    ttl: Duration,
) -> (CompletionLedger, usize) {
    let goal_id = local.goal_id();
    let mut keep = BTreeMap::new();

    dirty.retain(|key, since| {
        if &key.0 != goal_id {
            return true;
        }
        let date = key.1;
        let queued = pending.contains_key(key);
        let local_record = local.get(date);

        if !queued && local_record.is_some() && local_record == remote.get(date) {
            return false;
        }
        if !queued && now.saturating_duration_since(*since) > ttl {
            debug!(goal_id = %goal_id, date = %date, "dirty marker expired, remote wins");
            return false;
        }
        if let Some(record) = local_record {
            keep.insert(date, record.clone());
        }
        true
    });

    if keep.is_empty() {
        return (remote, 0);
    }

    let kept = keep.len();
    let mut records: Vec<CompletionRecord> = remote
        .iter()
        .filter(|r| !keep.contains_key(&r.date))
        .cloned()
        .collect();
    records.extend(keep.into_values());

    match CompletionLedger::from_records(goal_id.clone(), remote.amount_per_success(), records) {
        Ok(merged) => (merged, kept),
        Err(e) => {
            warn!(goal_id = %goal_id, error = %e, "could not overlay local writes, taking remote");
            (remote, 0)
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
