//! Property-based tests for CompletionWorkflow.

use chrono::Utc;
use proptest::prelude::*;

use crate::workflow::error::WorkflowError;
use crate::workflow::service::CompletionWorkflow;
use crate::workflow::types::{CompletionStatus, TransitionTrigger};

fn arb_status() -> impl Strategy<Value = CompletionStatus> {
    prop::sample::select(CompletionStatus::ALL.to_vec())
}

fn arb_trigger() -> impl Strategy<Value = TransitionTrigger> {
    prop_oneof![
        Just(TransitionTrigger::Verifier),
        Just(TransitionTrigger::Gateway),
        Just(TransitionTrigger::Reconciliation),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Terminal statuses accept no transition from anyone.
    #[test]
    fn prop_terminal_statuses_are_final(
        current in arb_status(),
        target in arb_status(),
        trigger in arb_trigger(),
    ) {
        prop_assume!(current.is_terminal());
        let result = CompletionWorkflow::transition(current, target, trigger, Utc::now());
        let is_invalid_transition = matches!(result, Err(WorkflowError::InvalidStateTransition { .. }));
        prop_assert!(is_invalid_transition);
    }

    /// A successful transition lands exactly on the requested status.
    #[test]
    fn prop_successful_transition_hits_target(
        current in arb_status(),
        target in arb_status(),
        trigger in arb_trigger(),
    ) {
        if let Ok(action) = CompletionWorkflow::transition(current, target, trigger, Utc::now()) {
            prop_assert_eq!(action.new_status(), target);
            prop_assert_eq!(action.from_status(), current);
            prop_assert!(CompletionWorkflow::is_valid_transition(current, target));
        }
    }

    /// The refund guard passes exactly for Verified and RefundFailed.
    #[test]
    fn prop_refund_guard(current in arb_status()) {
        let allowed = CompletionWorkflow::ensure_refundable(current).is_ok();
        prop_assert_eq!(
            allowed,
            matches!(current, CompletionStatus::Verified | CompletionStatus::RefundFailed)
        );
    }

    /// Reconciliation never transitions an existing record.
    #[test]
    fn prop_reconciliation_never_transitions(current in arb_status(), target in arb_status()) {
        let result = CompletionWorkflow::transition(current, target, TransitionTrigger::Reconciliation, Utc::now());
        prop_assert!(result.is_err());
    }
}
