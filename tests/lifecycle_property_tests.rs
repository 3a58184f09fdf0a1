//! Property-based tests for the contract state machine and shared primitives
//!
//! This module uses the proptest crate to verify invariants that must hold for
//! all inputs, not just the hand-picked cases in the scenario tests: the
//! workflow transition table, calendar-axis advancement, the notification
//! priority ladder, and template rendering.

use contract_lifecycle::contract::{ActualStatus, ApprovalStatus, render_content};
use contract_lifecycle::state::{WorkflowEvent, advance_actual_status, next_approval_status};
use contract_lifecycle::types::{DateStamp, Priority};
use proptest::prelude::*;
use std::collections::BTreeMap;

// PROPERTY TEST STRATEGIES

/// Strategy to generate random workflow events
fn event_strategy() -> impl Strategy<Value = WorkflowEvent> {
    prop_oneof![
        Just(WorkflowEvent::SubmitForApproval),
        Just(WorkflowEvent::Approve),
        Just(WorkflowEvent::Reject),
        Just(WorkflowEvent::Resubmit),
        Just(WorkflowEvent::MarkSigned),
        Just(WorkflowEvent::Complete),
        Just(WorkflowEvent::Cancel),
        Just(WorkflowEvent::AdminUncancel),
    ]
}

/// Strategy to generate random calendar-axis statuses
fn actual_status_strategy() -> impl Strategy<Value = ActualStatus> {
    prop_oneof![
        Just(ActualStatus::Draft),
        Just(ActualStatus::Active),
        Just(ActualStatus::ExpiringSoon),
        Just(ActualStatus::Expired),
        Just(ActualStatus::Completed),
        Just(ActualStatus::Cancelled),
        Just(ActualStatus::Renewed),
    ]
}

/// Apply a signed day offset to a date
fn end_date_for(today: DateStamp, offset: i64) -> DateStamp {
    if offset >= 0 {
        today.plus_days(offset as u64)
    } else {
        today.minus_days(offset.unsigned_abs())
    }
}

/// Strategy to generate placeholder variable bindings with brace-free keys
/// and values
fn variables_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map("[a-z]{1,8}", "[A-Za-z0-9 ]{1,12}", 0..5)
}

// PROPERTY TESTS
proptest! {
    /// Property: no event sequence starting from Draft ever escapes a
    /// terminal workflow state illegally
    ///
    /// Completed has no outgoing edges at all, and the only edge out of
    /// Cancelled is AdminUncancel, which lands on Approved. Every accepted
    /// transition must also actually move the status.
    #[test]
    fn prop_workflow_respects_terminal_states(
        events in prop::collection::vec(event_strategy(), 0..40)
    ) {
        let mut status = ApprovalStatus::Draft;
        for event in events {
            match next_approval_status(status, event) {
                Ok(next) => {
                    prop_assert_ne!(
                        status, ApprovalStatus::Completed,
                        "completed must have no outgoing edges"
                    );
                    if status == ApprovalStatus::Cancelled {
                        prop_assert_eq!(event, WorkflowEvent::AdminUncancel);
                        prop_assert_eq!(next, ApprovalStatus::Approved);
                    }
                    prop_assert_ne!(next, status, "every edge must move the status");
                    status = next;
                }
                Err(_) => {
                    // rejected events must leave the status untouched, which
                    // the pure function guarantees by construction
                }
            }
        }
    }

    /// Property: calendar-axis advancement only ever steps forward
    ///
    /// The scheduler may only produce ExpiringSoon or Expired, never a
    /// regression, and advancing a second time on the same day is a no-op
    /// unless the contract tips over into Expired.
    #[test]
    fn prop_calendar_advance_is_monotonic(
        current in actual_status_strategy(),
        offset in -60i64..60,
    ) {
        let today = DateStamp::new_with(2026, 8, 25);
        let end = end_date_for(today, offset);

        match advance_actual_status(current, Some(end), today) {
            Some(next) => {
                prop_assert!(
                    matches!(next, ActualStatus::ExpiringSoon | ActualStatus::Expired),
                    "advance produced {next:?}"
                );
                prop_assert_ne!(next, current);

                let again = advance_actual_status(next, Some(end), today);
                prop_assert!(
                    again.is_none(),
                    "same-day re-advance must be a no-op, got {again:?}"
                );
            }
            None => {
                // terminal states and contracts outside the window idle; both
                // are covered by the unit tests
            }
        }
    }

    /// Property: terminal calendar states never advance, whatever the dates
    #[test]
    fn prop_terminal_calendar_states_are_final(offset in -60i64..60) {
        let today = DateStamp::new_with(2026, 8, 25);
        let end = end_date_for(today, offset);

        for terminal in [
            ActualStatus::Expired,
            ActualStatus::Completed,
            ActualStatus::Cancelled,
            ActualStatus::Renewed,
        ] {
            prop_assert_eq!(advance_actual_status(terminal, Some(end), today), None);
        }
    }

    /// Property: expiry priority never drops as the deadline approaches
    ///
    /// Fewer days remaining must always map to an equal or higher priority.
    #[test]
    fn prop_priority_rises_toward_deadline(a in -5i64..60, b in -5i64..60) {
        let (near, far) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            Priority::for_days_until_expiry(near) >= Priority::for_days_until_expiry(far),
            "priority at {near} days ranked below priority at {far} days"
        );
    }

    /// Property: rendering substitutes every bound placeholder and leaves no
    /// `{{key}}` marker behind for bound keys
    #[test]
    fn prop_render_replaces_all_bound_placeholders(vars in variables_strategy()) {
        let template: String = vars
            .keys()
            .map(|key| format!("clause {{{{{key}}}}}. "))
            .collect();

        let rendered = render_content(&template, &vars);

        for (key, value) in &vars {
            prop_assert!(
                !rendered.contains(&format!("{{{{{key}}}}}")),
                "placeholder {key} survived rendering"
            );
            prop_assert!(rendered.contains(value));
        }
    }

    /// Property: unknown placeholders are preserved verbatim so a reviewer
    /// can spot unbound variables
    #[test]
    fn prop_render_preserves_unbound_placeholders(
        vars in variables_strategy(),
        unbound in "[a-z]{9,12}",
    ) {
        prop_assume!(!vars.contains_key(&unbound));
        let template = format!("known parts, then {{{{{unbound}}}}}");

        let placeholder = format!("{{{{{unbound}}}}}");
        let rendered = render_content(&template, &vars);
        prop_assert!(rendered.contains(&placeholder));
    }

    /// Property: date arithmetic round-trips and stays signed
    #[test]
    fn prop_date_offsets_round_trip(days in 0u64..10_000) {
        let base = DateStamp::new_with(2026, 8, 25);
        let later = base.plus_days(days);

        prop_assert_eq!(base.days_until(&later), days as i64);
        prop_assert_eq!(later.days_until(&base), -(days as i64));
        prop_assert_eq!(later.minus_days(days), base);
    }
}
