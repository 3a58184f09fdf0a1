//! Pure state machine for the two contract status axes.
//!
//! The workflow axis (`ApprovalStatus`) moves through interactive events and
//! the calendar axis (`ActualStatus`) moves through the daily scheduler. The
//! two tables live here side by side but never read each other's state; a
//! contract can sit at `Signed` on the workflow axis while the calendar axis
//! walks active -> expiring_soon -> expired underneath it.
use crate::contract::{ActualStatus, ApprovalStatus};
use crate::error::LifecycleError;
use crate::types::{Capability, DateStamp};

/// Days before end_date at which a signed contract counts as expiring soon.
pub const EXPIRING_SOON_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowEvent {
    SubmitForApproval,
    Approve,
    Reject,
    Resubmit,
    MarkSigned,
    Complete,
    Cancel,
    AdminUncancel,
}

/// The workflow transition table. Guards that need external data (capability,
/// comments, signature completion) are checked by the caller; this table only
/// answers whether the edge exists.
pub fn next_approval_status(
    from: ApprovalStatus,
    event: WorkflowEvent,
) -> Result<ApprovalStatus, LifecycleError> {
    use ApprovalStatus::*;
    use WorkflowEvent::*;

    let next = match (from, event) {
        (Draft, SubmitForApproval) => PendingApproval,
        (PendingApproval, Approve) => Approved,
        (PendingApproval, Reject) => Rejected,
        (Rejected, Resubmit) => PendingApproval,
        (Approved, MarkSigned) => Signed,
        (Signed, Complete) => Completed,
        (Approved, Cancel) | (Signed, Cancel) => Cancelled,
        (Cancelled, AdminUncancel) => Approved,
        (Cancelled, _) => {
            return Err(LifecycleError::InvalidTransition {
                from,
                event,
                reason: "cancelled is terminal outside the admin uncancel path".into(),
            });
        }
        _ => {
            return Err(LifecycleError::InvalidTransition {
                from,
                event,
                reason: format!("no {event:?} edge out of {from:?}"),
            });
        }
    };
    Ok(next)
}

/// Capability the caller must hold to fire an event. `MarkSigned` is driven
/// by signature completion, not a privileged caller.
pub fn required_capability(event: WorkflowEvent) -> Capability {
    match event {
        WorkflowEvent::SubmitForApproval | WorkflowEvent::Resubmit => Capability::ManageContracts,
        WorkflowEvent::Approve | WorkflowEvent::Reject | WorkflowEvent::Complete => {
            Capability::Review
        }
        WorkflowEvent::Cancel => Capability::ManageContracts,
        WorkflowEvent::AdminUncancel => Capability::AdminOverride,
        WorkflowEvent::MarkSigned => Capability::ManageContracts,
    }
}

/// Calendar-axis advancement for one signed contract.
///
/// Returns the new status, or `None` when nothing changes. Terminal calendar
/// states (expired, completed, cancelled, renewed) never regress; a contract
/// without an end date never advances.
pub fn advance_actual_status(
    current: ActualStatus,
    end_date: Option<DateStamp>,
    today: DateStamp,
) -> Option<ActualStatus> {
    use ActualStatus::*;

    if matches!(current, Expired | Completed | Cancelled | Renewed) {
        return None;
    }
    let end = end_date?;
    let days_left = today.days_until(&end);

    if days_left < 0 {
        Some(Expired)
    } else if days_left <= EXPIRING_SOON_WINDOW_DAYS && current != ExpiringSoon {
        Some(ExpiringSoon)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApprovalStatus::*;
    use WorkflowEvent::*;

    #[test]
    fn happy_path_edges() {
        assert_eq!(
            next_approval_status(Draft, SubmitForApproval).unwrap(),
            PendingApproval
        );
        assert_eq!(next_approval_status(PendingApproval, Approve).unwrap(), Approved);
        assert_eq!(next_approval_status(Approved, MarkSigned).unwrap(), Signed);
        assert_eq!(next_approval_status(Signed, Complete).unwrap(), Completed);
    }

    #[test]
    fn rejection_and_resubmit_cycle() {
        assert_eq!(next_approval_status(PendingApproval, Reject).unwrap(), Rejected);
        assert_eq!(
            next_approval_status(Rejected, Resubmit).unwrap(),
            PendingApproval
        );
    }

    #[test]
    fn cancellation_is_terminal_except_admin_uncancel() {
        assert_eq!(next_approval_status(Approved, Cancel).unwrap(), Cancelled);
        assert_eq!(next_approval_status(Signed, Cancel).unwrap(), Cancelled);
        assert_eq!(
            next_approval_status(Cancelled, AdminUncancel).unwrap(),
            Approved
        );

        for event in [SubmitForApproval, Approve, Reject, Resubmit, MarkSigned, Complete, Cancel] {
            assert!(next_approval_status(Cancelled, event).is_err());
        }
    }

    #[test]
    fn illegal_edges_carry_context() {
        let err = next_approval_status(Draft, Approve).unwrap_err();
        match err {
            LifecycleError::InvalidTransition { from, event, .. } => {
                assert_eq!(from, Draft);
                assert_eq!(event, Approve);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
    }

    #[test]
    fn draft_cannot_be_cancelled() {
        assert!(next_approval_status(Draft, Cancel).is_err());
        assert!(next_approval_status(PendingApproval, Cancel).is_err());
    }

    #[test]
    fn calendar_axis_enters_window_and_expires() {
        let today = DateStamp::new_with(2026, 8, 25);

        let soon = advance_actual_status(
            ActualStatus::Active,
            Some(today.plus_days(10)),
            today,
        );
        assert_eq!(soon, Some(ActualStatus::ExpiringSoon));

        let edge = advance_actual_status(
            ActualStatus::Active,
            Some(today.plus_days(30)),
            today,
        );
        assert_eq!(edge, Some(ActualStatus::ExpiringSoon));

        let expired = advance_actual_status(
            ActualStatus::ExpiringSoon,
            Some(today.minus_days(1)),
            today,
        );
        assert_eq!(expired, Some(ActualStatus::Expired));
    }

    #[test]
    fn calendar_axis_terminal_states_never_regress() {
        let today = DateStamp::new_with(2026, 8, 25);
        let near = Some(today.plus_days(5));

        for terminal in [
            ActualStatus::Expired,
            ActualStatus::Completed,
            ActualStatus::Cancelled,
            ActualStatus::Renewed,
        ] {
            assert_eq!(advance_actual_status(terminal, near, today), None);
        }
    }

    #[test]
    fn calendar_axis_idles_outside_window() {
        let today = DateStamp::new_with(2026, 8, 25);
        assert_eq!(
            advance_actual_status(ActualStatus::Active, Some(today.plus_days(31)), today),
            None
        );
        assert_eq!(advance_actual_status(ActualStatus::Active, None, today), None);
        // already in the window, nothing to do
        assert_eq!(
            advance_actual_status(ActualStatus::ExpiringSoon, Some(today.plus_days(10)), today),
            None
        );
    }
}
