//! Daily expiry/renewal batch.
//!
//! Invoked once per calendar day by an external trigger. Five ordered stages;
//! each is isolated so one failure never blocks the rest, and every stage is
//! idempotent so an immediate re-run creates no duplicates. The duplicate
//! check in stage 2 is a narrow time-window existence check right before
//! insert: best-effort under concurrent runs, not strict exactly-once.
use crate::contract::{ActualStatus, ApprovalStatus};
use crate::error::LifecycleError;
use crate::notify::{Notification, NotificationKind};
use crate::renewal::RenewalState;
use crate::service::ContractService;
use crate::state;
use crate::types::{Actor, Priority, TimeStamp};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

pub const NOTIFICATION_THRESHOLDS: [i64; 5] = [30, 15, 10, 5, 1];
/// Thresholds at or under which reviewers get an urgent copy.
pub const REVIEWER_ALERT_THRESHOLD_DAYS: i64 = 5;
pub const AUTO_RENEWAL_COOLDOWN_HOURS: i64 = 24;
pub const ESCALATION_AGE_HOURS: i64 = 72;
pub const DUPLICATE_WINDOW_HOURS: u64 = 24;
pub const NOTIFICATION_RETENTION_DAYS: u64 = 30;

pub struct ExpiryScheduler<'a> {
    service: &'a ContractService,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum StageOutcome<T> {
    Completed(T),
    Failed { error: String },
}

impl<T> StageOutcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, StageOutcome::Completed(_))
    }
    pub fn counts(&self) -> Option<&T> {
        match self {
            StageOutcome::Completed(counts) => Some(counts),
            StageOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct StatusAdvanceCounts {
    pub expiring_soon: u64,
    pub expired: u64,
}

#[derive(Debug, Default, Serialize)]
pub struct NotificationCounts {
    pub created: u64,
    pub reviewer_alerts: u64,
    pub skipped_duplicates: u64,
}

#[derive(Debug, Default, Serialize)]
pub struct AutoRenewalCounts {
    pub approved: u64,
    pub contracts_created: u64,
}

#[derive(Debug, Default, Serialize)]
pub struct EscalationCounts {
    pub escalated: u64,
}

#[derive(Debug, Default, Serialize)]
pub struct CleanupCounts {
    pub deleted_read: u64,
    pub deleted_expired: u64,
}

#[derive(Debug, Serialize)]
pub struct StageResults {
    pub status_updates: StageOutcome<StatusAdvanceCounts>,
    pub notifications: StageOutcome<NotificationCounts>,
    pub auto_renewals: StageOutcome<AutoRenewalCounts>,
    pub escalations: StageOutcome<EscalationCounts>,
    pub cleanup: StageOutcome<CleanupCounts>,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub success: bool,
    pub executed_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub results: StageResults,
}

impl RunSummary {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                "{{\"success\":false,\"error\":\"failed to serialize run summary: {e}\",\"executed_at\":\"{}\"}}",
                self.executed_at
            )
        })
    }
}

fn run_stage<T>(
    name: &str,
    stage: impl FnOnce() -> Result<T, LifecycleError>,
) -> StageOutcome<T> {
    match stage() {
        Ok(counts) => StageOutcome::Completed(counts),
        Err(err) => {
            warn!(stage = name, error = %err, "scheduler stage failed, continuing");
            StageOutcome::Failed {
                error: err.to_string(),
            }
        }
    }
}

impl<'a> ExpiryScheduler<'a> {
    pub fn new(service: &'a ContractService) -> Self {
        Self { service }
    }

    /// Run all five stages for the day `now` falls on. Stage failures are
    /// recorded in the summary; later stages still run.
    pub fn run_daily(&self, now: TimeStamp<Utc>, reviewers: &[Actor]) -> RunSummary {
        info!(executed_at = %now.to_rfc3339(), "starting daily contract expiry run");

        let status_updates = run_stage("status_advancement", || self.advance_statuses(&now));
        let notifications = run_stage("notification_fanout", || {
            self.fan_out_expiry_notices(&now, reviewers)
        });
        let auto_renewals = run_stage("auto_renewals", || self.resolve_auto_renewals(&now));
        let escalations = run_stage("escalations", || self.escalate_stale_renewals(&now, reviewers));
        let cleanup = run_stage("notification_cleanup", || self.cleanup_notifications(&now));

        let results = StageResults {
            status_updates,
            notifications,
            auto_renewals,
            escalations,
            cleanup,
        };
        let failed: Vec<&str> = [
            ("status_updates", results.status_updates.is_ok()),
            ("notifications", results.notifications.is_ok()),
            ("auto_renewals", results.auto_renewals.is_ok()),
            ("escalations", results.escalations.is_ok()),
            ("cleanup", results.cleanup.is_ok()),
        ]
        .iter()
        .filter(|(_, ok)| !ok)
        .map(|(name, _)| *name)
        .collect();

        RunSummary {
            success: failed.is_empty(),
            executed_at: now.to_rfc3339(),
            error: if failed.is_empty() {
                None
            } else {
                Some(format!("stages failed: {}", failed.join(", ")))
            },
            results,
        }
    }

    /// Stage 1: advance the calendar axis of every signed contract. Terminal
    /// calendar states are excluded inside the transition function, so a
    /// cancelled or renewed contract is never touched.
    fn advance_statuses(&self, now: &TimeStamp<Utc>) -> Result<StatusAdvanceCounts, LifecycleError> {
        let today = now.date_utc();
        let mut counts = StatusAdvanceCounts::default();

        for contract in self
            .service
            .store()
            .find_by_approval_status(ApprovalStatus::Signed)?
        {
            let Some(next) =
                state::advance_actual_status(contract.actual_status, contract.end_date, today)
            else {
                continue;
            };
            self.service.store().update_contract_with(&contract.id, |c| {
                c.actual_status = next;
                c.updated_at = now.clone();
                Ok(())
            })?;
            match next {
                ActualStatus::ExpiringSoon => counts.expiring_soon += 1,
                ActualStatus::Expired => counts.expired += 1,
                _ => {}
            }
        }
        info!(
            expiring_soon = counts.expiring_soon,
            expired = counts.expired,
            "status advancement done"
        );
        Ok(counts)
    }

    /// Stage 2: graduated expiry warnings at fixed day thresholds, with an
    /// urgent reviewer fan-out close to the deadline.
    fn fan_out_expiry_notices(
        &self,
        now: &TimeStamp<Utc>,
        reviewers: &[Actor],
    ) -> Result<NotificationCounts, LifecycleError> {
        let today = now.date_utc();
        let mut counts = NotificationCounts::default();

        for threshold in NOTIFICATION_THRESHOLDS {
            let target = today.plus_days(threshold as u64);
            for contract in self.service.store().find_signed_ending_on(target)? {
                if !matches!(
                    contract.actual_status,
                    ActualStatus::Active | ActualStatus::ExpiringSoon
                ) {
                    continue;
                }
                // existence check immediately before insert bounds the
                // duplicate risk under concurrent runs
                if self.recent_expiry_notice_exists(&contract.id, threshold, now)? {
                    counts.skipped_duplicates += 1;
                    continue;
                }

                self.service
                    .store()
                    .insert_notification(&expiring_notice(&contract, threshold, now)?)?;
                counts.created += 1;

                if threshold <= REVIEWER_ALERT_THRESHOLD_DAYS {
                    for reviewer in reviewers {
                        self.service.store().insert_notification(
                            &reviewer_alert(&contract, reviewer, threshold, now)?,
                        )?;
                        counts.reviewer_alerts += 1;
                    }
                }
            }
        }
        info!(
            created = counts.created,
            reviewer_alerts = counts.reviewer_alerts,
            "expiry notification fan-out done"
        );
        Ok(counts)
    }

    fn recent_expiry_notice_exists(
        &self,
        contract_id: &str,
        days: i64,
        now: &TimeStamp<Utc>,
    ) -> Result<bool, LifecycleError> {
        let cutoff = now.minus_hours(DUPLICATE_WINDOW_HOURS);
        Ok(self.service.store().notifications()?.iter().any(|n| {
            n.kind == NotificationKind::ContractExpiring
                && n.data.contract_id.as_deref() == Some(contract_id)
                && n.data.days_until_expiry == Some(days)
                && n.created_at >= cutoff
        }))
    }

    /// Stage 3: auto-renewals pending past the cooldown are approved and the
    /// successor contract synthesized. The CAS on the renewal record makes a
    /// re-run (or a racing interactive resolution) a no-op.
    fn resolve_auto_renewals(
        &self,
        now: &TimeStamp<Utc>,
    ) -> Result<AutoRenewalCounts, LifecycleError> {
        let mut counts = AutoRenewalCounts::default();

        for renewal in self.service.store().renewals()? {
            if !renewal.auto_renewal
                || !renewal.is_pending()
                || renewal.age_hours(now) < AUTO_RENEWAL_COOLDOWN_HOURS
            {
                continue;
            }
            let original = match self.service.store().get_contract(&renewal.original_contract_id)
            {
                Ok(contract) => contract,
                Err(err) => {
                    warn!(renewal = %renewal.id, error = %err, "skipping auto-renewal");
                    continue;
                }
            };

            let mut approved = renewal.clone();
            approved.status = RenewalState::Approved;
            approved.processed_by = Some(original.created_by.clone());
            approved.processed_at = Some(now.clone());
            approved.gestor_response =
                Some("Automatic approval after scheduled renewal cooldown".to_owned());

            match self.service.store().replace_renewal(&renewal, &approved) {
                Ok(()) => {}
                Err(LifecycleError::WriteConflict(_)) => continue,
                Err(err) => return Err(err),
            }
            counts.approved += 1;

            let successor = self
                .service
                .create_successor_contract(&original, &approved, now.clone())
                .map_err(|e| LifecycleError::StoreUnavailable(e.to_string()))?;
            approved.new_contract_id = Some(successor.id.clone());
            self.service.store().insert_renewal(&approved)?;
            counts.contracts_created += 1;

            self.service.store().update_contract_with(&original.id, |c| {
                c.actual_status = ActualStatus::Renewed;
                c.updated_at = now.clone();
                Ok(())
            })?;

            let notice = Notification::renewal_resolved(
                &approved.requested_by,
                &approved.id,
                &original.id,
                &original.title,
                Some(&successor.id),
                true,
                now.clone(),
            )
            .map_err(|e| LifecycleError::Codec(e.to_string()))?;
            self.service.store().insert_notification(&notice)?;
        }
        info!(approved = counts.approved, "auto-renewal resolution done");
        Ok(counts)
    }

    /// Stage 4: manual renewals pending for three days with no response are
    /// escalated to one reviewer, exactly once.
    fn escalate_stale_renewals(
        &self,
        now: &TimeStamp<Utc>,
        reviewers: &[Actor],
    ) -> Result<EscalationCounts, LifecycleError> {
        let mut counts = EscalationCounts::default();

        for renewal in self.service.store().renewals()? {
            if renewal.auto_renewal
                || !renewal.is_pending()
                || renewal.escalated_at.is_some()
                || renewal.age_hours(now) < ESCALATION_AGE_HOURS
            {
                continue;
            }
            let Some(reviewer) = reviewers.first() else {
                warn!(renewal = %renewal.id, "no reviewer available for escalation");
                break;
            };

            let mut escalated = renewal.clone();
            escalated.escalated_at = Some(now.clone());
            escalated.escalated_to = Some(reviewer.user_id.clone());
            escalated.escalation_reason =
                Some("Renewal request unanswered for more than 3 days".to_owned());
            escalated.priority = Priority::Urgent;

            match self.service.store().replace_renewal(&renewal, &escalated) {
                Ok(()) => {}
                Err(LifecycleError::WriteConflict(_)) => continue,
                Err(err) => return Err(err),
            }
            counts.escalated += 1;

            let original = self.service.store().get_contract(&renewal.original_contract_id)?;
            let notice = Notification::renewal_escalated(
                &reviewer.user_id,
                &renewal.id,
                &original.id,
                &original.title,
                &original.created_by,
                now.clone(),
            )
            .map_err(|e| LifecycleError::Codec(e.to_string()))?;
            self.service.store().insert_notification(&notice)?;
        }
        info!(escalated = counts.escalated, "escalation pass done");
        Ok(counts)
    }

    /// Stage 5: drop read notifications older than the retention window and
    /// anything past its explicit expiry.
    fn cleanup_notifications(&self, now: &TimeStamp<Utc>) -> Result<CleanupCounts, LifecycleError> {
        let read_cutoff = now.minus_days(NOTIFICATION_RETENTION_DAYS);
        let mut counts = CleanupCounts::default();

        for notification in self.service.store().notifications()? {
            let expired = notification
                .expires_at
                .as_ref()
                .is_some_and(|expiry| *expiry < *now);
            let stale_read = notification
                .read_at
                .as_ref()
                .is_some_and(|read| *read < read_cutoff);

            if expired {
                self.service.store().remove_notification(&notification.id)?;
                counts.deleted_expired += 1;
            } else if stale_read {
                self.service.store().remove_notification(&notification.id)?;
                counts.deleted_read += 1;
            }
        }
        info!(
            deleted_read = counts.deleted_read,
            deleted_expired = counts.deleted_expired,
            "notification cleanup done"
        );
        Ok(counts)
    }
}

fn expiring_notice(
    contract: &crate::contract::Contract,
    threshold: i64,
    now: &TimeStamp<Utc>,
) -> Result<Notification, LifecycleError> {
    Notification::contract_expiring(
        &contract.created_by,
        &contract.id,
        &contract.title,
        threshold,
        contract.auto_renewal,
        now.clone(),
    )
    .map_err(|e| LifecycleError::Codec(e.to_string()))
}

fn reviewer_alert(
    contract: &crate::contract::Contract,
    reviewer: &Actor,
    threshold: i64,
    now: &TimeStamp<Utc>,
) -> Result<Notification, LifecycleError> {
    Notification::contract_expiring_reviewer_alert(
        &reviewer.user_id,
        &contract.id,
        &contract.title,
        &contract.created_by,
        threshold,
        now.clone(),
    )
    .map_err(|e| LifecycleError::Codec(e.to_string()))
}
