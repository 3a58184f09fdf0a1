//! Notification records handed to the external delivery layer.
//!
//! The core only writes these rows; email/push/in-app delivery is someone
//! else's job. Payloads are a typed field set rather than a free-form map,
//! and every kind is built through a constructor that fills exactly the
//! fields that kind documents.
use crate::types::{Priority, TimeStamp};
use crate::utils;
use chrono::Utc;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    #[n(0)]
    ContractExpiring,
    #[n(1)]
    ContractApproved,
    #[n(2)]
    ContractRejected,
    #[n(3)]
    ContractSigned,
    #[n(4)]
    RenewalRequest,
    #[n(5)]
    RenewalApproved,
    #[n(6)]
    RenewalRejected,
}

/// Typed payload. Known fields per kind:
///
/// - `ContractExpiring`: contract_id, days_until_expiry, auto_renewal
/// - `ContractApproved` / `ContractRejected` / `ContractSigned`: contract_id
/// - `RenewalRequest`: renewal_id, contract_id, escalated_from on escalation
/// - `RenewalApproved`: renewal_id, contract_id, new_contract_id, auto_renewal
/// - `RenewalRejected`: renewal_id, contract_id
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Default)]
pub struct NotificationData {
    #[n(0)]
    pub contract_id: Option<String>,
    #[n(1)]
    pub renewal_id: Option<String>,
    #[n(2)]
    pub new_contract_id: Option<String>,
    #[n(3)]
    pub days_until_expiry: Option<i64>,
    #[n(4)]
    pub auto_renewal: Option<bool>,
    #[n(5)]
    pub escalated_from: Option<String>,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone)]
pub struct Notification {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub user_id: String,
    #[n(2)]
    pub kind: NotificationKind,
    #[n(3)]
    pub title: String,
    #[n(4)]
    pub message: String,
    #[n(5)]
    pub data: NotificationData,
    #[n(6)]
    pub priority: Priority,
    #[n(7)]
    pub action_url: Option<String>,
    #[n(8)]
    pub action_label: Option<String>,
    #[n(9)]
    pub read_at: Option<TimeStamp<Utc>>,
    #[n(10)]
    pub expires_at: Option<TimeStamp<Utc>>,
    #[n(11)]
    pub created_at: TimeStamp<Utc>,
}

impl Notification {
    fn assemble(
        user_id: &str,
        kind: NotificationKind,
        title: String,
        message: String,
        data: NotificationData,
        priority: Priority,
        action_url: Option<String>,
        action_label: Option<&str>,
        now: TimeStamp<Utc>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            id: utils::new_uuid_to_bech32("notif_")?,
            user_id: user_id.to_owned(),
            kind,
            title,
            message,
            data,
            priority,
            action_url,
            action_label: action_label.map(str::to_owned),
            read_at: None,
            expires_at: None,
            created_at: now,
        })
    }

    /// Expiry warning for the contract owner.
    pub fn contract_expiring(
        owner_id: &str,
        contract_id: &str,
        contract_title: &str,
        days_until_expiry: i64,
        auto_renewal: bool,
        now: TimeStamp<Utc>,
    ) -> anyhow::Result<Self> {
        let plural = if days_until_expiry == 1 { "day" } else { "days" };
        Self::assemble(
            owner_id,
            NotificationKind::ContractExpiring,
            format!("Contract expires in {days_until_expiry} {plural}"),
            format!(
                "Contract \"{contract_title}\" expires in {days_until_expiry} {plural}{}",
                if auto_renewal { " (auto-renewal enabled)" } else { "" }
            ),
            NotificationData {
                contract_id: Some(contract_id.to_owned()),
                days_until_expiry: Some(days_until_expiry),
                auto_renewal: Some(auto_renewal),
                ..Default::default()
            },
            Priority::for_days_until_expiry(days_until_expiry),
            Some(format!("/dashboard/contracts/{contract_id}")),
            Some(if auto_renewal { "View Status" } else { "Request Renewal" }),
            now,
        )
    }

    /// Urgent copy of an expiry warning fanned out to a reviewer.
    pub fn contract_expiring_reviewer_alert(
        reviewer_id: &str,
        contract_id: &str,
        contract_title: &str,
        owner_id: &str,
        days_until_expiry: i64,
        now: TimeStamp<Utc>,
    ) -> anyhow::Result<Self> {
        Self::assemble(
            reviewer_id,
            NotificationKind::ContractExpiring,
            format!("Critical contract expires in {days_until_expiry} days"),
            format!("Contract \"{contract_title}\" is about to expire and needs review"),
            NotificationData {
                contract_id: Some(contract_id.to_owned()),
                days_until_expiry: Some(days_until_expiry),
                escalated_from: Some(owner_id.to_owned()),
                ..Default::default()
            },
            Priority::Urgent,
            Some(format!("/dashboard/contracts/{contract_id}")),
            Some("Review Contract"),
            now,
        )
    }

    pub fn contract_reviewed(
        owner_id: &str,
        contract_id: &str,
        contract_title: &str,
        approved: bool,
        now: TimeStamp<Utc>,
    ) -> anyhow::Result<Self> {
        let (kind, title, verb) = if approved {
            (NotificationKind::ContractApproved, "Contract approved", "approved")
        } else {
            (NotificationKind::ContractRejected, "Contract rejected", "rejected")
        };
        Self::assemble(
            owner_id,
            kind,
            title.to_owned(),
            format!("Contract \"{contract_title}\" was {verb}"),
            NotificationData {
                contract_id: Some(contract_id.to_owned()),
                ..Default::default()
            },
            Priority::High,
            Some(format!("/dashboard/contracts/{contract_id}")),
            Some("View Contract"),
            now,
        )
    }

    pub fn contract_signed(
        owner_id: &str,
        contract_id: &str,
        contract_title: &str,
        now: TimeStamp<Utc>,
    ) -> anyhow::Result<Self> {
        Self::assemble(
            owner_id,
            NotificationKind::ContractSigned,
            "Contract fully signed".to_owned(),
            format!("All signatories have signed \"{contract_title}\""),
            NotificationData {
                contract_id: Some(contract_id.to_owned()),
                ..Default::default()
            },
            Priority::High,
            Some(format!("/dashboard/contracts/{contract_id}")),
            Some("View Contract"),
            now,
        )
    }

    pub fn renewal_request(
        recipient_id: &str,
        renewal_id: &str,
        contract_id: &str,
        contract_title: &str,
        priority: Priority,
        now: TimeStamp<Utc>,
    ) -> anyhow::Result<Self> {
        Self::assemble(
            recipient_id,
            NotificationKind::RenewalRequest,
            "New renewal request".to_owned(),
            format!("A renewal was requested for contract \"{contract_title}\""),
            NotificationData {
                contract_id: Some(contract_id.to_owned()),
                renewal_id: Some(renewal_id.to_owned()),
                ..Default::default()
            },
            priority,
            Some(format!("/dashboard/renewals/{renewal_id}")),
            Some("View Request"),
            now,
        )
    }

    /// Escalation notice for the reviewer a stale renewal was handed to.
    pub fn renewal_escalated(
        reviewer_id: &str,
        renewal_id: &str,
        contract_id: &str,
        contract_title: &str,
        owner_id: &str,
        now: TimeStamp<Utc>,
    ) -> anyhow::Result<Self> {
        Self::assemble(
            reviewer_id,
            NotificationKind::RenewalRequest,
            "Escalated renewal needs attention".to_owned(),
            format!(
                "A renewal request for \"{contract_title}\" was escalated after going unanswered"
            ),
            NotificationData {
                contract_id: Some(contract_id.to_owned()),
                renewal_id: Some(renewal_id.to_owned()),
                escalated_from: Some(owner_id.to_owned()),
                ..Default::default()
            },
            Priority::Urgent,
            Some(format!("/dashboard/renewals/{renewal_id}")),
            Some("Review Now"),
            now,
        )
    }

    pub fn renewal_resolved(
        requester_id: &str,
        renewal_id: &str,
        contract_id: &str,
        contract_title: &str,
        new_contract_id: Option<&str>,
        auto: bool,
        now: TimeStamp<Utc>,
    ) -> anyhow::Result<Self> {
        let approved = new_contract_id.is_some();
        let (kind, title) = match (approved, auto) {
            (true, true) => (NotificationKind::RenewalApproved, "Automatic renewal processed"),
            (true, false) => (NotificationKind::RenewalApproved, "Renewal approved"),
            (false, _) => (NotificationKind::RenewalRejected, "Renewal rejected"),
        };
        let message = if approved {
            format!("Contract \"{contract_title}\" was renewed")
        } else {
            format!("The renewal request for \"{contract_title}\" was rejected")
        };
        let action_url = new_contract_id
            .map(|id| format!("/dashboard/contracts/{id}"))
            .or(Some(format!("/dashboard/renewals/{renewal_id}")));
        Self::assemble(
            requester_id,
            kind,
            title.to_owned(),
            message,
            NotificationData {
                contract_id: Some(contract_id.to_owned()),
                renewal_id: Some(renewal_id.to_owned()),
                new_contract_id: new_contract_id.map(str::to_owned),
                auto_renewal: Some(auto),
                ..Default::default()
            },
            if approved { Priority::High } else { Priority::Medium },
            action_url,
            Some(if approved { "View New Contract" } else { "View Request" }),
            now,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_priority_follows_threshold() {
        let now = TimeStamp::new();
        let urgent =
            Notification::contract_expiring("user_1", "contract_1", "Lease", 1, false, now.clone())
                .unwrap();
        assert_eq!(urgent.priority, Priority::Urgent);

        let low =
            Notification::contract_expiring("user_1", "contract_1", "Lease", 30, false, now)
                .unwrap();
        assert_eq!(low.priority, Priority::Low);
        assert_eq!(low.data.days_until_expiry, Some(30));
        assert_eq!(low.data.contract_id.as_deref(), Some("contract_1"));
    }

    #[test]
    fn reviewer_alert_is_always_urgent() {
        let alert = Notification::contract_expiring_reviewer_alert(
            "user_sup",
            "contract_1",
            "Lease",
            "user_owner",
            5,
            TimeStamp::new(),
        )
        .unwrap();
        assert_eq!(alert.priority, Priority::Urgent);
        assert_eq!(alert.data.escalated_from.as_deref(), Some("user_owner"));
    }

    #[test]
    fn renewal_resolution_carries_successor_link() {
        let approved = Notification::renewal_resolved(
            "user_1",
            "renewal_1",
            "contract_1",
            "Lease",
            Some("contract_2"),
            true,
            TimeStamp::new(),
        )
        .unwrap();
        assert_eq!(approved.kind, NotificationKind::RenewalApproved);
        assert_eq!(approved.data.new_contract_id.as_deref(), Some("contract_2"));

        let rejected = Notification::renewal_resolved(
            "user_1",
            "renewal_1",
            "contract_1",
            "Lease",
            None,
            false,
            TimeStamp::new(),
        )
        .unwrap();
        assert_eq!(rejected.kind, NotificationKind::RenewalRejected);
        assert!(rejected.data.new_contract_id.is_none());
    }

    #[test]
    fn notification_cbor_roundtrip() {
        let original =
            Notification::contract_signed("user_1", "contract_1", "Lease", TimeStamp::new())
                .unwrap();

        let encoded = minicbor::to_vec(&original).unwrap();
        let decoded: Notification = minicbor::decode(&encoded).unwrap();

        assert_eq!(original.id, decoded.id);
        assert_eq!(original.kind, decoded.kind);
        assert_eq!(original.data.contract_id, decoded.data.contract_id);
    }
}
