//! Renewal requests linking an expiring contract to its successor
use crate::types::{DateStamp, Priority, TimeStamp};
use crate::utils;
use chrono::Utc;
use std::collections::BTreeMap;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalState {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
    #[n(2)]
    Rejected,
    #[n(3)]
    Cancelled,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone)]
pub struct Renewal {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub original_contract_id: String,
    #[n(2)]
    pub new_contract_id: Option<String>,
    #[n(3)]
    pub requested_by: String,
    #[n(4)]
    pub requested_at: TimeStamp<Utc>,
    #[n(5)]
    pub proposed_value: Option<u64>,
    #[n(6)]
    pub proposed_start_date: Option<DateStamp>,
    #[n(7)]
    pub proposed_end_date: Option<DateStamp>,
    #[n(8)]
    pub proposed_changes: BTreeMap<String, String>,
    #[n(9)]
    pub status: RenewalState,
    #[n(10)]
    pub auto_renewal: bool,
    #[n(11)]
    pub gestor_response: Option<String>,
    #[n(12)]
    pub processed_by: Option<String>,
    #[n(13)]
    pub processed_at: Option<TimeStamp<Utc>>,
    #[n(14)]
    pub escalated_at: Option<TimeStamp<Utc>>,
    #[n(15)]
    pub escalated_to: Option<String>,
    #[n(16)]
    pub escalation_reason: Option<String>,
    #[n(17)]
    pub priority: Priority,
}

/// Proposed terms for the successor contract. Absent fields fall back to the
/// original contract's values when the renewal is approved.
#[derive(Debug, Clone, Default)]
pub struct RenewalProposal {
    pub proposed_value: Option<u64>,
    pub proposed_start_date: Option<DateStamp>,
    pub proposed_end_date: Option<DateStamp>,
    pub proposed_changes: BTreeMap<String, String>,
    pub auto_renewal: bool,
}

impl Renewal {
    pub fn open(
        original_contract_id: &str,
        requested_by: &str,
        proposal: RenewalProposal,
        priority: Priority,
        now: TimeStamp<Utc>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            id: utils::new_uuid_to_bech32("renewal_")?,
            original_contract_id: original_contract_id.to_owned(),
            new_contract_id: None,
            requested_by: requested_by.to_owned(),
            requested_at: now,
            proposed_value: proposal.proposed_value,
            proposed_start_date: proposal.proposed_start_date,
            proposed_end_date: proposal.proposed_end_date,
            proposed_changes: proposal.proposed_changes,
            status: RenewalState::Pending,
            auto_renewal: proposal.auto_renewal,
            gestor_response: None,
            processed_by: None,
            processed_at: None,
            escalated_at: None,
            escalated_to: None,
            escalation_reason: None,
            priority,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == RenewalState::Pending
    }

    pub fn age_hours(&self, now: &TimeStamp<Utc>) -> i64 {
        now.hours_since(&self.requested_at)
    }
}
