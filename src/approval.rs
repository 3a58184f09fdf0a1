//! One request/review cycle for a contract version
use crate::types::TimeStamp;
use crate::utils;
use chrono::Utc;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalState {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
    #[n(2)]
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone)]
pub struct Approval {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub contract_id: String,
    #[n(2)]
    pub version_number: u32,
    #[n(3)]
    pub requested_by: String,
    #[n(4)]
    pub requested_at: TimeStamp<Utc>,
    #[n(5)]
    pub reviewed_by: Option<String>,
    #[n(6)]
    pub reviewed_at: Option<TimeStamp<Utc>>,
    #[n(7)]
    pub status: ApprovalState,
    #[n(8)]
    pub comments: Option<String>,
}

impl Approval {
    pub fn open(
        contract_id: &str,
        version_number: u32,
        requested_by: &str,
        now: TimeStamp<Utc>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            id: utils::new_uuid_to_bech32("approval_")?,
            contract_id: contract_id.to_owned(),
            version_number,
            requested_by: requested_by.to_owned(),
            requested_at: now,
            reviewed_by: None,
            reviewed_at: None,
            status: ApprovalState::Pending,
            comments: None,
        })
    }

    /// One-way: pending is the only mutable state. The caller checks the
    /// pending guard before calling.
    pub fn resolve(
        &mut self,
        reviewer: &str,
        decision: ReviewDecision,
        comments: Option<String>,
        now: TimeStamp<Utc>,
    ) {
        self.reviewed_by = Some(reviewer.to_owned());
        self.reviewed_at = Some(now);
        self.comments = comments;
        self.status = match decision {
            ReviewDecision::Approve => ApprovalState::Approved,
            ReviewDecision::Reject => ApprovalState::Rejected,
        };
    }

    pub fn is_pending(&self) -> bool {
        self.status == ApprovalState::Pending
    }
}
