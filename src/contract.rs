//! Core contract entity and its two orthogonal status axes
use crate::error::LifecycleError;
use crate::types::{Actor, DateStamp, TimeStamp};
use crate::utils;
use chrono::Utc;
use std::collections::BTreeMap;

/// Workflow axis, driven by interactive transitions.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalStatus {
    #[n(0)]
    Draft,
    #[n(1)]
    PendingApproval,
    #[n(2)]
    Approved,
    #[n(3)]
    Rejected,
    #[n(4)]
    Signed,
    #[n(5)]
    Completed,
    #[n(6)]
    Cancelled,
}

/// Calendar axis, driven by the daily scheduler. Never conflated with
/// [`ApprovalStatus`]: a signed contract cycles active -> expiring_soon ->
/// expired on this axis while the workflow axis stays `Signed`.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActualStatus {
    #[n(0)]
    Draft,
    #[n(1)]
    Active,
    #[n(2)]
    ExpiringSoon,
    #[n(3)]
    Expired,
    #[n(4)]
    Completed,
    #[n(5)]
    Cancelled,
    #[n(6)]
    Renewed,
}

/// Coarse lifecycle bucket. Derived from the two real axes, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Draft,
    Active,
    Completed,
    Cancelled,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalType {
    #[n(0)]
    Original,
    #[n(1)]
    ManualRenewal,
    #[n(2)]
    AutoRenewal,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone)]
pub struct Contract {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub template_id: Option<String>,
    #[n(2)]
    pub title: String,
    #[n(3)]
    pub content: String,
    #[n(4)]
    pub generated_content: Option<String>,
    #[n(5)]
    pub variables: BTreeMap<String, String>,
    // denormalized convenience copy of the first signer
    #[n(6)]
    pub client_name: Option<String>,
    #[n(7)]
    pub client_email: Option<String>,
    #[n(8)]
    pub client_phone: Option<String>,
    // monetary value in minor units
    #[n(9)]
    pub contract_value: Option<u64>,
    #[n(10)]
    pub start_date: Option<DateStamp>,
    #[n(11)]
    pub end_date: Option<DateStamp>,
    #[n(12)]
    pub approval_status: ApprovalStatus,
    #[n(13)]
    pub actual_status: ActualStatus,
    #[n(14)]
    pub current_version: u32,
    #[n(15)]
    pub approved_by: Option<String>,
    #[n(16)]
    pub approved_at: Option<TimeStamp<Utc>>,
    #[n(17)]
    pub rejection_reason: Option<String>,
    // kept separate from rejection_reason so report generation can tell a
    // workflow rejection apart from a lifecycle cancellation
    #[n(18)]
    pub cancellation_reason: Option<String>,
    #[n(19)]
    pub notes: Option<String>,
    #[n(20)]
    pub created_by: String,
    #[n(21)]
    pub created_at: TimeStamp<Utc>,
    #[n(22)]
    pub updated_at: TimeStamp<Utc>,
    #[n(23)]
    pub auto_renewal: bool,
    #[n(24)]
    pub parent_contract_id: Option<String>,
    #[n(25)]
    pub renewal_type: RenewalType,
    #[n(26)]
    pub archived: bool,
    #[n(27)]
    pub archived_by: Option<String>,
    #[n(28)]
    pub archived_at: Option<TimeStamp<Utc>>,
}

impl Contract {
    /// Coarse status for listing screens, derived from the two real axes.
    pub fn status(&self) -> Status {
        match (self.approval_status, self.actual_status) {
            (ApprovalStatus::Cancelled, _) | (_, ActualStatus::Cancelled) => Status::Cancelled,
            (ApprovalStatus::Completed, _) | (_, ActualStatus::Completed) => Status::Completed,
            (ApprovalStatus::Signed, _) => Status::Active,
            _ => Status::Draft,
        }
    }
    pub fn days_until_expiry(&self, today: DateStamp) -> Option<i64> {
        self.end_date.map(|end| today.days_until(&end))
    }
}

/// Draft contract under construction. Becomes a [`Contract`] on `build`,
/// which runs the required-field checks and mints the id.
#[derive(Debug, Default)]
pub struct ContractDraft {
    template_id: Option<String>,
    title: String,
    content: String,
    variables: BTreeMap<String, String>,
    contract_value: Option<u64>,
    start_date: Option<DateStamp>,
    end_date: Option<DateStamp>,
    notes: Option<String>,
    auto_renewal: bool,
}

impl ContractDraft {
    /// Construct a new builder object, this becomes the basis for a draft
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_template(mut self, template_id: &str) -> Self {
        self.template_id = Some(template_id.to_owned());
        self
    }
    pub fn set_title(mut self, title: &str) -> Self {
        self.title = title.to_owned();
        self
    }
    pub fn set_content(mut self, content: &str) -> Self {
        self.content = content.to_owned();
        self
    }
    pub fn set_variable(mut self, key: &str, value: &str) -> Self {
        self.variables.insert(key.to_owned(), value.to_owned());
        self
    }
    pub fn set_value(mut self, minor_units: u64) -> Self {
        self.contract_value = Some(minor_units);
        self
    }
    pub fn set_start_date(mut self, date: DateStamp) -> Self {
        self.start_date = Some(date);
        self
    }
    pub fn set_end_date(mut self, date: DateStamp) -> Self {
        self.end_date = Some(date);
        self
    }
    pub fn set_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_owned());
        self
    }
    pub fn set_auto_renewal(mut self, enabled: bool) -> Self {
        self.auto_renewal = enabled;
        self
    }

    /// Checks required fields and date ordering, then assembles the contract
    /// in its initial state with a freshly minted id.
    pub fn validate_and_build(
        self,
        created_by: &Actor,
        now: TimeStamp<Utc>,
    ) -> anyhow::Result<Contract> {
        if self.title.trim().is_empty() {
            return Err(LifecycleError::MissingField("title").into());
        }
        if self.content.trim().is_empty() {
            return Err(LifecycleError::MissingField("content").into());
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date)
            && end < start
        {
            return Err(LifecycleError::MissingField("end_date on or after start_date").into());
        }

        let rendered = render_content(&self.content, &self.variables);

        Ok(Contract {
            id: utils::new_uuid_to_bech32("contract_")?,
            template_id: self.template_id,
            title: self.title,
            content: self.content,
            generated_content: Some(rendered),
            variables: self.variables,
            client_name: None,
            client_email: None,
            client_phone: None,
            contract_value: self.contract_value,
            start_date: self.start_date,
            end_date: self.end_date,
            approval_status: ApprovalStatus::Draft,
            actual_status: ActualStatus::Draft,
            current_version: 1,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            cancellation_reason: None,
            notes: self.notes,
            created_by: created_by.user_id.clone(),
            created_at: now.clone(),
            updated_at: now,
            auto_renewal: self.auto_renewal,
            parent_contract_id: None,
            renewal_type: RenewalType::Original,
            archived: false,
            archived_by: None,
            archived_at: None,
        })
    }
}

/// Substitute `{{key}}` placeholders from the variable bindings. Unknown
/// placeholders are left in place so a reviewer can spot them.
pub fn render_content(template: &str, variables: &BTreeMap<String, String>) -> String {
    let mut rendered = template.to_owned();
    for (key, value) in variables {
        rendered = rendered.replace(&format!("{{{{{key}}}}}"), value);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn gestor() -> Actor {
        Actor::new("user_g1", "Gestor", Role::Gestor)
    }

    #[test]
    fn build_requires_title_and_content() {
        let missing_title = ContractDraft::new()
            .set_content("body")
            .validate_and_build(&gestor(), TimeStamp::new());
        assert!(missing_title.is_err());

        let missing_content = ContractDraft::new()
            .set_title("Lease")
            .validate_and_build(&gestor(), TimeStamp::new());
        assert!(missing_content.is_err());
    }

    #[test]
    fn build_rejects_inverted_dates() {
        let res = ContractDraft::new()
            .set_title("Lease")
            .set_content("body")
            .set_start_date(DateStamp::new_with(2026, 5, 1))
            .set_end_date(DateStamp::new_with(2026, 4, 1))
            .validate_and_build(&gestor(), TimeStamp::new());
        assert!(res.is_err());
    }

    #[test]
    fn build_starts_in_draft_at_version_one() {
        let contract = ContractDraft::new()
            .set_title("Lease")
            .set_content("Hello {{client}}")
            .set_variable("client", "Acme")
            .validate_and_build(&gestor(), TimeStamp::new())
            .unwrap();

        assert_eq!(contract.approval_status, ApprovalStatus::Draft);
        assert_eq!(contract.actual_status, ActualStatus::Draft);
        assert_eq!(contract.current_version, 1);
        assert_eq!(contract.generated_content.as_deref(), Some("Hello Acme"));
        assert!(contract.id.starts_with("contract_1"));
    }

    #[test]
    fn coarse_status_is_derived() {
        let mut contract = ContractDraft::new()
            .set_title("Lease")
            .set_content("body")
            .validate_and_build(&gestor(), TimeStamp::new())
            .unwrap();
        assert_eq!(contract.status(), Status::Draft);

        contract.approval_status = ApprovalStatus::Signed;
        contract.actual_status = ActualStatus::Active;
        assert_eq!(contract.status(), Status::Active);

        contract.actual_status = ActualStatus::Cancelled;
        assert_eq!(contract.status(), Status::Cancelled);
    }

    #[test]
    fn contract_cbor_roundtrip() {
        let original = ContractDraft::new()
            .set_title("Lease")
            .set_content("body")
            .set_value(120_000)
            .set_end_date(DateStamp::new_with(2027, 1, 1))
            .validate_and_build(&gestor(), TimeStamp::new())
            .unwrap();

        let encoded = minicbor::to_vec(&original).unwrap();
        let decoded: Contract = minicbor::decode(&encoded).unwrap();

        assert_eq!(original.id, decoded.id);
        assert_eq!(original.end_date, decoded.end_date);
        assert_eq!(original.approval_status, decoded.approval_status);
    }
}
