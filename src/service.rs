//! Service layer API for interactive contract workflow operations
use crate::approval::{Approval, ReviewDecision};
use crate::audit::AuditEntry;
use crate::contract::{
    ActualStatus, ApprovalStatus, Contract, ContractDraft, RenewalType, render_content,
};
use crate::error::LifecycleError;
use crate::notify::Notification;
use crate::renewal::{Renewal, RenewalProposal, RenewalState};
use crate::signatory::{
    self, SignatoryDraft, SignatoryStatus, SignatureCapture, SignerIdentity, Signatory,
};
use crate::state::{self, WorkflowEvent};
use crate::store::ContractStore;
use crate::types::{Actor, Capability, Priority, TimeStamp};
use crate::utils;
use crate::version::Version;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

pub struct ContractService {
    store: ContractStore,
}

/// Result of matching a newly registered user against unlinked signatories.
#[derive(Debug, Default)]
pub struct LinkOutcome {
    pub bound: Vec<String>,
    pub already_bound: Vec<String>,
    pub conflicts: Vec<String>,
}

impl ContractService {
    pub fn new(instance: Arc<sled::Db>) -> anyhow::Result<Self> {
        Ok(Self {
            store: ContractStore::open(instance)?,
        })
    }

    pub fn store(&self) -> &ContractStore {
        &self.store
    }

    fn require(&self, actor: &Actor, cap: Capability) -> Result<(), LifecycleError> {
        if actor.has(cap) {
            Ok(())
        } else {
            Err(LifecycleError::NotAuthorized(cap))
        }
    }

    fn require_event(&self, actor: &Actor, event: WorkflowEvent) -> Result<(), LifecycleError> {
        self.require(actor, state::required_capability(event))
    }

    /// Create a draft contract together with its required signers. The first
    /// signer is denormalized into the client_* convenience fields.
    pub fn create_contract(
        &self,
        draft: ContractDraft,
        signers: Vec<SignatoryDraft>,
        actor: &Actor,
    ) -> anyhow::Result<Contract> {
        self.require(actor, Capability::ManageContracts)?;

        let now = TimeStamp::new();
        let mut contract = draft.validate_and_build(actor, now.clone())?;
        if let Some(first) = signers.first() {
            contract.client_name = Some(first.name.clone());
            contract.client_email = Some(first.email.clone());
            contract.client_phone = first.phone.clone();
        }
        self.store.insert_contract(&contract)?;

        for (index, signer) in signers.into_iter().enumerate() {
            let signatory = signer.into_signatory(&contract.id, index as u32 + 1)?;
            self.store.insert_signatory(&signatory)?;
        }

        let snapshot = Version::snapshot(
            &contract.id,
            1,
            &contract.content,
            &contract.variables,
            &actor.user_id,
            Some("initial draft".to_owned()),
            now.clone(),
        )?;
        self.store.insert_version(&snapshot)?;

        self.audit(&contract.id, "contract_created", "contract", None, actor, None, now)?;

        Ok(contract)
    }

    /// `draft -> pending_approval`. Reserves the single pending-approval slot
    /// before touching the contract, so a racing second submit loses with
    /// `DuplicatePendingApproval`.
    pub fn submit_for_approval(
        &self,
        contract_id: &str,
        actor: &Actor,
    ) -> anyhow::Result<Contract> {
        let event = WorkflowEvent::SubmitForApproval;
        self.require_event(actor, event)?;

        let contract = self.store.get_contract(contract_id)?;
        let next = state::next_approval_status(contract.approval_status, event)?;
        self.check_submittable(&contract, event)?;

        let now = TimeStamp::new();
        let approval = Approval::open(
            contract_id,
            contract.current_version,
            &actor.user_id,
            now.clone(),
        )?;
        self.store
            .reserve_pending_approval(contract_id, &approval.id)?;
        self.store.insert_approval(&approval)?;

        let updated = match self.store.update_contract_if_status(
            contract_id,
            ApprovalStatus::Draft,
            |c| {
                c.approval_status = next;
                c.updated_at = now.clone();
                Ok(())
            },
        ) {
            Ok(updated) => updated,
            Err(err) => {
                // undo the reservation so the contract is not wedged
                let _ = self
                    .store
                    .release_pending_approval(contract_id, &approval.id);
                return Err(err.into());
            }
        };

        self.audit(
            contract_id,
            "submitted_for_approval",
            "approval",
            Some(&approval.id),
            actor,
            None,
            now,
        )?;

        Ok(updated)
    }

    fn check_submittable(
        &self,
        contract: &Contract,
        event: WorkflowEvent,
    ) -> Result<(), LifecycleError> {
        if contract.template_id.is_none() {
            return Err(LifecycleError::InvalidTransition {
                from: contract.approval_status,
                event,
                reason: "a template is required before submission".into(),
            });
        }
        if self.store.signatories_for(&contract.id)?.is_empty() {
            return Err(LifecycleError::InvalidTransition {
                from: contract.approval_status,
                event,
                reason: "at least one signatory is required before submission".into(),
            });
        }
        Ok(())
    }

    /// Review the pending approval cycle: approve or reject. Rejection
    /// requires comments. The contract transition rides along atomically on
    /// the contract row.
    pub fn resolve_approval(
        &self,
        approval_id: &str,
        reviewer: &Actor,
        decision: ReviewDecision,
        comments: Option<String>,
    ) -> anyhow::Result<Contract> {
        let event = match decision {
            ReviewDecision::Approve => WorkflowEvent::Approve,
            ReviewDecision::Reject => WorkflowEvent::Reject,
        };
        self.require_event(reviewer, event)?;

        let approval = self.store.get_approval(approval_id)?;
        if !approval.is_pending() {
            return Err(LifecycleError::NotPending(approval_id.to_owned()).into());
        }
        if decision == ReviewDecision::Reject
            && comments.as_deref().map_or(true, |c| c.trim().is_empty())
        {
            return Err(LifecycleError::CommentsRequired.into());
        }

        let contract = self.store.get_contract(&approval.contract_id)?;
        let next = state::next_approval_status(contract.approval_status, event)?;

        let now = TimeStamp::new();
        let mut resolved = approval.clone();
        resolved.resolve(&reviewer.user_id, decision, comments.clone(), now.clone());
        self.store.replace_approval(&approval, &resolved)?;

        let updated = self.store.update_contract_if_status(
            &approval.contract_id,
            ApprovalStatus::PendingApproval,
            |c| {
                c.approval_status = next;
                c.updated_at = now.clone();
                match decision {
                    ReviewDecision::Approve => {
                        c.approved_by = Some(reviewer.user_id.clone());
                        c.approved_at = Some(now.clone());
                        c.rejection_reason = None;
                    }
                    ReviewDecision::Reject => {
                        c.rejection_reason = comments.clone();
                        c.approved_by = None;
                        c.approved_at = None;
                    }
                }
                Ok(())
            },
        )?;
        self.store
            .release_pending_approval(&approval.contract_id, approval_id)?;

        let action = match decision {
            ReviewDecision::Approve => "approval_granted",
            ReviewDecision::Reject => "approval_rejected",
        };
        self.audit(
            &approval.contract_id,
            action,
            "approval",
            Some(approval_id),
            reviewer,
            resolved.comments.clone(),
            now.clone(),
        )?;

        let approved = decision == ReviewDecision::Approve;
        self.store.insert_notification(&Notification::contract_reviewed(
            &updated.created_by,
            &updated.id,
            &updated.title,
            approved,
            now,
        )?)?;

        Ok(updated)
    }

    /// Resubmission after rejection: a fresh approval cycle bound to an
    /// incremented version. The signatory list carries forward unchanged.
    pub fn resubmit(
        &self,
        contract_id: &str,
        new_content: &str,
        variables: BTreeMap<String, String>,
        change_summary: &str,
        actor: &Actor,
    ) -> anyhow::Result<Contract> {
        let event = WorkflowEvent::Resubmit;
        self.require_event(actor, event)?;

        let contract = self.store.get_contract(contract_id)?;
        let next = state::next_approval_status(contract.approval_status, event)?;
        let new_version = contract.current_version + 1;

        let now = TimeStamp::new();
        let approval = Approval::open(contract_id, new_version, &actor.user_id, now.clone())?;
        self.store
            .reserve_pending_approval(contract_id, &approval.id)?;
        self.store.insert_approval(&approval)?;

        let updated = match self.store.update_contract_if_status(
            contract_id,
            ApprovalStatus::Rejected,
            |c| {
                c.content = new_content.to_owned();
                c.variables = variables.clone();
                c.generated_content = Some(render_content(new_content, &variables));
                c.current_version = new_version;
                c.approval_status = next;
                c.updated_at = now.clone();
                Ok(())
            },
        ) {
            Ok(updated) => updated,
            Err(err) => {
                let _ = self
                    .store
                    .release_pending_approval(contract_id, &approval.id);
                return Err(err.into());
            }
        };

        let snapshot = Version::snapshot(
            contract_id,
            new_version,
            new_content,
            &updated.variables,
            &actor.user_id,
            Some(change_summary.to_owned()),
            now.clone(),
        )?;
        self.store.insert_version(&snapshot)?;

        self.audit(
            contract_id,
            "resubmitted_for_approval",
            "approval",
            Some(&approval.id),
            actor,
            Some(change_summary.to_owned()),
            now,
        )?;

        Ok(updated)
    }

    /// Record one signer's signature. Signing is one-shot: the write is a
    /// compare-and-swap on the signatory record, and a lost race is
    /// re-checked once before giving up.
    pub fn record_signature(
        &self,
        signatory_id: &str,
        identity: &SignerIdentity,
        capture: SignatureCapture,
    ) -> anyhow::Result<Signatory> {
        let now = TimeStamp::new();
        let mut attempts = 0;
        let signed = loop {
            let current = self.store.get_signatory(signatory_id)?;
            if current.signed_at.is_some() {
                return Err(LifecycleError::AlreadySigned(signatory_id.to_owned()).into());
            }
            if !current.matches_identity(identity) {
                return Err(LifecycleError::IdentityMismatch {
                    expected: current.user_id.clone().unwrap_or(current.email.clone()),
                    got: identity
                        .user_id
                        .clone()
                        .unwrap_or(identity.email.clone()),
                }
                .into());
            }
            let contract = self.store.get_contract(&current.contract_id)?;
            if !matches!(
                contract.approval_status,
                ApprovalStatus::Approved | ApprovalStatus::Signed
            ) {
                return Err(LifecycleError::ContractNotSignable {
                    id: contract.id.clone(),
                    status: contract.approval_status,
                }
                .into());
            }

            let mut next = current.clone();
            next.signed_at = Some(now.clone());
            next.status = SignatoryStatus::Signed;
            next.signature_ref = Some(capture.signature_ref.clone());
            next.ip_address = capture.ip_address.clone();
            next.user_agent = capture.user_agent.clone();

            match self.store.replace_signatory(&current, &next) {
                Ok(()) => break next,
                // lost race: re-fetch once, the guard above decides what it means
                Err(LifecycleError::WriteConflict(_)) if attempts == 0 => {
                    attempts += 1;
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        };

        self.audit_system(
            &signed.contract_id,
            "signature_recorded",
            "signatory",
            Some(signatory_id),
            None,
            now.clone(),
        )?;

        self.settle_fully_signed(&signed.contract_id, now)?;

        Ok(signed)
    }

    /// After every successful signature: if the set just became fully signed,
    /// move the workflow axis to `signed` and the calendar axis to `active`.
    fn settle_fully_signed(
        &self,
        contract_id: &str,
        now: TimeStamp<chrono::Utc>,
    ) -> anyhow::Result<()> {
        let signers = self.store.signatories_for(contract_id)?;
        if !signatory::is_fully_signed(&signers) {
            return Ok(());
        }
        let contract = self.store.get_contract(contract_id)?;
        if contract.approval_status == ApprovalStatus::Signed {
            return Ok(());
        }
        let next = state::next_approval_status(contract.approval_status, WorkflowEvent::MarkSigned)?;

        match self.store.update_contract_if_status(
            contract_id,
            ApprovalStatus::Approved,
            |c| {
                c.approval_status = next;
                c.actual_status = ActualStatus::Active;
                c.updated_at = now.clone();
                Ok(())
            },
        ) {
            Ok(updated) => {
                self.audit_system(contract_id, "fully_signed", "contract", None, None, now.clone())?;
                self.store.insert_notification(&Notification::contract_signed(
                    &updated.created_by,
                    &updated.id,
                    &updated.title,
                    now,
                )?)?;
                Ok(())
            }
            // a concurrent signer settled it first; verify and move on
            Err(LifecycleError::WriteConflict(_)) => {
                let current = self.store.get_contract(contract_id)?;
                if current.approval_status == ApprovalStatus::Signed {
                    Ok(())
                } else {
                    Err(LifecycleError::WriteConflict(format!("contract {contract_id}")).into())
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn is_fully_signed(&self, contract_id: &str) -> anyhow::Result<bool> {
        let signers = self.store.signatories_for(contract_id)?;
        Ok(signatory::is_fully_signed(&signers))
    }

    /// Bind a newly registered user to any unlinked signatory sharing their
    /// email. Idempotent; an existing different binding is flagged, never
    /// overwritten.
    pub fn link_signatory_identity(
        &self,
        email: &str,
        user_id: &str,
    ) -> anyhow::Result<LinkOutcome> {
        let mut outcome = LinkOutcome::default();
        for signatory in self.store.signatories()? {
            if !signatory.email.eq_ignore_ascii_case(email) {
                continue;
            }
            match signatory.user_id.as_deref() {
                Some(bound) if bound == user_id => {
                    outcome.already_bound.push(signatory.id.clone())
                }
                Some(_) => outcome.conflicts.push(signatory.id.clone()),
                None => {
                    let mut linked = signatory.clone();
                    linked.user_id = Some(user_id.to_owned());
                    self.store.replace_signatory(&signatory, &linked)?;
                    outcome.bound.push(signatory.id.clone());
                }
            }
        }
        Ok(outcome)
    }

    /// `approved/signed -> cancelled`. A reason is required; it lands in the
    /// dedicated cancellation field, not the rejection one.
    pub fn cancel(
        &self,
        contract_id: &str,
        actor: &Actor,
        reason: &str,
    ) -> anyhow::Result<Contract> {
        let event = WorkflowEvent::Cancel;
        self.require_event(actor, event)?;
        if reason.trim().is_empty() {
            return Err(LifecycleError::MissingField("cancellation reason").into());
        }

        let contract = self.store.get_contract(contract_id)?;
        let next = state::next_approval_status(contract.approval_status, event)?;

        let now = TimeStamp::new();
        let updated = self.store.update_contract_if_status(
            contract_id,
            contract.approval_status,
            |c| {
                c.approval_status = next;
                c.actual_status = ActualStatus::Cancelled;
                c.cancellation_reason = Some(reason.to_owned());
                c.updated_at = now.clone();
                Ok(())
            },
        )?;

        self.audit(
            contract_id,
            "contract_cancelled",
            "contract",
            None,
            actor,
            Some(reason.to_owned()),
            now,
        )?;

        Ok(updated)
    }

    /// Admin-only escape hatch out of the terminal cancelled state.
    pub fn admin_uncancel(&self, contract_id: &str, admin: &Actor) -> anyhow::Result<Contract> {
        let event = WorkflowEvent::AdminUncancel;
        self.require_event(admin, event)?;

        let contract = self.store.get_contract(contract_id)?;
        let next = state::next_approval_status(contract.approval_status, event)?;

        let now = TimeStamp::new();
        let updated = self.store.update_contract_if_status(
            contract_id,
            ApprovalStatus::Cancelled,
            |c| {
                c.approval_status = next;
                c.actual_status = ActualStatus::Active;
                c.cancellation_reason = None;
                c.updated_at = now.clone();
                Ok(())
            },
        )?;

        self.audit(contract_id, "contract_uncancelled", "contract", None, admin, None, now)?;

        Ok(updated)
    }

    /// Close out a signed contract whose obligations are fulfilled.
    pub fn complete(&self, contract_id: &str, actor: &Actor) -> anyhow::Result<Contract> {
        let event = WorkflowEvent::Complete;
        self.require_event(actor, event)?;

        let contract = self.store.get_contract(contract_id)?;
        let next = state::next_approval_status(contract.approval_status, event)?;

        let now = TimeStamp::new();
        let updated = self.store.update_contract_if_status(
            contract_id,
            ApprovalStatus::Signed,
            |c| {
                c.approval_status = next;
                c.actual_status = ActualStatus::Completed;
                c.updated_at = now.clone();
                Ok(())
            },
        )?;

        self.audit(contract_id, "contract_completed", "contract", None, actor, None, now)?;

        Ok(updated)
    }

    /// Soft-delete for listing screens. No state machine effect.
    pub fn archive(&self, contract_id: &str, actor: &Actor) -> anyhow::Result<Contract> {
        self.require(actor, Capability::ManageContracts)?;
        let now = TimeStamp::new();
        let updated = self.store.update_contract_with(contract_id, |c| {
            c.archived = true;
            c.archived_by = Some(actor.user_id.clone());
            c.archived_at = Some(now.clone());
            c.updated_at = now.clone();
            Ok(())
        })?;
        self.audit(contract_id, "contract_archived", "contract", None, actor, None, now)?;
        Ok(updated)
    }

    /// Explicit cascading physical delete. Admin only; removes the contract
    /// and every dependent record.
    pub fn admin_delete_contract(&self, contract_id: &str, admin: &Actor) -> anyhow::Result<()> {
        self.require(admin, Capability::AdminOverride)?;
        // ensure it exists so a typo'd id is an error, not a no-op
        self.store.get_contract(contract_id)?;
        self.store.delete_contract_cascade(contract_id)?;
        info!(contract_id, admin = %admin.user_id, "contract deleted with cascade");
        Ok(())
    }

    /// Open a renewal request for a signed contract. At most one pending
    /// renewal per contract.
    pub fn request_renewal(
        &self,
        contract_id: &str,
        actor: &Actor,
        proposal: RenewalProposal,
    ) -> anyhow::Result<Renewal> {
        let contract = self.store.get_contract(contract_id)?;

        let is_owner = contract.created_by == actor.user_id;
        let is_signatory = self
            .store
            .signatories_for(contract_id)?
            .iter()
            .any(|s| s.user_id.as_deref() == Some(actor.user_id.as_str()));
        if !is_owner && !is_signatory && !actor.has(Capability::Review) {
            return Err(LifecycleError::NotAuthorized(Capability::ManageContracts).into());
        }

        if self.store.pending_renewal_for(contract_id)?.is_some() {
            return Err(LifecycleError::DuplicatePendingRenewal(contract_id.to_owned()).into());
        }

        let now = TimeStamp::new();
        let today = now.date_utc();
        let priority = match contract.days_until_expiry(today) {
            Some(days) if days <= 10 => Priority::Urgent,
            _ => Priority::Medium,
        };
        let renewal = Renewal::open(contract_id, &actor.user_id, proposal, priority, now.clone())?;
        self.store.insert_renewal(&renewal)?;

        if contract.created_by != actor.user_id {
            self.store.insert_notification(&Notification::renewal_request(
                &contract.created_by,
                &renewal.id,
                contract_id,
                &contract.title,
                priority,
                now.clone(),
            )?)?;
        }
        self.audit(
            contract_id,
            "renewal_requested",
            "renewal",
            Some(&renewal.id),
            actor,
            None,
            now,
        )?;

        Ok(renewal)
    }

    /// Resolve a pending renewal. Approval synthesizes the successor contract
    /// and marks the original renewed on the calendar axis.
    pub fn process_renewal(
        &self,
        renewal_id: &str,
        actor: &Actor,
        decision: ReviewDecision,
        response: Option<String>,
    ) -> anyhow::Result<Option<Contract>> {
        let renewal = self.store.get_renewal(renewal_id)?;
        if !renewal.is_pending() {
            return Err(LifecycleError::RenewalNotPending(renewal_id.to_owned()).into());
        }
        let original = self.store.get_contract(&renewal.original_contract_id)?;
        if original.created_by != actor.user_id && !actor.has(Capability::Review) {
            return Err(LifecycleError::NotAuthorized(Capability::Review).into());
        }

        let now = TimeStamp::new();
        let mut processed = renewal.clone();
        processed.status = match decision {
            ReviewDecision::Approve => RenewalState::Approved,
            ReviewDecision::Reject => RenewalState::Rejected,
        };
        processed.gestor_response = response;
        processed.processed_by = Some(actor.user_id.clone());
        processed.processed_at = Some(now.clone());
        // CAS resolves a race with the auto-renewal stage of the scheduler
        self.store.replace_renewal(&renewal, &processed)?;

        match decision {
            ReviewDecision::Approve => {
                let successor = self.create_successor_contract(&original, &processed, now.clone())?;
                processed.new_contract_id = Some(successor.id.clone());
                self.store.insert_renewal(&processed)?;

                self.store.update_contract_with(&original.id, |c| {
                    c.actual_status = ActualStatus::Renewed;
                    c.updated_at = now.clone();
                    Ok(())
                })?;

                self.store.insert_notification(&Notification::renewal_resolved(
                    &processed.requested_by,
                    renewal_id,
                    &original.id,
                    &original.title,
                    Some(&successor.id),
                    processed.auto_renewal,
                    now.clone(),
                )?)?;
                self.audit(
                    &original.id,
                    "renewal_approved",
                    "renewal",
                    Some(renewal_id),
                    actor,
                    None,
                    now,
                )?;
                Ok(Some(successor))
            }
            ReviewDecision::Reject => {
                self.store.insert_notification(&Notification::renewal_resolved(
                    &processed.requested_by,
                    renewal_id,
                    &original.id,
                    &original.title,
                    None,
                    processed.auto_renewal,
                    now.clone(),
                )?)?;
                self.audit(
                    &original.id,
                    "renewal_rejected",
                    "renewal",
                    Some(renewal_id),
                    actor,
                    None,
                    now,
                )?;
                Ok(None)
            }
        }
    }

    /// Build the successor contract from an approved renewal: same template,
    /// content and signers; proposed value/dates override the original's.
    pub(crate) fn create_successor_contract(
        &self,
        original: &Contract,
        renewal: &Renewal,
        now: TimeStamp<chrono::Utc>,
    ) -> anyhow::Result<Contract> {
        let mut variables = original.variables.clone();
        for (key, value) in &renewal.proposed_changes {
            variables.insert(key.clone(), value.clone());
        }

        let successor = Contract {
            id: utils::new_uuid_to_bech32("contract_")?,
            template_id: original.template_id.clone(),
            title: format!("{} (Renewal)", original.title),
            content: original.content.clone(),
            generated_content: Some(render_content(&original.content, &variables)),
            variables,
            client_name: original.client_name.clone(),
            client_email: original.client_email.clone(),
            client_phone: original.client_phone.clone(),
            contract_value: renewal.proposed_value.or(original.contract_value),
            start_date: renewal.proposed_start_date.or(original.start_date),
            end_date: renewal.proposed_end_date.or(original.end_date),
            approval_status: ApprovalStatus::Draft,
            actual_status: ActualStatus::Draft,
            current_version: 1,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            cancellation_reason: None,
            notes: Some(format!("Renewal of contract {}", original.id)),
            created_by: original.created_by.clone(),
            created_at: now.clone(),
            updated_at: now.clone(),
            auto_renewal: original.auto_renewal,
            parent_contract_id: Some(original.id.clone()),
            renewal_type: if renewal.auto_renewal {
                RenewalType::AutoRenewal
            } else {
                RenewalType::ManualRenewal
            },
            archived: false,
            archived_by: None,
            archived_at: None,
        };
        self.store.insert_contract(&successor)?;

        for original_signer in self.store.signatories_for(&original.id)? {
            let copied = Signatory {
                id: utils::new_uuid_to_bech32("signer_")?,
                contract_id: successor.id.clone(),
                signed_at: None,
                signature_ref: None,
                ip_address: None,
                user_agent: None,
                status: SignatoryStatus::Pending,
                ..original_signer
            };
            self.store.insert_signatory(&copied)?;
        }

        let snapshot = Version::snapshot(
            &successor.id,
            1,
            &successor.content,
            &successor.variables,
            &successor.created_by,
            Some(format!("renewal of {}", original.id)),
            now.clone(),
        )?;
        self.store.insert_version(&snapshot)?;

        self.audit_system(
            &successor.id,
            "contract_created_from_renewal",
            "contract",
            Some(&renewal.id),
            None,
            now,
        )?;

        Ok(successor)
    }

    pub fn mark_notification_read(&self, notification_id: &str) -> anyhow::Result<()> {
        let mut notification = self.store.get_notification(notification_id)?;
        if notification.read_at.is_none() {
            notification.read_at = Some(TimeStamp::new());
            self.store.update_notification(&notification)?;
        }
        Ok(())
    }

    fn audit(
        &self,
        contract_id: &str,
        action: &str,
        entity_type: &str,
        entity_id: Option<&str>,
        actor: &Actor,
        detail: Option<String>,
        now: TimeStamp<chrono::Utc>,
    ) -> anyhow::Result<()> {
        let entry = AuditEntry::record(
            contract_id,
            action,
            entity_type,
            entity_id,
            Some((actor.user_id.as_str(), actor.name.as_str())),
            detail,
            now,
        )?;
        self.store.append_audit(&entry)?;
        Ok(())
    }

    fn audit_system(
        &self,
        contract_id: &str,
        action: &str,
        entity_type: &str,
        entity_id: Option<&str>,
        detail: Option<String>,
        now: TimeStamp<chrono::Utc>,
    ) -> anyhow::Result<()> {
        let entry =
            AuditEntry::record(contract_id, action, entity_type, entity_id, None, detail, now)?;
        self.store.append_audit(&entry)?;
        Ok(())
    }
}
