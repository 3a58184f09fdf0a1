//! Sled-backed contract store.
//!
//! One tree per entity, records encoded with minicbor. The store exposes no
//! cross-tree transactions; invariants that need atomicity (one pending
//! approval per contract, one-shot signing) are enforced with
//! `compare_and_swap` on a single key. A lost race surfaces as
//! [`LifecycleError::WriteConflict`] and is the caller's signal to re-fetch
//! and re-evaluate its guard.
use crate::approval::Approval;
use crate::audit::AuditEntry;
use crate::contract::{ApprovalStatus, Contract};
use crate::error::LifecycleError;
use crate::notify::Notification;
use crate::renewal::Renewal;
use crate::signatory::Signatory;
use crate::types::DateStamp;
use crate::version::Version;
use sled::{Db, Tree};
use std::sync::Arc;

// key separator for composite keys; bech32 ids never contain NUL
const SEP: u8 = 0;

pub struct ContractStore {
    _db: Arc<Db>,
    contracts: Tree,
    signatories: Tree,
    versions: Tree,
    approvals: Tree,
    // contract_id -> approval_id, present only while an approval is pending.
    // CAS on this key is the at-most-one-pending-approval constraint.
    pending_approvals: Tree,
    renewals: Tree,
    notifications: Tree,
    audit: Tree,
}

fn encode<T>(value: &T) -> Result<Vec<u8>, LifecycleError>
where
    T: minicbor::Encode<()>,
{
    Ok(minicbor::to_vec(value)?)
}

fn decode<T>(bytes: &[u8]) -> Result<T, LifecycleError>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    Ok(minicbor::decode(bytes)?)
}

fn composite_key(prefix: &str, suffix: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 1 + suffix.len());
    key.extend_from_slice(prefix.as_bytes());
    key.push(SEP);
    key.extend_from_slice(suffix.as_bytes());
    key
}

fn scan_all<T>(tree: &Tree) -> Result<Vec<T>, LifecycleError>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    let mut out = Vec::new();
    for entry in tree.iter() {
        let (_, value) = entry?;
        out.push(decode(&value)?);
    }
    Ok(out)
}

impl ContractStore {
    pub fn open(db: Arc<Db>) -> Result<Self, LifecycleError> {
        Ok(Self {
            contracts: db.open_tree("contracts")?,
            signatories: db.open_tree("signatories")?,
            versions: db.open_tree("versions")?,
            approvals: db.open_tree("approvals")?,
            pending_approvals: db.open_tree("pending_approvals")?,
            renewals: db.open_tree("renewals")?,
            notifications: db.open_tree("notifications")?,
            audit: db.open_tree("audit")?,
            _db: db,
        })
    }

    // ---- contracts ----

    pub fn insert_contract(&self, contract: &Contract) -> Result<(), LifecycleError> {
        self.contracts.insert(&contract.id, encode(contract)?)?;
        Ok(())
    }

    pub fn get_contract(&self, id: &str) -> Result<Contract, LifecycleError> {
        match self.contracts.get(id)? {
            Some(bytes) => decode(&bytes),
            None => Err(LifecycleError::NotFound {
                entity: "contract",
                id: id.to_owned(),
            }),
        }
    }

    pub fn contracts(&self) -> Result<Vec<Contract>, LifecycleError> {
        scan_all(&self.contracts)
    }

    pub fn find_by_approval_status(
        &self,
        status: ApprovalStatus,
    ) -> Result<Vec<Contract>, LifecycleError> {
        Ok(self
            .contracts()?
            .into_iter()
            .filter(|c| c.approval_status == status)
            .collect())
    }

    /// Signed contracts whose end_date equals the given day. Feeds the
    /// scheduler's threshold notification fan-out.
    pub fn find_signed_ending_on(&self, date: DateStamp) -> Result<Vec<Contract>, LifecycleError> {
        Ok(self
            .contracts()?
            .into_iter()
            .filter(|c| c.approval_status == ApprovalStatus::Signed && c.end_date == Some(date))
            .collect())
    }

    /// Conditional update: re-reads the record, applies `mutate`, and writes
    /// back with compare-and-swap. A concurrent writer turns into
    /// `WriteConflict`, never a silent overwrite.
    pub fn update_contract_with(
        &self,
        id: &str,
        mutate: impl FnOnce(&mut Contract) -> Result<(), LifecycleError>,
    ) -> Result<Contract, LifecycleError> {
        let old_bytes = self.contracts.get(id)?.ok_or(LifecycleError::NotFound {
            entity: "contract",
            id: id.to_owned(),
        })?;
        let mut contract: Contract = decode(&old_bytes)?;
        mutate(&mut contract)?;
        let new_bytes = encode(&contract)?;

        match self
            .contracts
            .compare_and_swap(id, Some(&old_bytes), Some(new_bytes))?
        {
            Ok(()) => Ok(contract),
            Err(_) => Err(LifecycleError::WriteConflict(format!("contract {id}"))),
        }
    }

    /// `updateIfStatus`: the mutation only applies while the contract still
    /// holds the expected workflow status.
    pub fn update_contract_if_status(
        &self,
        id: &str,
        expected: ApprovalStatus,
        mutate: impl FnOnce(&mut Contract) -> Result<(), LifecycleError>,
    ) -> Result<Contract, LifecycleError> {
        self.update_contract_with(id, |contract| {
            if contract.approval_status != expected {
                return Err(LifecycleError::WriteConflict(format!(
                    "contract {id} left {expected:?} before the write"
                )));
            }
            mutate(contract)
        })
    }

    // ---- signatories ----

    pub fn insert_signatory(&self, signatory: &Signatory) -> Result<(), LifecycleError> {
        self.signatories
            .insert(&signatory.id, encode(signatory)?)?;
        Ok(())
    }

    pub fn get_signatory(&self, id: &str) -> Result<Signatory, LifecycleError> {
        match self.signatories.get(id)? {
            Some(bytes) => decode(&bytes),
            None => Err(LifecycleError::NotFound {
                entity: "signatory",
                id: id.to_owned(),
            }),
        }
    }

    pub fn signatories_for(&self, contract_id: &str) -> Result<Vec<Signatory>, LifecycleError> {
        let mut signers: Vec<Signatory> = scan_all::<Signatory>(&self.signatories)?
            .into_iter()
            .filter(|s| s.contract_id == contract_id)
            .collect();
        signers.sort_by_key(|s| s.signing_order);
        Ok(signers)
    }

    pub fn signatories(&self) -> Result<Vec<Signatory>, LifecycleError> {
        scan_all(&self.signatories)
    }

    /// One-shot signing write: succeeds only if the record is unchanged since
    /// `old` was read, so two racing signature attempts cannot both land.
    pub fn replace_signatory(
        &self,
        old: &Signatory,
        new: &Signatory,
    ) -> Result<(), LifecycleError> {
        match self
            .signatories
            .compare_and_swap(&old.id, Some(encode(old)?), Some(encode(new)?))?
        {
            Ok(()) => Ok(()),
            Err(_) => Err(LifecycleError::WriteConflict(format!("signatory {}", old.id))),
        }
    }

    // ---- versions ----

    pub fn insert_version(&self, version: &Version) -> Result<(), LifecycleError> {
        let key = composite_key(
            &version.contract_id,
            &format!("{:010}", version.version_number),
        );
        self.versions.insert(key, encode(version)?)?;
        Ok(())
    }

    pub fn versions_for(&self, contract_id: &str) -> Result<Vec<Version>, LifecycleError> {
        let mut prefix = contract_id.as_bytes().to_vec();
        prefix.push(SEP);
        let mut out = Vec::new();
        for entry in self.versions.scan_prefix(prefix) {
            let (_, value) = entry?;
            out.push(decode(&value)?);
        }
        Ok(out)
    }

    // ---- approvals ----

    pub fn insert_approval(&self, approval: &Approval) -> Result<(), LifecycleError> {
        self.approvals.insert(&approval.id, encode(approval)?)?;
        Ok(())
    }

    pub fn get_approval(&self, id: &str) -> Result<Approval, LifecycleError> {
        match self.approvals.get(id)? {
            Some(bytes) => decode(&bytes),
            None => Err(LifecycleError::NotFound {
                entity: "approval",
                id: id.to_owned(),
            }),
        }
    }

    pub fn approvals_for(&self, contract_id: &str) -> Result<Vec<Approval>, LifecycleError> {
        Ok(scan_all::<Approval>(&self.approvals)?
            .into_iter()
            .filter(|a| a.contract_id == contract_id)
            .collect())
    }

    /// Reserve the single pending-approval slot for a contract. The CAS from
    /// empty resolves races: the second requester gets
    /// `DuplicatePendingApproval`.
    pub fn reserve_pending_approval(
        &self,
        contract_id: &str,
        approval_id: &str,
    ) -> Result<(), LifecycleError> {
        match self.pending_approvals.compare_and_swap(
            contract_id,
            None::<&[u8]>,
            Some(approval_id.as_bytes()),
        )? {
            Ok(()) => Ok(()),
            Err(_) => Err(LifecycleError::DuplicatePendingApproval(
                contract_id.to_owned(),
            )),
        }
    }

    pub fn pending_approval_id(&self, contract_id: &str) -> Result<Option<String>, LifecycleError> {
        Ok(self
            .pending_approvals
            .get(contract_id)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Free the slot, but only for the approval that holds it.
    pub fn release_pending_approval(
        &self,
        contract_id: &str,
        approval_id: &str,
    ) -> Result<(), LifecycleError> {
        match self.pending_approvals.compare_and_swap(
            contract_id,
            Some(approval_id.as_bytes()),
            None::<&[u8]>,
        )? {
            Ok(()) => Ok(()),
            Err(_) => Err(LifecycleError::WriteConflict(format!(
                "pending approval slot for {contract_id}"
            ))),
        }
    }

    pub fn replace_approval(&self, old: &Approval, new: &Approval) -> Result<(), LifecycleError> {
        match self
            .approvals
            .compare_and_swap(&old.id, Some(encode(old)?), Some(encode(new)?))?
        {
            Ok(()) => Ok(()),
            Err(_) => Err(LifecycleError::WriteConflict(format!("approval {}", old.id))),
        }
    }

    // ---- renewals ----

    pub fn insert_renewal(&self, renewal: &Renewal) -> Result<(), LifecycleError> {
        self.renewals.insert(&renewal.id, encode(renewal)?)?;
        Ok(())
    }

    pub fn get_renewal(&self, id: &str) -> Result<Renewal, LifecycleError> {
        match self.renewals.get(id)? {
            Some(bytes) => decode(&bytes),
            None => Err(LifecycleError::NotFound {
                entity: "renewal",
                id: id.to_owned(),
            }),
        }
    }

    pub fn renewals(&self) -> Result<Vec<Renewal>, LifecycleError> {
        scan_all(&self.renewals)
    }

    pub fn pending_renewal_for(
        &self,
        contract_id: &str,
    ) -> Result<Option<Renewal>, LifecycleError> {
        Ok(self
            .renewals()?
            .into_iter()
            .find(|r| r.original_contract_id == contract_id && r.is_pending()))
    }

    pub fn replace_renewal(&self, old: &Renewal, new: &Renewal) -> Result<(), LifecycleError> {
        match self
            .renewals
            .compare_and_swap(&old.id, Some(encode(old)?), Some(encode(new)?))?
        {
            Ok(()) => Ok(()),
            Err(_) => Err(LifecycleError::WriteConflict(format!("renewal {}", old.id))),
        }
    }

    // ---- notifications ----

    pub fn insert_notification(&self, notification: &Notification) -> Result<(), LifecycleError> {
        self.notifications
            .insert(&notification.id, encode(notification)?)?;
        Ok(())
    }

    pub fn get_notification(&self, id: &str) -> Result<Notification, LifecycleError> {
        match self.notifications.get(id)? {
            Some(bytes) => decode(&bytes),
            None => Err(LifecycleError::NotFound {
                entity: "notification",
                id: id.to_owned(),
            }),
        }
    }

    pub fn notifications(&self) -> Result<Vec<Notification>, LifecycleError> {
        scan_all(&self.notifications)
    }

    pub fn update_notification(&self, notification: &Notification) -> Result<(), LifecycleError> {
        self.notifications
            .insert(&notification.id, encode(notification)?)?;
        Ok(())
    }

    pub fn remove_notification(&self, id: &str) -> Result<(), LifecycleError> {
        self.notifications.remove(id)?;
        Ok(())
    }

    // ---- audit ----

    pub fn append_audit(&self, entry: &AuditEntry) -> Result<(), LifecycleError> {
        self.audit.insert(&entry.id, encode(entry)?)?;
        Ok(())
    }

    pub fn audit_for(&self, contract_id: &str) -> Result<Vec<AuditEntry>, LifecycleError> {
        let mut entries: Vec<AuditEntry> = scan_all::<AuditEntry>(&self.audit)?
            .into_iter()
            .filter(|e| e.contract_id == contract_id)
            .collect();
        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(entries)
    }

    // ---- cascade ----

    /// Physically delete a contract and every dependent record. Only the
    /// explicit admin-delete path calls this.
    pub fn delete_contract_cascade(&self, contract_id: &str) -> Result<(), LifecycleError> {
        self.contracts.remove(contract_id)?;
        self.pending_approvals.remove(contract_id)?;

        for signer in self.signatories_for(contract_id)? {
            self.signatories.remove(&signer.id)?;
        }
        let mut prefix = contract_id.as_bytes().to_vec();
        prefix.push(SEP);
        for entry in self.versions.scan_prefix(&prefix) {
            let (key, _) = entry?;
            self.versions.remove(key)?;
        }
        for approval in self.approvals_for(contract_id)? {
            self.approvals.remove(&approval.id)?;
        }
        for renewal in self.renewals()? {
            if renewal.original_contract_id == contract_id {
                self.renewals.remove(&renewal.id)?;
            }
        }
        for notification in self.notifications()? {
            if notification.data.contract_id.as_deref() == Some(contract_id) {
                self.notifications.remove(&notification.id)?;
            }
        }
        for entry in self.audit_for(contract_id)? {
            self.audit.remove(&entry.id)?;
        }
        Ok(())
    }
}
