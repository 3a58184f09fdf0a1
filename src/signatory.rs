//! Required signers bound to a contract and the fully-signed predicate
use crate::types::TimeStamp;
use crate::utils;
use chrono::Utc;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerRole {
    #[n(0)]
    Client,
    #[n(1)]
    Contractor,
    #[n(2)]
    Witness,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatoryStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Signed,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone)]
pub struct Signatory {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub contract_id: String,
    #[n(2)]
    pub name: String,
    #[n(3)]
    pub email: String,
    #[n(4)]
    pub phone: Option<String>,
    #[n(5)]
    pub role: SignerRole,
    #[n(6)]
    pub signing_order: u32,
    // bound registered user, if any; signers need not be users
    #[n(7)]
    pub user_id: Option<String>,
    #[n(8)]
    pub signed_at: Option<TimeStamp<Utc>>,
    #[n(9)]
    pub signature_ref: Option<String>,
    #[n(10)]
    pub ip_address: Option<String>,
    #[n(11)]
    pub user_agent: Option<String>,
    #[n(12)]
    pub status: SignatoryStatus,
}

/// Signer fields supplied at contract creation.
#[derive(Debug, Clone)]
pub struct SignatoryDraft {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: SignerRole,
    pub user_id: Option<String>,
}

impl SignatoryDraft {
    pub fn new(name: &str, email: &str, role: SignerRole) -> Self {
        Self {
            name: name.to_owned(),
            email: email.to_owned(),
            phone: None,
            role,
            user_id: None,
        }
    }
    pub fn with_phone(mut self, phone: &str) -> Self {
        self.phone = Some(phone.to_owned());
        self
    }
    pub fn with_user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_owned());
        self
    }

    pub fn into_signatory(self, contract_id: &str, signing_order: u32) -> anyhow::Result<Signatory> {
        Ok(Signatory {
            id: utils::new_uuid_to_bech32("signer_")?,
            contract_id: contract_id.to_owned(),
            name: self.name,
            email: self.email,
            phone: self.phone,
            role: self.role,
            signing_order,
            user_id: self.user_id,
            signed_at: None,
            signature_ref: None,
            ip_address: None,
            user_agent: None,
            status: SignatoryStatus::Pending,
        })
    }
}

/// Identity of the person attempting to sign, as supplied by the auth layer.
#[derive(Debug, Clone)]
pub struct SignerIdentity {
    pub user_id: Option<String>,
    pub email: String,
}

/// Capture metadata recorded alongside a signature. The core does not derive
/// these itself; the caller passes what its transport saw.
#[derive(Debug, Clone)]
pub struct SignatureCapture {
    pub signature_ref: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Signatory {
    /// A signer identity matches when the bound user id agrees, or when no
    /// user is bound yet and the email agrees.
    pub fn matches_identity(&self, identity: &SignerIdentity) -> bool {
        match (&self.user_id, &identity.user_id) {
            (Some(bound), Some(given)) => bound == given,
            (Some(_), None) => false,
            (None, _) => self.email.eq_ignore_ascii_case(&identity.email),
        }
    }
}

/// True iff the signatory set is non-empty and every signer has signed.
pub fn is_fully_signed(signers: &[Signatory]) -> bool {
    !signers.is_empty() && signers.iter().all(|s| s.signed_at.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer(email: &str, user_id: Option<&str>) -> Signatory {
        let mut s = SignatoryDraft::new("Ana", email, SignerRole::Client)
            .into_signatory("contract_1", 1)
            .unwrap();
        s.user_id = user_id.map(str::to_owned);
        s
    }

    #[test]
    fn fully_signed_requires_non_empty_set() {
        assert!(!is_fully_signed(&[]));
    }

    #[test]
    fn fully_signed_flips_back_when_unsigned_signer_added() {
        let mut a = signer("a@example.com", None);
        a.signed_at = Some(TimeStamp::new());
        assert!(is_fully_signed(std::slice::from_ref(&a)));

        let b = signer("b@example.com", None);
        assert!(!is_fully_signed(&[a, b]));
    }

    #[test]
    fn identity_matches_bound_user_over_email() {
        let bound = signer("ana@example.com", Some("user_1"));

        assert!(bound.matches_identity(&SignerIdentity {
            user_id: Some("user_1".into()),
            email: "other@example.com".into(),
        }));
        // bound signer refuses a bare email match
        assert!(!bound.matches_identity(&SignerIdentity {
            user_id: None,
            email: "ana@example.com".into(),
        }));
        assert!(!bound.matches_identity(&SignerIdentity {
            user_id: Some("user_2".into()),
            email: "ana@example.com".into(),
        }));
    }

    #[test]
    fn identity_matches_email_case_insensitively_when_unbound() {
        let unbound = signer("Ana@Example.com", None);
        assert!(unbound.matches_identity(&SignerIdentity {
            user_id: Some("user_9".into()),
            email: "ana@example.com".into(),
        }));
    }
}
