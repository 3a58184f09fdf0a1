use crate::contract::ApprovalStatus;
use crate::state::WorkflowEvent;

/// Error taxonomy for the contract lifecycle core.
///
/// Validation variants are caller mistakes and carry enough context to render
/// actionable feedback. `StoreUnavailable` and `WriteConflict` are
/// infrastructure conditions: interactive callers may retry a lost race once
/// after re-fetching, batch stages log and continue.
#[derive(thiserror::Error, Debug)]
pub enum LifecycleError {
    #[error("invalid transition from {from:?} on {event:?}: {reason}")]
    InvalidTransition {
        from: ApprovalStatus,
        event: WorkflowEvent,
        reason: String,
    },
    #[error("rejection requires comments")]
    CommentsRequired,
    #[error("contract {0} already has a pending approval")]
    DuplicatePendingApproval(String),
    #[error("contract {0} already has a pending renewal request")]
    DuplicatePendingRenewal(String),
    #[error("approval {0} is not pending")]
    NotPending(String),
    #[error("renewal {0} is not pending")]
    RenewalNotPending(String),
    #[error("signatory {0} has already signed")]
    AlreadySigned(String),
    #[error("signer identity {got} does not match the signatory binding {expected}")]
    IdentityMismatch { expected: String, got: String },
    #[error("contract {id} is not open for signing (approval status {status:?})")]
    ContractNotSignable { id: String, status: ApprovalStatus },
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("operation requires the {0:?} capability")]
    NotAuthorized(crate::types::Capability),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("conditional write lost a race on {0}, re-fetch and retry")]
    WriteConflict(String),
    #[error("failed to encode record: {0}")]
    Codec(String),
}

impl From<sled::Error> for LifecycleError {
    fn from(value: sled::Error) -> Self {
        LifecycleError::StoreUnavailable(value.to_string())
    }
}

impl<E: std::fmt::Display> From<minicbor::encode::Error<E>> for LifecycleError {
    fn from(value: minicbor::encode::Error<E>) -> Self {
        LifecycleError::Codec(value.to_string())
    }
}

impl From<minicbor::decode::Error> for LifecycleError {
    fn from(value: minicbor::decode::Error) -> Self {
        LifecycleError::Codec(value.to_string())
    }
}
