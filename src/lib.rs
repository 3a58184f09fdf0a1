//! Contract lifecycle core: the workflow state machine, approval cycles,
//! multi-party signature collection, and the daily expiry/renewal scheduler.
//!
//! A contract carries two orthogonal status axes. The workflow axis moves
//! through interactive events (submit, approve, reject, sign, cancel); the
//! calendar axis moves once a day through [`scheduler::ExpiryScheduler`].
//! Everything persists in an embedded sled store via [`store::ContractStore`];
//! invariants that need atomicity are enforced with compare-and-swap writes.

pub mod approval;
pub mod audit;
pub mod contract;
pub mod error;
pub mod notify;
pub mod renewal;
pub mod scheduler;
pub mod service;
pub mod signatory;
pub mod state;
pub mod store;
pub mod types;
pub mod utils;
pub mod version;
