//! Append-only audit trail for contract mutations
use crate::types::TimeStamp;
use crate::utils;
use chrono::Utc;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone)]
pub struct AuditEntry {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub contract_id: String,
    #[n(2)]
    pub action: String,
    #[n(3)]
    pub entity_type: String,
    #[n(4)]
    pub entity_id: Option<String>,
    #[n(5)]
    pub actor_id: Option<String>,
    #[n(6)]
    pub actor_name: Option<String>,
    #[n(7)]
    pub detail: Option<String>,
    #[n(8)]
    pub timestamp: TimeStamp<Utc>,
}

impl AuditEntry {
    pub fn record(
        contract_id: &str,
        action: &str,
        entity_type: &str,
        entity_id: Option<&str>,
        actor: Option<(&str, &str)>,
        detail: Option<String>,
        now: TimeStamp<Utc>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            id: utils::new_uuid_to_bech32("audit_")?,
            contract_id: contract_id.to_owned(),
            action: action.to_owned(),
            entity_type: entity_type.to_owned(),
            entity_id: entity_id.map(str::to_owned),
            actor_id: actor.map(|(id, _)| id.to_owned()),
            actor_name: actor.map(|(_, name)| name.to_owned()),
            detail,
            timestamp: now,
        })
    }
}
