//! Immutable content snapshots, one per contract version
use crate::types::TimeStamp;
use crate::utils;
use chrono::Utc;
use std::collections::BTreeMap;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone)]
pub struct Version {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub contract_id: String,
    #[n(2)]
    pub version_number: u32,
    #[n(3)]
    pub content: String,
    // sha256 over the content, for tamper checks on historical snapshots
    #[n(4)]
    pub content_hash: String,
    #[n(5)]
    pub variables: BTreeMap<String, String>,
    #[n(6)]
    pub created_by: String,
    #[n(7)]
    pub created_at: TimeStamp<Utc>,
    #[n(8)]
    pub change_summary: Option<String>,
}

impl Version {
    pub fn snapshot(
        contract_id: &str,
        version_number: u32,
        content: &str,
        variables: &BTreeMap<String, String>,
        created_by: &str,
        change_summary: Option<String>,
        now: TimeStamp<Utc>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            id: utils::new_uuid_to_bech32("version_")?,
            contract_id: contract_id.to_owned(),
            version_number,
            content: content.to_owned(),
            content_hash: sha256::digest(content),
            variables: variables.clone(),
            created_by: created_by.to_owned(),
            created_at: now,
            change_summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_hashes_content() {
        let vars = BTreeMap::new();
        let v = Version::snapshot("contract_1", 1, "body", &vars, "user_1", None, TimeStamp::new())
            .unwrap();

        assert_eq!(v.content_hash, sha256::digest("body"));
        assert_eq!(v.version_number, 1);
    }
}
