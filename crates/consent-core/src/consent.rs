//! Protocol-level consent records and how a peer id maps onto them.

use serde::{Deserialize, Serialize};

use crate::identity::{canonicalize, CanonicalId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentState {
    Allowed,
    Denied,
    Unknown,
}

/// Whether a consent record is keyed by an account address or an inbox id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentEntity {
    Address,
    InboxId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub entity: ConsentEntity,
    /// Key in the form the protocol expects: `0x…` for addresses, bare for inbox ids.
    pub entity_id: String,
    pub state: ConsentState,
}

/// Resolve a peer id to the (entity type, key) the protocol should see.
///
/// `None` when the id canonicalises to nothing or to something that
/// cannot be an address or inbox id.
pub fn resolve_entity(peer: &str) -> Option<(ConsentEntity, String)> {
    let id = canonicalize(peer);
    entity_for(&id)
}

pub fn entity_for(id: &CanonicalId) -> Option<(ConsentEntity, String)> {
    if !id.is_well_formed() {
        return None;
    }
    if id.is_address() {
        Some((ConsentEntity::Address, id.to_prefixed()))
    } else {
        Some((ConsentEntity::InboxId, id.as_str().to_string()))
    }
}

impl ConsentRecord {
    pub fn for_peer(peer: &str, state: ConsentState) -> Option<Self> {
        resolve_entity(peer).map(|(entity, entity_id)| Self {
            entity,
            entity_id,
            state,
        })
    }
}

/// Build records for every resolvable peer, dropping the rest.
///
/// Duplicate peers (same canonical key) collapse into one record.
pub fn records_for_peers<'a, I>(peers: I, state: ConsentState) -> Vec<ConsentRecord>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out: Vec<ConsentRecord> = Vec::new();
    for peer in peers {
        let Some(record) = ConsentRecord::for_peer(peer, state) else {
            tracing::debug!(peer, "dropping unresolvable consent peer");
            continue;
        };
        if !out.iter().any(|r| r.entity_id == record.entity_id) {
            out.push(record);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_peers_use_address_entity() {
        let (entity, key) = resolve_entity("0xABCDEF0123456789abcdef0123456789ABCDEF01").unwrap();
        assert_eq!(entity, ConsentEntity::Address);
        assert_eq!(key, "0xabcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn other_peers_use_inbox_entity_stripped() {
        let (entity, key) = resolve_entity("0xF00DInbox:installation-7").unwrap();
        assert_eq!(entity, ConsentEntity::InboxId);
        assert_eq!(key, "f00dinbox");
    }

    #[test]
    fn unresolvable_peers_are_dropped() {
        assert!(resolve_entity("").is_none());
        assert!(resolve_entity("0x").is_none());
        assert!(resolve_entity("not-an-id!!").is_none());
        let records = records_for_peers(["", "0x", ":suffix"], ConsentState::Allowed);
        assert!(records.is_empty());
    }

    #[test]
    fn duplicate_encodings_collapse() {
        let records = records_for_peers(
            [
                "0xabcdef0123456789abcdef0123456789abcdef01",
                "ABCDEF0123456789ABCDEF0123456789ABCDEF01",
                "inbox-1",
            ],
            ConsentState::Allowed,
        );
        assert_eq!(records.len(), 2);
    }
}
