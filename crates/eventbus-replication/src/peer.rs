//! The peer and replication-intent data model.

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Peer {
    pub name: String,
    pub addr: String,
}

/// A KV entry instructing `target_peer` to fetch `segment_name` of
/// `category` from `owned_by`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationIntent {
    pub target_peer: String,
    pub category: String,
    pub segment_name: String,
    pub owned_by: String,
}
