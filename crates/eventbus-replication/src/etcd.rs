//! A [`PeerRegistry`] backed by etcd's v3 JSON gRPC-gateway HTTP API.
//!
//! The peer registry is treated as an opaque KV collaborator, and no etcd
//! client crate is otherwise part of this workspace's dependency graph, so
//! this talks directly to `reqwest` against etcd's `/v3/kv/put` and
//! `/v3/kv/range` endpoints rather than pulling in a new wire-protocol
//! crate. Keys and values on that API are base64-encoded, per etcd's
//! documented JSON mapping of its gRPC service. See DESIGN.md for the full
//! rationale.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::peer::{Peer, ReplicationIntent};
use crate::registry::PeerRegistry;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A registry client scoped to `events/<cluster>/` within the etcd
/// keyspace.
pub struct EtcdRegistry {
    client: reqwest::blocking::Client,
    endpoint: String,
    prefix: String,
}

#[derive(Serialize)]
struct PutRequest {
    key: String,
    value: String,
}

#[derive(Serialize)]
struct RangeRequest {
    key: String,
    range_end: String,
}

#[derive(Deserialize, Default)]
struct RangeResponse {
    #[serde(default)]
    kvs: Vec<Kv>,
}

#[derive(Deserialize)]
struct Kv {
    key: String,
    value: String,
}

impl EtcdRegistry {
    /// Connect to the etcd gRPC-gateway listening at `endpoint` (e.g.
    /// `"http://127.0.0.1:2379"`), scoped to `cluster_name`. Performs a
    /// sanity put on construction so an unreachable KV store fails fast
    /// rather than on the first real operation.
    pub fn connect(endpoint: impl Into<String>, cluster_name: &str) -> Result<Self, RegistryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        let this = Self {
            client,
            endpoint: endpoint.into(),
            prefix: format!("events/{cluster_name}/"),
        };
        this.put("test", "test")?;
        Ok(this)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), RegistryError> {
        let body = PutRequest {
            key: BASE64.encode(format!("{}{}", self.prefix, key)),
            value: BASE64.encode(value),
        };
        self.client
            .post(format!("{}/v3/kv/put", self.endpoint))
            .json(&body)
            .send()?
            .error_for_status()?;
        Ok(())
    }

    /// Prefix range-get over `key_prefix` (relative to the cluster prefix).
    fn get_prefix(&self, key_prefix: &str) -> Result<Vec<(String, String)>, RegistryError> {
        let full_prefix = format!("{}{}", self.prefix, key_prefix);
        let range_end = prefix_range_end(full_prefix.as_bytes());

        let body = RangeRequest {
            key: BASE64.encode(&full_prefix),
            range_end: BASE64.encode(range_end),
        };
        let resp: RangeResponse = self
            .client
            .post(format!("{}/v3/kv/range", self.endpoint))
            .json(&body)
            .send()?
            .error_for_status()?
            .json()?;

        resp.kvs
            .into_iter()
            .map(|kv| {
                let key = BASE64
                    .decode(&kv.key)
                    .ok()
                    .and_then(|b| String::from_utf8(b).ok())
                    .ok_or_else(|| RegistryError::Protocol("non-utf8 key".into()))?;
                let value = BASE64
                    .decode(&kv.value)
                    .ok()
                    .and_then(|b| String::from_utf8(b).ok())
                    .ok_or_else(|| RegistryError::Protocol("non-utf8 value".into()))?;
                Ok((key, value))
            })
            .collect()
    }
}

/// Compute etcd's conventional `range_end` for a prefix query: `prefix` with
/// its last byte incremented, trailing 0xff bytes dropped first. An
/// all-0xff prefix (vanishingly unlikely for our string keys) matches to
/// the end of the keyspace.
fn prefix_range_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(&last) = end.last() {
        if last < 0xff {
            *end.last_mut().unwrap() += 1;
            return end;
        }
        end.pop();
    }
    end
}

impl PeerRegistry for EtcdRegistry {
    fn register_peer(&self, peer: &Peer) -> Result<(), RegistryError> {
        self.put(&format!("peers/{}", peer.name), &peer.addr)
    }

    fn list_peers(&self) -> Result<Vec<Peer>, RegistryError> {
        let prefix = format!("{}peers/", self.prefix);
        self.get_prefix("peers/")?
            .into_iter()
            .map(|(key, value)| {
                let name = key
                    .strip_prefix(&prefix)
                    .ok_or_else(|| RegistryError::Protocol(format!("unexpected peer key {key:?}")))?
                    .to_string();
                Ok(Peer { name, addr: value })
            })
            .collect()
    }

    fn add_chunk_to_replication_queue(&self, intent: &ReplicationIntent) -> Result<(), RegistryError> {
        self.put(
            &format!(
                "replication/{}/{}/{}",
                intent.target_peer, intent.category, intent.segment_name
            ),
            &intent.owned_by,
        )
    }
}
