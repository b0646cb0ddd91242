//! The on-disk TOML configuration for an eventbusd process.
//!
//! A server config has no interactive editor and no need to round-trip
//! comments, so a plain serde `Deserialize` over `toml` is enough; no
//! need for a comment-preserving table editor.

use std::fs;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Address to bind the HTTP server on, e.g. `"0.0.0.0:8080"`.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Where category stores persist their segments. Omit for an in-memory
    /// backend (data lost on restart; intended for tests and demos).
    pub data_dir: Option<String>,

    /// This node's name, as registered in the peer registry.
    pub node_name: String,

    /// Other members of the cluster, if replication is enabled.
    #[serde(default)]
    pub peers: Vec<PeerConfig>,

    /// etcd gRPC-gateway endpoint for the peer registry, e.g.
    /// `"http://127.0.0.1:2379"`. Omit to run without replication.
    pub etcd_endpoint: Option<String>,

    /// Cluster name, used to scope this node's etcd keyspace prefix.
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeerConfig {
    pub name: String,
    pub addr: String,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_cluster_name() -> String {
    "default".to_string()
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config file {}: {e}", path.display()))?;
        toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("parsing config file {}: {e}", path.display()))
    }
}
