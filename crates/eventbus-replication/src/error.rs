use thiserror::Error;

/// Failure talking to the peer-registry KV store.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("peer registry unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("peer registry returned unexpected response: {0}")]
    Protocol(String),
}
