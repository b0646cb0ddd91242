//! The peer registry client contract: a thin abstraction over a
//! linearizable KV store scoped by a cluster prefix. The KV store itself is
//! an opaque collaborator; only this interface is specified here.

use crate::error::RegistryError;
use crate::peer::{Peer, ReplicationIntent};

pub trait PeerRegistry: Send + Sync {
    /// Idempotent put at `peers/<name>`.
    fn register_peer(&self, peer: &Peer) -> Result<(), RegistryError>;

    /// Prefix range-get over `peers/`.
    fn list_peers(&self) -> Result<Vec<Peer>, RegistryError>;

    /// Put at `replication/<target>/<category>/<segment_name> = <owned_by>`.
    fn add_chunk_to_replication_queue(&self, intent: &ReplicationIntent) -> Result<(), RegistryError>;
}
