//! The concrete [`eventbus_core::ReplicationHook`] that enqueues a
//! replication intent per peer on new-segment creation.

use std::io;
use std::sync::Arc;

use eventbus_core::ReplicationHook;

use crate::peer::ReplicationIntent;
use crate::registry::PeerRegistry;

/// Enqueues a replication intent for every peer other than `self_name`
/// whenever a new segment is created.
pub struct RegistryReplicationHook<R> {
    registry: Arc<R>,
    self_name: String,
}

impl<R: PeerRegistry> RegistryReplicationHook<R> {
    pub fn new(registry: Arc<R>, self_name: impl Into<String>) -> Self {
        Self { registry, self_name: self_name.into() }
    }
}

impl<R: PeerRegistry> ReplicationHook for RegistryReplicationHook<R> {
    fn init(&self, category: &str, segment_name: &str) -> io::Result<()> {
        let peers = self
            .registry
            .list_peers()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        for peer in peers {
            if peer.name == self.self_name {
                continue;
            }
            let intent = ReplicationIntent {
                target_peer: peer.name.clone(),
                category: category.to_string(),
                segment_name: segment_name.to_string(),
                owned_by: self.self_name.clone(),
            };
            self.registry
                .add_chunk_to_replication_queue(&intent)
                .map_err(|e| {
                    io::Error::new(
                        io::ErrorKind::Other,
                        format!("could not send segment to peer {}: {e}", peer.name),
                    )
                })?;
        }
        Ok(())
    }
}
