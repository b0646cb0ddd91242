//! An in-process [`PeerRegistry`] test double, grounded on
//! `eventbus_core::store::Memory`'s map-backed approach to the on-disk
//! store's contract: same interface, no real KV store behind it.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::error::RegistryError;
use crate::peer::{Peer, ReplicationIntent};
use crate::registry::PeerRegistry;

#[derive(Default)]
pub struct InMemoryRegistry {
    peers: Mutex<BTreeMap<String, String>>,
    replication_queue: Mutex<BTreeMap<String, String>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything enqueued so far, keyed
    /// `replication/<target>/<category>/<segment>`. Exposed for assertions
    /// in integration tests.
    pub fn replication_queue_snapshot(&self) -> Vec<(String, String)> {
        self.replication_queue
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl PeerRegistry for InMemoryRegistry {
    fn register_peer(&self, peer: &Peer) -> Result<(), RegistryError> {
        self.peers.lock().insert(peer.name.clone(), peer.addr.clone());
        Ok(())
    }

    fn list_peers(&self) -> Result<Vec<Peer>, RegistryError> {
        Ok(self
            .peers
            .lock()
            .iter()
            .map(|(name, addr)| Peer { name: name.clone(), addr: addr.clone() })
            .collect())
    }

    fn add_chunk_to_replication_queue(&self, intent: &ReplicationIntent) -> Result<(), RegistryError> {
        self.replication_queue.lock().insert(
            format!(
                "replication/{}/{}/{}",
                intent.target_peer, intent.category, intent.segment_name
            ),
            intent.owned_by.clone(),
        );
        Ok(())
    }
}
