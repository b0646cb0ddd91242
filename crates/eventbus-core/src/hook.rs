//! The replication hook collaborator: invoked by a segment store on every
//! new-segment creation so the cluster can be told what to replicate.
//!
//! The hook is a fallible, two-argument call rather than a fire-and-forget
//! callback: the store's write path propagates the hook's failure as its
//! own, since enqueueing replication intents is part of a write's
//! durability story, not a best-effort side effect.

use std::io;
use std::sync::Arc;

/// Invoked synchronously by a segment store immediately after it creates a
/// new active segment.
pub trait ReplicationHook: Send + Sync {
    /// `category`/`segment_name` name the segment that was just created.
    /// An `Err` here fails the write that triggered the rollover.
    fn init(&self, category: &str, segment_name: &str) -> io::Result<()>;
}

/// A hook that does nothing. Used by tests and by single-node deployments
/// that don't participate in a cluster.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl ReplicationHook for NoopHook {
    fn init(&self, _category: &str, _segment_name: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Convenience alias for the trait-object form stores hold onto.
pub type SharedHook = Arc<dyn ReplicationHook>;
