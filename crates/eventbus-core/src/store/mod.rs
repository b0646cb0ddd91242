//! The per-category segment store contract.
//!
//! Two backends implement this trait with an identical contract: [`fs::Fs`]
//! persists segments as files under a category directory; [`mem::Memory`]
//! keeps them as byte buffers in a map, for tests and ephemeral categories.

pub mod fs;
pub mod mem;

use std::io::Write;

use crate::chunk::ChunkInfo;
use crate::error::StoreError;

pub use fs::Fs;
pub use mem::Memory;

/// Default cap for an on-disk segment before rollover.
pub const MAX_SEGMENT_BYTES: u64 = 16 * 1024 * 1024;

/// Default cap for an in-memory segment before rollover.
pub const MAX_IN_MEMORY_SEGMENT_BYTES: u64 = 1024 * 1024;

/// Per-category append-only chunk storage.
///
/// Invariants every implementation must uphold: at most one active segment
/// per category, strictly increasing segment indices, the rollover
/// boundary check, and ack-only-if-complete-and-fully-consumed.
pub trait SegmentStore: Send + Sync {
    /// Append `msg` to the active segment, rolling over to a new segment
    /// first if the active segment doesn't exist or can't accept `msg`
    /// without exceeding the configured size cap.
    fn write(&self, msg: &[u8]) -> Result<(), StoreError>;

    /// Write up to `max_size` bytes of `chunk`, starting at `offset`, into
    /// `sink`. The written bytes end at a line feed (see
    /// [`crate::delimiter`]). Writes nothing if `offset` is at or past the
    /// segment's current end.
    fn read(&self, chunk: &str, offset: u64, max_size: u64, sink: &mut dyn Write) -> Result<(), StoreError>;

    /// Delete `chunk`, provided it is complete and `size` covers its entire
    /// current length.
    fn ack(&self, chunk: &str, size: u64) -> Result<(), StoreError>;

    /// List all segments currently present, each tagged `complete` iff it
    /// is not the active segment. Ascending by segment index.
    fn list_chunks(&self) -> Result<Vec<ChunkInfo>, StoreError>;
}

/// Validate a chunk name supplied by a caller (read/ack), rejecting
/// anything that isn't a well-formed `chunk<N>` segment name. This is the
/// traversal guard for both backends' read/ack paths.
pub(crate) fn validate_chunk_name(name: &str) -> Result<(), StoreError> {
    if crate::chunk::parse_chunk_index(name).is_none() {
        return Err(StoreError::NotFound(name.to_string()));
    }
    Ok(())
}
