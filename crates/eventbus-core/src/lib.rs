//! Core storage primitives for eventbusd: the chunked, append-only,
//! per-category segment store and its supporting types.
//!
//! This crate has no network or cluster awareness; see `eventbus-replication`
//! for the peer registry client and replication hook, and `eventbus-server`
//! for the wire protocol built on top of [`router::CategoryRouter`].

pub mod chunk;
pub mod delimiter;
pub mod error;
pub mod hook;
pub mod router;
pub mod store;

pub use chunk::{chunk_name, parse_chunk_index, ChunkInfo};
pub use error::{validate_category, StoreError};
pub use hook::{NoopHook, ReplicationHook, SharedHook};
pub use router::{Backend, CategoryRouter};
pub use store::{Fs, Memory, SegmentStore, MAX_IN_MEMORY_SEGMENT_BYTES, MAX_SEGMENT_BYTES};
