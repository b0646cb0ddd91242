//! In-memory segment store: same contract as [`super::fs::Fs`], backed by a
//! map of segment name to byte buffer instead of a directory of files.
//!
//! Used for the default (non-file-based) mode, ephemeral categories, and
//! tests that would otherwise pay real disk I/O for no benefit.

use std::collections::HashMap;
use std::io::Write as _;

use log::debug;
use parking_lot::RwLock;

use crate::chunk::{chunk_name, parse_chunk_index, ChunkInfo};
use crate::delimiter::truncate_to_last_delimiter;
use crate::error::StoreError;
use crate::hook::SharedHook;

use super::{validate_chunk_name, SegmentStore, MAX_IN_MEMORY_SEGMENT_BYTES};

struct ActiveSegment {
    name: String,
    size: u64,
}

struct State {
    next_idx: u64,
    active: Option<ActiveSegment>,
    segments: HashMap<String, Vec<u8>>,
}

pub struct Memory {
    category: String,
    max_segment_bytes: u64,
    hook: SharedHook,
    state: RwLock<State>,
}

impl Memory {
    pub fn new(category: impl Into<String>, hook: SharedHook) -> Self {
        Self::with_max_segment_bytes(category, hook, MAX_IN_MEMORY_SEGMENT_BYTES)
    }

    pub fn with_max_segment_bytes(category: impl Into<String>, hook: SharedHook, max_segment_bytes: u64) -> Self {
        Self {
            category: category.into(),
            max_segment_bytes,
            hook,
            state: RwLock::new(State {
                next_idx: 0,
                active: None,
                segments: HashMap::new(),
            }),
        }
    }
}

impl SegmentStore for Memory {
    fn write(&self, msg: &[u8]) -> Result<(), StoreError> {
        let mut state = self.state.write();
        let needs_rollover = match &state.active {
            None => true,
            Some(a) => a.size + msg.len() as u64 > self.max_segment_bytes,
        };

        if needs_rollover {
            let idx = state.next_idx;
            state.next_idx += 1;
            let name = chunk_name(idx);
            state.segments.insert(name.clone(), Vec::new());
            state.active = Some(ActiveSegment { name: name.clone(), size: 0 });
            debug!("category {:?}: rolled over to segment {name}", self.category);
            self.hook
                .init(&self.category, &name)
                .map_err(StoreError::Io)?;
        }

        let active_name = state.active.as_ref().unwrap().name.clone();
        state.segments.get_mut(&active_name).unwrap().extend_from_slice(msg);
        state.active.as_mut().unwrap().size += msg.len() as u64;

        Ok(())
    }

    fn read(&self, chunk: &str, offset: u64, max_size: u64, sink: &mut dyn Write) -> Result<(), StoreError> {
        validate_chunk_name(chunk)?;
        let state = self.state.read();
        let data = state
            .segments
            .get(chunk)
            .ok_or_else(|| StoreError::NotFound(chunk.to_string()))?;

        if offset >= data.len() as u64 {
            return Ok(());
        }
        let offset = offset as usize;
        let end = max_size.min(data.len() as u64 - offset as u64) as usize + offset;
        if end <= offset {
            return Ok(());
        }

        let (truncated, _rest) = truncate_to_last_delimiter(&data[offset..end])?;
        sink.write_all(truncated).map_err(StoreError::Io)?;
        Ok(())
    }

    fn ack(&self, chunk: &str, size: u64) -> Result<(), StoreError> {
        validate_chunk_name(chunk)?;
        let mut state = self.state.write();

        if state.active.as_ref().map(|a| a.name.as_str()) == Some(chunk) {
            return Err(StoreError::AckActiveSegment { chunk: chunk.to_string() });
        }

        let file_size = state
            .segments
            .get(chunk)
            .ok_or_else(|| StoreError::NotFound(chunk.to_string()))?
            .len() as u64;
        if size < file_size {
            return Err(StoreError::UnderConsumed {
                chunk: chunk.to_string(),
                acked: size,
                file_size,
            });
        }

        state.segments.remove(chunk);
        debug!("category {:?}: acked and removed segment {chunk}", self.category);
        Ok(())
    }

    fn list_chunks(&self) -> Result<Vec<ChunkInfo>, StoreError> {
        let state = self.state.read();
        let mut out: Vec<ChunkInfo> = state
            .segments
            .iter()
            .map(|(name, data)| ChunkInfo {
                name: name.clone(),
                complete: state.active.as_ref().map(|a| a.name.as_str()) != Some(name.as_str()),
                size: data.len() as u64,
            })
            .collect();
        out.sort_by_key(|c| parse_chunk_index(&c.name).unwrap_or(u64::MAX));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use super::*;
    use crate::hook::NoopHook;

    fn store() -> Memory {
        Memory::with_max_segment_bytes("events", Arc::new(NoopHook), 4)
    }

    #[test]
    fn same_contract_as_fs_for_the_basics() {
        let store = store();
        store.write(b"one\n").unwrap();
        store.write(b"two\n").unwrap();

        let chunks = store.list_chunks().unwrap();
        assert_eq!(chunks.len(), 2);
        let complete = chunks.iter().find(|c| c.complete).unwrap();

        let mut out = Cursor::new(Vec::new());
        store.read(&complete.name, 0, 100, &mut out).unwrap();
        assert_eq!(out.into_inner(), b"one\n");

        assert!(store.ack(&complete.name, complete.size - 1).is_err());
        store.ack(&complete.name, complete.size).unwrap();
        assert!(store.list_chunks().unwrap().iter().all(|c| c.name != complete.name));
    }

    #[test]
    fn active_cannot_be_acked() {
        let store = store();
        store.write(b"x\n").unwrap();
        let chunks = store.list_chunks().unwrap();
        assert!(store.ack(&chunks[0].name, chunks[0].size).is_err());
    }
}
