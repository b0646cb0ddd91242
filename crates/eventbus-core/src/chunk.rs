//! The externally observable shape of a segment.

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInfo {
    /// The segment filename, e.g. `"chunk7"`.
    pub name: String,
    /// True iff this segment is not the category's current active
    /// (append-target) segment.
    pub complete: bool,
    /// Current byte length of the segment.
    pub size: u64,
}

const CHUNK_PREFIX: &str = "chunk";

/// Build the canonical filename for segment index `n`.
pub fn chunk_name(n: u64) -> String {
    format!("{CHUNK_PREFIX}{n}")
}

/// Parse a segment filename of the form `chunk<N>` into its index.
///
/// Returns `None` for anything that doesn't match, including the prefix
/// alone, non-numeric suffixes, or an out-of-range integer -- such entries
/// are ignored during directory scans rather than treated as an error.
pub fn parse_chunk_index(name: &str) -> Option<u64> {
    name.strip_prefix(CHUNK_PREFIX)?.parse().ok()
}
