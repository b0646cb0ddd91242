//! Alignment of raw read windows to record boundaries.
//!
//! Records are opaque bytes delimited solely by a line feed (`\n`). The
//! server never has any other notion of record framing; this module is the
//! one mechanism by which a truncated read window is kept record-aligned.

const DELIMITER: u8 = b'\n';

/// Truncate `buf` so it ends at the last line feed, returning the truncated
/// prefix and the unconsumed remainder.
///
/// - An empty buffer truncates to itself with no remainder.
/// - A buffer already ending in a line feed is returned unchanged, with no
///   remainder.
/// - Otherwise the last line feed in `buf` is located and becomes the new
///   end of the truncated prefix; everything after it is the remainder.
///
/// Returns [`DelimiterError::BufferTooSmall`] if `buf` is non-empty, does not
/// end in a line feed, and contains no line feed at all -- the caller's read
/// window is too small to contain even a single terminated record.
pub fn truncate_to_last_delimiter(buf: &[u8]) -> Result<(&[u8], &[u8]), DelimiterError> {
    if buf.is_empty() {
        return Ok((buf, &buf[0..0]));
    }
    if *buf.last().unwrap() == DELIMITER {
        return Ok((buf, &buf[buf.len()..]));
    }
    match buf.iter().rposition(|&b| b == DELIMITER) {
        Some(i) => Ok((&buf[..=i], &buf[i + 1..])),
        None => Err(DelimiterError::BufferTooSmall),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DelimiterError {
    #[error("read window contains no delimiter-terminated record")]
    BufferTooSmall,
}
