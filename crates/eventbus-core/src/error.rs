//! Error types for category validation and segment store operations.

use std::io;

use thiserror::Error;

use crate::delimiter::DelimiterError;

/// Error returned by segment store operations ([`crate::store::SegmentStore`]).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("chunk {0:?} not found")]
    NotFound(String),

    #[error("{0}")]
    BufferTooSmall(#[from] DelimiterError),

    #[error("cannot ack chunk {chunk:?}: it is the active segment")]
    AckActiveSegment { chunk: String },

    #[error("cannot ack chunk {chunk:?}: acked size {acked} is less than file size {file_size}")]
    UnderConsumed { chunk: String, acked: u64, file_size: u64 },

    #[error("invalid category {0:?}")]
    InvalidCategory(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Whether this error should be reported to an HTTP caller as a 4xx
    /// (client's fault) rather than a 5xx (store/transport failure).
    ///
    /// Missing parameters and invalid categories are client errors;
    /// not-found chunk and ack conflicts are also reported as client errors
    /// here since they're typically the consequence of an otherwise-valid
    /// request racing the server's state, not a store malfunction. This
    /// helper only covers the store-error half of the request handler's
    /// status-code mapping; missing-parameter errors are classified
    /// directly by the handler.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidCategory(_)
                | StoreError::NotFound(_)
                | StoreError::AckActiveSegment { .. }
                | StoreError::UnderConsumed { .. }
                | StoreError::BufferTooSmall(_)
        )
    }
}

/// Validate a category name.
///
/// A category must be non-empty, must not be `.` or `..`, and must not
/// contain a path separator or a literal `.` anywhere (which also rules out
/// `..` as a path component and any attempt at directory traversal).
pub fn validate_category(name: &str) -> Result<(), StoreError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('.');
    if invalid {
        return Err(StoreError::InvalidCategory(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_dot_forms() {
        assert!(validate_category("").is_err());
        assert!(validate_category(".").is_err());
        assert!(validate_category("..").is_err());
    }

    #[test]
    fn rejects_separators_and_dots() {
        for bad in ["a/b", "a\\b", "a.b", "../escape", "a/../b"] {
            assert!(validate_category(bad).is_err(), "expected {bad:?} to be rejected");
        }
    }

    #[test]
    fn accepts_plain_names() {
        for good in ["number", "num\nbers", "_:num\nbe:rs"] {
            assert!(validate_category(good).is_ok(), "expected {good:?} to be accepted");
        }
    }
}
