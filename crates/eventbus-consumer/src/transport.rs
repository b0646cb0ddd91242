//! The three calls the consumer state machine needs from a server
//! connection: list, positional read, and ack.

use async_trait::async_trait;
use eventbus_core::ChunkInfo;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport error: {0}")]
    Other(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn list_chunks(&self, category: &str) -> Result<Vec<ChunkInfo>, TransportError>;

    /// Append up to `max_size` bytes of `chunk`, starting at `offset`, into
    /// `buf` (cleared first). Mirrors the server's `/read` contract: may
    /// write zero bytes without that being an error.
    async fn read(
        &self,
        category: &str,
        chunk: &str,
        offset: u64,
        max_size: u64,
        buf: &mut Vec<u8>,
    ) -> Result<(), TransportError>;

    async fn ack(&self, category: &str, chunk: &str, size: u64) -> Result<(), TransportError>;
}
