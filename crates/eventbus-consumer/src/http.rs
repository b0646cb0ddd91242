//! An HTTP [`Transport`] speaking the server's wire protocol over
//! `reqwest`'s async client.

use async_trait::async_trait;
use eventbus_core::ChunkInfo;

use crate::transport::{Transport, TransportError};

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into() }
    }

    fn other(context: &str, err: impl std::fmt::Display) -> TransportError {
        TransportError::Other(format!("{context}: {err}"))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn list_chunks(&self, category: &str) -> Result<Vec<ChunkInfo>, TransportError> {
        let resp = self
            .client
            .get(format!("{}/listChunks", self.base_url))
            .query(&[("category", category)])
            .send()
            .await
            .map_err(|e| Self::other("listChunks request failed", e))?;

        if !resp.status().is_success() {
            return Err(TransportError::Other(format!("listChunks: status {}", resp.status())));
        }
        resp.json().await.map_err(|e| Self::other("listChunks: bad body", e))
    }

    async fn read(
        &self,
        category: &str,
        chunk: &str,
        offset: u64,
        max_size: u64,
        buf: &mut Vec<u8>,
    ) -> Result<(), TransportError> {
        let resp = self
            .client
            .get(format!("{}/read", self.base_url))
            .query(&[
                ("category", category),
                ("chunk", chunk),
                ("offset", &offset.to_string()),
                ("maxSize", &max_size.to_string()),
            ])
            .send()
            .await
            .map_err(|e| Self::other("read request failed", e))?;

        if !resp.status().is_success() {
            return Err(TransportError::Other(format!("read: status {}", resp.status())));
        }
        let bytes = resp.bytes().await.map_err(|e| Self::other("read: bad body", e))?;
        buf.clear();
        buf.extend_from_slice(&bytes);
        Ok(())
    }

    async fn ack(&self, category: &str, chunk: &str, size: u64) -> Result<(), TransportError> {
        let resp = self
            .client
            .get(format!("{}/ack", self.base_url))
            .query(&[("category", category), ("chunk", chunk), ("size", &size.to_string())])
            .send()
            .await
            .map_err(|e| Self::other("ack request failed", e))?;

        if !resp.status().is_success() {
            return Err(TransportError::Other(format!("ack: status {}", resp.status())));
        }
        Ok(())
    }
}
