//! The four wire endpoints (write/read/ack/listChunks), mapped onto the
//! category router.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use eventbus_core::CategoryRouter;
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<CategoryRouter>,
}

#[derive(Deserialize)]
pub struct WriteQuery {
    pub category: String,
}

pub async fn write(
    State(state): State<AppState>,
    Query(q): Query<WriteQuery>,
    body: axum::body::Bytes,
) -> Result<StatusCode, ApiError> {
    let store = state.router.get_or_create(&q.category)?;
    tokio::task::spawn_blocking(move || store.write(&body))
        .await
        .map_err(|e| ApiError::server(format!("write task panicked: {e}")))??;
    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
pub struct ReadQuery {
    pub category: String,
    pub chunk: String,
    pub offset: u64,
    #[serde(rename = "maxSize")]
    pub max_size: u64,
}

pub async fn read(State(state): State<AppState>, Query(q): Query<ReadQuery>) -> Result<Vec<u8>, ApiError> {
    let store = state.router.get_or_create(&q.category)?;
    let bytes = tokio::task::spawn_blocking(move || {
        let mut out = Vec::new();
        store.read(&q.chunk, q.offset, q.max_size, &mut out)?;
        Ok::<_, eventbus_core::StoreError>(out)
    })
    .await
    .map_err(|e| ApiError::server(format!("read task panicked: {e}")))??;
    Ok(bytes)
}

#[derive(Deserialize)]
pub struct AckQuery {
    pub category: String,
    pub chunk: String,
    pub size: u64,
}

pub async fn ack(State(state): State<AppState>, Query(q): Query<AckQuery>) -> Result<StatusCode, ApiError> {
    let store = state.router.get_or_create(&q.category)?;
    tokio::task::spawn_blocking(move || store.ack(&q.chunk, q.size))
        .await
        .map_err(|e| ApiError::server(format!("ack task panicked: {e}")))??;
    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
pub struct ListChunksQuery {
    pub category: String,
}

pub async fn list_chunks(
    State(state): State<AppState>,
    Query(q): Query<ListChunksQuery>,
) -> Result<Json<Vec<eventbus_core::ChunkInfo>>, ApiError> {
    let store = state.router.get_or_create(&q.category)?;
    let chunks = tokio::task::spawn_blocking(move || store.list_chunks())
        .await
        .map_err(|e| ApiError::server(format!("listChunks task panicked: {e}")))??;
    Ok(Json(chunks))
}

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}
