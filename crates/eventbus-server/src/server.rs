//! Router construction and server lifecycle.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use eventbus_core::CategoryRouter;
use tokio::net::TcpListener;

use crate::handlers::{self, AppState};

/// Build the axum [`Router`] serving the four wire endpoints plus a
/// liveness probe.
pub fn router(category_router: Arc<CategoryRouter>) -> Router {
    let state = AppState { router: category_router };
    Router::new()
        .route("/write", post(handlers::write))
        .route("/read", get(handlers::read))
        .route("/ack", get(handlers::ack))
        .route("/listChunks", get(handlers::list_chunks))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}

/// Bind `addr` and serve `router` until the listener is closed or a
/// shutdown signal arrives. No graceful drain of in-flight handlers is
/// performed beyond their natural completion.
pub async fn serve(addr: impl tokio::net::ToSocketAddrs, router: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, router).await
}

/// Like [`serve`], but over an already-bound listener. Lets callers pick an
/// ephemeral port (`127.0.0.1:0`) and read back the assigned address before
/// handing the listener off, which `serve` itself has no way to report.
pub async fn serve_on(listener: TcpListener, router: Router) -> std::io::Result<()> {
    tracing::info!(local_addr = ?listener.local_addr()?, "eventbusd listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl_c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl_c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
