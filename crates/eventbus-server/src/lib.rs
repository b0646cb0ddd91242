//! The HTTP wire protocol and server lifecycle for eventbusd.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use server::{router, serve, serve_on};
