//! Client-side resumable consumer for eventbusd categories.

pub mod machine;
pub mod transport;

#[cfg(feature = "http")]
pub mod http;

pub use machine::{Consumer, ConsumerError, StepResult};
pub use transport::{Transport, TransportError};

#[cfg(feature = "http")]
pub use http::HttpTransport;
