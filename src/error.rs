//! Crate-level error type.

use thiserror::Error;

/// Shorthand for results produced by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong talking to a peer.
#[derive(Debug, Error)]
pub enum Error {
    /// A socket-level failure, including a timed-out wait for a response.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A document failed to encode or decode.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// The peer closed the connection before producing a response.
    #[error("connection closed by peer")]
    ConnectionClosed,
}
