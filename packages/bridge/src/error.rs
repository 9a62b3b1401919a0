//! Error types for remote operations.

use peerlink_wire::TransportError;
use serde_json::Value;
use thiserror::Error;

/// Errors from dispatching an operation to the peer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// The channel failed to deliver the request or its reply.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The peer reported a failure. The payload is passed through as sent.
    #[error("remote operation failed: {0}")]
    Remote(Value),

    /// The peer's reply could not be interpreted.
    #[error("malformed reply: {0}")]
    MalformedReply(String),
}

/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
