//! Error types for the wire layer.

use thiserror::Error;

/// Failures reported by the channel itself, as opposed to failures the peer
/// reports inside a reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The channel no longer accepts messages.
    #[error("channel disconnected")]
    Disconnected,

    /// The peer dropped the request without answering it.
    #[error("the message port closed before a response was received")]
    NoReply,

    /// No async runtime is available to carry the message.
    #[error("no runtime available to deliver the message")]
    NoRuntime,

    /// Any other failure, with the channel's own description.
    #[error("channel error: {0}")]
    Failed(String),
}
