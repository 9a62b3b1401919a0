//! # peerlink-wire
//!
//! The lowest layer of peerlink: the messages that cross the boundary between
//! the page side and the privileged peer, and the one-shot channel they travel
//! over.
//!
//! The channel model is deliberately small:
//!
//! - Every [`Channel::send`] produces a [`Replies`] stream. The peer answers
//!   an ordinary request exactly once.
//! - A request that registered callback arguments keeps its reply stream
//!   open, and the peer may push any number of callback invocations down it
//!   later.
//! - [`Channel::post`] is fire-and-forget; no reply is expected.
//!
//! ```text
//!   page side                                 peer
//!   ─────────                                 ────
//!   send({action: "backgroundoperation"}) ──▶ handle(message, reply)
//!   Replies ◀─────────────────────────────── reply.send({result: 42})
//!   Replies ◀─────────────────────────────── reply.send({calledArg: 0, args})
//! ```
//!
//! [`LoopbackChannel`] binds any [`Peer`] to the [`Channel`] interface inside
//! one process.

pub mod channel;
pub mod descriptor;
pub mod error;
pub mod message;

pub use channel::{reply_pair, Channel, LoopbackChannel, Peer, Replies, ReplyItem, ReplySender};
pub use descriptor::{DescriptorKind, PeerPropertyDescriptor, PropertiesReply};
pub use error::TransportError;
pub use message::{
    Message, OperationKind, RemoteOperationRequest, RemoteOperationResponse, RequestKind,
};
