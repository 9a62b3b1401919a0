//! # peerlink-bridge
//!
//! The page side of the capability bridge.
//!
//! - [`Dispatcher`] sends one function call, property read or property
//!   write to the peer and resolves from its reply. Callback arguments are
//!   replaced by placeholders on the wire and invoked locally whenever the
//!   peer asks, for as long as the request stays open.
//! - [`Mirror`] rebuilds the peer's exposed object graph as a tree of
//!   [`MirrorNode`]s that forward to the dispatcher.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use peerlink_bridge::{Argument, Dispatcher, Mirror};
//! use peerlink_wire::LoopbackChannel;
//!
//! let dispatcher = Dispatcher::new(Arc::new(LoopbackChannel::new(peer)));
//!
//! let answer = dispatcher.call("math.answer", vec![]).await?;
//!
//! let mirror = Mirror::build(&dispatcher, true).await?;
//! if let Some(on) = mirror.resolve("events.on").and_then(|n| n.as_function()) {
//!     on.call(vec![Argument::callback(|args| println!("{args:?}"))]).await?;
//! }
//! ```

mod argument;
mod dispatcher;
mod error;
mod mirror;

pub use argument::{Argument, Callback};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, Result};
pub use mirror::{Mirror, MirrorNode, MirrorObject, RemoteFunction, RemoteValue};
