//! peerlink: scripts on one side of a message channel, a privileged peer on
//! the other.
//!
//! Everything travels as JSON messages over a [`wire::Channel`]. On top of
//! that:
//!
//! - [`storage`] namespaces a shared key-value store per consumer;
//! - [`bridge`] turns calls, property reads and writes into request/reply
//!   exchanges, including callback arguments, and mirrors the peer's object
//!   tree;
//! - [`script`] runs sandboxed Lua with those capabilities in scope;
//! - [`peer`] is an in-process peer backed by a tree of values and Rust
//!   functions.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use peerlink::{bridge::Dispatcher, peer::ObjectPeer, script::*, storage::MemoryBackend, wire::LoopbackChannel};
//!
//! let peer = Arc::new(ObjectPeer::from_json(serde_json::json!({"greeting": "hi"}))?);
//! let dispatcher = Dispatcher::new(Arc::new(LoopbackChannel::new(peer)));
//! let host = ScriptHost::new(dispatcher, Arc::new(MemoryBackend::new()), injector);
//! host.execute(r#"log(get("greeting"))"#, ScriptOptions::default()).await;
//! ```

pub use peerlink_bridge as bridge;
pub use peerlink_peer as peer;
pub use peerlink_script as script;
pub use peerlink_storage as storage;
pub use peerlink_wire as wire;
