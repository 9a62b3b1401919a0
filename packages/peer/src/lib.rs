//! # peerlink-peer
//!
//! The privileged side of peerlink, in process. [`ObjectPeer`] exposes a
//! tree of [`HostProperty`] nodes (plain values, nested objects and Rust
//! functions) through the wire protocol, so the bridge and the script
//! executor can be driven without a real browser.
//!
//! ```rust,ignore
//! let peer = ObjectPeer::from_json(json!({ "version": "1.0" }))?
//!     .with("echo", HostProperty::function(|args, _| Ok(json!(args))))?;
//! let channel = LoopbackChannel::new(Arc::new(peer));
//! ```

mod error;
mod peer;
mod property;

pub use error::{PeerError, Result};
pub use peer::ObjectPeer;
pub use property::{describe_all, CallbackSink, HostFunction, HostProperty, Properties};
