//! # peerlink-storage
//!
//! A facade that lets independent consumers share one key-value store by
//! prefixing every key with a per-consumer namespace.
//!
//! - [`StorageBackend`] / [`StorageArea`]: the shared store (two areas,
//!   `local` and `sync`, plus one change stream). [`MemoryBackend`] is a
//!   complete in-memory implementation.
//! - [`StorageManager`]: the namespaced facade. Its [`NamespacedArea`]s
//!   prefix keys on the way in and strip them on the way out; its
//!   [`ChangeEvent`] multiplexes any number of listeners over a single
//!   backend subscription.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use peerlink_storage::{Keys, MemoryBackend, StorageManager};
//!
//! let backend = Arc::new(MemoryBackend::new());
//! let manager = StorageManager::new("script_", backend)?;
//!
//! manager.local().set([("count".to_string(), 1.into())].into()).await?;
//! let all = manager.local().get(Keys::All).await?;   // {"count": 1}
//! ```
//!
//! Keys are only isolated if every consumer picks a distinct prefix; the
//! facade does not police collisions between prefixes such as `a_` and `a_b_`.

mod area;
mod backend;
mod error;
mod events;
mod keys;
mod manager;
mod memory;

pub use area::NamespacedArea;
pub use backend::{
    AreaName, ChangeHandler, Changes, Items, StorageArea, StorageBackend, StorageChange,
    SubscriptionId,
};
pub use error::{Result, StorageError};
pub use events::{ChangeEvent, ChangeListener, ListenerError};
pub use keys::{KeyPrefix, Keys};
pub use manager::StorageManager;
pub use memory::{MemoryArea, MemoryBackend};
