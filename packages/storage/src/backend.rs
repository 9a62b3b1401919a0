//! The shared store that namespaced facades sit on top of.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::keys::Keys;

/// Key/value pairs read from or written to a store.
pub type Items = BTreeMap<String, Value>;

/// Which of the two storage areas a value lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaName {
    Local,
    Sync,
}

impl AreaName {
    pub fn as_str(&self) -> &'static str {
        match self {
            AreaName::Local => "local",
            AreaName::Sync => "sync",
        }
    }
}

impl std::fmt::Display for AreaName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Old and new value of one changed key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

/// A batch of changes, keyed by the changed key.
pub type Changes = BTreeMap<String, StorageChange>;

/// Callback attached to a backend's change stream.
pub type ChangeHandler = Arc<dyn Fn(&Changes, AreaName) + Send + Sync>;

/// Identifies one subscription to a backend's change stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

/// One storage area of the shared store.
///
/// Keys seen here are raw: a namespaced facade has already prefixed them.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Arc<dyn StorageArea>`.
#[async_trait]
pub trait StorageArea: Send + Sync {
    /// Read items. [`Keys::All`] reads the whole area; absent keys are
    /// omitted, or filled from the defaults for [`Keys::Defaults`].
    async fn get(&self, keys: Keys) -> Result<Items>;

    /// Write items.
    async fn set(&self, items: Items) -> Result<()>;

    /// Remove the given keys. Missing keys are ignored.
    async fn remove(&self, keys: Vec<String>) -> Result<()>;

    /// Bytes used by the given keys, or by the whole area for `None`.
    async fn get_bytes_in_use(&self, keys: Option<Vec<String>>) -> Result<u64>;
}

/// The shared store: two areas and one change stream covering both.
pub trait StorageBackend: Send + Sync {
    /// Get one of the two areas.
    fn area(&self, name: AreaName) -> Arc<dyn StorageArea>;

    /// Attach a handler to the change stream.
    fn subscribe(&self, handler: ChangeHandler) -> SubscriptionId;

    /// Detach a handler. Returns `false` if it was not attached.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn change_wire_shape() {
        let change = StorageChange {
            old_value: None,
            new_value: Some(json!(2)),
        };
        assert_eq!(serde_json::to_value(&change).unwrap(), json!({"newValue": 2}));
    }

    #[test]
    fn area_names() {
        assert_eq!(AreaName::Local.to_string(), "local");
        assert_eq!(serde_json::to_value(AreaName::Sync).unwrap(), json!("sync"));
    }

    #[test]
    fn subscription_ids_are_unique() {
        assert_ne!(SubscriptionId::new(), SubscriptionId::new());
    }
}
