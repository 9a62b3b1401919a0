//! One namespaced storage area.

use std::sync::Arc;

use crate::backend::{AreaName, Items, StorageArea};
use crate::error::{Result, StorageError};
use crate::keys::{KeyPrefix, Keys};

/// A storage area seen through a namespace prefix.
///
/// Writes prefix every key. Reading [`Keys::All`] returns only this
/// namespace's entries with the prefix stripped; reading specific keys
/// returns the backend's result unchanged, so those keys come back prefixed.
#[derive(Clone)]
pub struct NamespacedArea {
    prefix: KeyPrefix,
    area: Arc<dyn StorageArea>,
    name: AreaName,
}

impl NamespacedArea {
    pub(crate) fn new(prefix: KeyPrefix, area: Arc<dyn StorageArea>, name: AreaName) -> Self {
        Self { prefix, area, name }
    }

    pub fn name(&self) -> AreaName {
        self.name
    }

    pub fn prefix(&self) -> &KeyPrefix {
        &self.prefix
    }

    pub async fn get(&self, keys: impl Into<Keys>) -> Result<Items> {
        let keys = keys.into();
        if keys.is_all() {
            let raw = self.area.get(Keys::All).await?;
            return Ok(self.prefix.strip_map(raw));
        }
        self.area.get(self.prefix.apply_keys(&keys)).await
    }

    pub async fn set(&self, items: Items) -> Result<()> {
        tracing::trace!(area = %self.name, prefix = %self.prefix, count = items.len(), "namespaced set");
        self.area.set(self.prefix.apply_map(items)).await
    }

    /// Remove specific keys. [`Keys::All`] is rejected; use
    /// [`clear`](Self::clear) to empty the namespace.
    pub async fn remove(&self, keys: impl Into<Keys>) -> Result<()> {
        let keys = keys.into();
        if keys.is_all() {
            return Err(StorageError::InvalidKeys {
                message: "remove needs explicit keys, use clear() to empty the namespace"
                    .to_string(),
            });
        }
        let names = keys.names().iter().map(|key| self.prefix.apply(key)).collect();
        self.area.remove(names).await
    }

    /// Remove every key visible in this namespace, and nothing else.
    pub async fn clear(&self) -> Result<()> {
        let visible = self.get(Keys::All).await?;
        if visible.is_empty() {
            return Ok(());
        }
        let names = visible.keys().map(|key| self.prefix.apply(key)).collect();
        self.area.remove(names).await
    }

    /// Bytes used by the given keys. `None` (or [`Keys::All`]) measures the
    /// keys currently visible in this namespace.
    pub async fn get_bytes_in_use(&self, keys: Option<Keys>) -> Result<u64> {
        let names = match keys {
            None | Some(Keys::All) => self.get(Keys::All).await?.into_keys().collect(),
            Some(keys) => keys.names(),
        };
        let prefixed = names.iter().map(|key| self.prefix.apply(key)).collect();
        self.area.get_bytes_in_use(Some(prefixed)).await
    }
}

impl std::fmt::Debug for NamespacedArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespacedArea")
            .field("prefix", &self.prefix)
            .field("name", &self.name)
            .finish()
    }
}
