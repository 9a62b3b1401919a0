//! In-memory storage backend.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::{
    AreaName, ChangeHandler, Changes, Items, StorageArea, StorageBackend, StorageChange,
    SubscriptionId,
};
use crate::error::{Result, StorageError};
use crate::keys::Keys;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Subscribers to the change stream, shared by both areas.
#[derive(Default)]
struct Subscribers {
    handlers: Mutex<Vec<(SubscriptionId, ChangeHandler)>>,
}

impl Subscribers {
    fn notify(&self, changes: &Changes, area: AreaName) {
        if changes.is_empty() {
            return;
        }
        // Handlers may subscribe or unsubscribe while running.
        let handlers: Vec<ChangeHandler> = lock(&self.handlers)
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(changes, area);
        }
    }
}

/// One area of a [`MemoryBackend`].
pub struct MemoryArea {
    name: AreaName,
    items: Mutex<Items>,
    fault: Mutex<Option<String>>,
    subscribers: Arc<Subscribers>,
}

impl MemoryArea {
    fn new(name: AreaName, subscribers: Arc<Subscribers>) -> Self {
        Self {
            name,
            items: Mutex::new(Items::new()),
            fault: Mutex::new(None),
            subscribers,
        }
    }

    pub fn name(&self) -> AreaName {
        self.name
    }

    /// Make the next operation on this area fail with a transport error.
    pub fn fail_next(&self, message: impl Into<String>) {
        *lock(&self.fault) = Some(message.into());
    }

    /// Copy of every raw item in the area.
    pub fn snapshot(&self) -> Items {
        lock(&self.items).clone()
    }

    fn check_fault(&self) -> Result<()> {
        match lock(&self.fault).take() {
            Some(message) => Err(StorageError::transport(message)),
            None => Ok(()),
        }
    }

    fn bytes_for(key: &str, value: &Value) -> u64 {
        let value_len = serde_json::to_string(value).map(|s| s.len()).unwrap_or(0);
        (key.len() + value_len) as u64
    }
}

#[async_trait]
impl StorageArea for MemoryArea {
    async fn get(&self, keys: Keys) -> Result<Items> {
        self.check_fault()?;
        let items = lock(&self.items);
        let found = match keys {
            Keys::All => items.clone(),
            Keys::One(key) => items
                .get(&key)
                .map(|value| Items::from([(key, value.clone())]))
                .unwrap_or_default(),
            Keys::Many(keys) => keys
                .into_iter()
                .filter_map(|key| items.get(&key).cloned().map(|value| (key, value)))
                .collect(),
            Keys::Defaults(defaults) => defaults
                .into_iter()
                .map(|(key, default)| {
                    let value = items.get(&key).cloned().unwrap_or(default);
                    (key, value)
                })
                .collect(),
        };
        Ok(found)
    }

    async fn set(&self, new_items: Items) -> Result<()> {
        self.check_fault()?;
        let mut changes = Changes::new();
        {
            let mut items = lock(&self.items);
            for (key, value) in new_items {
                let old_value = items.insert(key.clone(), value.clone());
                if old_value.as_ref() != Some(&value) {
                    changes.insert(
                        key,
                        StorageChange {
                            old_value,
                            new_value: Some(value),
                        },
                    );
                }
            }
        }
        tracing::trace!(area = %self.name, changed = changes.len(), "memory storage set");
        self.subscribers.notify(&changes, self.name);
        Ok(())
    }

    async fn remove(&self, keys: Vec<String>) -> Result<()> {
        self.check_fault()?;
        let mut changes = Changes::new();
        {
            let mut items = lock(&self.items);
            for key in keys {
                if let Some(old_value) = items.remove(&key) {
                    changes.insert(
                        key,
                        StorageChange {
                            old_value: Some(old_value),
                            new_value: None,
                        },
                    );
                }
            }
        }
        self.subscribers.notify(&changes, self.name);
        Ok(())
    }

    async fn get_bytes_in_use(&self, keys: Option<Vec<String>>) -> Result<u64> {
        self.check_fault()?;
        let items = lock(&self.items);
        let total = match keys {
            None => items
                .iter()
                .map(|(key, value)| Self::bytes_for(key, value))
                .sum(),
            Some(keys) => keys
                .iter()
                .filter_map(|key| items.get(key).map(|value| Self::bytes_for(key, value)))
                .sum(),
        };
        Ok(total)
    }
}

/// A [`StorageBackend`] that keeps both areas in memory.
///
/// Changes are delivered to subscribers synchronously, after the write has
/// been applied and before the writing call returns.
pub struct MemoryBackend {
    local: Arc<MemoryArea>,
    sync: Arc<MemoryArea>,
    subscribers: Arc<Subscribers>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let subscribers = Arc::new(Subscribers::default());
        Self {
            local: Arc::new(MemoryArea::new(AreaName::Local, Arc::clone(&subscribers))),
            sync: Arc::new(MemoryArea::new(AreaName::Sync, Arc::clone(&subscribers))),
            subscribers,
        }
    }

    /// Concrete handle to an area, for inspection and fault injection.
    pub fn memory_area(&self, name: AreaName) -> Arc<MemoryArea> {
        match name {
            AreaName::Local => Arc::clone(&self.local),
            AreaName::Sync => Arc::clone(&self.sync),
        }
    }

    /// Number of handlers attached to the change stream.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers.handlers).len()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for MemoryBackend {
    fn area(&self, name: AreaName) -> Arc<dyn StorageArea> {
        self.memory_area(name)
    }

    fn subscribe(&self, handler: ChangeHandler) -> SubscriptionId {
        let id = SubscriptionId::new();
        lock(&self.subscribers.handlers).push((id, handler));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = lock(&self.subscribers.handlers);
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }
}
