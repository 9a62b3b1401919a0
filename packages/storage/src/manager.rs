//! The namespaced storage facade.

use std::sync::Arc;

use crate::area::NamespacedArea;
use crate::backend::{AreaName, StorageBackend};
use crate::error::Result;
use crate::events::ChangeEvent;
use crate::keys::KeyPrefix;

/// Storage for one consumer of a shared backend.
///
/// Cloning is cheap and clones share the listener registry. Every accessor
/// hands out its own clone of the handle.
#[derive(Clone)]
pub struct StorageManager {
    prefix: KeyPrefix,
    local: NamespacedArea,
    sync: NamespacedArea,
    on_changed: ChangeEvent,
}

impl StorageManager {
    pub fn new(prefix: &str, backend: Arc<dyn StorageBackend>) -> Result<Self> {
        let prefix = KeyPrefix::new(prefix)?;
        let local = NamespacedArea::new(
            prefix.clone(),
            backend.area(AreaName::Local),
            AreaName::Local,
        );
        let sync = NamespacedArea::new(
            prefix.clone(),
            backend.area(AreaName::Sync),
            AreaName::Sync,
        );
        let on_changed = ChangeEvent::new(prefix.clone(), backend);
        Ok(Self {
            prefix,
            local,
            sync,
            on_changed,
        })
    }

    pub fn key_prefix(&self) -> &str {
        self.prefix.as_str()
    }

    pub fn local(&self) -> NamespacedArea {
        self.local.clone()
    }

    pub fn sync(&self) -> NamespacedArea {
        self.sync.clone()
    }

    pub fn area(&self, name: AreaName) -> NamespacedArea {
        match name {
            AreaName::Local => self.local(),
            AreaName::Sync => self.sync(),
        }
    }

    pub fn on_changed(&self) -> ChangeEvent {
        self.on_changed.clone()
    }
}

impl std::fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageManager")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Changes, StorageArea};
    use crate::error::StorageError;
    use crate::events::ChangeListener;
    use crate::keys::Keys;
    use crate::memory::MemoryBackend;
    use collection_literals::btree;
    use serde_json::json;
    use std::sync::Mutex;

    fn backend() -> Arc<MemoryBackend> {
        Arc::new(MemoryBackend::new())
    }

    #[test]
    fn empty_prefix_rejected() {
        let err = StorageManager::new("", backend()).unwrap_err();
        assert_eq!(err, StorageError::InvalidPrefix(String::new()));
    }

    #[tokio::test]
    async fn namespaces_do_not_see_each_other() {
        let backend = backend();
        let a = StorageManager::new("a_", backend.clone()).unwrap();
        let b = StorageManager::new("b_", backend.clone()).unwrap();

        a.local().set(btree! { "k".to_string() => json!(1) }).await.unwrap();
        b.local().set(btree! { "k".to_string() => json!(2) }).await.unwrap();

        assert_eq!(
            a.local().get(Keys::All).await.unwrap(),
            btree! { "k".to_string() => json!(1) }
        );
        assert_eq!(
            b.local().get(Keys::All).await.unwrap(),
            btree! { "k".to_string() => json!(2) }
        );
        assert!(a.sync().get(Keys::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_leaves_other_namespaces() {
        let backend = backend();
        let x = StorageManager::new("x_", backend.clone()).unwrap();
        let y = StorageManager::new("y_", backend.clone()).unwrap();

        x.local()
            .set(btree! { "a".to_string() => json!(1), "b".to_string() => json!(2) })
            .await
            .unwrap();
        y.local().set(btree! { "a".to_string() => json!(9) }).await.unwrap();

        x.local().clear().await.unwrap();

        assert!(x.local().get(Keys::All).await.unwrap().is_empty());
        assert_eq!(
            backend.memory_area(AreaName::Local).snapshot(),
            btree! { "y_a".to_string() => json!(9) }
        );
    }

    #[tokio::test]
    async fn listeners_share_one_subscription() {
        let backend = backend();
        let manager = StorageManager::new("a_", backend.clone()).unwrap();
        let seen: Arc<Mutex<Vec<(String, AreaName)>>> = Arc::default();

        let listeners: Vec<ChangeListener> = (0..3)
            .map(|i| {
                let sink = Arc::clone(&seen);
                ChangeListener::new(move |changes: &Changes, area| {
                    for key in changes.keys() {
                        sink.lock().unwrap().push((format!("{i}:{key}"), area));
                    }
                    Ok(())
                })
            })
            .collect();
        for listener in &listeners {
            manager.on_changed().add_listener(listener);
        }
        assert_eq!(backend.subscriber_count(), 1);

        manager
            .sync()
            .set(btree! { "k".to_string() => json!(1) })
            .await
            .unwrap();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                ("0:k".to_string(), AreaName::Sync),
                ("1:k".to_string(), AreaName::Sync),
                ("2:k".to_string(), AreaName::Sync),
            ]
        );

        for listener in &listeners {
            manager.on_changed().remove_listener(listener);
        }
        assert_eq!(backend.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn foreign_changes_do_not_reach_listeners() {
        let backend = backend();
        let a = StorageManager::new("a_", backend.clone()).unwrap();
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        a.on_changed().add_listener(&ChangeListener::new(move |_, _| {
            *counter.lock().unwrap() += 1;
            Ok(())
        }));

        backend
            .area(AreaName::Local)
            .set(btree! { "b_k".to_string() => json!(1) })
            .await
            .unwrap();
        assert_eq!(*calls.lock().unwrap(), 0);

        a.local().set(btree! { "k".to_string() => json!(1) }).await.unwrap();
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn clones_share_the_registry() {
        let backend = backend();
        let manager = StorageManager::new("a_", backend.clone()).unwrap();
        let copy = manager.clone();
        let listener = ChangeListener::new(|_, _| Ok(()));

        manager.on_changed().add_listener(&listener);
        assert!(copy.on_changed().has_listener(&listener));
        copy.on_changed().remove_listener(&listener);
        assert_eq!(backend.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn set_failure_is_a_transport_error() {
        let backend = backend();
        let manager = StorageManager::new("a_", backend.clone()).unwrap();
        backend.memory_area(AreaName::Sync).fail_next("QUOTA_BYTES exceeded");

        let err = manager
            .sync()
            .set(btree! { "k".to_string() => json!(1) })
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::transport("QUOTA_BYTES exceeded"));
        assert_eq!(manager.key_prefix(), "a_");
    }
}
