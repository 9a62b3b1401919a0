//! Change events for a namespace.
//!
//! Every [`ChangeEvent`] handle of a namespace shares one listener registry
//! and, while any listener is registered, exactly one subscription to the
//! backend's change stream.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::backend::{AreaName, Changes, StorageBackend, SubscriptionId};
use crate::keys::KeyPrefix;

/// Error a listener may return. It is logged and otherwise ignored.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

type ListenerFn = dyn Fn(&Changes, AreaName) -> Result<(), ListenerError> + Send + Sync;

/// A change listener.
///
/// Listeners compare by identity: clones of one listener are the same
/// listener, two listeners built from identical closures are not.
#[derive(Clone)]
pub struct ChangeListener(Arc<ListenerFn>);

impl ChangeListener {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Changes, AreaName) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    fn invoke(&self, changes: &Changes, area: AreaName) -> Result<(), ListenerError> {
        (self.0)(changes, area)
    }
}

impl PartialEq for ChangeListener {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ChangeListener {}

impl std::fmt::Debug for ChangeListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChangeListener({:p})", Arc::as_ptr(&self.0))
    }
}

#[derive(Default)]
struct Registry {
    listeners: Vec<ChangeListener>,
    subscription: Option<SubscriptionId>,
}

struct Shared {
    prefix: KeyPrefix,
    backend: Arc<dyn StorageBackend>,
    registry: Mutex<Registry>,
}

impl Shared {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn start_listening(self: &Arc<Self>, registry: &mut Registry) {
        if registry.subscription.is_some() {
            return;
        }
        let weak: Weak<Shared> = Arc::downgrade(self);
        let id = self
            .backend
            .subscribe(Arc::new(move |changes: &Changes, area: AreaName| {
                if let Some(shared) = weak.upgrade() {
                    shared.deliver(changes, area);
                }
            }));
        tracing::debug!(prefix = %self.prefix, "attached storage change subscription");
        registry.subscription = Some(id);
    }

    fn stop_listening(&self, registry: &mut Registry) {
        if let Some(id) = registry.subscription.take() {
            self.backend.unsubscribe(id);
            tracing::debug!(prefix = %self.prefix, "detached storage change subscription");
        }
    }

    fn deliver(&self, changes: &Changes, area: AreaName) {
        let listeners = {
            let mut registry = self.registry();
            if registry.listeners.is_empty() {
                self.stop_listening(&mut registry);
                return;
            }
            registry.listeners.clone()
        };

        let filtered = self.prefix.strip_map(changes.clone());
        if filtered.is_empty() {
            return;
        }

        for listener in listeners {
            if let Err(error) = listener.invoke(&filtered, area) {
                tracing::debug!(prefix = %self.prefix, %error, "storage change listener failed");
            }
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let id = self.registry().subscription.take();
        if let Some(id) = id {
            self.backend.unsubscribe(id);
        }
    }
}

/// The `onChanged` event of a namespace.
#[derive(Clone)]
pub struct ChangeEvent {
    shared: Arc<Shared>,
}

impl ChangeEvent {
    pub(crate) fn new(prefix: KeyPrefix, backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            shared: Arc::new(Shared {
                prefix,
                backend,
                registry: Mutex::new(Registry::default()),
            }),
        }
    }

    /// Register a listener. Registering the same listener twice is a no-op.
    pub fn add_listener(&self, listener: &ChangeListener) {
        let mut registry = self.shared.registry();
        if registry.listeners.contains(listener) {
            return;
        }
        self.shared.start_listening(&mut registry);
        registry.listeners.push(listener.clone());
    }

    /// Unregister a listener. Removing the last one detaches the backend
    /// subscription.
    pub fn remove_listener(&self, listener: &ChangeListener) {
        let mut registry = self.shared.registry();
        if !registry.listeners.contains(listener) {
            return;
        }
        registry.listeners.retain(|existing| existing != listener);
        if registry.listeners.is_empty() {
            self.shared.stop_listening(&mut registry);
        }
    }

    pub fn has_listener(&self, listener: &ChangeListener) -> bool {
        self.shared.registry().listeners.contains(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.shared.registry().listeners.len()
    }

    /// Whether the backend subscription is currently attached.
    pub fn is_listening(&self) -> bool {
        self.shared.registry().subscription.is_some()
    }
}
