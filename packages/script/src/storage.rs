//! The `storage` capability.
//!
//! Scripts see the namespaced manager as
//!
//! ```lua
//! storage["local"].set({ count = 1 })
//! local all = storage.sync.get()          -- every key of the namespace
//! storage.onChanged.addListener(function(changes, area) ... end)
//! ```
//!
//! (`local` is a Lua keyword, so that area is reached by indexing.)

use std::sync::{Arc, Mutex, MutexGuard};

use mlua::{Function, Lua, Result as LuaResult, Table, Value};
use peerlink_storage::{ChangeEvent, ChangeListener, NamespacedArea, StorageManager};

use crate::convert::{items_from_lua, json_to_lua, keys_from_lua};
use crate::queue::CallQueue;

/// Lua functions registered as change listeners, with the listener each
/// one was wrapped in. Keeps listener identity stable across calls.
#[derive(Clone, Default)]
pub struct LuaListeners {
    entries: Arc<Mutex<Vec<(Function, ChangeListener)>>>,
}

impl LuaListeners {
    fn entries(&self) -> MutexGuard<'_, Vec<(Function, ChangeListener)>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn find(&self, function: &Function) -> Option<ChangeListener> {
        self.entries()
            .iter()
            .find(|(registered, _)| registered == function)
            .map(|(_, listener)| listener.clone())
    }

    fn find_or_wrap(&self, function: Function) -> ChangeListener {
        let mut entries = self.entries();
        if let Some((_, listener)) = entries.iter().find(|(registered, _)| *registered == function)
        {
            return listener.clone();
        }
        let listener = wrap_listener(function.clone());
        entries.push((function, listener.clone()));
        listener
    }

    fn forget(&self, function: &Function) {
        self.entries().retain(|(registered, _)| registered != function);
    }

    /// Take every registered listener, leaving none behind.
    pub fn drain(&self) -> Vec<ChangeListener> {
        self.entries()
            .drain(..)
            .map(|(_, listener)| listener)
            .collect()
    }
}

/// Listeners are queued rather than called in place, so they may use the
/// capabilities that suspend.
fn wrap_listener(function: Function) -> ChangeListener {
    let queue = CallQueue::new(function, "change listener");
    ChangeListener::new(move |changes, area| {
        let changes = serde_json::to_value(changes)?;
        if !queue.push(vec![changes, serde_json::Value::from(area.as_str())]) {
            return Err("no tokio runtime to run the listener on".into());
        }
        Ok(())
    })
}

pub fn storage_table(lua: &Lua, manager: &StorageManager, listeners: &LuaListeners) -> LuaResult<Table> {
    let table = lua.create_table()?;
    table.set("keyPrefix", manager.key_prefix())?;
    table.set("local", area_table(lua, manager.local())?)?;
    table.set("sync", area_table(lua, manager.sync())?)?;
    table.set(
        "onChanged",
        change_event_table(lua, manager.on_changed(), listeners.clone())?,
    )?;
    Ok(table)
}

fn area_table(lua: &Lua, area: NamespacedArea) -> LuaResult<Table> {
    let table = lua.create_table()?;

    let handle = area.clone();
    let get = lua.create_async_function(move |lua, keys: Value| {
        let area = handle.clone();
        let keys = keys_from_lua(&keys);
        async move {
            let items = area.get(keys?).await.map_err(mlua::Error::external)?;
            json_to_lua(&lua, &serde_json::Value::Object(items.into_iter().collect()))
        }
    })?;
    table.set("get", get)?;

    let handle = area.clone();
    let set = lua.create_async_function(move |_, items: Value| {
        let area = handle.clone();
        let items = items_from_lua(&items);
        async move { area.set(items?).await.map_err(mlua::Error::external) }
    })?;
    table.set("set", set)?;

    let handle = area.clone();
    let remove = lua.create_async_function(move |_, keys: Value| {
        let area = handle.clone();
        let keys = keys_from_lua(&keys);
        async move { area.remove(keys?).await.map_err(mlua::Error::external) }
    })?;
    table.set("remove", remove)?;

    let handle = area.clone();
    let clear = lua.create_async_function(move |_, ()| {
        let area = handle.clone();
        async move { area.clear().await.map_err(mlua::Error::external) }
    })?;
    table.set("clear", clear)?;

    let handle = area;
    let bytes = lua.create_async_function(move |_, keys: Value| {
        let area = handle.clone();
        let keys = match keys {
            Value::Nil => Ok(None),
            other => keys_from_lua(&other).map(Some),
        };
        async move {
            area.get_bytes_in_use(keys?)
                .await
                .map_err(mlua::Error::external)
        }
    })?;
    table.set("getBytesInUse", bytes)?;

    Ok(table)
}

fn change_event_table(lua: &Lua, event: ChangeEvent, listeners: LuaListeners) -> LuaResult<Table> {
    let table = lua.create_table()?;

    let (on, registry) = (event.clone(), listeners.clone());
    let add = lua.create_function(move |_, function: Function| {
        on.add_listener(&registry.find_or_wrap(function));
        Ok(())
    })?;
    table.set("addListener", add)?;

    let (on, registry) = (event.clone(), listeners.clone());
    let remove = lua.create_function(move |_, function: Function| {
        if let Some(listener) = registry.find(&function) {
            on.remove_listener(&listener);
            registry.forget(&function);
        }
        Ok(())
    })?;
    table.set("removeListener", remove)?;

    let (on, registry) = (event, listeners);
    let has = lua.create_function(move |_, function: Function| {
        Ok(registry
            .find(&function)
            .is_some_and(|listener| on.has_listener(&listener)))
    })?;
    table.set("hasListener", has)?;

    Ok(table)
}
