//! The page context scripts run in.

use std::sync::{Arc, OnceLock};

use mlua::{Lua, Table, Value};
use peerlink_bridge::Dispatcher;
use peerlink_storage::{StorageBackend, StorageManager};

use crate::capabilities::{host_identifier, Capabilities, ScriptInjector};
use crate::config::{ExecutionOutcome, ScriptHostConfig, ScriptOptions};
use crate::convert::lua_to_json;
use crate::error::{Result, ScriptError};
use crate::sandbox::base_environment;
use crate::storage::{storage_table, LuaListeners};

/// Prefix of every reported script failure.
pub const ERROR_PREFIX: &str = "peerlink user script - Uncaught error:\n";

/// Shadows the host identifiers for the rest of the chunk.
const HIDE_HOST_IDENTIFIERS: &str = "local runtime, browser = nil, nil\n";

/// One page context: a Lua VM plus the state its scripts share.
///
/// The scratch `data` table and the script storage are created on first use
/// and then shared, without isolation, by every execution on this host.
pub struct ScriptHost {
    dispatcher: Dispatcher,
    backend: Arc<dyn StorageBackend>,
    injector: Arc<dyn ScriptInjector>,
    config: ScriptHostConfig,
    data: OnceLock<Table>,
    storage: OnceLock<StorageManager>,
    listeners: LuaListeners,
    lua: Lua,
}

impl ScriptHost {
    pub fn new(
        dispatcher: Dispatcher,
        backend: Arc<dyn StorageBackend>,
        injector: Arc<dyn ScriptInjector>,
    ) -> Self {
        Self::with_config(dispatcher, backend, injector, ScriptHostConfig::default())
    }

    pub fn with_config(
        dispatcher: Dispatcher,
        backend: Arc<dyn StorageBackend>,
        injector: Arc<dyn ScriptInjector>,
        config: ScriptHostConfig,
    ) -> Self {
        Self {
            dispatcher,
            backend,
            injector,
            config,
            data: OnceLock::new(),
            storage: OnceLock::new(),
            listeners: LuaListeners::default(),
            lua: Lua::new(),
        }
    }

    pub fn config(&self) -> &ScriptHostConfig {
        &self.config
    }

    /// Run a script. Never fails: errors are logged locally and on the peer,
    /// and returned only for inspection.
    pub async fn execute(&self, code: &str, options: ScriptOptions) -> ExecutionOutcome {
        match self.run(code, options).await {
            Ok(()) => ExecutionOutcome::Completed,
            Err(error) => {
                let message = format!("{ERROR_PREFIX}{}", error.describe());
                tracing::error!(target: "peerlink::script", "{message}");
                self.dispatcher.log(serde_json::Value::String(message.clone()));
                ExecutionOutcome::Failed(message)
            }
        }
    }

    async fn run(&self, code: &str, options: ScriptOptions) -> Result<()> {
        let env = self.environment(options)?;
        let source = if options.hide_host_identifiers {
            format!("{HIDE_HOST_IDENTIFIERS}{code}")
        } else {
            code.to_string()
        };
        let chunk = self
            .lua
            .load(source)
            .set_name("=userscript")
            .set_environment(env);

        tracing::debug!(
            target: "peerlink::script",
            is_async = options.is_async,
            hide = options.hide_host_identifiers,
            callbacks = options.allow_callback_arguments,
            "executing script"
        );
        if options.is_async {
            chunk.exec_async().await?;
        } else {
            chunk.exec()?;
        }
        Ok(())
    }

    fn environment(&self, options: ScriptOptions) -> Result<Table> {
        let lua = &self.lua;
        let env = base_environment(lua)?;

        let host = host_identifier(lua, &self.dispatcher, &self.config.host_id)?;
        env.set("runtime", host.clone())?;
        env.set("browser", host)?;

        Capabilities {
            dispatcher: self.dispatcher.clone(),
            injector: Arc::clone(&self.injector),
            allow_callback_arguments: options.allow_callback_arguments,
        }
        .install(lua, &env)?;

        env.set("storage", storage_table(lua, &self.storage()?, &self.listeners)?)?;
        env.set("data", self.data()?)?;
        Ok(env)
    }

    /// The storage scripts see, created on first use.
    pub fn storage(&self) -> Result<StorageManager> {
        if let Some(manager) = self.storage.get() {
            return Ok(manager.clone());
        }
        let manager = StorageManager::new(&self.config.storage_prefix, Arc::clone(&self.backend))?;
        Ok(self.storage.get_or_init(|| manager).clone())
    }

    fn data(&self) -> Result<Table> {
        if let Some(table) = self.data.get() {
            return Ok(table.clone());
        }
        let table = self.lua.create_table()?;
        Ok(self.data.get_or_init(|| table).clone())
    }

    /// JSON copy of the scratch `data` table.
    pub fn data_snapshot(&self) -> Result<serde_json::Value> {
        let data = self.data()?;
        lua_to_json(&Value::Table(data)).map_err(ScriptError::from)
    }
}

impl Drop for ScriptHost {
    fn drop(&mut self) {
        // Registered listeners hold Lua functions, which keep the VM alive.
        let listeners = self.listeners.drain();
        if let Some(manager) = self.storage.get() {
            let on_changed = manager.on_changed();
            for listener in &listeners {
                on_changed.remove_listener(listener);
            }
        }
    }
}

impl std::fmt::Debug for ScriptHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptHost")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
