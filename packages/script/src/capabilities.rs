//! The functions a script can call: `call`, `get`, `set`, `log`, `inject`,
//! `executeInBackground` and the host identifier table.

use std::sync::Arc;

use mlua::{Function, Lua, MultiValue, Result as LuaResult, Table, Value};
use peerlink_bridge::{Dispatcher, Mirror};
use peerlink_wire::{Channel, Message};

use crate::convert::{arguments_from_lua, json_to_lua, lua_to_json, Json};
use crate::mirror::mirror_table;
use crate::sandbox::base_environment;

/// Receives page code from `inject`. Injection itself happens outside
/// peerlink.
pub trait ScriptInjector: Send + Sync {
    fn inject(&self, source: &str);
}

/// The bridge-backed capabilities of one execution.
pub(crate) struct Capabilities {
    pub dispatcher: Dispatcher,
    pub injector: Arc<dyn ScriptInjector>,
    pub allow_callback_arguments: bool,
}

impl Capabilities {
    pub fn install(&self, lua: &Lua, env: &Table) -> LuaResult<()> {
        env.set("call", self.call(lua)?)?;
        env.set("executeInBackground", self.execute_in_background(lua)?)?;
        env.set("get", self.get(lua)?)?;
        env.set("set", self.set(lua)?)?;
        env.set("log", log_function(lua, self.dispatcher.clone())?)?;
        env.set("inject", self.inject(lua)?)?;
        Ok(())
    }

    /// `call(name, ...)`: call a remote function.
    fn call(&self, lua: &Lua) -> LuaResult<Function> {
        let dispatcher = self.dispatcher.clone();
        let allow = self.allow_callback_arguments;
        lua.create_async_function(move |lua, (property, args): (String, MultiValue)| {
            let dispatcher = dispatcher.clone();
            let arguments = arguments_from_lua(args);
            async move {
                let value = dispatcher
                    .dispatch(&property, arguments?, allow, false)
                    .await
                    .map_err(mlua::Error::external)?;
                json_to_lua(&lua, &value)
            }
        })
    }

    /// `get(name)`: read a remote property.
    fn get(&self, lua: &Lua) -> LuaResult<Function> {
        let dispatcher = self.dispatcher.clone();
        let allow = self.allow_callback_arguments;
        lua.create_async_function(move |lua, property: String| {
            let dispatcher = dispatcher.clone();
            async move {
                let value = dispatcher
                    .dispatch(&property, Vec::new(), allow, true)
                    .await
                    .map_err(mlua::Error::external)?;
                json_to_lua(&lua, &value)
            }
        })
    }

    /// `set(name, value)`: write a remote property.
    fn set(&self, lua: &Lua) -> LuaResult<Function> {
        let dispatcher = self.dispatcher.clone();
        let allow = self.allow_callback_arguments;
        lua.create_async_function(move |lua, (property, value): (String, Value)| {
            let dispatcher = dispatcher.clone();
            let arguments = arguments_from_lua(MultiValue::from_vec(vec![value]));
            async move {
                let value = dispatcher
                    .dispatch(&property, arguments?, allow, true)
                    .await
                    .map_err(mlua::Error::external)?;
                json_to_lua(&lua, &value)
            }
        })
    }

    fn inject(&self, lua: &Lua) -> LuaResult<Function> {
        let injector = Arc::clone(&self.injector);
        lua.create_function(move |_, source: String| {
            injector.inject(&source);
            Ok(())
        })
    }

    /// `executeInBackground(source, args)`: evaluate the source of a function
    /// with every top-level mirrored name in scope, and apply it to `args`.
    fn execute_in_background(&self, lua: &Lua) -> LuaResult<Function> {
        let dispatcher = self.dispatcher.clone();
        let allow = self.allow_callback_arguments;
        lua.create_async_function(move |lua, (source, args): (String, Option<Table>)| {
            let dispatcher = dispatcher.clone();
            async move {
                let mirror = Mirror::build(&dispatcher, allow)
                    .await
                    .map_err(mlua::Error::external)?;
                let root = mirror_table(&lua, mirror.root())?;

                let env = base_environment(&lua)?;
                env.set("log", log_function(&lua, dispatcher.clone())?)?;
                for name in mirror.root().names() {
                    // Value properties stay unset so reads fall through to
                    // the mirror and hit the peer.
                    let bound: Value = root.raw_get(name)?;
                    env.raw_set(name, bound)?;
                }
                let fallback = lua.create_table()?;
                fallback.set("__index", root)?;
                env.set_metatable(Some(fallback));

                let function: Function = lua
                    .load(format!("return {source}"))
                    .set_name("=executeInBackground")
                    .set_environment(env)
                    .eval()?;

                let args = match args {
                    Some(args) => args.sequence_values::<Value>().collect::<LuaResult<Vec<_>>>()?,
                    None => Vec::new(),
                };
                function
                    .call_async::<MultiValue>(MultiValue::from_vec(args))
                    .await
            }
        })
    }
}

/// `log(value)`: log a value on the peer.
pub(crate) fn log_function(lua: &Lua, dispatcher: Dispatcher) -> LuaResult<Function> {
    lua.create_function(move |_, value: Value| {
        dispatcher.log(lua_to_json(&value)?);
        Ok(())
    })
}

/// The `runtime` / `browser` table: the host id and a raw `sendMessage`.
pub(crate) fn host_identifier(lua: &Lua, dispatcher: &Dispatcher, host_id: &str) -> LuaResult<Table> {
    let table = lua.create_table()?;
    table.set("id", host_id)?;

    let channel = Arc::clone(dispatcher.channel());
    let send_message = lua.create_async_function(move |lua, message: Json| {
        let channel = Arc::clone(&channel);
        let message = serde_json::from_value::<Message>(message.0).map_err(mlua::Error::external);
        async move {
            let replies = channel.send(message?).map_err(mlua::Error::external)?;
            let reply = replies.first().await.map_err(mlua::Error::external)?;
            json_to_lua(&lua, &reply)
        }
    })?;
    table.set("sendMessage", send_message)?;
    Ok(table)
}
