//! The remote object mirror as Lua tables.
//!
//! Objects become tables and functions become async functions. Value
//! properties are not stored at all: reading one goes through the table's
//! `__index` and performs a fresh property read on the peer, and assigning
//! to one writes it on the peer.

use std::collections::HashMap;
use std::sync::Arc;

use mlua::{Function, Lua, MultiValue, Result as LuaResult, Table, Value};
use peerlink_bridge::{MirrorNode, MirrorObject, RemoteFunction, RemoteValue};

use crate::convert::{arguments_from_lua, json_to_lua, lua_to_json};

pub fn mirror_table(lua: &Lua, object: &MirrorObject) -> LuaResult<Table> {
    let table = lua.create_table()?;
    let mut values = HashMap::new();
    for (name, node) in object.iter() {
        match node {
            MirrorNode::Object(child) => table.raw_set(name, mirror_table(lua, child)?)?,
            MirrorNode::Function(function) => {
                table.raw_set(name, remote_function(lua, function.clone())?)?
            }
            MirrorNode::Value(value) => {
                values.insert(name.to_string(), value.clone());
            }
        }
    }
    if !values.is_empty() {
        table.set_metatable(Some(value_accessors(lua, Arc::new(values))?));
    }
    Ok(table)
}

fn remote_function(lua: &Lua, function: RemoteFunction) -> LuaResult<Function> {
    lua.create_async_function(move |lua, args: MultiValue| {
        let function = function.clone();
        let arguments = arguments_from_lua(args);
        async move {
            let value = function
                .call(arguments?)
                .await
                .map_err(mlua::Error::external)?;
            json_to_lua(&lua, &value)
        }
    })
}

fn value_accessors(lua: &Lua, values: Arc<HashMap<String, RemoteValue>>) -> LuaResult<Table> {
    let meta = lua.create_table()?;

    let readable = Arc::clone(&values);
    let index = lua.create_async_function(move |lua, (_, key): (Table, Value)| {
        let remote = property_name(&key).and_then(|name| readable.get(&name).cloned());
        async move {
            match remote {
                Some(remote) => {
                    let value = remote.get().await.map_err(mlua::Error::external)?;
                    json_to_lua(&lua, &value)
                }
                None => Ok(Value::Nil),
            }
        }
    })?;
    meta.set("__index", index)?;

    let writable = values;
    let newindex = lua.create_async_function(move |_, (table, key, value): (Table, Value, Value)| {
        let remote = property_name(&key).and_then(|name| writable.get(&name).cloned());
        let write = match remote {
            Some(remote) => lua_to_json(&value).map(|json| Some((remote, json))),
            None => table.raw_set(key, value).map(|()| None),
        };
        async move {
            if let Some((remote, json)) = write? {
                remote.set(json).await.map_err(mlua::Error::external)?;
            }
            Ok(())
        }
    })?;
    meta.set("__newindex", newindex)?;

    Ok(meta)
}

fn property_name(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => s.to_str().ok().map(|s| s.to_string()),
        _ => None,
    }
}
