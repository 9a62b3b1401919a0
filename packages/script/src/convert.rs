//! Marshaling between Lua values and JSON.
//!
//! `nil` maps to `null`, non-empty sequences to arrays and every other table
//! to an object. A table with a sequence part is an array: its keys outside
//! `1..=#t` are not marshaled, so `{ 1, 2, x = 3 }` becomes `[1, 2]`.
//! Functions have no JSON form: they are dropped from objects and become
//! `null` in arrays, mirroring `JSON.stringify`.

use mlua::{FromLua, Function, IntoLua, Lua, MultiValue, Result as LuaResult, Table, Value};
use peerlink_bridge::Argument;
use peerlink_storage::{Items, Keys};

use crate::queue::CallQueue;

/// Nesting limit for tables, so self-referencing tables fail instead of
/// recursing forever.
const MAX_DEPTH: usize = 64;

/// A JSON value passed to or from Lua.
#[derive(Debug, Clone, PartialEq)]
pub struct Json(pub serde_json::Value);

impl IntoLua for Json {
    fn into_lua(self, lua: &Lua) -> LuaResult<Value> {
        json_to_lua(lua, &self.0)
    }
}

impl FromLua for Json {
    fn from_lua(value: Value, _lua: &Lua) -> LuaResult<Self> {
        lua_to_json(&value).map(Json)
    }
}

pub fn json_to_lua(lua: &Lua, value: &serde_json::Value) -> LuaResult<Value> {
    Ok(match value {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::String(lua.create_string(s)?),
        serde_json::Value::Array(items) => {
            let table = lua.create_table_with_capacity(items.len(), 0)?;
            for (i, item) in items.iter().enumerate() {
                table.raw_set(i + 1, json_to_lua(lua, item)?)?;
            }
            Value::Table(table)
        }
        serde_json::Value::Object(map) => {
            let table = lua.create_table_with_capacity(0, map.len())?;
            for (key, item) in map {
                table.raw_set(key.as_str(), json_to_lua(lua, item)?)?;
            }
            Value::Table(table)
        }
    })
}

pub fn lua_to_json(value: &Value) -> LuaResult<serde_json::Value> {
    to_json(value, 0)
}

fn to_json(value: &Value, depth: usize) -> LuaResult<serde_json::Value> {
    match value {
        Value::Nil => Ok(serde_json::Value::Null),
        Value::Boolean(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Integer(i) => Ok(serde_json::Value::from(*i)),
        Value::Number(n) => Ok(serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)),
        Value::String(s) => Ok(serde_json::Value::String(s.to_str()?.to_string())),
        Value::Function(_) => Ok(serde_json::Value::Null),
        Value::Table(table) => {
            if depth >= MAX_DEPTH {
                return Err(mlua::Error::external("table nesting too deep to marshal"));
            }
            table_to_json(table, depth + 1)
        }
        other => Err(mlua::Error::external(format!(
            "cannot marshal a {} value",
            other.type_name()
        ))),
    }
}

/// Non-sequence keys of a table with a sequence part are skipped.
fn table_to_json(table: &Table, depth: usize) -> LuaResult<serde_json::Value> {
    let len = table.raw_len();
    if len > 0 {
        let mut items = Vec::with_capacity(len);
        for i in 1..=len {
            let item: Value = table.raw_get(i)?;
            items.push(to_json(&item, depth)?);
        }
        return Ok(serde_json::Value::Array(items));
    }

    let mut map = serde_json::Map::new();
    for pair in table.clone().pairs::<Value, Value>() {
        let (key, item) = pair?;
        if matches!(item, Value::Function(_)) {
            continue;
        }
        let key = match key {
            Value::String(s) => s.to_str()?.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Number(n) => n.to_string(),
            other => {
                return Err(mlua::Error::external(format!(
                    "cannot use a {} as an object key",
                    other.type_name()
                )))
            }
        };
        map.insert(key, to_json(&item, depth)?);
    }
    Ok(serde_json::Value::Object(map))
}

/// Read the keys argument of a storage call.
///
/// `nil` addresses every key, a string one key, a sequence a list of keys
/// and any other table a set of keys with default values.
pub fn keys_from_lua(value: &Value) -> LuaResult<Keys> {
    match value {
        Value::Nil => Ok(Keys::All),
        Value::String(s) => Ok(Keys::One(s.to_str()?.to_string())),
        Value::Table(table) if table.raw_len() > 0 => {
            let keys = table
                .clone()
                .sequence_values::<String>()
                .collect::<LuaResult<Vec<_>>>()?;
            Ok(Keys::Many(keys))
        }
        Value::Table(_) => Ok(Keys::Defaults(items_from_lua(value)?)),
        other => Err(mlua::Error::external(format!(
            "storage keys must be nil, a string or a table, got {}",
            other.type_name()
        ))),
    }
}

/// Read a table of items to store.
pub fn items_from_lua(value: &Value) -> LuaResult<Items> {
    match lua_to_json(value)? {
        serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
        serde_json::Value::Null => Ok(Items::new()),
        other => Err(mlua::Error::external(format!(
            "storage items must be a table of key/value pairs, got {other}"
        ))),
    }
}

/// Turn the arguments of a Lua call into remote call arguments.
///
/// Top-level functions become callbacks; the dispatcher decides whether they
/// are kept.
pub fn arguments_from_lua(args: MultiValue) -> LuaResult<Vec<Argument>> {
    args.into_iter()
        .map(|value| match value {
            Value::Function(function) => Ok(lua_callback(function)),
            other => lua_to_json(&other).map(Argument::Value),
        })
        .collect()
}

/// Wrap a Lua function as a callback argument.
///
/// Invocations run in the order the peer makes them, one at a time; errors
/// are traced.
pub fn lua_callback(function: Function) -> Argument {
    let queue = CallQueue::new(function, "callback");
    Argument::callback(move |args| {
        if !queue.push(args) {
            tracing::warn!("callback invoked outside a tokio runtime, dropped");
        }
    })
}
