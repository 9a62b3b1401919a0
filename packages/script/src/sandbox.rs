//! The whitelisted base environment scripts run in.
//!
//! Only pure language functions and the `math`, `string` and `table`
//! libraries are copied from the VM's globals. `load`, `dofile`, `require`,
//! `os`, `io` and `debug` are never reachable. `print` goes to the log.

use mlua::{Lua, MultiValue, Result as LuaResult, Table, Value};

const BASE_FUNCTIONS: &[&str] = &[
    "assert",
    "error",
    "getmetatable",
    "ipairs",
    "next",
    "pairs",
    "pcall",
    "rawequal",
    "rawget",
    "rawlen",
    "rawset",
    "select",
    "setmetatable",
    "tonumber",
    "tostring",
    "type",
    "xpcall",
];

const LIBRARIES: &[&str] = &["math", "string", "table"];

/// Create a fresh environment table holding the whitelisted base.
pub fn base_environment(lua: &Lua) -> LuaResult<Table> {
    let env = lua.create_table()?;
    let globals = lua.globals();
    for name in BASE_FUNCTIONS.iter().chain(LIBRARIES) {
        let value: Value = globals.get(*name)?;
        if !value.is_nil() {
            env.set(*name, value)?;
        }
    }
    env.set("print", lua.create_function(print)?)?;
    Ok(env)
}

fn print(_: &Lua, args: MultiValue) -> LuaResult<()> {
    let line = args.iter().map(display).collect::<Vec<_>>().join("\t");
    tracing::info!(target: "peerlink::script", "{line}");
    Ok(())
}

fn display(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s
            .to_str()
            .map(|s| s.to_string())
            .unwrap_or_else(|_| "<invalid utf8>".to_string()),
        other => format!("{}: {:p}", other.type_name(), other.to_pointer()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(code: &str) -> Value {
        let lua = Lua::new();
        let env = base_environment(&lua).unwrap();
        lua.load(code).set_environment(env).eval().unwrap()
    }

    #[test]
    fn dangerous_globals_are_absent() {
        for name in ["load", "loadfile", "dofile", "require", "os", "io", "debug", "package"] {
            let value = run(&format!("return {name}"));
            assert!(value.is_nil(), "{name} is reachable");
        }
    }

    #[test]
    fn whitelisted_functions_work() {
        let lua = Lua::new();
        let env = base_environment(&lua).unwrap();
        let value: String = lua
            .load(r#"return string.upper("a") .. tostring(math.max(1, 2)) .. #table.pack(1, 2, 3)"#)
            .set_environment(env)
            .eval()
            .unwrap();
        assert_eq!(value, "A23");
    }

    #[test]
    fn print_does_not_fail() {
        assert!(run(r#"print("hello", 1, nil, {}) return nil"#).is_nil());
    }
}
