//! REPL line handling.
//!
//! A line is either a command or Lua source:
//! - `:data` - Show the scratch `data` table
//! - `:storage` - Show both storage areas of the script namespace
//! - `:raw` - Show the backend's keys, prefixes included
//! - `:objects` - Show the peer's object tree
//! - `:help` - Show help
//! - `:quit` - Exit the REPL (`exit` and `quit` work too)
//!
//! Anything else runs as one script execution.

use peerlink::script::ExecutionOutcome;
use serde_json::Value;
use tokio::runtime::Handle;

use crate::session::Session;

/// Result of handling a line
pub enum CommandResult {
    /// Command succeeded, optionally with output to display
    Ok(Option<String>),
    /// A script ran; `logs` are the values it logged on the peer
    Script {
        logs: Vec<Value>,
        outcome: ExecutionOutcome,
    },
    /// Command failed with an error message
    Error(String),
    /// User requested to exit
    Exit,
    /// Show help
    Help,
}

pub const COMMANDS: &[&str] = &[":data", ":storage", ":raw", ":objects", ":help", ":quit"];

pub fn execute(line: &str, session: &mut Session, runtime: &Handle) -> CommandResult {
    let line = line.trim();
    if line.is_empty() {
        return CommandResult::Ok(None);
    }

    match line {
        ":quit" | ":exit" | ":q" | "exit" | "quit" => CommandResult::Exit,
        ":help" | ":h" | "help" => CommandResult::Help,
        ":data" => match session.data() {
            Ok(data) => CommandResult::Ok(Some(pretty(&data))),
            Err(e) => CommandResult::Error(e.to_string()),
        },
        ":storage" => match runtime.block_on(session.storage()) {
            Ok(storage) => CommandResult::Ok(Some(pretty(&storage))),
            Err(e) => CommandResult::Error(e.to_string()),
        },
        ":raw" => CommandResult::Ok(Some(pretty(&session.raw_storage()))),
        ":objects" => CommandResult::Ok(Some(pretty(&session.objects()))),
        other if other.starts_with(':') => {
            CommandResult::Error(format!("Unknown command: {other}. Type :help for help."))
        }
        code => runtime.block_on(async {
            let outcome = session.execute(code).await;
            let logs = session.new_logs().await;
            CommandResult::Script { logs, outcome }
        }),
    }
}

/// Pretty-print a JSON value
pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub fn format_help() -> String {
    r#"Each line runs as a Lua script in the same page context, so `data` and
`storage` keep their contents between lines.

Capabilities:
  call(name, ...)              Call a peer function; Lua functions become callbacks
  get(name) / set(name, v)     Read / write a peer property
  executeInBackground(src, a)  Evaluate a function with the peer's objects in scope
  log(value)                   Log a value on the peer (printed below the line)
  inject(source)               Hand page code to the injector
  storage["local"], storage.sync, storage.onChanged
  data                         Scratch table shared by every line

Demo peer:
  echo(...)                    Returns its arguments
  timer.after(ms, callback)    Calls callback(ms) once after ms milliseconds

Commands:
  :data       Show the scratch data table
  :storage    Show the script's storage
  :raw        Show the backend's keys, prefixes included
  :objects    Show the peer's object tree
  :help       Show this help
  :quit       Exit

Examples:
  log(call("echo", 1, 2))
  call("timer.after", 500, function(ms) log("after " .. ms) end)
  storage.sync.set({ theme = "dark" })
"#
    .to_string()
}
