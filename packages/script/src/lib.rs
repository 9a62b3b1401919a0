//! # peerlink-script
//!
//! Runs caller-supplied Lua 5.4 in a sandbox whose only free names are a
//! whitelisted base library and these capabilities:
//!
//! | Name | Does |
//! |------|------|
//! | `call(name, ...)` | call a remote function; functions among the arguments become callbacks |
//! | `get(name)` / `set(name, value)` | read / write a remote property |
//! | `executeInBackground(source, args)` | evaluate a function with the peer's objects in scope |
//! | `log(value)` | log a value on the peer |
//! | `inject(source)` | hand page code to the [`ScriptInjector`] |
//! | `storage` | the `script_` namespaced storage |
//! | `data` | scratch table shared by every execution on the host |
//!
//! plus the host identifiers `runtime` and `browser`.
//!
//! Remote capabilities suspend the script while they wait, so scripts are
//! written in a plain sequential style:
//!
//! ```lua
//! local tab = call("tabs.getCurrent")
//! data.visits = (data.visits or 0) + 1
//! log(tab.title .. " #" .. data.visits)
//! ```
//!
//! Errors never escape [`ScriptHost::execute`]: they are logged with a fixed
//! prefix, sent to the peer's log, and reported as
//! [`ExecutionOutcome::Failed`].

mod capabilities;
mod config;
mod convert;
mod error;
mod host;
mod mirror;
mod queue;
mod sandbox;
mod storage;

pub use capabilities::ScriptInjector;
pub use config::{ExecutionOutcome, ScriptHostConfig, ScriptOptions};
pub use convert::{json_to_lua, lua_to_json, Json};
pub use error::{Result, ScriptError};
pub use host::{ScriptHost, ERROR_PREFIX};
