//! # peerlink-cli
//!
//! Runs peerlink scripts against an in-process demo peer.
//!
//! ```bash
//! # Run one script; values it logs are printed as JSON lines
//! peerlink run hello.lua --objects tree.json
//!
//! # Keep the process alive for late callbacks
//! peerlink run timers.lua --wait 1000
//!
//! # Interactive: every line is one execution in the same page context
//! peerlink repl --objects tree.json
//! > data.n = 1
//! > log(call("echo", data.n))
//! log [1]
//! ```
//!
//! The demo peer serves the JSON object tree given with `--objects` plus
//! `echo` and `timer.after`.

pub mod commands;
pub mod completer;
pub mod demo;
pub mod error;
pub mod highlighter;
pub mod host;
pub mod io;
pub mod repl;
pub mod session;

use std::path::Path;
use std::time::Duration;

use peerlink::script::{ExecutionOutcome, ScriptOptions};
use serde_json::Value;

pub use error::{CliError, Result};
pub use repl::ReplCore;
pub use session::Session;

/// Read the object tree for the demo peer; no file means an empty tree.
pub fn load_objects(path: Option<&Path>) -> Result<Value> {
    let Some(path) = path else {
        return Ok(Value::Object(Default::default()));
    };
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Run one script file, then print everything it logged.
pub async fn run_script(
    script: &Path,
    objects: Value,
    options: ScriptOptions,
    wait: Duration,
) -> Result<()> {
    let code = std::fs::read_to_string(script).map_err(|source| CliError::Read {
        path: script.display().to_string(),
        source,
    })?;
    let mut session = Session::new(objects, options)?;

    let outcome = session.execute(&code).await;
    if !wait.is_zero() {
        tokio::time::sleep(wait).await;
    }
    for value in session.new_logs().await {
        println!("{value}");
    }

    match outcome {
        ExecutionOutcome::Completed => Ok(()),
        ExecutionOutcome::Failed(message) => {
            eprintln!("{message}");
            Err(CliError::ScriptFailed)
        }
    }
}

/// Run the interactive REPL on the current thread.
pub fn run_repl(
    runtime: &tokio::runtime::Runtime,
    objects: Value,
    options: ScriptOptions,
    vi: bool,
) -> Result<()> {
    let session = {
        let _guard = runtime.enter();
        Session::new(objects, options)?
    };
    let mut core = ReplCore::new(session, runtime.handle().clone());
    let mut terminal = host::TerminalHost::new(vi);
    core.run(&mut terminal)?;
    Ok(())
}
