//! Configuration of the script host and of single executions.

use serde::{Deserialize, Serialize};

/// Settings of a [`crate::ScriptHost`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScriptHostConfig {
    /// Namespace prefix of the storage handed to scripts.
    pub storage_prefix: String,

    /// Value of `runtime.id` inside scripts.
    pub host_id: String,
}

impl Default for ScriptHostConfig {
    fn default() -> Self {
        Self {
            storage_prefix: "script_".to_string(),
            host_id: "peerlink".to_string(),
        }
    }
}

/// Options of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScriptOptions {
    /// Run the chunk as a coroutine so capabilities can suspend it.
    pub is_async: bool,

    /// Shadow `runtime` and `browser` with locals set to `nil`.
    pub hide_host_identifiers: bool,

    /// Let scripts pass functions to remote calls as callbacks.
    pub allow_callback_arguments: bool,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            is_async: true,
            hide_host_identifiers: false,
            allow_callback_arguments: true,
        }
    }
}

/// How an execution ended. For inspection only; failures have already been
/// reported by the time this is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Completed,
    Failed(String),
}

impl ExecutionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ExecutionOutcome::Completed)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ExecutionOutcome::Completed => None,
            ExecutionOutcome::Failed(message) => Some(message),
        }
    }
}
