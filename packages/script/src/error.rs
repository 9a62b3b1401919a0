//! Error types for the script executor.

use peerlink_bridge::DispatchError;
use peerlink_storage::StorageError;
use thiserror::Error;

/// Errors raised while preparing or running a script.
///
/// These never leave [`crate::ScriptHost::execute`]; they end up in the
/// message of a failed [`crate::ExecutionOutcome`].
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Lua(#[from] mlua::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl ScriptError {
    /// The message shown to the script author: the innermost cause, without
    /// the callback wrapping mlua adds.
    pub fn describe(&self) -> String {
        match self {
            ScriptError::Lua(error) => describe_lua(error),
            other => other.to_string(),
        }
    }
}

fn describe_lua(error: &mlua::Error) -> String {
    match error {
        mlua::Error::CallbackError { cause, .. } => describe_lua(cause),
        mlua::Error::RuntimeError(message) => message.clone(),
        mlua::Error::SyntaxError { message, .. } => format!("syntax error: {message}"),
        mlua::Error::ExternalError(inner) => inner.to_string(),
        other => other.to_string(),
    }
}

/// Result type alias for script operations.
pub type Result<T> = std::result::Result<T, ScriptError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn callback_wrapping_is_removed() {
        let error = ScriptError::Lua(mlua::Error::CallbackError {
            traceback: "stack traceback: ...".into(),
            cause: Arc::new(mlua::Error::external(DispatchError::Remote("boom".into()))),
        });
        assert_eq!(error.describe(), "remote operation failed: \"boom\"");
    }

    #[test]
    fn storage_errors_pass_through() {
        let error = ScriptError::from(StorageError::transport("disk full"));
        assert_eq!(error.describe(), "storage transport error: disk full");
    }
}
