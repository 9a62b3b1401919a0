//! I/O abstraction for the REPL.
//!
//! The REPL core talks to its user only through [`IoHost`], so the loop can
//! run against a terminal or against queued input in tests.

pub mod types;

#[cfg(test)]
pub mod test_host;

pub use types::*;

#[cfg(test)]
pub use test_host::TestHost;

/// Error type for I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<IoError> for crate::error::CliError {
    fn from(error: IoError) -> Self {
        match error {
            IoError::Io(message) => crate::error::CliError::Io(message),
        }
    }
}

/// Host interface for REPL I/O operations.
pub trait IoHost {
    /// Block until a line or a signal is available.
    fn wait_for_input(&mut self) -> Result<(), IoError>;

    /// Take the pending input line, if any.
    fn read_input(&mut self) -> Result<Option<InputLine>, IoError>;

    /// Take the pending signal (Ctrl+C, Ctrl+D), if any.
    fn read_signal(&mut self) -> Result<Option<Signal>, IoError>;

    fn write_output(&mut self, output: Output) -> Result<(), IoError>;

    /// Update the prompt rendered before the next input.
    fn write_prompt(&mut self, config: PromptConfig) -> Result<(), IoError>;

    fn flush(&mut self) -> Result<(), IoError> {
        Ok(())
    }
}
