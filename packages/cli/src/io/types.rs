//! Values exchanged between the REPL core and its host.

/// A line of input from the user.
#[derive(Debug, Clone)]
pub struct InputLine {
    pub line: String,
}

/// A signal from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Ctrl+C
    Interrupt,
    /// Ctrl+D
    Eof,
}

/// Output to be written by the REPL.
#[derive(Debug, Clone)]
pub struct Output {
    pub text: String,
    pub style: OutputStyle,
}

impl Output {
    pub fn normal(text: impl Into<String>) -> Self {
        Self::styled(text, OutputStyle::Normal)
    }

    pub fn log(text: impl Into<String>) -> Self {
        Self::styled(text, OutputStyle::Log)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::styled(text, OutputStyle::Error)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::styled(text, OutputStyle::Info)
    }

    fn styled(text: impl Into<String>, style: OutputStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Style hint for output rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputStyle {
    #[default]
    Normal,
    /// A value the script logged on the peer.
    Log,
    Error,
    Info,
}

/// What the prompt shows.
#[derive(Debug, Clone, Default)]
pub struct PromptConfig {
    /// Number of scripts run so far.
    pub executions: usize,
    /// Whether the most recent script failed.
    pub last_failed: bool,
}

/// Reason the REPL exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// User typed `:quit`.
    UserExit,
    /// User pressed Ctrl+D.
    Eof,
}
