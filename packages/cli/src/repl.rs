//! The REPL loop.

use peerlink::script::ExecutionOutcome;
use tokio::runtime::Handle;

use crate::commands::{self, CommandResult};
use crate::io::{ExitReason, IoError, IoHost, Output, PromptConfig, Signal};
use crate::session::Session;

/// Runs lines against one [`Session`]. Scripts execute on `runtime`, which
/// also keeps callbacks and timers alive between lines.
pub struct ReplCore {
    session: Session,
    runtime: Handle,
    prompt: PromptConfig,
}

impl ReplCore {
    pub fn new(session: Session, runtime: Handle) -> Self {
        Self {
            session,
            runtime,
            prompt: PromptConfig::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn run(&mut self, io: &mut impl IoHost) -> Result<ExitReason, IoError> {
        io.write_output(Output::info(BANNER))?;

        loop {
            io.write_prompt(self.prompt.clone())?;
            io.wait_for_input()?;

            if let Some(signal) = io.read_signal()? {
                match signal {
                    Signal::Eof => {
                        io.write_output(Output::info("Goodbye!"))?;
                        io.flush()?;
                        return Ok(ExitReason::Eof);
                    }
                    Signal::Interrupt => {
                        io.write_output(Output::info("^C (use :quit to exit)"))?;
                        continue;
                    }
                }
            }

            let input = match io.read_input()? {
                Some(input) => input,
                None => continue,
            };

            match commands::execute(&input.line, &mut self.session, &self.runtime) {
                CommandResult::Ok(None) => {}
                CommandResult::Ok(Some(text)) => io.write_output(Output::normal(text))?,
                CommandResult::Script { logs, outcome } => {
                    for value in logs {
                        io.write_output(Output::log(commands::pretty(&value)))?;
                    }
                    self.prompt.executions += 1;
                    self.prompt.last_failed = !outcome.is_completed();
                    if let ExecutionOutcome::Failed(message) = outcome {
                        io.write_output(Output::error(message))?;
                    }
                }
                CommandResult::Error(message) => io.write_output(Output::error(message))?,
                CommandResult::Help => io.write_output(Output::normal(commands::format_help()))?,
                CommandResult::Exit => {
                    io.write_output(Output::info("Goodbye!"))?;
                    io.flush()?;
                    return Ok(ExitReason::UserExit);
                }
            }

            io.flush()?;
        }
    }
}

const BANNER: &str = "peerlink REPL. Each line is a Lua script; type :help for help, :quit to exit.";
