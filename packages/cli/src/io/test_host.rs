//! In-memory [`IoHost`] for driving the REPL loop in tests.

use std::collections::VecDeque;

use super::{InputLine, IoError, IoHost, Output, OutputStyle, PromptConfig, Signal};

/// Queued input is consumed in order; output is buffered for inspection.
#[derive(Debug, Default)]
pub struct TestHost {
    inputs: VecDeque<String>,
    signals: VecDeque<Signal>,
    outputs: Vec<Output>,
    prompts: Vec<PromptConfig>,
}

impl TestHost {
    pub fn with_inputs<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            inputs: lines.into_iter().map(String::from).collect(),
            ..Self::default()
        }
    }

    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signals.push_back(signal);
        self
    }

    pub fn output(&self) -> &[Output] {
        &self.outputs
    }

    pub fn texts(&self, style: OutputStyle) -> Vec<&str> {
        self.outputs
            .iter()
            .filter(|o| o.style == style)
            .map(|o| o.text.as_str())
            .collect()
    }

    pub fn last_prompt(&self) -> Option<&PromptConfig> {
        self.prompts.last()
    }
}

impl IoHost for TestHost {
    fn wait_for_input(&mut self) -> Result<(), IoError> {
        Ok(())
    }

    fn read_input(&mut self) -> Result<Option<InputLine>, IoError> {
        Ok(self.inputs.pop_front().map(|line| InputLine { line }))
    }

    fn read_signal(&mut self) -> Result<Option<Signal>, IoError> {
        // Signals fire once the queued lines are used up.
        if self.inputs.is_empty() {
            return Ok(self.signals.pop_front());
        }
        Ok(None)
    }

    fn write_output(&mut self, output: Output) -> Result<(), IoError> {
        self.outputs.push(output);
        Ok(())
    }

    fn write_prompt(&mut self, config: PromptConfig) -> Result<(), IoError> {
        self.prompts.push(config);
        Ok(())
    }
}
