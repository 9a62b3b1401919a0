//! Terminal host using Reedline: line editing in Vi or Emacs mode, tab
//! completion, highlighting and persistent history.

use std::borrow::Cow;
use std::io::{self, Write};
use std::path::PathBuf;

use nu_ansi_term::{Color, Style};
use reedline::{
    default_emacs_keybindings, default_vi_insert_keybindings, default_vi_normal_keybindings,
    ColumnarMenu, DefaultHinter, EditMode, Emacs, FileBackedHistory, KeyCode, KeyModifiers,
    MenuBuilder, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus,
    PromptViMode, Reedline, ReedlineEvent, ReedlineMenu, Signal as ReedlineSignal, Vi,
};

use crate::completer::ReplCompleter;
use crate::highlighter::ReplHighlighter;
use crate::io::{InputLine, IoError, IoHost, Output, OutputStyle, PromptConfig, Signal};

const HISTORY_SIZE: usize = 1000;

pub struct TerminalHost {
    line_editor: Reedline,
    pending_input: Option<InputLine>,
    pending_signal: Option<Signal>,
    prompt: PromptConfig,
}

impl TerminalHost {
    pub fn new(vi: bool) -> Self {
        let completion_menu = Box::new(
            ColumnarMenu::default()
                .with_name("completion_menu")
                .with_text_style(Style::new().fg(Color::Cyan))
                .with_selected_text_style(Style::new().fg(Color::Black).on(Color::Cyan).bold()),
        );

        let complete = ReedlineEvent::UntilFound(vec![
            ReedlineEvent::Menu("completion_menu".to_string()),
            ReedlineEvent::MenuNext,
        ]);
        let edit_mode: Box<dyn EditMode> = if vi || prefers_vi() {
            let mut insert = default_vi_insert_keybindings();
            insert.add_binding(KeyModifiers::NONE, KeyCode::Tab, complete);
            Box::new(Vi::new(insert, default_vi_normal_keybindings()))
        } else {
            let mut keybindings = default_emacs_keybindings();
            keybindings.add_binding(KeyModifiers::NONE, KeyCode::Tab, complete);
            Box::new(Emacs::new(keybindings))
        };

        let mut line_editor = Reedline::create()
            .with_completer(Box::new(ReplCompleter))
            .with_highlighter(Box::new(ReplHighlighter))
            .with_hinter(Box::new(
                DefaultHinter::default().with_style(Style::new().fg(Color::LightGray).dimmed()),
            ))
            .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
            .with_edit_mode(edit_mode);

        if let Some(path) = history_path() {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match FileBackedHistory::with_file(HISTORY_SIZE, path) {
                Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
                Err(error) => tracing::debug!(%error, "history disabled"),
            }
        }

        Self {
            line_editor,
            pending_input: None,
            pending_signal: None,
            prompt: PromptConfig::default(),
        }
    }
}

impl IoHost for TerminalHost {
    fn wait_for_input(&mut self) -> Result<(), IoError> {
        let prompt = TerminalPrompt(self.prompt.clone());
        match self.line_editor.read_line(&prompt) {
            Ok(ReedlineSignal::Success(line)) => self.pending_input = Some(InputLine { line }),
            Ok(ReedlineSignal::CtrlC) => self.pending_signal = Some(Signal::Interrupt),
            Ok(ReedlineSignal::CtrlD) => self.pending_signal = Some(Signal::Eof),
            Err(e) => return Err(IoError::Io(format!("Reedline error: {}", e))),
        }
        Ok(())
    }

    fn read_input(&mut self) -> Result<Option<InputLine>, IoError> {
        Ok(self.pending_input.take())
    }

    fn read_signal(&mut self) -> Result<Option<Signal>, IoError> {
        Ok(self.pending_signal.take())
    }

    fn write_output(&mut self, output: Output) -> Result<(), IoError> {
        let styled = match output.style {
            OutputStyle::Normal => output.text,
            OutputStyle::Log => format!("{} {}", Color::DarkGray.paint("log"), output.text),
            OutputStyle::Error => format!("{} {}", Color::Red.bold().paint("Error:"), output.text),
            OutputStyle::Info => Color::Cyan.paint(&output.text).to_string(),
        };
        println!("{}", styled);
        Ok(())
    }

    fn write_prompt(&mut self, config: PromptConfig) -> Result<(), IoError> {
        self.prompt = config;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), IoError> {
        io::stdout().flush().map_err(|e| IoError::Io(e.to_string()))
    }
}

struct TerminalPrompt(PromptConfig);

impl Prompt for TerminalPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        let color = if self.0.last_failed {
            Color::Red
        } else {
            Color::Blue
        };
        Cow::Owned(
            color
                .bold()
                .paint(format!("peerlink[{}]", self.0.executions))
                .to_string(),
        )
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, edit_mode: PromptEditMode) -> Cow<'_, str> {
        match edit_mode {
            PromptEditMode::Vi(PromptViMode::Normal) => {
                Cow::Owned(format!("{} ", Color::Blue.bold().paint("[N]>")))
            }
            PromptEditMode::Vi(PromptViMode::Insert) => {
                Cow::Owned(format!("{} ", Color::Green.bold().paint("[I]>")))
            }
            PromptEditMode::Custom(s) => Cow::Owned(format!("({})> ", s)),
            _ => Cow::Owned(format!("{} ", Color::Green.bold().paint(">"))),
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed(": ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!("({}reverse-search: {}) ", prefix, history_search.term))
    }
}

fn history_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("peerlink").join("history.txt"))
}

/// `PEERLINK_EDIT_MODE` wins; otherwise follow a vi-flavoured `EDITOR` or
/// `VISUAL`.
fn prefers_vi() -> bool {
    if let Ok(mode) = std::env::var("PEERLINK_EDIT_MODE") {
        return matches!(mode.to_lowercase().as_str(), "vi" | "vim");
    }
    ["EDITOR", "VISUAL"].iter().any(|var| {
        std::env::var(var)
            .map(|editor| {
                let editor = editor.to_lowercase();
                editor.contains("vim") || editor == "vi"
            })
            .unwrap_or(false)
    })
}
