use nu_ansi_term::{Color, Style};
use reedline::{Highlighter, StyledText};

use crate::commands::COMMANDS;
use crate::completer::GLOBALS;

const KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

/// Colors commands, Lua keywords, script globals and string literals.
#[derive(Default)]
pub struct ReplHighlighter;

impl Highlighter for ReplHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut styled = StyledText::new();

        if line.starts_with(':') {
            let style = if COMMANDS.contains(&line.trim_end()) {
                Style::new().bold().fg(Color::Cyan)
            } else {
                Style::new().fg(Color::Red)
            };
            styled.push((style, line.to_string()));
            return styled;
        }

        let mut rest = line;
        while let Some(first) = rest.chars().next() {
            let (len, style) = if first == '"' || first == '\'' {
                let close = rest[1..].find(first).map(|i| i + 2).unwrap_or(rest.len());
                (close, Style::new().fg(Color::Green))
            } else if first.is_alphabetic() || first == '_' {
                let len = rest
                    .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                    .unwrap_or(rest.len());
                (len, word_style(&rest[..len]))
            } else {
                (first.len_utf8(), Style::new())
            };
            styled.push((style, rest[..len].to_string()));
            rest = &rest[len..];
        }

        styled
    }
}

fn word_style(word: &str) -> Style {
    if KEYWORDS.contains(&word) {
        Style::new().fg(Color::Magenta)
    } else if GLOBALS.contains(&word) {
        Style::new().fg(Color::Yellow)
    } else {
        Style::new()
    }
}
