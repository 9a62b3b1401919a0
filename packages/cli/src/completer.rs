use reedline::{Completer, Span, Suggestion};

use crate::commands::COMMANDS;

/// Names a script can use without any prefix.
pub const GLOBALS: &[&str] = &[
    "call",
    "get",
    "set",
    "executeInBackground",
    "log",
    "inject",
    "storage",
    "data",
    "runtime",
];

/// Completes REPL commands at the start of a line and script globals
/// anywhere else.
#[derive(Default)]
pub struct ReplCompleter;

impl Completer for ReplCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let line_to_pos = &line[..pos];
        let start = line_to_pos
            .rfind(|c: char| !(c.is_alphanumeric() || c == '_' || c == ':'))
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &line_to_pos[start..];
        if word.is_empty() {
            return Vec::new();
        }

        let candidates: &[&str] = if start == 0 && word.starts_with(':') {
            COMMANDS
        } else {
            GLOBALS
        };

        candidates
            .iter()
            .filter(|name| name.starts_with(word))
            .map(|name| Suggestion {
                value: name.to_string(),
                description: Some(description(name).to_string()),
                style: None,
                extra: None,
                span: Span::new(start, pos),
                append_whitespace: name.starts_with(':'),
                match_indices: None,
            })
            .collect()
    }
}

fn description(name: &str) -> &'static str {
    match name {
        ":data" => "Show the scratch data table",
        ":storage" => "Show the script's storage",
        ":raw" => "Show raw backend keys",
        ":objects" => "Show the peer's object tree",
        ":help" => "Show help",
        ":quit" => "Exit the REPL",
        "call" => "Call a peer function",
        "get" => "Read a peer property",
        "set" => "Write a peer property",
        "executeInBackground" => "Evaluate a function next to the peer's objects",
        "log" => "Log a value on the peer",
        "inject" => "Hand page code to the injector",
        "storage" => "Namespaced storage",
        "data" => "Scratch table shared by every line",
        "runtime" => "Host identifier",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(line: &str) -> Vec<String> {
        ReplCompleter
            .complete(line, line.len())
            .into_iter()
            .map(|s| s.value)
            .collect()
    }

    #[test]
    fn completes_commands_at_line_start() {
        assert_eq!(values(":d"), vec![":data"]);
        assert!(values("x = :d").is_empty());
    }

    #[test]
    fn completes_globals_inside_expressions() {
        assert_eq!(values("log(ca"), vec!["call"]);
        assert_eq!(values("local t = st"), vec!["storage"]);
    }
}
