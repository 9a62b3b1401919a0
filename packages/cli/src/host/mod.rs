//! Interactive terminal host for the REPL, built on Reedline.

pub mod terminal;

pub use terminal::TerminalHost;
