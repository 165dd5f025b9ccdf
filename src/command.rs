//! Turns what the user types into one of the shell's commands.
//!
//! Input is consumed one whitespace-delimited token at a time, so
//! `conectar 1` typed on a single line connects straight to the composer:
//! the `1` stays pending and answers the endpoint menu.

use std::collections::VecDeque;
use std::io::BufRead;

use crate::Result;

/// Everything the shell knows how to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Blank line; only the prompt is shown again.
    Empty,
    Help,
    Connect,
    Disconnect,
    /// Poll one engine event and dump its result codes.
    ReadState,
    Exit,
    /// Anything not listed above.
    Invalid,
}

/// Keyword and description for each listed command, in help order.
pub const COMMANDS: [(&str, &str); 5] = [
    ("help", "show the list of available commands"),
    ("conectar", "open the connection with the headset engine"),
    ("desconectar", "close the current connection"),
    ("ler", "show the EmoState value pending on the engine queue"),
    ("exit", "quit the program"),
];

/// Maps a single token to a command. Matching is exact and case-sensitive.
pub fn interpret(token: &str) -> Command {
    match token {
        "" => Command::Empty,
        "help" => Command::Help,
        "conectar" => Command::Connect,
        "desconectar" => Command::Disconnect,
        "ler" => Command::ReadState,
        "exit" => Command::Exit,
        _ => Command::Invalid,
    }
}

/// Reads tokens out of a line-oriented source.
///
/// Tokens left over on a line are handed out by later calls before another
/// line is read.
pub struct TokenReader<R> {
    source: R,
    pending: VecDeque<String>,
}

impl<R: BufRead> TokenReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            pending: VecDeque::new(),
        }
    }

    /// Returns the next token, `Some("")` for a blank line, or `None` once
    /// the source is exhausted.
    pub fn next_token(&mut self) -> Result<Option<String>> {
        if let Some(token) = self.pending.pop_front() {
            return Ok(Some(token));
        }

        // Bytes that are not UTF-8 become U+FFFD and read as invalid input
        let mut raw = Vec::new();
        if self.source.read_until(b'\n', &mut raw)? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&raw);

        let mut tokens = line.split_whitespace().map(str::to_string);
        match tokens.next() {
            Some(first) => {
                self.pending.extend(tokens);
                Ok(Some(first))
            }
            None => Ok(Some(String::new())),
        }
    }

    /// Whether tokens from the last line are still waiting.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
