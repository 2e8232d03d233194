//! Response framing.
//!
//! A completed read holds `[stale prompt] echo \r\n output \r\n prompt`. The
//! framing step cuts the trailing prompt, removes escape sequences, decodes
//! the bytes and drops the echoed command line. Everything in between is
//! returned as-is apart from line terminator normalisation.

use crate::ansi::strip_escapes;
use crate::prompt::{Prompt, PromptDetector};
use std::time::Duration;

/// Decoded text between the command echo and the next prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    command: String,
    text: String,
    elapsed: Duration,
}

impl RawResponse {
    pub fn new(command: impl Into<String>, text: impl Into<String>, elapsed: Duration) -> Self {
        RawResponse {
            command: command.into(),
            text: text.into(),
            elapsed,
        }
    }

    /// Frame a completed read buffer.
    pub fn from_buffer(command: &str, buffer: &[u8], prompt: &Prompt, elapsed: Duration) -> Self {
        RawResponse::new(command, frame_response(command, buffer, prompt), elapsed)
    }

    /// The command this response answers.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The response text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Time between writing the command and seeing the prompt again.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn lines(&self) -> std::str::Lines<'_> {
        self.text.lines()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

impl AsRef<str> for RawResponse {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Decode console bytes as Latin-1. Every byte maps to one char, so decoding
/// never fails and never loses input.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Extract the response text from a completed read buffer.
pub fn frame_response(command: &str, buffer: &[u8], prompt: &Prompt) -> String {
    let detector = PromptDetector::new(prompt.clone());
    let body = detector.strip_trailing_prompt(buffer);
    let body = strip_escapes(body);
    let text = decode_latin1(&body);

    let mut lines = text
        .split('\n')
        .map(|line| line.trim_matches('\r'))
        .skip_while(|line| line.trim().is_empty())
        .peekable();

    if let Some(first) = lines.peek() {
        if is_echo_line(first, command, prompt) {
            lines.next();
        }
    }

    let mut kept: Vec<&str> = lines.collect();
    while kept.last().is_some_and(|line| line.trim().is_empty()) {
        kept.pop();
    }
    kept.join("\n")
}

/// Whether a line is the console echoing `command`, with or without a stale
/// prompt in front of it.
pub fn is_echo_line(line: &str, command: &str, prompt: &Prompt) -> bool {
    let line = line.trim();
    let command = command.trim();
    if line == command {
        return true;
    }
    line.strip_prefix(prompt.as_str())
        .is_some_and(|rest| rest.trim() == command)
}
