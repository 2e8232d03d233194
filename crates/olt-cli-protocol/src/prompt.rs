//! Prompt validation and response completion detection.
//!
//! A command response is complete once the console prints its prompt again.
//! Right after a command is written the buffer may still hold the previous
//! prompt (or nothing), so a detector that requires progress refuses to
//! declare completion until something other than the prompt has arrived.

use crate::ansi::find_subslice;
use crate::error::{ProtocolError, ProtocolResult};
use std::fmt;
use std::str::FromStr;

/// Characters a privileged or user-mode prompt may end with.
pub const PROMPT_TERMINATORS: &[char] = &['#', '>'];

/// A validated console prompt.
///
/// Stored whitespace-trimmed; device prompts are usually printed with a
/// trailing space (`"OLT2406# "`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Prompt(String);

impl Prompt {
    /// Validate and normalise a prompt string.
    pub fn new(raw: &str) -> ProtocolResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ProtocolError::InvalidPrompt {
                prompt: raw.to_string(),
                reason: "prompt is empty".to_string(),
            });
        }
        if !trimmed.ends_with(PROMPT_TERMINATORS) {
            return Err(ProtocolError::InvalidPrompt {
                prompt: raw.to_string(),
                reason: format!("prompt must end with one of {PROMPT_TERMINATORS:?}"),
            });
        }
        if trimmed.chars().any(|c| c.is_control()) {
            return Err(ProtocolError::InvalidPrompt {
                prompt: raw.to_string(),
                reason: "prompt contains control characters".to_string(),
            });
        }
        Ok(Prompt(trimmed.to_string()))
    }

    /// Trimmed prompt text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prompt as matched against the receive buffer.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl FromStr for Prompt {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Prompt::new(s)
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of evaluating a buffer against a completion condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The response is complete.
    Complete,
    /// Keep reading.
    Continue,
}

/// A condition that ends a bounded read.
pub trait Completion {
    /// Length of the buffer prefix that makes up the completed read, or
    /// `None` while the read must continue.
    fn match_end(&self, buffer: &[u8]) -> Option<usize>;

    /// Human-readable description used in timeout errors.
    fn describe(&self) -> String;
}

/// Completes as soon as a literal byte marker appears (login prompts).
///
/// Bytes after the marker are left for the next read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    bytes: Vec<u8>,
}

impl Marker {
    /// Completion on the first occurrence of `marker`.
    pub fn new(marker: impl Into<Vec<u8>>) -> Self {
        Marker {
            bytes: marker.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Completion for Marker {
    fn match_end(&self, buffer: &[u8]) -> Option<usize> {
        find_subslice(buffer, &self.bytes).map(|pos| pos + self.bytes.len())
    }

    fn describe(&self) -> String {
        format!("marker {:?}", String::from_utf8_lossy(&self.bytes))
    }
}

/// Decides whether a buffer holds a complete command response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptDetector {
    prompt: Prompt,
    require_progress: bool,
}

impl PromptDetector {
    /// Detector that completes on the prompt alone (resync, login).
    pub fn new(prompt: Prompt) -> Self {
        PromptDetector {
            prompt,
            require_progress: false,
        }
    }

    /// Detector that applies the stale-prompt rule (command responses).
    pub fn requiring_progress(prompt: Prompt) -> Self {
        PromptDetector {
            prompt,
            require_progress: true,
        }
    }

    /// Prompt this detector waits for.
    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    /// Whether the stale-prompt rule applies.
    pub fn requires_progress(&self) -> bool {
        self.require_progress
    }

    /// Evaluate the buffer. Pure: the same buffer always yields the same
    /// answer.
    pub fn evaluate(&self, buffer: &[u8]) -> Progress {
        if !self.ends_with_prompt(buffer) {
            return Progress::Continue;
        }
        if self.require_progress && !self.has_real_progress(buffer) {
            return Progress::Continue;
        }
        Progress::Complete
    }

    /// Whether the buffer, trailing whitespace ignored, ends with the prompt.
    pub fn ends_with_prompt(&self, buffer: &[u8]) -> bool {
        trim_end(buffer).ends_with(self.prompt.as_bytes())
    }

    /// Whether the buffer holds anything besides whitespace and the prompt.
    pub fn has_real_progress(&self, buffer: &[u8]) -> bool {
        let trimmed = trim(buffer);
        !trimmed.is_empty() && trimmed != self.prompt.as_bytes()
    }

    /// The buffer with the trailing prompt (and whitespace around it) cut.
    ///
    /// Returns the buffer unchanged when it does not end with the prompt.
    pub fn strip_trailing_prompt<'a>(&self, buffer: &'a [u8]) -> &'a [u8] {
        let trimmed = trim_end(buffer);
        match trimmed.strip_suffix(self.prompt.as_bytes()) {
            Some(body) => body,
            None => buffer,
        }
    }
}

impl Completion for PromptDetector {
    fn match_end(&self, buffer: &[u8]) -> Option<usize> {
        match self.evaluate(buffer) {
            Progress::Complete => Some(buffer.len()),
            Progress::Continue => None,
        }
    }

    fn describe(&self) -> String {
        if self.require_progress {
            format!("prompt {:?} after output", self.prompt.as_str())
        } else {
            format!("prompt {:?}", self.prompt.as_str())
        }
    }
}

fn trim_end(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |pos| pos + 1);
    &bytes[..end]
}

fn trim(bytes: &[u8]) -> &[u8] {
    let trimmed = trim_end(bytes);
    let start = trimmed
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(trimmed.len());
    &trimmed[start..]
}
