//! VT100/ANSI escape handling.
//!
//! The OLT consoles sprinkle CSI sequences into their output and, right after
//! login, ask the terminal for its cursor position (`ESC [ 6 n`). The console
//! stalls until that query is answered, so the session layer replies with a
//! fixed report and strips the remaining sequences before parsing.

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::borrow::Cow;

/// Device status report request: "report cursor position".
pub const CURSOR_POSITION_QUERY: &[u8] = b"\x1b[6n";

/// Report sent back for [`CURSOR_POSITION_QUERY`] (row 1, column 1).
pub const CURSOR_POSITION_REPORT: &[u8] = b"\x1b[1;1R";

/// CSI sequence (e.g. `ESC[2J`, `ESC[?25l`, `ESC[1;1H`).
static CSI_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").unwrap());

/// Remove CSI escape sequences from raw console bytes.
pub fn strip_escapes(raw: &[u8]) -> Cow<'_, [u8]> {
    CSI_PATTERN.replace_all(raw, &b""[..])
}

/// Whether the bytes contain any CSI escape sequence.
pub fn contains_escapes(raw: &[u8]) -> bool {
    CSI_PATTERN.is_match(raw)
}

/// Find the first occurrence of `needle` in `haystack`.
pub fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
