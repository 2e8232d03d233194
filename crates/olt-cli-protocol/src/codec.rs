//! Byte-level codec for the OLT console stream.
//!
//! The consoles speak a telnet-flavoured character stream. Before any text
//! reaches the response buffer the codec:
//!
//! - refuses every telnet option the device offers (`DO` → `WONT`,
//!   `WILL` → `DONT`) and drops sub-negotiation blocks
//! - unescapes `IAC IAC` and drops NUL padding
//! - answers cursor position queries with a fixed report
//!
//! Bytes that have to be written back to the device are returned from
//! [`StreamCodec::push`]; the caller owns the channel.

use crate::ansi::{find_subslice, CURSOR_POSITION_QUERY, CURSOR_POSITION_REPORT};
use bytes::{BufMut, Bytes, BytesMut};

/// Initial buffer capacity; table dumps are a few kilobytes.
pub const INITIAL_BUFFER_CAPACITY: usize = 4096;

/// Telnet "interpret as command".
pub const IAC: u8 = 255;
/// Telnet DONT.
pub const DONT: u8 = 254;
/// Telnet DO.
pub const DO: u8 = 253;
/// Telnet WONT.
pub const WONT: u8 = 252;
/// Telnet WILL.
pub const WILL: u8 = 251;
/// Telnet sub-negotiation begin.
pub const SB: u8 = 250;
/// Telnet sub-negotiation end.
pub const SE: u8 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum TelnetState {
    #[default]
    Data,
    Iac,
    Negotiate(u8),
    Subnegotiation,
    SubnegotiationIac,
}

/// Accumulates console bytes and produces the replies the console expects.
#[derive(Debug, Default)]
pub struct StreamCodec {
    /// Text received so far, telnet commands removed.
    buffer: BytesMut,
    /// Telnet command parser state (commands may straddle reads).
    telnet: TelnetState,
    /// Buffer offset from which to look for new cursor position queries.
    query_scan_from: usize,
    /// Number of cursor position queries answered over the codec lifetime.
    cursor_reports: u64,
    /// Number of telnet option refusals produced.
    option_refusals: u64,
}

impl StreamCodec {
    /// Create a new stream codec.
    pub fn new() -> Self {
        StreamCodec {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            ..Default::default()
        }
    }

    /// Add received data to the buffer.
    ///
    /// Returns the bytes that must be written back to the device right away
    /// (option refusals and cursor position reports). Empty when nothing is
    /// owed.
    pub fn push(&mut self, data: &[u8]) -> Vec<u8> {
        let mut replies = Vec::new();

        for &byte in data {
            self.telnet = match self.telnet {
                TelnetState::Data => match byte {
                    IAC => TelnetState::Iac,
                    0 => TelnetState::Data,
                    _ => {
                        self.buffer.put_u8(byte);
                        TelnetState::Data
                    }
                },
                TelnetState::Iac => match byte {
                    IAC => {
                        self.buffer.put_u8(IAC);
                        TelnetState::Data
                    }
                    DO | DONT | WILL | WONT => TelnetState::Negotiate(byte),
                    SB => TelnetState::Subnegotiation,
                    // NOP, GA, AYT and friends carry no option byte.
                    _ => TelnetState::Data,
                },
                TelnetState::Negotiate(verb) => {
                    if let Some(answer) = refusal_for(verb) {
                        replies.extend_from_slice(&[IAC, answer, byte]);
                        self.option_refusals += 1;
                    }
                    TelnetState::Data
                }
                TelnetState::Subnegotiation => match byte {
                    IAC => TelnetState::SubnegotiationIac,
                    _ => TelnetState::Subnegotiation,
                },
                TelnetState::SubnegotiationIac => match byte {
                    SE => TelnetState::Data,
                    _ => TelnetState::Subnegotiation,
                },
            };
        }

        for _ in 0..self.scan_cursor_queries() {
            replies.extend_from_slice(CURSOR_POSITION_REPORT);
            self.cursor_reports += 1;
        }

        replies
    }

    /// Count cursor position queries that arrived since the last scan.
    ///
    /// The scan window keeps a tail of `len - 1` bytes so a query split
    /// across two reads is still seen exactly once.
    fn scan_cursor_queries(&mut self) -> usize {
        let mut count = 0;
        let mut pos = self.query_scan_from.min(self.buffer.len());
        while let Some(offset) = find_subslice(&self.buffer[pos..], CURSOR_POSITION_QUERY) {
            count += 1;
            pos += offset + CURSOR_POSITION_QUERY.len();
        }
        let tail = self
            .buffer
            .len()
            .saturating_sub(CURSOR_POSITION_QUERY.len() - 1);
        self.query_scan_from = pos.max(tail);
        count
    }

    /// The buffered text (telnet commands already removed).
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Remove and return the first `at` bytes of the buffer.
    pub fn split_to(&mut self, at: usize) -> Bytes {
        let at = at.min(self.buffer.len());
        self.query_scan_from = self.query_scan_from.saturating_sub(at);
        self.buffer.split_to(at).freeze()
    }

    /// Remove and return the whole buffer.
    pub fn take(&mut self) -> Bytes {
        self.query_scan_from = 0;
        self.buffer.split().freeze()
    }

    /// Clear the buffer.
    ///
    /// Telnet parser state is kept: a command may still be in flight.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.query_scan_from = 0;
    }

    /// Number of cursor position reports produced so far.
    pub fn cursor_reports(&self) -> u64 {
        self.cursor_reports
    }

    /// Number of telnet option refusals produced so far.
    pub fn option_refusals(&self) -> u64 {
        self.option_refusals
    }

    /// Encode a command line for transmission.
    ///
    /// Surrounding whitespace is trimmed and `eol` appended.
    pub fn encode_line(line: &str, eol: &[u8]) -> Vec<u8> {
        let line = line.trim();
        let mut buf = Vec::with_capacity(line.len() + eol.len());
        buf.extend_from_slice(line.as_bytes());
        buf.extend_from_slice(eol);
        buf
    }

    /// Get the current buffer contents as a string (for debugging).
    pub fn buffer_as_str(&self) -> String {
        String::from_utf8_lossy(&self.buffer).to_string()
    }
}

/// Passive-client answer to an option request. `DONT`/`WONT` already match
/// our state and are not answered.
fn refusal_for(verb: u8) -> Option<u8> {
    match verb {
        DO => Some(WONT),
        WILL => Some(DONT),
        _ => None,
    }
}
