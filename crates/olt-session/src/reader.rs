//! Bounded reads over a transport.
//!
//! [`StreamReader`] feeds transport chunks through the [`StreamCodec`], writes
//! back whatever the codec owes the device (telnet refusals, cursor position
//! reports) and hands out completed buffers. Nothing is stripped here: prompt
//! detection runs on the buffer as received.

use crate::capture::Capture;
use crate::error::{SessionError, SessionResult};
use crate::metrics::metric_defs;
use crate::transport::{CloseSignal, Transport};
use bytes::Bytes;
use olt_cli_protocol::{decode_latin1, strip_escapes, Completion, StreamCodec};
use std::io;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// How much a drain window grows each time data arrives.
pub const DRAIN_EXTENSION: Duration = Duration::from_millis(50);
/// Hard limit on a single drain, however chatty the device is.
pub const MAX_DRAIN: Duration = Duration::from_secs(5);

/// Incremental reader with bounded waits.
pub struct StreamReader<T: Transport> {
    transport: T,
    codec: StreamCodec,
    capture: Capture,
    close: CloseSignal,
    /// Metric label.
    host: String,
}

impl<T: Transport> StreamReader<T> {
    pub fn new(transport: T, capture: Capture, host: impl Into<String>) -> Self {
        let close = transport.close_signal();
        StreamReader {
            transport,
            codec: StreamCodec::new(),
            capture,
            close,
            host: host.into(),
        }
    }

    /// Read until `completion` matches, waiting at most `max_wait`.
    ///
    /// Returns the matched prefix of the buffer; anything after it stays
    /// buffered. On timeout the partial buffer is discarded and returned in
    /// the error. `context` labels the capture record and the error.
    pub fn read_until(
        &mut self,
        completion: &dyn Completion,
        max_wait: Duration,
        context: &str,
    ) -> SessionResult<Bytes> {
        let started = Instant::now();
        let deadline = started + max_wait;

        loop {
            if let Some(end) = completion.match_end(self.codec.buffer()) {
                let data = self.codec.split_to(end);
                self.capture.record(context, &data);
                trace!(context, bytes = data.len(), elapsed = ?started.elapsed(), "read complete");
                return Ok(data);
            }

            let now = Instant::now();
            if now >= deadline {
                let partial = self.codec.take();
                self.capture.record(&format!("{} (timeout)", context), &partial);
                metrics::counter!(metric_defs::COMMAND_TIMEOUTS.name, "host" => self.host.clone())
                    .increment(1);
                return Err(SessionError::Timeout {
                    command: context.to_string(),
                    waiting_for: completion.describe(),
                    elapsed: started.elapsed(),
                    buffered: decode_latin1(&strip_escapes(&partial)),
                });
            }

            self.pump(deadline - now)?;
        }
    }

    /// Read and discard whatever arrives within `window`. Each chunk extends
    /// the window by [`DRAIN_EXTENSION`], up to [`MAX_DRAIN`] in total.
    ///
    /// Returns the number of bytes discarded, including anything already
    /// buffered.
    pub fn drain(&mut self, window: Duration, context: &str) -> SessionResult<usize> {
        let started = Instant::now();
        let limit = started + MAX_DRAIN.max(window);
        let mut deadline = started + window;

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            if self.pump(deadline - now)?.is_some() {
                deadline = (deadline + DRAIN_EXTENSION).min(limit);
            }
        }

        let drained = self.codec.take();
        if !drained.is_empty() {
            self.capture.record(context, &drained);
            trace!(context, bytes = drained.len(), "drained");
        }
        Ok(drained.len())
    }

    /// Drop buffered bytes without reading more. Returns how many were dropped.
    pub fn discard_buffered(&mut self) -> usize {
        let dropped = self.codec.take();
        if !dropped.is_empty() {
            trace!(bytes = dropped.len(), text = %decode_latin1(&dropped), "discarding stale output");
        }
        dropped.len()
    }

    pub fn write(&mut self, data: &[u8]) -> SessionResult<()> {
        self.transport
            .write_all(data)
            .map_err(|e| self.io_error(e))
    }

    /// Read one chunk into the codec and answer what it asks for.
    ///
    /// Returns the chunk size, or `None` when nothing arrived within `wait`.
    fn pump(&mut self, wait: Duration) -> SessionResult<Option<usize>> {
        let Some(chunk) = self.transport.read_chunk(wait).map_err(|e| self.io_error(e))? else {
            return Ok(None);
        };
        metrics::counter!(metric_defs::BYTES_RECEIVED.name, "host" => self.host.clone())
            .increment(chunk.len() as u64);

        let reports_before = self.codec.cursor_reports();
        let replies = self.codec.push(&chunk);
        let reports = self.codec.cursor_reports() - reports_before;
        if reports > 0 {
            trace!(reports, "answering cursor position query");
            metrics::counter!(metric_defs::CURSOR_REPORTS.name, "host" => self.host.clone())
                .increment(reports);
        }
        if !replies.is_empty() {
            self.write(&replies)?;
        }
        Ok(Some(chunk.len()))
    }

    fn io_error(&self, e: io::Error) -> SessionError {
        if self.close.is_closed() {
            SessionError::Closed
        } else {
            warn!(error = %e, "transport error");
            SessionError::Connection(e)
        }
    }

    pub fn buffered(&self) -> &[u8] {
        self.codec.buffer()
    }

    pub fn cursor_reports(&self) -> u64 {
        self.codec.cursor_reports()
    }

    pub fn close_signal(&self) -> CloseSignal {
        self.close.clone()
    }

    pub fn capture(&self) -> &Capture {
        &self.capture
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
