//! Diagnostic capture of console traffic.
//!
//! Two independent sinks:
//!
//! - **console**: escape-stripped text framed by `--- <context> START ---` and
//!   `--- <context> END ---`, meant for a terminal or a readable log
//! - **raw**: the exact bytes, each record preceded by a
//!   `===== <timestamp> <context> =====` header, for replaying odd output
//!
//! Capture failures are logged and never fail the command being captured.

use crate::config::CaptureConfig;
use crate::error::{SessionError, SessionResult};
use chrono::Local;
use olt_cli_protocol::{decode_latin1, strip_escapes};
use parking_lot::Mutex;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Capture sinks injected into a session.
///
/// Cloning shares the sinks.
#[derive(Clone, Default)]
pub struct Capture {
    console: Option<Sink>,
    raw: Option<Sink>,
}

impl Capture {
    /// A capture that records nothing.
    pub fn disabled() -> Self {
        Capture::default()
    }

    pub fn with_console(mut self, sink: impl Write + Send + 'static) -> Self {
        self.console = Some(Arc::new(Mutex::new(Box::new(sink))));
        self
    }

    pub fn with_raw(mut self, sink: impl Write + Send + 'static) -> Self {
        self.raw = Some(Arc::new(Mutex::new(Box::new(sink))));
        self
    }

    /// Build the sinks a [`CaptureConfig`] asks for. Files are appended to.
    pub fn from_config(config: &CaptureConfig) -> SessionResult<Self> {
        let mut capture = Capture::disabled();
        if let Some(path) = &config.console_path {
            capture = capture.with_console(open_append(path)?);
        } else if config.console {
            capture = capture.with_console(io::stderr());
        }
        if let Some(path) = &config.raw_path {
            capture = capture.with_raw(open_append(path)?);
        }
        Ok(capture)
    }

    pub fn is_enabled(&self) -> bool {
        self.console.is_some() || self.raw.is_some()
    }

    /// Record one buffer under a context label (usually the command).
    pub fn record(&self, context: &str, data: &[u8]) {
        if let Some(sink) = &self.console {
            let text = decode_latin1(&strip_escapes(data));
            let mut out = format!("--- {} START ---\n{}", context, text);
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&format!("--- {} END ---\n", context));
            write_record(sink, "console", out.as_bytes());
        }
        if let Some(sink) = &self.raw {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            let mut out = format!("\n\n===== {} {} =====\n", timestamp, context).into_bytes();
            out.extend_from_slice(data);
            write_record(sink, "raw", &out);
        }
    }

    pub fn flush(&self) {
        for sink in [&self.console, &self.raw].into_iter().flatten() {
            if let Err(e) = sink.lock().flush() {
                warn!(error = %e, "failed to flush capture sink");
            }
        }
    }
}

impl fmt::Debug for Capture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capture")
            .field("console", &self.console.is_some())
            .field("raw", &self.raw.is_some())
            .finish()
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        self.flush();
    }
}

fn write_record(sink: &Sink, name: &str, bytes: &[u8]) {
    let mut sink = sink.lock();
    if let Err(e) = sink.write_all(bytes).and_then(|_| sink.flush()) {
        warn!(sink = name, error = %e, "failed to write capture record");
    }
}

fn open_append(path: &Path) -> SessionResult<std::fs::File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SessionError::CaptureSink {
            path: path.to_path_buf(),
            source,
        })
}
