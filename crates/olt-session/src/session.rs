//! Command/response cycling over one console connection.
//!
//! A [`Session`] logs in on construction and then runs one command at a time:
//!
//! 1. optionally resync (bare EOL, wait for the prompt, drain)
//! 2. write the command line
//! 3. read until the prompt comes back after real output
//! 4. frame the buffer into a [`RawResponse`]
//!
//! Every wait is bounded. A session is never shared between callers; all
//! command operations take `&mut self`.

use crate::capture::Capture;
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::metrics::metric_defs;
use crate::reader::StreamReader;
use crate::tcp::TcpTransport;
use crate::transport::{CloseSignal, Transport};
use olt_cli_protocol::{Marker, Prompt, PromptDetector, RawResponse, StreamCodec};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Command sent when leaving the console.
pub const EXIT_COMMAND: &str = "exit";

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Logged in and ready for a command.
    Ready,
    /// `close` ran or the close signal was raised.
    Closed,
}

/// A logged-in console session.
pub struct Session<T: Transport = TcpTransport> {
    reader: StreamReader<T>,
    config: SessionConfig,
    prompt: Prompt,
    state: SessionState,
}

impl Session<TcpTransport> {
    /// Connect over TCP and log in.
    pub fn connect(config: SessionConfig, capture: Capture) -> SessionResult<Self> {
        // Reject a bad prompt before touching the network.
        config.prompt()?;
        let transport = TcpTransport::connect(&config.host, config.port, config.timeout())
            .map_err(|source| SessionError::Connect {
                address: config.address(),
                source,
            })?;
        Session::open(transport, config, capture)
    }
}

impl<T: Transport> Session<T> {
    /// Log in over an already connected transport.
    pub fn open(transport: T, config: SessionConfig, capture: Capture) -> SessionResult<Self> {
        let prompt = config.prompt()?;
        let reader = StreamReader::new(transport, capture, config.host.clone());
        let mut session = Session {
            reader,
            config,
            prompt,
            state: SessionState::Ready,
        };
        session.login()?;
        info!(host = %session.config.host, prompt = %session.prompt, "logged in");
        Ok(session)
    }

    fn login(&mut self) -> SessionResult<()> {
        let timeout = self.config.timeout();
        let eol = self.config.eol.clone();

        if self.config.has_credentials() {
            let username_prompt = Marker::new(self.config.username_prompt.as_str());
            self.reader.read_until(&username_prompt, timeout, "login")?;
            let line = StreamCodec::encode_line(&self.config.username, eol.as_bytes());
            self.reader.write(&line)?;

            let password_prompt = Marker::new(self.config.password_prompt.as_str());
            self.reader.read_until(&password_prompt, timeout, "login")?;
            let mut line = self.config.password.clone().into_bytes();
            line.extend_from_slice(eol.as_bytes());
            self.reader.write(&line)?;
        }

        let detector = PromptDetector::new(self.prompt.clone());
        self.reader.read_until(&detector, timeout, "login")?;
        debug!("prompt seen after login");
        Ok(())
    }

    /// Run a command with the configured timeout.
    pub fn execute(&mut self, command: &str) -> SessionResult<RawResponse> {
        let timeout = self.config.timeout();
        self.execute_with_timeout(command, timeout)
    }

    /// Run a command, waiting at most `timeout` for the prompt to return.
    pub fn execute_with_timeout(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> SessionResult<RawResponse> {
        self.ensure_open()?;
        let command = command.trim();

        if self.config.resync {
            self.resync()?;
        } else {
            self.reader.discard_buffered();
        }

        debug!(command, ?timeout, "executing");
        let started = Instant::now();
        let line = StreamCodec::encode_line(command, self.config.eol_bytes());
        self.reader.write(&line)?;

        let detector = PromptDetector::requiring_progress(self.prompt.clone());
        let buffer = self.reader.read_until(&detector, timeout, command)?;
        let elapsed = started.elapsed();

        let response = RawResponse::from_buffer(command, &buffer, &self.prompt, elapsed);
        metrics::counter!(metric_defs::COMMANDS.name, "host" => self.config.host.clone())
            .increment(1);
        metrics::histogram!(metric_defs::COMMAND_LATENCY.name, "host" => self.config.host.clone())
            .record(elapsed.as_secs_f64());
        debug!(
            command,
            ?elapsed,
            lines = response.lines().count(),
            "command complete"
        );
        Ok(response)
    }

    /// Realign on the prompt: write a bare EOL, wait for the prompt (capped),
    /// then drain. A missing prompt is logged and tolerated.
    pub fn resync(&mut self) -> SessionResult<()> {
        self.ensure_open()?;
        self.reader.discard_buffered();
        let eol = self.config.eol.clone();
        self.reader.write(eol.as_bytes())?;

        let detector = PromptDetector::new(self.prompt.clone());
        match self
            .reader
            .read_until(&detector, self.config.resync_timeout(), "resync")
        {
            Ok(_) => {}
            Err(SessionError::Timeout { elapsed, .. }) => {
                warn!(?elapsed, prompt = %self.prompt, "no prompt during resync, continuing");
            }
            Err(e) => return Err(e),
        }
        self.reader.drain(self.config.drain_window(), "resync drain")?;
        Ok(())
    }

    /// Leave the console: best-effort `exit`, then tear the channel down.
    /// Idempotent.
    pub fn close(&mut self) -> SessionResult<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;

        if !self.reader.close_signal().is_closed() {
            let line = StreamCodec::encode_line(EXIT_COMMAND, self.config.eol_bytes());
            if let Err(e) = self.reader.write(&line) {
                debug!(error = %e, "exit not delivered");
            }
        }
        self.reader.capture().flush();
        self.reader.transport_mut().shutdown()?;
        debug!(host = %self.config.host, "session closed");
        Ok(())
    }

    /// Handle that closes the session from another thread. A read in
    /// progress fails with [`SessionError::Closed`].
    pub fn close_handle(&self) -> CloseSignal {
        self.reader.close_signal()
    }

    pub fn state(&self) -> SessionState {
        if self.reader.close_signal().is_closed() {
            SessionState::Closed
        } else {
            self.state
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Cursor position reports sent so far.
    pub fn cursor_reports(&self) -> u64 {
        self.reader.cursor_reports()
    }

    fn ensure_open(&self) -> SessionResult<()> {
        match self.state() {
            SessionState::Ready => Ok(()),
            SessionState::Closed => Err(SessionError::Closed),
        }
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            debug!(error = %e, "error closing session on drop");
        }
    }
}
