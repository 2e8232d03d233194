//! Session and capture configuration.

use olt_cli_protocol::{DeviceModel, Prompt, ProtocolResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default telnet port.
pub const DEFAULT_PORT: u16 = 23;
/// Default bounded wait for a command response, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Default bounded wait for long-running queries (DDMI), in seconds.
pub const DEFAULT_LONG_TIMEOUT_SECS: u64 = 120;
/// Upper bound on the prompt wait during a resync, in seconds.
pub const DEFAULT_RESYNC_TIMEOUT_SECS: u64 = 5;
/// Default drain window after a resync, in milliseconds.
pub const DEFAULT_DRAIN_MILLIS: u64 = 200;

// ============================================================================
// Session Configuration
// ============================================================================

/// Everything needed to open a session to one OLT.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Expected prompt, e.g. `OLT2406#`. Must end in `#` or `>`.
    pub prompt: String,
    pub timeout_secs: u64,
    /// Bounded wait for long-running queries.
    pub long_timeout_secs: u64,
    /// Cap on the prompt wait of a resync.
    pub resync_timeout_secs: u64,
    /// How long to drain after a resync.
    pub drain_millis: u64,
    /// Line terminator appended to every command.
    pub eol: String,
    pub username_prompt: String,
    pub password_prompt: String,
    /// Realign on the prompt before every command.
    pub resync: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig::for_model(DeviceModel::Olt2406)
    }
}

impl SessionConfig {
    /// Configuration with the defaults of `model` and no target or
    /// credentials.
    pub fn for_model(model: DeviceModel) -> Self {
        SessionConfig {
            host: String::new(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            prompt: model.default_prompt().to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            long_timeout_secs: DEFAULT_LONG_TIMEOUT_SECS,
            resync_timeout_secs: DEFAULT_RESYNC_TIMEOUT_SECS,
            drain_millis: DEFAULT_DRAIN_MILLIS,
            eol: model.eol().to_string(),
            username_prompt: model.username_prompt().to_string(),
            password_prompt: model.password_prompt().to_string(),
            resync: model.resync_before_command(),
        }
    }

    pub fn with_target(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validated prompt.
    pub fn prompt(&self) -> ProtocolResult<Prompt> {
        Prompt::new(&self.prompt)
    }

    /// Whether the login handshake sends credentials.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn long_timeout(&self) -> Duration {
        Duration::from_secs(self.long_timeout_secs)
    }

    /// Prompt wait of a resync: the command timeout, capped.
    pub fn resync_timeout(&self) -> Duration {
        self.timeout()
            .min(Duration::from_secs(self.resync_timeout_secs))
    }

    pub fn drain_window(&self) -> Duration {
        Duration::from_millis(self.drain_millis)
    }

    pub fn eol_bytes(&self) -> &[u8] {
        self.eol.as_bytes()
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("prompt", &self.prompt)
            .field("timeout_secs", &self.timeout_secs)
            .field("long_timeout_secs", &self.long_timeout_secs)
            .field("resync_timeout_secs", &self.resync_timeout_secs)
            .field("drain_millis", &self.drain_millis)
            .field("eol", &self.eol)
            .field("username_prompt", &self.username_prompt)
            .field("password_prompt", &self.password_prompt)
            .field("resync", &self.resync)
            .finish()
    }
}

// ============================================================================
// Capture Configuration
// ============================================================================

/// Where diagnostic captures go. Everything off by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Write the console capture to stderr.
    pub console: bool,
    /// Write the console capture to this file instead of stderr.
    pub console_path: Option<PathBuf>,
    /// Append raw bytes to this file.
    pub raw_path: Option<PathBuf>,
}

impl CaptureConfig {
    pub fn is_enabled(&self) -> bool {
        self.console || self.console_path.is_some() || self.raw_path.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_defaults() {
        let config = SessionConfig::for_model(DeviceModel::Olt1408A);
        assert_eq!(config.prompt, "OLT1408A#");
        assert_eq!(config.eol, "\n");
        assert!(!config.resync);
        assert_eq!(config.port, 23);

        let config = SessionConfig::for_model(DeviceModel::Msc1240XA);
        assert_eq!(config.username_prompt, "login:");
        assert_eq!(config.eol_bytes(), b"\r\n");
        assert!(config.resync);
    }

    #[test]
    fn test_resync_timeout_is_capped() {
        let mut config = SessionConfig::default();
        assert_eq!(config.resync_timeout(), Duration::from_secs(5));
        config.timeout_secs = 2;
        assert_eq!(config.resync_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_password_redacted_in_debug() {
        let config = SessionConfig::default().with_credentials("admin", "s3cret");
        let debug = format!("{:?}", config);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"host": "10.0.0.1", "timeout_secs": 10}"#).unwrap();
        assert_eq!(config.host, "10.0.0.1");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.prompt, "OLT2406#");
    }

    #[test]
    fn test_invalid_prompt_rejected() {
        let mut config = SessionConfig::default();
        config.prompt = "OLT2406".to_string();
        assert!(config.prompt().is_err());
        config.prompt = "OLT2406# ".to_string();
        assert_eq!(config.prompt().unwrap().as_str(), "OLT2406#");
    }

    #[test]
    fn test_capture_config_default_off() {
        assert!(!CaptureConfig::default().is_enabled());
    }
}
