//! Runner configuration file.
//!
//! ```yaml
//! device: "2406"
//! session:
//!   host: 10.0.0.2
//!   username: admin
//!   password: "1234"
//!   timeout_secs: 20
//! capture:
//!   console: false
//!   raw_path: /tmp/olt.raw
//! ```
//!
//! Session fields left out fall back to the defaults of the device model.

use crate::error::{RunnerError, RunnerResult};
use olt_cli_protocol::DeviceModel;
use olt_session::{CaptureConfig, SessionConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Session settings from the file; unset fields keep the model default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub prompt: Option<String>,
    pub timeout_secs: Option<u64>,
    pub long_timeout_secs: Option<u64>,
    pub resync_timeout_secs: Option<u64>,
    pub drain_millis: Option<u64>,
    pub eol: Option<String>,
    pub username_prompt: Option<String>,
    pub password_prompt: Option<String>,
    pub resync: Option<bool>,
}

impl SessionOverrides {
    /// Apply the set fields on top of `base`.
    pub fn apply(&self, mut base: SessionConfig) -> SessionConfig {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }
        set(&mut base.host, &self.host);
        set(&mut base.port, &self.port);
        set(&mut base.username, &self.username);
        set(&mut base.password, &self.password);
        set(&mut base.prompt, &self.prompt);
        set(&mut base.timeout_secs, &self.timeout_secs);
        set(&mut base.long_timeout_secs, &self.long_timeout_secs);
        set(&mut base.resync_timeout_secs, &self.resync_timeout_secs);
        set(&mut base.drain_millis, &self.drain_millis);
        set(&mut base.eol, &self.eol);
        set(&mut base.username_prompt, &self.username_prompt);
        set(&mut base.password_prompt, &self.password_prompt);
        set(&mut base.resync, &self.resync);
        base
    }
}

/// Contents of the runner's YAML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    pub device: DeviceModel,
    #[serde(default)]
    pub session: SessionOverrides,
    #[serde(default)]
    pub capture: CaptureConfig,
}

impl RunnerConfig {
    /// Configuration for `device` with nothing overridden.
    pub fn new(device: DeviceModel) -> Self {
        RunnerConfig {
            device,
            session: SessionOverrides::default(),
            capture: CaptureConfig::default(),
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn load(path: &Path) -> RunnerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| RunnerError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        RunnerConfig::from_yaml(&text).map_err(|source| RunnerError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Model defaults with the file's session settings applied.
    pub fn session_config(&self) -> SessionConfig {
        self.session.apply(SessionConfig::for_model(self.device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_session_keeps_model_defaults() {
        let config = RunnerConfig::from_yaml(
            "device: \"1408A\"\nsession:\n  host: 10.0.0.2\n  username: admin\n  password: \"1234\"\n",
        )
        .unwrap();
        assert_eq!(config.device, DeviceModel::Olt1408A);

        let session = config.session_config();
        assert_eq!(session.host, "10.0.0.2");
        assert_eq!(session.password, "1234");
        assert_eq!(session.prompt, "OLT1408A#");
        assert_eq!(session.eol, "\n");
        assert!(!session.resync);
        assert!(!config.capture.is_enabled());
    }

    #[test]
    fn test_capture_block() {
        let config = RunnerConfig::from_yaml(
            "device: \"1240XA\"\ncapture:\n  console: true\n  raw_path: /tmp/olt.raw\n",
        )
        .unwrap();
        assert!(config.capture.console);
        assert_eq!(config.capture.raw_path.as_deref(), Some(Path::new("/tmp/olt.raw")));
        assert_eq!(config.session_config().username_prompt, "login:");
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(RunnerConfig::from_yaml("device: \"2406\"\nsession:\n  hots: x\n").is_err());
        assert!(RunnerConfig::from_yaml("session:\n  host: x\n").is_err());
    }
}
