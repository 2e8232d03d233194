//! Runner errors.

use olt_session::SessionError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to read config file {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no device model given (use --model or `device:` in the config file)")]
    MissingModel,

    #[error("no OLT host given (use --host or `session.host` in the config file)")]
    MissingHost,

    #[error(transparent)]
    Session(#[from] SessionError),
}

pub type RunnerResult<T> = Result<T, RunnerError>;
