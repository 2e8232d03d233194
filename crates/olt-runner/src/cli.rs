//! Command line interface for `olt-query`.

use crate::config::RunnerConfig;
use crate::error::{RunnerError, RunnerResult};
use clap::{ArgAction, Parser, Subcommand};
use olt_cli_protocol::DeviceModel;
use olt_session::SessionConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "olt-query")]
#[command(about = "Query a Zyxel OLT over telnet and print the result as JSON")]
#[command(version)]
pub struct Cli {
    /// YAML config file (device, session and capture settings)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Device model: 1408A, 2406 or 1240XA
    #[arg(short, long, global = true)]
    pub model: Option<DeviceModel>,

    /// OLT host name or address
    #[arg(short = 'H', long, global = true)]
    pub host: Option<String>,

    /// Telnet port
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Login user name
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Login password
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Per-command timeout in seconds
    #[arg(short, long, global = true)]
    pub timeout: Option<u64>,

    /// Print console output to stderr as commands run
    #[arg(long, global = true)]
    pub show_console: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub query: Query,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// List every registered ONT
    Onts {
        /// Skip the DDMI receive power lookup
        #[arg(long)]
        no_rx: bool,
    },
    /// List ONTs waiting to be registered
    Unreg,
    /// Status block of one ONT
    Details { aid: String },
    /// Status change history of one ONT
    History { aid: String },
    /// Provisioned configuration of one ONT
    Config { aid: String },
    /// Details, configuration and history of one ONT
    Report { aid: String },
    /// Receive power of every ONT, keyed by AID
    Ddmi,
    /// Run a raw console command and print its output
    Exec { command: String },
}

impl Cli {
    /// Config file (if any) with the command line options applied on top.
    pub fn runner_config(&self) -> RunnerResult<RunnerConfig> {
        let mut config = match (&self.config, self.model) {
            (Some(path), model) => {
                let mut config = RunnerConfig::load(path)?;
                if let Some(model) = model {
                    config.device = model;
                }
                config
            }
            (None, Some(model)) => RunnerConfig::new(model),
            (None, None) => return Err(RunnerError::MissingModel),
        };

        let session = &mut config.session;
        if let Some(host) = &self.host {
            session.host = Some(host.clone());
        }
        if let Some(port) = self.port {
            session.port = Some(port);
        }
        if let Some(user) = &self.user {
            session.username = Some(user.clone());
        }
        if let Some(password) = &self.password {
            session.password = Some(password.clone());
        }
        if let Some(timeout) = self.timeout {
            session.timeout_secs = Some(timeout);
        }
        if self.show_console {
            config.capture.console = true;
        }
        Ok(config)
    }

    /// Final session settings; fails when no host was given anywhere.
    pub fn session_config(&self, config: &RunnerConfig) -> RunnerResult<SessionConfig> {
        let session = config.session_config();
        if session.host.trim().is_empty() {
            return Err(RunnerError::MissingHost);
        }
        Ok(session)
    }

    /// Default tracing filter for the verbosity flag.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
