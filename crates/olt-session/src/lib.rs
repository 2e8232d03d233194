//! Zyxel OLT console sessions
//!
//! Blocking telnet sessions to OLT consoles and the per-model client built on
//! top of them. Framing and parsing live in `olt-cli-protocol`; this crate
//! owns the connection, the bounded reads and the command cycle.
//!
//! # Example
//!
//! ```rust,ignore
//! use olt_cli_protocol::DeviceModel;
//! use olt_session::{Capture, OltClient, SessionConfig};
//!
//! let config = SessionConfig::for_model(DeviceModel::Olt2406)
//!     .with_target("10.0.0.2", 23)
//!     .with_credentials("admin", "1234");
//! let mut client = OltClient::connect(DeviceModel::Olt2406, config, Capture::disabled())?;
//! let onts = client.get_all_onts()?;
//! println!("{}", client.to_json(&onts)?);
//! ```

mod capture;
mod client;
mod config;
mod error;
pub mod metrics;
mod reader;
mod session;
mod tcp;
mod transport;

pub use capture::*;
pub use client::*;
pub use config::*;
pub use error::*;
pub use reader::*;
pub use session::*;
pub use tcp::*;
pub use transport::*;
