//! Zyxel OLT console protocol
//!
//! This crate holds everything about talking to a Zyxel OLT console that does
//! not need a socket: stream decoding, completion detection, response framing
//! and the parsers that turn console listings into structured records.
//!
//! # Protocol Overview
//!
//! The OLTs expose a line-mode CLI over telnet:
//!
//! - **Login**: `User name:` (`login:` on the MSC1240XA) then `Password:`
//! - **Commands** (host → OLT): text lines terminated with the model's EOL
//! - **Responses** (OLT → host): the echoed command, the output, then the
//!   prompt (`OLT2406#`) with no trailing newline
//! - **Terminal noise**: telnet option negotiation, VT100 escapes and cursor
//!   position queries that must be answered before the console continues
//!
//! # Parsers
//!
//! - [`parse_table`] / [`TableSpec`]: pipe-delimited listings
//! - [`parse_unregistered`]: unregistered ONT listing
//! - [`parse_flat_block`]: `label : value` detail dumps
//! - [`parse_config_block`] / [`classify_config_block`]: running configuration
//! - [`parse_status_history`]: status transitions
//! - [`parse_ddmi_rx`] / [`enrich`]: receive power joined into listings
//! - [`consolidate_filter_listing`]: MSC1240XA Config/Actual rows
//!
//! # Example
//!
//! ```rust,ignore
//! use olt_cli_protocol::{parse_table, Command, DeviceModel};
//!
//! let line = Command::ListOnts.encode(DeviceModel::Olt2406);
//! let onts = parse_table(&response_text, &["AID", "SN"])?;
//! ```

mod ansi;
mod codec;
mod commands;
mod config;
mod ddmi;
mod error;
mod history;
mod keyvalue;
mod merge;
mod prompt;
mod record;
mod response;
mod table;
mod unreg;

pub use ansi::*;
pub use codec::*;
pub use commands::*;
pub use config::*;
pub use ddmi::*;
pub use error::*;
pub use history::*;
pub use keyvalue::*;
pub use merge::*;
pub use prompt::*;
pub use record::*;
pub use response::*;
pub use table::*;
pub use unreg::*;
