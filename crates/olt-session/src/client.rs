//! Per-model OLT client.
//!
//! [`OltClient`] pairs a [`Session`] with a [`DeviceModel`] and turns the
//! read-only queries into structured results. The model decides the command
//! strings, the AID form, the config dialect and whether the ONT listing is
//! enriched with DDMI receive power.

use crate::capture::Capture;
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::session::Session;
use crate::tcp::TcpTransport;
use crate::transport::Transport;
use olt_cli_protocol::{
    consolidate_filter_listing, parse_config_block, parse_ddmi_rx, parse_flat_block,
    parse_status_history, parse_summary_block, parse_unregistered, Command, ConfigTree,
    DeviceModel, ProtocolError, RawResponse, Record, RxJoin, StatusEvent, TableSpec,
    UnregisteredOnt,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Header tokens of the `show remote ont` listing.
pub const ONT_LISTING_HEADERS: [&str; 2] = ["AID", "SN"];

/// Details, configuration and status history of one ONT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OntReport {
    pub aid: String,
    pub details: Record,
    pub config: ConfigTree,
    pub history: Vec<StatusEvent>,
}

/// Read-only client for one OLT.
pub struct OltClient<T: Transport = TcpTransport> {
    session: Session<T>,
    model: DeviceModel,
    enrich_rx: bool,
}

impl OltClient<TcpTransport> {
    /// Connect and log in over TCP.
    pub fn connect(model: DeviceModel, config: SessionConfig, capture: Capture) -> SessionResult<Self> {
        let session = Session::connect(config, capture)?;
        Ok(OltClient::new(model, session))
    }
}

impl<T: Transport> OltClient<T> {
    /// Wrap an open session. DDMI enrichment is on where the model has it.
    pub fn new(model: DeviceModel, session: Session<T>) -> Self {
        OltClient {
            session,
            model,
            enrich_rx: model.supports_ddmi(),
        }
    }

    /// Turn the DDMI join of [`get_all_onts`](Self::get_all_onts) on or off.
    /// Ignored on models without DDMI.
    pub fn with_rx_enrichment(mut self, enabled: bool) -> Self {
        self.set_rx_enrichment(enabled);
        self
    }

    pub fn set_rx_enrichment(&mut self, enabled: bool) {
        self.enrich_rx = enabled && self.model.supports_ddmi();
    }

    pub fn enriches_rx(&self) -> bool {
        self.enrich_rx
    }

    pub fn model(&self) -> DeviceModel {
        self.model
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<T> {
        &mut self.session
    }

    fn run(&mut self, command: &Command) -> SessionResult<RawResponse> {
        let text = command.to_command_string(self.model);
        let timeout = if command.is_long_running() {
            self.session.config().long_timeout()
        } else {
            self.session.config().timeout()
        };
        self.session.execute_with_timeout(&text, timeout)
    }

    /// Every registered ONT, one record per row.
    ///
    /// The MSC1240XA listing is consolidated from its Config/Actual rows and
    /// gets an `ONT Rx` field from the DDMI readings unless disabled.
    pub fn get_all_onts(&mut self) -> SessionResult<Vec<Record>> {
        let response = self.run(&Command::ListOnts)?;
        let parsed = match self.model {
            DeviceModel::Msc1240XA => consolidate_filter_listing(response.text()),
            DeviceModel::Olt2406 => TableSpec::new(ONT_LISTING_HEADERS)
                .with_row_prefix("ont-")
                .parse(response.text()),
            DeviceModel::Olt1408A => TableSpec::new(ONT_LISTING_HEADERS).parse(response.text()),
        };
        let mut records = parsed.map_err(|source| parse_error(&response, source))?;
        debug!(model = %self.model, count = records.len(), "ONT listing parsed");

        if self.enrich_rx {
            let readings = self.get_ddmi_rx()?;
            let enriched = RxJoin::default().apply(&mut records, &readings);
            debug!(enriched, readings = readings.len(), "joined DDMI readings");
        }
        Ok(records)
    }

    /// ONTs seen on a PON but not provisioned. Empty when the table is absent.
    pub fn get_unregistered_onts(&mut self) -> SessionResult<Vec<UnregisteredOnt>> {
        let response = self.run(&Command::ListUnregistered)?;
        Ok(parse_unregistered(response.text()))
    }

    /// `label : value` details of one ONT. On the OLT1408A the summary row
    /// printed above the details is included.
    pub fn get_ont_details(&mut self, aid: &str) -> SessionResult<Record> {
        let response = self.run(&Command::OntStatus {
            aid: aid.to_string(),
        })?;
        Ok(match self.model {
            DeviceModel::Olt1408A => parse_summary_block(response.text()),
            DeviceModel::Olt2406 | DeviceModel::Msc1240XA => parse_flat_block(response.text()),
        })
    }

    /// Status transitions of one ONT, in device order.
    pub fn get_ont_status_history(&mut self, aid: &str) -> SessionResult<Vec<StatusEvent>> {
        let response = self.run(&Command::OntStatusHistory {
            aid: aid.to_string(),
        })?;
        Ok(parse_status_history(response.text()))
    }

    /// Running configuration of one ONT.
    pub fn get_ont_config(&mut self, aid: &str) -> SessionResult<ConfigTree> {
        let response = self.run(&Command::OntConfig {
            aid: aid.to_string(),
        })?;
        let aid = self.model.normalize_aid(aid);
        Ok(parse_config_block(
            &aid,
            response.text(),
            self.model.config_profile(),
        ))
    }

    /// Details, configuration and history of one ONT in one call.
    pub fn get_ont_report(&mut self, aid: &str) -> SessionResult<OntReport> {
        let details = self.get_ont_details(aid)?;
        let config = self.get_ont_config(aid)?;
        let history = self.get_ont_status_history(aid)?;
        Ok(OntReport {
            aid: aid.trim().to_string(),
            details,
            config,
            history,
        })
    }

    /// DDMI receive power per ONT (`ont-<aid>` → dBm). Empty on models
    /// without DDMI.
    pub fn get_ddmi_rx(&mut self) -> SessionResult<BTreeMap<String, String>> {
        if !self.model.supports_ddmi() {
            warn!(model = %self.model, "DDMI not available on this model");
            return Ok(BTreeMap::new());
        }
        let response = self.run(&Command::ddmi_all())?;
        Ok(parse_ddmi_rx(response.text()))
    }

    /// Pretty-printed JSON of any result.
    pub fn to_json<S: Serialize + ?Sized>(&self, value: &S) -> SessionResult<String> {
        to_json(value)
    }

    /// Close the session. Also happens on drop.
    pub fn close(&mut self) -> SessionResult<()> {
        self.session.close()
    }
}

/// Pretty-printed JSON of any result.
pub fn to_json<S: Serialize + ?Sized>(value: &S) -> SessionResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn parse_error(response: &RawResponse, source: ProtocolError) -> SessionError {
    SessionError::Parse {
        command: response.command().to_string(),
        source,
    }
}
