//! OLT query runner
//!
//! Glue between the command line, the YAML config file and the
//! `olt-session` client. The `olt-query` binary is a thin wrapper around
//! [`run`].

mod cli;
mod config;
mod error;

pub use cli::*;
pub use config::*;
pub use error::*;

use olt_session::{to_json, Capture, OltClient, SessionResult, Transport};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Run one query and render the result. Structured answers are pretty JSON;
/// [`Query::Exec`] returns the console text as is.
pub fn run_query<T: Transport>(client: &mut OltClient<T>, query: &Query) -> SessionResult<String> {
    match query {
        Query::Onts { no_rx } => {
            let onts = if *no_rx {
                let enrich = client.enriches_rx();
                client.set_rx_enrichment(false);
                let onts = client.get_all_onts();
                client.set_rx_enrichment(enrich);
                onts?
            } else {
                client.get_all_onts()?
            };
            to_json(&onts)
        }
        Query::Unreg => to_json(&client.get_unregistered_onts()?),
        Query::Details { aid } => to_json(&client.get_ont_details(aid)?),
        Query::History { aid } => to_json(&client.get_ont_status_history(aid)?),
        Query::Config { aid } => to_json(&client.get_ont_config(aid)?),
        Query::Report { aid } => to_json(&client.get_ont_report(aid)?),
        Query::Ddmi => to_json(&client.get_ddmi_rx()?),
        Query::Exec { command } => {
            let response = client.session_mut().execute(command)?;
            Ok(response.text().to_string())
        }
    }
}

/// Resolve the configuration, connect, run the query and log out.
pub fn run(cli: &Cli) -> RunnerResult<String> {
    let config = cli.runner_config()?;
    let session = cli.session_config(&config)?;
    let capture = Capture::from_config(&config.capture)?;

    info!(model = %config.device, address = %session.address(), "Connecting");
    let mut client = OltClient::connect(config.device, session, capture)?;
    let result = run_query(&mut client, &cli.query);
    // log out even when the query failed
    let closed = client.close();
    let output = result?;
    closed?;
    Ok(output)
}

/// Install the stderr subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .or_else(|| EnvFilter::try_new(default_level).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    // a second init (tests) is harmless
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
