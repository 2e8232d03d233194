//! olt-query - read-only queries against Zyxel OLT consoles
//!
//! Usage:
//!   olt-query --model 2406 --host 10.0.0.2 --user admin --password 1234 onts
//!   olt-query --config olt.yaml report ont-6-4-4

use clap::Parser;
use olt_runner::{init_tracing, run, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level());
    olt_session::metrics::describe_metrics();

    match run(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
