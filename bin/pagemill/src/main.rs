//! A traffic driver for books APIs.
//!
//! Spawns a number of simulated users, each of which repeatedly picks one of a fixed set of operations (create, list,
//! clear, update, fetch, delete) and runs it against the target, pausing for a random amount of time in between.

#![deny(missing_docs)]

use anyhow::Result;
use clap::Parser as _;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod actor;
mod behavior;

mod config;
use self::config::{Cli, Config};

mod driver;
use self::driver::Driver;

mod logging;
use self::logging::{fatal_and_exit, initialize_logging};

mod operation;
mod report;
mod stats;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() {
    if let Err(e) = initialize_logging(None) {
        fatal_and_exit(format!("failed to initialize logging: {}", e));
    }

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => info!("pagemill stopped."),
        Err(e) => {
            error!("{:?}", e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("pagemill starting...");

    let config = Config::try_from_cli(&cli)?;
    let report_path = config.report_path.clone();
    let driver = Driver::from_config(config)?;

    let shutdown = CancellationToken::new();
    let ctrl_c_shutdown = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received interrupt. Stopping actors...");
                ctrl_c_shutdown.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for interrupt signal."),
        }
    });

    let summary = driver.run(shutdown).await;
    report::log_summary(&summary);

    if let Some(path) = report_path {
        report::write_report(&path, &summary)?;
    }

    Ok(())
}
