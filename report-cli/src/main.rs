//! Binary crate for the `weather-report` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Logging setup
//! - Mapping run failures to process exit codes

use std::process::ExitCode;

use clap::Parser;
use report_core::ReportError;
use tracing::error;

mod cli;

/// Exit code for config and other non-pipeline failures.
const EXIT_USAGE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "report_core=info,weather_report=info".into()),
        )
        .init();

    let cmd = cli::Cli::parse();
    match cmd.run().await {
        Ok(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            let code = err.downcast_ref::<ReportError>().map_or(EXIT_USAGE, ReportError::exit_code);
            ExitCode::from(code)
        }
    }
}
