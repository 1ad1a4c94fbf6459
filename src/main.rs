use std::process::ExitCode;

use clap::Parser;
use testmigrate::cli::{Cli, Commands};
use testmigrate::error::MigrateError;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "TESTMIGRATE_LOG";

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok((output, code)) => {
            println!("{output}");
            code
        }
        Err(error) => {
            let serialized = serde_json::to_string_pretty(&error.to_error_response()).unwrap_or_else(
                |_| {
                    "{\"error\":{\"type\":\"serialization_error\",\"message\":\"Failed to serialize error response\"}}"
                        .to_string()
                },
            );
            println!("{serialized}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<(String, ExitCode), MigrateError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Rewrite(args) => {
            let response = testmigrate::cli::rewrite::run_rewrite(args)?;
            let output = serde_json::to_string_pretty(&response)
                .map_err(|source| MigrateError::ResponseSerialization { source })?;
            Ok((output, ExitCode::SUCCESS))
        }
        Commands::Check(args) => {
            let response = testmigrate::cli::rewrite::run_check(args)?;
            let code = if response.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
            let output = serde_json::to_string_pretty(&response)
                .map_err(|source| MigrateError::ResponseSerialization { source })?;
            Ok((output, code))
        }
    }
}
