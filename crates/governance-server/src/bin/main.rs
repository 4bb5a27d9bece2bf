//! Governance engine binary
//!
//! Loads configuration from `--config` (or `GOVERNANCE_CONFIG`) and the
//! environment, installs logging, and runs the requested command.

use clap::Parser;
use governance_core::config::LoggingSettings;
use governance_server::{init_tracing, run, ExitCode, GovernanceCli};

#[tokio::main]
async fn main() {
    let cli = GovernanceCli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&LoggingSettings::default());
            tracing::error!(error = %e, "Failed to load configuration");
            eprintln!("error: {}", e);
            std::process::exit(ExitCode::ConfigError.into());
        }
    };
    init_tracing(&config.logging);

    let exit_code = run(cli, config).await;
    std::process::exit(exit_code.into());
}
