//! Operator CLI
//!
//! ```bash
//! governance --config governance.toml serve
//! governance issue-token --actor cfo --reason "board approved" --signature "J. Doe"
//! governance verify-audit --status blocked --format json
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: One or more audit records failed verification
//! - 3: Invalid input
//! - 4: Configuration could not be loaded
//! - 10: Internal error

pub mod commands;
pub mod output;

pub use commands::{Commands, GovernanceCli};
pub use output::{OutputFormat, VerificationReport};

use governance_core::config::LoggingSettings;
use governance_core::GovernanceConfig;
use tracing_subscriber::EnvFilter;

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    VerificationFailed = 1,
    InvalidInput = 3,
    ConfigError = 4,
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_tracing(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if settings.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Run a parsed command against a loaded configuration
pub async fn run(cli: GovernanceCli, config: GovernanceConfig) -> ExitCode {
    let result = match cli.command {
        Commands::Serve { bind } => commands::execute_serve(config, bind).await,
        Commands::IssueToken {
            actor,
            reason,
            signature,
            format,
        } => commands::execute_issue_token(config, &actor, &reason, &signature, format),
        Commands::VerifyAudit {
            request_id,
            actor,
            status,
            limit,
            format,
        } => {
            let query = commands::audit_query(request_id, actor, status, limit);
            commands::execute_verify_audit(config, query, format).await
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Command failed");
            eprintln!("error: {:#}", e);
            ExitCode::InternalError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_conversion() {
        assert_eq!(i32::from(ExitCode::Success), 0);
        assert_eq!(i32::from(ExitCode::VerificationFailed), 1);
        assert_eq!(i32::from(ExitCode::ConfigError), 4);
        assert_eq!(i32::from(ExitCode::InternalError), 10);
    }
}
