//! Command definitions for the governance CLI

use anyhow::Context;
use clap::{Parser, Subcommand};
use governance_core::{
    AuditQuery, AuditStatus, DecisionOrchestrator, GovernanceConfig, MemoryAuditStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::output::{OutputFormat, VerificationReport};
use super::ExitCode;
use crate::handler::{create_router, AppState};

/// Strategic decision governance engine
#[derive(Parser, Debug)]
#[command(name = "governance")]
#[command(about = "Strategic decision governance engine", long_about = None)]
#[command(version)]
pub struct GovernanceCli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true, env = "GOVERNANCE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl GovernanceCli {
    /// Load configuration from the file (if any) and the environment
    pub fn load_config(&self) -> governance_core::Result<GovernanceConfig> {
        GovernanceConfig::load(self.config.as_deref())
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to bind, overriding the configuration
        #[arg(long)]
        bind: Option<String>,
    },

    /// Issue a one-hour human override token
    IssueToken {
        /// Approver issuing the token
        #[arg(long)]
        actor: String,

        /// Why the block is being overridden
        #[arg(long)]
        reason: String,

        /// Approver signature
        #[arg(long)]
        signature: String,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Verify the signatures of stored audit records
    VerifyAudit {
        #[arg(long)]
        request_id: Option<String>,

        #[arg(long)]
        actor: Option<String>,

        /// One of processing, approved, blocked, error
        #[arg(long)]
        status: Option<AuditStatus>,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Serve the HTTP API until interrupted
pub async fn execute_serve(config: GovernanceConfig, bind: Option<String>) -> anyhow::Result<ExitCode> {
    let store = governance_storage::open_store(&config.audit.store).context("Failed to open audit store")?;
    let orchestrator = Arc::new(DecisionOrchestrator::from_config(&config, store)?);
    let state = AppState::new(orchestrator)
        .with_request_timeout(Duration::from_millis(config.server.request_timeout_ms));
    let app = create_router(state);

    let addr = bind.unwrap_or_else(|| config.server.bind_addr.clone());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        addr = %addr,
        environment = %config.environment.as_str(),
        reasoning_configured = config.reasoning.has_credential(),
        "Governance server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Governance server stopped");
    Ok(ExitCode::Success)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

/// Issue an override token and print it
pub fn execute_issue_token(
    config: GovernanceConfig,
    actor: &str,
    reason: &str,
    signature: &str,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    // Tokens are self-describing, so no durable store is needed to issue one.
    let orchestrator = DecisionOrchestrator::from_config(&config, Arc::new(MemoryAuditStore::new()))?;
    let issued = match orchestrator.issue_override_token(actor, reason, signature) {
        Ok(issued) => issued,
        Err(e) if e.is_user_error() => {
            eprintln!("{}", e);
            return Ok(ExitCode::InvalidInput);
        }
        Err(e) => return Err(e.into()),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&issued)?),
        OutputFormat::Text => {
            println!("{}", issued.token);
            println!("valid for {} minutes, until {}", issued.valid_for_minutes, issued.expires_at.to_rfc3339());
        }
    }
    Ok(ExitCode::Success)
}

/// Re-verify every matching record in the configured store
pub async fn execute_verify_audit(
    config: GovernanceConfig,
    query: AuditQuery,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    if !config.audit.has_signing_key() {
        tracing::warn!("No signing key configured; verifying against the development key");
    }
    let store = governance_storage::open_store(&config.audit.store).context("Failed to open audit store")?;
    let orchestrator = DecisionOrchestrator::from_config(&config, store)?;

    let records = orchestrator.query_audit(&query).await?;
    let report = VerificationReport::from_records(&records, |record| orchestrator.verify_record(record));
    report.render(format)?;

    Ok(if report.is_clean() {
        ExitCode::Success
    } else {
        ExitCode::VerificationFailed
    })
}

/// Build the store query for `verify-audit`
pub fn audit_query(
    request_id: Option<String>,
    actor: Option<String>,
    status: Option<AuditStatus>,
    limit: Option<usize>,
) -> AuditQuery {
    AuditQuery {
        request_id,
        actor,
        status,
        limit,
        ..AuditQuery::default()
    }
}
