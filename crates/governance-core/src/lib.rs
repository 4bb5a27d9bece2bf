//! Strategic Decision Governance Engine
//!
//! Accepts a structured decision request, asks an external reasoning
//! service for a recommendation, validates the answer, applies a safety
//! policy with a time-boxed human override, and writes a signed audit
//! record for every request.
//!
//! ## Features
//!
//! - **Contracts**: loose wire shapes and validated typed shapes for requests and reasoning output
//! - **Reasoning Gateway**: mode-specific prompts, OpenAI-compatible transport, offline fallback
//! - **Safety Policy**: risk, cost and urgency circuit breakers with human override tokens
//! - **Audit Ledger**: HMAC-SHA256 signed, append-only records through a pluggable store
//! - **Telemetry**: injected counters for status plus Prometheus metrics
//!
//! ## Architecture
//!
//! 1. **Validation** (`validation/`): contract and response validators.
//! 2. **Crypto** (`crypto/`): audit signatures and override tokens.
//! 3. **Gateway** (`gateway/`): prompt rendering and the reasoning backend.
//! 4. **Policy** (`policy/`): the safety policy engine.
//! 5. **Audit** (`audit/`): record lifecycle, ledger and store trait.
//! 6. **Client** (`client/`): HTTP clients for the reasoning service and remote audit store.
//! 7. **Orchestrator** (`orchestrator`): composes all of the above.
//!
//! ## Example
//!
//! ```rust,no_run
//! use governance_core::{DecisionOrchestrator, DecisionRequestInput, Urgency};
//!
//! #[tokio::main]
//! async fn main() {
//!     let orchestrator = DecisionOrchestrator::builder().build().unwrap();
//!     let request = DecisionRequestInput::new("ceo", "Acquire a competitor", Urgency::High);
//!     match orchestrator.execute(request).await {
//!         Ok(outcome) => println!("{} ({})", outcome.status, outcome.safety_check.reasoning),
//!         Err(failure) => eprintln!("{}: {}", failure.kind(), failure),
//!     }
//! }
//! ```

pub mod audit;
pub mod client;
pub mod clock;
pub mod config;
pub mod contracts;
pub mod crypto;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod policy;
pub mod telemetry;
pub mod validation;

pub use audit::{AuditLedger, AuditQuery, AuditRecord, AuditStatus, AuditStore, MemoryAuditStore, StoreError};
pub use client::{HttpAuditStore, ReasoningClient};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DeploymentEnvironment, GovernanceConfig, StoreConfig};
pub use contracts::{
    Decision, DecisionRequest, DecisionRequestInput, MoatValue, ReasoningDraft, ReasoningMode,
    ReasoningResponse, Urgency,
};
pub use crypto::{AuditSigner, OverrideToken, OverrideTokenManager};
pub use error::{ErrorKind, GovernanceError, Result};
pub use gateway::{ReasoningBackend, ReasoningGateway};
pub use orchestrator::{
    DecisionFailure, DecisionOrchestrator, DecisionOutcome, DecisionState, IssuedOverride,
    OrchestratorBuilder,
};
pub use policy::{PolicyThresholds, SafetyCheck, SafetyCheckResult, SafetyPolicyEngine};
pub use telemetry::{MetricsRegistry, ServiceStatus, TelemetryAggregator, TelemetrySnapshot};
pub use validation::{ContractValidator, ResponseValidator, ValidationReport};

/// Engine version (from Cargo.toml)
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine identifier
pub const ENGINE_ID: &str = "strategic-governance-engine";
