//! Decision orchestrator
//!
//! Runs one request through the pipeline:
//!
//! ```text
//! RECEIVED -> VALIDATED -> REASONED -> POLICY_CHECKED -> APPROVED | BLOCKED
//!     \____________\____________\__________________________> ERROR
//! ```
//!
//! Every path ends with exactly one sealed and persisted audit record and
//! one telemetry update before the caller gets an answer.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::audit::{AuditLedger, AuditQuery, AuditRecord, AuditStatus, AuditStore, Conclusion, MemoryAuditStore, OpenAuditRecord};
use crate::clock::{Clock, SystemClock};
use crate::config::GovernanceConfig;
use crate::contracts::{DecisionRequestInput, ReasoningResponse};
use crate::crypto::{fingerprint, AuditSigner, OverrideTokenManager, OVERRIDE_VALIDITY_MINUTES};
use crate::error::{ErrorKind, GovernanceError, Result};
use crate::gateway::{ReasoningBackend, ReasoningGateway};
use crate::policy::{PolicyThresholds, SafetyCheckResult, SafetyPolicyEngine};
use crate::telemetry::{DecisionTimer, MetricsRegistry, TelemetryAggregator, TelemetrySnapshot};
use crate::validation::{ContractValidator, ResponseValidator};

/// Pipeline states of one decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionState {
    Received,
    Validated,
    Reasoned,
    PolicyChecked,
    Approved,
    Blocked,
    Error,
}

impl DecisionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionState::Received => "RECEIVED",
            DecisionState::Validated => "VALIDATED",
            DecisionState::Reasoned => "REASONED",
            DecisionState::PolicyChecked => "POLICY_CHECKED",
            DecisionState::Approved => "APPROVED",
            DecisionState::Blocked => "BLOCKED",
            DecisionState::Error => "ERROR",
        }
    }
}

impl fmt::Display for DecisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed policy decision (approved or blocked)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome {
    pub success: bool,
    pub request_id: String,
    pub status: AuditStatus,
    pub decision: ReasoningResponse,
    pub safety_check: SafetyCheckResult,
    pub audit_record: AuditRecord,
    pub processing_time_ms: u64,
}

/// A decision that ended in `error`; the audit record was still written
#[derive(Debug, Clone, thiserror::Error)]
#[error("{error}")]
pub struct DecisionFailure {
    pub error: GovernanceError,
    pub request_id: String,
    pub audit_record: AuditRecord,
}

impl DecisionFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// Result of issuing an override token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedOverride {
    pub token: String,
    pub valid_for_minutes: i64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// End-to-end decision pipeline
pub struct DecisionOrchestrator {
    contracts: ContractValidator,
    responses: ResponseValidator,
    backend: Arc<dyn ReasoningBackend>,
    policy: SafetyPolicyEngine,
    tokens: OverrideTokenManager,
    ledger: AuditLedger,
    telemetry: TelemetryAggregator,
    metrics: Arc<MetricsRegistry>,
    clock: Arc<dyn Clock>,
}

impl DecisionOrchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Wire an orchestrator from configuration and an already-opened store
    pub fn from_config(config: &GovernanceConfig, store: Arc<dyn AuditStore>) -> Result<Self> {
        config.validate()?;
        let backend = ReasoningGateway::from_settings(
            config.reasoning.client_config(),
            config.reasoning.api_key.as_ref(),
            config.reasoning.timeout(),
        )?;
        let signing_key = config
            .audit
            .signing_key
            .as_ref()
            .map(|k| SecretString::new(k.expose_secret().to_string()));

        Self::builder()
            .backend(Arc::new(backend))
            .store(store)
            .signer(AuditSigner::from_optional(signing_key))
            .thresholds(config.policy)
            .build()
    }

    pub fn ledger(&self) -> &AuditLedger {
        &self.ledger
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn tokens(&self) -> &OverrideTokenManager {
        &self.tokens
    }

    pub fn is_reasoning_configured(&self) -> bool {
        self.backend.is_configured()
    }

    /// Run one decision request to a terminal state
    pub async fn execute(&self, mut input: DecisionRequestInput) -> std::result::Result<DecisionOutcome, DecisionFailure> {
        let timer = self.metrics.governance().start_timer();
        let request_id = input.ensure_request_id(self.clock.now()).to_string();
        self.transition(&request_id, DecisionState::Received);

        let open = self.ledger.open(input.clone());

        let request = match self.contracts.accept(&input) {
            Ok(request) => request,
            Err(report) => {
                let error = GovernanceError::InvalidRequestContract { errors: report.errors };
                return Err(self.fail(open, error, &timer).await);
            }
        };
        self.transition(&request_id, DecisionState::Validated);

        let draft = match self.backend.reason(&request).await {
            Ok(draft) => draft,
            Err(error) => return Err(self.fail(open, error, &timer).await),
        };

        let response = match self.responses.accept(&draft) {
            Ok(response) => response,
            Err(report) => {
                let error = GovernanceError::InvalidReasoningContract { errors: report.errors };
                return Err(self.fail(open, error, &timer).await);
            }
        };
        self.transition(&request_id, DecisionState::Reasoned);

        let safety = self.policy.evaluate(&response, &request, self.clock.now());
        self.transition(&request_id, DecisionState::PolicyChecked);

        let conclusion = if safety.allowed {
            Conclusion::Approved {
                response: response.clone(),
                safety: safety.clone(),
            }
        } else {
            Conclusion::Blocked {
                response: response.clone(),
                safety: safety.clone(),
            }
        };
        let status = conclusion.status();
        self.metrics.governance().record_safety_checks(&safety.triggered_checks);
        let record = self
            .finish(open, conclusion, Some(response.cost_estimate_usd), &timer)
            .await;

        tracing::info!(
            request_id = %request_id,
            status = %status,
            decision = %response.decision,
            risk_score = response.risk_score,
            triggered = ?safety.triggered_checks,
            processing_time_ms = record.processing_time_ms,
            "Decision completed"
        );

        Ok(DecisionOutcome {
            success: true,
            request_id,
            status,
            decision: response,
            safety_check: safety,
            processing_time_ms: record.processing_time_ms,
            audit_record: record,
        })
    }

    /// Run a decision on its own task
    ///
    /// Dropping the returned handle does not cancel the work: the decision
    /// still reaches a terminal state and its audit record is persisted.
    pub fn execute_detached(
        self: &Arc<Self>,
        input: DecisionRequestInput,
    ) -> JoinHandle<std::result::Result<DecisionOutcome, DecisionFailure>> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move { orchestrator.execute(input).await })
    }

    /// Issue a one-hour override token on behalf of an approver
    pub fn issue_override_token(&self, actor: &str, reason: &str, signature: &str) -> Result<IssuedOverride> {
        let mut errors = Vec::new();
        if actor.trim().is_empty() {
            errors.push("actor is required".to_string());
        }
        if reason.trim().is_empty() {
            errors.push("reason is required".to_string());
        }
        if signature.trim().is_empty() {
            errors.push("signature is required".to_string());
        }
        if !errors.is_empty() {
            return Err(GovernanceError::InvalidRequestContract { errors });
        }

        let token = self.tokens.issue(actor.trim());
        self.metrics.governance().record_token_issued();
        tracing::info!(
            actor = %actor,
            reason = %reason,
            signature_fingerprint = %fingerprint(signature.trim()),
            expires_at = %token.expires_at(),
            "Human override authorized"
        );

        Ok(IssuedOverride {
            expires_at: token.expires_at(),
            issued_at: token.issued_at,
            valid_for_minutes: OVERRIDE_VALIDITY_MINUTES,
            token: token.token,
        })
    }

    pub fn status(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot(self.backend.is_configured())
    }

    pub async fn query_audit(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>> {
        self.ledger.query(query).await
    }

    pub fn verify_record(&self, record: &AuditRecord) -> bool {
        self.ledger.verify(record)
    }

    async fn fail(&self, open: OpenAuditRecord, error: GovernanceError, timer: &DecisionTimer<'_>) -> DecisionFailure {
        let request_id = open.request_id().to_string();
        let kind = error.kind();
        self.metrics.governance().record_failure(kind);
        let record = self
            .finish(open, Conclusion::Failed { error: error.clone() }, None, timer)
            .await;

        if error.is_user_error() {
            tracing::info!(request_id = %request_id, kind = %kind, error = %error, "Decision request rejected");
        } else {
            tracing::warn!(request_id = %request_id, kind = %kind, error = %error, "Decision failed");
        }

        DecisionFailure {
            error,
            request_id,
            audit_record: record,
        }
    }

    async fn finish(
        &self,
        open: OpenAuditRecord,
        conclusion: Conclusion,
        cost_usd: Option<f64>,
        timer: &DecisionTimer<'_>,
    ) -> AuditRecord {
        let state = match conclusion.status() {
            AuditStatus::Approved => DecisionState::Approved,
            AuditStatus::Blocked => DecisionState::Blocked,
            _ => DecisionState::Error,
        };
        let record = self.ledger.seal(open.conclude(conclusion));
        self.transition(&record.request_id, state);

        if !self.ledger.persist(&record).await {
            self.metrics.governance().record_persist_failure();
        }

        self.telemetry.record_completion(cost_usd);
        let metrics = self.metrics.governance();
        metrics.record_decision(record.status, timer.elapsed_secs());
        if let Some(cost) = cost_usd {
            metrics.record_cost(cost);
        }
        record
    }

    fn transition(&self, request_id: &str, state: DecisionState) {
        tracing::debug!(request_id = %request_id, state = %state, "Decision state");
    }
}

impl fmt::Debug for DecisionOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionOrchestrator")
            .field("reasoning_configured", &self.backend.is_configured())
            .field("thresholds", self.policy.thresholds())
            .field("ledger", &self.ledger)
            .finish()
    }
}

/// Builder for [`DecisionOrchestrator`]
#[derive(Default)]
pub struct OrchestratorBuilder {
    backend: Option<Arc<dyn ReasoningBackend>>,
    store: Option<Arc<dyn AuditStore>>,
    signer: Option<AuditSigner>,
    clock: Option<Arc<dyn Clock>>,
    thresholds: PolicyThresholds,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl OrchestratorBuilder {
    /// Reasoning backend (default: offline gateway)
    pub fn backend(mut self, backend: Arc<dyn ReasoningBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Audit store (default: in-memory)
    pub fn store(mut self, store: Arc<dyn AuditStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Audit signer (default: development key)
    pub fn signer(mut self, signer: AuditSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn thresholds(mut self, thresholds: PolicyThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Share a metrics registry (default: a fresh one)
    pub fn metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<DecisionOrchestrator> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => Arc::new(
                MetricsRegistry::new()
                    .map_err(|e| GovernanceError::configuration(format!("Failed to register metrics: {}", e)))?,
            ),
        };
        let signer = self.signer.unwrap_or_else(|| AuditSigner::from_optional(None));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryAuditStore::new()));
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(ReasoningGateway::offline()));
        let tokens = OverrideTokenManager::new(Arc::clone(&clock));

        Ok(DecisionOrchestrator {
            contracts: ContractValidator::new(),
            responses: ResponseValidator::new(),
            backend,
            policy: SafetyPolicyEngine::new(self.thresholds, tokens.clone()),
            tokens,
            ledger: AuditLedger::new(signer, store, Arc::clone(&clock)),
            telemetry: TelemetryAggregator::init(clock.now()),
            metrics,
            clock,
        })
    }
}
