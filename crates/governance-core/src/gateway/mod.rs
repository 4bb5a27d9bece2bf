//! Reasoning gateway
//!
//! Turns a validated request into a [`ReasoningDraft`]:
//!
//! 1. render mode-specific prompts ([`prompts`])
//! 2. call the reasoning service, bounded by a timeout
//! 3. parse the completion text as a JSON object
//!
//! With no credential configured the gateway answers with a fixed offline
//! fallback and never fails. With a credential it never falls back: a
//! failed call is `ReasoningUnavailable`, an unparseable answer is
//! `ReasoningMalformed`. There are no retries here.

pub mod prompts;

pub use prompts::{render_prompts, PromptPair};

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::client::{ReasoningClient, ReasoningClientConfig};
use crate::contracts::{DecisionRequest, ReasoningDraft};
use crate::error::{GovernanceError, Result};

/// Default bound on one reasoning call
pub const DEFAULT_REASONING_TIMEOUT: Duration = Duration::from_secs(30);

/// Rationale returned while the reasoning service is not configured
pub const OFFLINE_RATIONALE: &str =
    "Reasoning service is offline: no credential is configured. Returning a conservative default; manual review recommended.";

/// Something that can reason about a decision request
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    async fn reason(&self, request: &DecisionRequest) -> Result<ReasoningDraft>;

    /// Whether a real reasoning service is behind this backend
    fn is_configured(&self) -> bool;
}

/// Draft returned when no reasoning service is configured
pub fn offline_fallback() -> ReasoningDraft {
    ReasoningDraft {
        decision: Some("revise".to_string()),
        rationale: Some(OFFLINE_RATIONALE.to_string()),
        risk_score: Some(75.0),
        moat_value: Some("unknown".to_string()),
        urgency_score: Some(25.0),
        cost_estimate_usd: Some(0.0),
        required_changes: Some(vec!["Configure reasoning service credentials".to_string()]),
        strategic_upgrades: Some(Vec::new()),
        execution_steps: Some(Vec::new()),
        references: Some(Vec::new()),
    }
}

/// Parse completion text into a draft
///
/// The text must be exactly one JSON object (surrounding whitespace aside).
/// Field-level checks are left to the response validator.
pub fn parse_reasoning_text(text: &str) -> Result<ReasoningDraft> {
    let value: Value = serde_json::from_str(text.trim())
        .map_err(|e| GovernanceError::malformed(format!("completion is not valid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(GovernanceError::malformed(format!(
            "completion is JSON but not an object: {}",
            json_type(&value)
        )));
    }
    serde_json::from_value(value)
        .map_err(|e| GovernanceError::malformed(format!("completion has wrong field types: {}", e)))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Gateway to the external reasoning service
#[derive(Debug)]
pub struct ReasoningGateway {
    client: Option<ReasoningClient>,
    timeout: Duration,
}

impl ReasoningGateway {
    /// Gateway without credentials; always answers with the offline fallback
    pub fn offline() -> Self {
        Self {
            client: None,
            timeout: DEFAULT_REASONING_TIMEOUT,
        }
    }

    pub fn new(client: ReasoningClient, timeout: Duration) -> Self {
        Self {
            client: Some(client),
            timeout,
        }
    }

    /// Build from settings; a missing or blank key yields the offline gateway
    pub fn from_settings(
        config: ReasoningClientConfig,
        api_key: Option<&secrecy::SecretString>,
        timeout: Duration,
    ) -> Result<Self> {
        use secrecy::ExposeSecret;
        match api_key {
            Some(key) if !key.expose_secret().trim().is_empty() => {
                let key = secrecy::SecretString::new(key.expose_secret().to_string());
                Ok(Self::new(ReasoningClient::new(config, key)?, timeout))
            }
            _ => {
                tracing::warn!("No reasoning service credential configured; running in offline mode");
                Ok(Self::offline())
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl ReasoningBackend for ReasoningGateway {
    async fn reason(&self, request: &DecisionRequest) -> Result<ReasoningDraft> {
        let Some(client) = &self.client else {
            tracing::info!(request_id = %request.request_id, "Reasoning service offline; using fallback");
            return Ok(offline_fallback());
        };

        let prompts = render_prompts(request);
        let text = match tokio::time::timeout(self.timeout, client.complete(&prompts)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(GovernanceError::unavailable(format!(
                    "reasoning call timed out after {} ms",
                    self.timeout.as_millis()
                )))
            }
        };
        parse_reasoning_text(&text)
    }

    fn is_configured(&self) -> bool {
        self.client.is_some()
    }
}
