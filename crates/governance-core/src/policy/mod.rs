//! Safety policy engine
//!
//! Circuit breakers over the reasoning answer. Rules run in a fixed order
//! and each one that fires appends its name to the triggered list. The
//! human override runs last and is the only rule that can lift a block.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::contracts::{Decision, DecisionRequest, ReasoningResponse, Urgency};
use crate::crypto::OverrideTokenManager;

/// Names of the safety checks, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyCheck {
    HighRiskDetected,
    CriticalRiskBlocked,
    HighCostDetected,
    CriticalUrgencyRejected,
    HumanOverrideApplied,
}

impl SafetyCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyCheck::HighRiskDetected => "HIGH_RISK_DETECTED",
            SafetyCheck::CriticalRiskBlocked => "CRITICAL_RISK_BLOCKED",
            SafetyCheck::HighCostDetected => "HIGH_COST_DETECTED",
            SafetyCheck::CriticalUrgencyRejected => "CRITICAL_URGENCY_REJECTED",
            SafetyCheck::HumanOverrideApplied => "HUMAN_OVERRIDE_APPLIED",
        }
    }
}

impl fmt::Display for SafetyCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running the safety policy over one decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyCheckResult {
    pub allowed: bool,
    pub requires_human_review: bool,
    pub triggered_checks: Vec<SafetyCheck>,
    pub reasoning: String,
}

impl SafetyCheckResult {
    pub fn triggered(&self, check: SafetyCheck) -> bool {
        self.triggered_checks.contains(&check)
    }
}

/// Circuit-breaker thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyThresholds {
    /// Risk at or above which human review is required
    pub high_risk: f64,
    /// Risk at or above which the decision is blocked
    pub critical_risk: f64,
    /// Cost strictly above which human review is required
    pub high_cost_usd: f64,
}

impl Default for PolicyThresholds {
    fn default() -> Self {
        Self {
            high_risk: 80.0,
            critical_risk: 95.0,
            high_cost_usd: 1000.0,
        }
    }
}

/// Applies [`PolicyThresholds`] and override tokens to reasoned decisions
#[derive(Clone)]
pub struct SafetyPolicyEngine {
    thresholds: PolicyThresholds,
    tokens: OverrideTokenManager,
}

impl SafetyPolicyEngine {
    pub fn new(thresholds: PolicyThresholds, tokens: OverrideTokenManager) -> Self {
        Self { thresholds, tokens }
    }

    pub fn thresholds(&self) -> &PolicyThresholds {
        &self.thresholds
    }

    /// Evaluate the policy. Performs no I/O and cannot fail.
    pub fn evaluate(
        &self,
        response: &ReasoningResponse,
        request: &DecisionRequest,
        now: DateTime<Utc>,
    ) -> SafetyCheckResult {
        let mut allowed = true;
        let mut requires_human_review = false;
        let mut triggered = Vec::new();

        if response.risk_score >= self.thresholds.high_risk {
            triggered.push(SafetyCheck::HighRiskDetected);
            requires_human_review = true;
        }

        if response.risk_score >= self.thresholds.critical_risk {
            triggered.push(SafetyCheck::CriticalRiskBlocked);
            allowed = false;
        }

        if response.cost_estimate_usd > self.thresholds.high_cost_usd {
            triggered.push(SafetyCheck::HighCostDetected);
            requires_human_review = true;
        }

        if request.urgency == Urgency::Critical && response.decision == Decision::Reject {
            triggered.push(SafetyCheck::CriticalUrgencyRejected);
            requires_human_review = true;
        }

        if let Some(token) = request.human_override_token.as_deref() {
            if self.tokens.validate(token, now) {
                triggered.push(SafetyCheck::HumanOverrideApplied);
                allowed = true;
                requires_human_review = false;
            } else {
                tracing::warn!(
                    request_id = %request.request_id,
                    actor = %request.actor,
                    "Override token presented but not valid"
                );
            }
        }

        let reasoning = if triggered.is_empty() {
            "All safety checks passed".to_string()
        } else {
            let names: Vec<&str> = triggered.iter().map(|c| c.as_str()).collect();
            format!("Safety checks triggered: {}", names.join(", "))
        };

        SafetyCheckResult {
            allowed,
            requires_human_review,
            triggered_checks: triggered,
            reasoning,
        }
    }
}
