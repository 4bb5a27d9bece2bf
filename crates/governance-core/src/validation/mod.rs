//! Contract and response validators
//!
//! Both validators are pure: validating the same input twice yields the
//! same report. They are also the only constructors of the typed
//! [`DecisionRequest`] and [`ReasoningResponse`].

pub mod rules;

use serde::{Deserialize, Serialize};

use crate::contracts::{
    Decision, DecisionRequest, DecisionRequestInput, MoatValue, ReasoningDraft, ReasoningMode,
    ReasoningResponse, Urgency,
};
use rules::{require_enum, require_present, require_text, NumericBounds, ValidationFinding};

/// Outcome of a validation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_findings(findings: &[ValidationFinding]) -> Self {
        Self {
            valid: findings.is_empty(),
            errors: findings.iter().map(|f| f.message.clone()).collect(),
        }
    }
}

/// Collects findings while converting loose fields into typed ones
#[derive(Default)]
struct Collector {
    findings: Vec<ValidationFinding>,
}

impl Collector {
    fn take<T>(&mut self, result: Result<T, ValidationFinding>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(finding) => {
                self.findings.push(finding);
                None
            }
        }
    }
}

/// Validates inbound decision requests
#[derive(Debug, Clone, Copy, Default)]
pub struct ContractValidator;

impl ContractValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate without producing the typed request
    pub fn validate(&self, input: &DecisionRequestInput) -> ValidationReport {
        let (findings, _) = self.check(input);
        ValidationReport::from_findings(&findings)
    }

    /// Validate and convert into a [`DecisionRequest`]
    pub fn accept(&self, input: &DecisionRequestInput) -> Result<DecisionRequest, ValidationReport> {
        match self.check(input) {
            (findings, Some(request)) if findings.is_empty() => Ok(request),
            (findings, _) => Err(ValidationReport::from_findings(&findings)),
        }
    }

    fn check(&self, input: &DecisionRequestInput) -> (Vec<ValidationFinding>, Option<DecisionRequest>) {
        let mut c = Collector::default();

        let actor = c.take(require_text("actor", input.actor.as_deref()));
        let request_id = c.take(require_text("requestId", input.request_id.as_deref()));
        let timestamp = c.take(require_present("timestamp", input.timestamp.as_ref()));
        let action = c.take(require_text("requestedAction", input.requested_action.as_deref()));
        let business = c.take(require_present("businessContext", input.business_context.as_ref()));
        let technical = c.take(require_present("technicalContext", input.technical_context.as_ref()));
        let safety = c.take(require_present("safetyContext", input.safety_context.as_ref()));

        let urgency = c
            .take(require_text("urgency", input.urgency.as_deref()))
            .and_then(|raw| c.take(require_enum::<Urgency>("urgency", raw)));

        let mode = match input.reasoning_mode.as_deref() {
            None => Some(ReasoningMode::default()),
            Some(raw) => c.take(require_enum::<ReasoningMode>("reasoningMode", raw)),
        };

        let request = match (actor, request_id, timestamp, action, business, technical, safety, urgency, mode) {
            (
                Some(actor),
                Some(request_id),
                Some(timestamp),
                Some(action),
                Some(business),
                Some(technical),
                Some(safety),
                Some(urgency),
                Some(mode),
            ) => Some(DecisionRequest {
                actor: actor.to_string(),
                request_id: request_id.to_string(),
                timestamp: *timestamp,
                requested_action: action.to_string(),
                business_context: business.clone(),
                technical_context: technical.clone(),
                safety_context: safety.clone(),
                urgency,
                reasoning_mode: mode,
                human_override_token: input
                    .human_override_token
                    .clone()
                    .filter(|t| !t.trim().is_empty()),
            }),
            _ => None,
        };

        (c.findings, request)
    }
}

/// Validates reasoning drafts returned by the gateway
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseValidator;

impl ResponseValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, draft: &ReasoningDraft) -> ValidationReport {
        let (findings, _) = self.check(draft);
        ValidationReport::from_findings(&findings)
    }

    pub fn accept(&self, draft: &ReasoningDraft) -> Result<ReasoningResponse, ValidationReport> {
        match self.check(draft) {
            (findings, Some(response)) if findings.is_empty() => Ok(response),
            (findings, _) => Err(ValidationReport::from_findings(&findings)),
        }
    }

    fn check(&self, draft: &ReasoningDraft) -> (Vec<ValidationFinding>, Option<ReasoningResponse>) {
        let mut c = Collector::default();

        let decision = c
            .take(require_text("decision", draft.decision.as_deref()))
            .and_then(|raw| c.take(require_enum::<Decision>("decision", raw)));
        let rationale = c.take(require_text("rationale", draft.rationale.as_deref()));
        let risk_score = c
            .take(require_present("riskScore", draft.risk_score.as_ref()))
            .and_then(|v| c.take(NumericBounds::SCORE.check("riskScore", *v)));
        let moat_value = c
            .take(require_text("moatValue", draft.moat_value.as_deref()))
            .and_then(|raw| c.take(require_enum::<MoatValue>("moatValue", raw)));
        let urgency_score = c
            .take(require_present("urgencyScore", draft.urgency_score.as_ref()))
            .and_then(|v| c.take(NumericBounds::SCORE.check("urgencyScore", *v)));
        let cost = c.take(
            NumericBounds::NON_NEGATIVE.check("costEstimateUsd", draft.cost_estimate_usd.unwrap_or(0.0)),
        );

        let response = match (decision, rationale, risk_score, moat_value, urgency_score, cost) {
            (Some(decision), Some(rationale), Some(risk_score), Some(moat_value), Some(urgency_score), Some(cost)) => {
                Some(ReasoningResponse {
                    decision,
                    rationale: rationale.to_string(),
                    risk_score,
                    moat_value,
                    urgency_score,
                    cost_estimate_usd: cost,
                    required_changes: draft.required_changes.clone().unwrap_or_default(),
                    strategic_upgrades: draft.strategic_upgrades.clone().unwrap_or_default(),
                    execution_steps: draft.execution_steps.clone().unwrap_or_default(),
                    references: draft.references.clone().unwrap_or_default(),
                })
            }
            _ => None,
        };

        (c.findings, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::ContextMap;
    use chrono::Utc;

    fn complete_input() -> DecisionRequestInput {
        DecisionRequestInput::new("cto", "Migrate to new datacenter", Urgency::High).with_request_id("req-42")
    }

    fn complete_draft() -> ReasoningDraft {
        ReasoningDraft {
            decision: Some("approve".to_string()),
            rationale: Some("Low risk, strong upside".to_string()),
            risk_score: Some(35.0),
            moat_value: Some("high".to_string()),
            urgency_score: Some(60.0),
            cost_estimate_usd: Some(120.0),
            required_changes: None,
            strategic_upgrades: Some(vec!["Negotiate SLA".to_string()]),
            execution_steps: None,
            references: None,
        }
    }

    #[test]
    fn test_accepts_complete_request() {
        let request = ContractValidator::new().accept(&complete_input()).unwrap();
        assert_eq!(request.actor, "cto");
        assert_eq!(request.urgency, Urgency::High);
        assert_eq!(request.reasoning_mode, ReasoningMode::Strategic);
    }

    #[test]
    fn test_empty_contexts_are_allowed() {
        let mut input = complete_input();
        input.business_context = Some(ContextMap::new());
        assert!(ContractValidator::new().validate(&input).valid);
    }

    #[test]
    fn test_missing_urgency_is_reported() {
        let mut input = complete_input();
        input.urgency = None;
        let report = ContractValidator::new().validate(&input);
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["urgency is required".to_string()]);
    }

    #[test]
    fn test_reports_every_problem() {
        let input = DecisionRequestInput {
            actor: Some(" ".to_string()),
            request_id: Some("r".to_string()),
            timestamp: Some(Utc::now()),
            urgency: Some("asap".to_string()),
            reasoning_mode: Some("chaotic".to_string()),
            ..Default::default()
        };
        let report = ContractValidator::new().validate(&input);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 7);
        assert!(report.errors.contains(&"actor must not be empty".to_string()));
        assert!(report.errors.contains(&"requestedAction is required".to_string()));
        assert!(report.errors.iter().any(|e| e.starts_with("urgency must be one of")));
        assert!(report.errors.iter().any(|e| e.starts_with("reasoningMode must be one of")));
    }

    #[test]
    fn test_blank_override_token_is_dropped() {
        let input = complete_input().with_override_token("  ");
        let request = ContractValidator::new().accept(&input).unwrap();
        assert!(request.human_override_token.is_none());
    }

    #[test]
    fn test_request_validation_is_idempotent() {
        let mut input = complete_input();
        input.actor = None;
        let validator = ContractValidator::new();
        assert_eq!(validator.validate(&input), validator.validate(&input));
    }

    #[test]
    fn test_accepts_complete_draft() {
        let response = ResponseValidator::new().accept(&complete_draft()).unwrap();
        assert_eq!(response.decision, Decision::Approve);
        assert_eq!(response.moat_value, MoatValue::High);
        assert!(response.required_changes.is_empty());
        assert_eq!(response.strategic_upgrades.len(), 1);
    }

    #[test]
    fn test_cost_defaults_to_zero() {
        let mut draft = complete_draft();
        draft.cost_estimate_usd = None;
        let response = ResponseValidator::new().accept(&draft).unwrap();
        assert_eq!(response.cost_estimate_usd, 0.0);
    }

    #[test]
    fn test_rejects_out_of_range_risk() {
        let mut draft = complete_draft();
        draft.risk_score = Some(101.0);
        draft.decision = Some("escalate".to_string());
        let report = ResponseValidator::new().validate(&draft);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().any(|e| e.starts_with("riskScore must be within")));
    }

    #[test]
    fn test_rejects_missing_required_fields() {
        let report = ResponseValidator::new().validate(&ReasoningDraft::default());
        assert_eq!(
            report.errors,
            vec![
                "decision is required".to_string(),
                "rationale is required".to_string(),
                "riskScore is required".to_string(),
                "moatValue is required".to_string(),
                "urgencyScore is required".to_string(),
            ]
        );
    }

    #[test]
    fn test_response_validation_is_idempotent() {
        let mut draft = complete_draft();
        draft.urgency_score = Some(-3.0);
        let validator = ResponseValidator::new();
        assert_eq!(validator.validate(&draft), validator.validate(&draft));
    }
}
