//! Prompt rendering for the reasoning service
//!
//! Pure: the same request always renders the same prompts. Each system
//! prompt ends with the JSON shape the service must answer with.

use serde_json::json;

use crate::contracts::{DecisionRequest, ReasoningMode};

/// System and user message for one reasoning call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

const OUTPUT_SCHEMA: &str = r#"{
  "decision": "approve | revise | reject",
  "rationale": "string",
  "riskScore": "number 0-100",
  "moatValue": "low | medium | high | unknown",
  "urgencyScore": "number 0-100",
  "costEstimateUsd": "number >= 0",
  "requiredChanges": ["string"],
  "strategicUpgrades": ["string"],
  "executionSteps": ["string"],
  "references": ["string"]
}"#;

const STRATEGIC_PROMPT: &str = "You are a strategic advisor to the executive team. \
Evaluate the requested action for long-term competitive position, capital efficiency \
and execution risk. Prefer revise over reject when the action can be made sound. \
Score risk conservatively and name concrete changes.";

const CRISIS_PROMPT: &str = "You are a crisis response advisor. The organization is under \
acute pressure. Evaluate the requested action for immediate containment, downside \
exposure and reversibility. Favor actions that stop further damage. Flag anything \
irreversible with a high risk score.";

const INNOVATION_PROMPT: &str = "You are an innovation strategist. Evaluate the requested \
action for novelty, defensibility and the strength of the moat it creates. Suggest \
strategic upgrades that would widen the advantage. Keep the risk score honest about \
technical and market uncertainty.";

const INVESTOR_PROMPT: &str = "You are an investor relations and capital markets advisor. \
Evaluate the requested action as a board member and a prospective investor would: \
return on capital, dilution, signaling and governance exposure. Estimate cost in USD \
and reference comparable transactions where possible.";

fn mode_instructions(mode: ReasoningMode) -> &'static str {
    match mode {
        ReasoningMode::Strategic => STRATEGIC_PROMPT,
        ReasoningMode::Crisis => CRISIS_PROMPT,
        ReasoningMode::Innovation => INNOVATION_PROMPT,
        ReasoningMode::Investor => INVESTOR_PROMPT,
    }
}

/// System prompt for a reasoning mode
pub fn system_prompt(mode: ReasoningMode) -> String {
    format!(
        "{}\n\nRespond with a single JSON object and nothing else, using exactly this shape:\n{}",
        mode_instructions(mode),
        OUTPUT_SCHEMA
    )
}

/// User prompt embedding the request as pretty JSON
///
/// The override token is left out; it is a credential, not context.
pub fn user_prompt(request: &DecisionRequest) -> String {
    let payload = json!({
        "actor": request.actor,
        "requestId": request.request_id,
        "timestamp": request.timestamp,
        "requestedAction": request.requested_action,
        "businessContext": request.business_context,
        "technicalContext": request.technical_context,
        "safetyContext": request.safety_context,
        "urgency": request.urgency,
        "reasoningMode": request.reasoning_mode,
    });
    let pretty = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
    format!("Evaluate the following decision request:\n\n{}", pretty)
}

pub fn render_prompts(request: &DecisionRequest) -> PromptPair {
    PromptPair {
        system: system_prompt(request.reasoning_mode),
        user: user_prompt(request),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{ContextMap, Urgency};
    use chrono::Utc;

    fn request(mode: ReasoningMode) -> DecisionRequest {
        let mut business = ContextMap::new();
        business.insert("arr".to_string(), json!(12_000_000));
        DecisionRequest {
            actor: "ceo".to_string(),
            request_id: "req-7".to_string(),
            timestamp: Utc::now(),
            requested_action: "Enter the Japanese market".to_string(),
            business_context: business,
            technical_context: ContextMap::new(),
            safety_context: ContextMap::new(),
            urgency: Urgency::High,
            reasoning_mode: mode,
            human_override_token: Some("OVERRIDE_ceo_1767225600000_abc".to_string()),
        }
    }

    #[test]
    fn test_every_mode_ends_with_schema() {
        for mode in [
            ReasoningMode::Strategic,
            ReasoningMode::Crisis,
            ReasoningMode::Innovation,
            ReasoningMode::Investor,
        ] {
            let prompt = system_prompt(mode);
            assert!(prompt.ends_with(OUTPUT_SCHEMA));
            assert!(prompt.starts_with(mode_instructions(mode)));
        }
    }

    #[test]
    fn test_modes_differ() {
        assert_ne!(system_prompt(ReasoningMode::Crisis), system_prompt(ReasoningMode::Investor));
    }

    #[test]
    fn test_user_prompt_embeds_request_without_token() {
        let prompts = render_prompts(&request(ReasoningMode::Innovation));
        assert!(prompts.user.contains("\"requestedAction\": \"Enter the Japanese market\""));
        assert!(prompts.user.contains("\"arr\": 12000000"));
        assert!(prompts.user.contains("\"urgency\": \"high\""));
        assert!(!prompts.user.contains("OVERRIDE_"));
        assert_eq!(prompts.system, system_prompt(ReasoningMode::Innovation));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let req = request(ReasoningMode::Strategic);
        assert_eq!(render_prompts(&req), render_prompts(&req));
    }
}
