//! Reasoning service answer contract

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::UnknownVariant;

/// Recommendation returned by the reasoning service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Revise,
    Reject,
}

impl Decision {
    pub const ALLOWED: &'static [&'static str] = &["approve", "revise", "reject"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Revise => "revise",
            Decision::Reject => "reject",
        }
    }
}

impl FromStr for Decision {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Decision::Approve),
            "revise" => Ok(Decision::Revise),
            "reject" => Ok(Decision::Reject),
            other => Err(UnknownVariant {
                field: "decision",
                value: other.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Competitive-advantage label, carried through unmodified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoatValue {
    Low,
    Medium,
    High,
    Unknown,
}

impl MoatValue {
    pub const ALLOWED: &'static [&'static str] = &["low", "medium", "high", "unknown"];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoatValue::Low => "low",
            MoatValue::Medium => "medium",
            MoatValue::High => "high",
            MoatValue::Unknown => "unknown",
        }
    }
}

impl FromStr for MoatValue {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(MoatValue::Low),
            "medium" => Ok(MoatValue::Medium),
            "high" => Ok(MoatValue::High),
            "unknown" => Ok(MoatValue::Unknown),
            other => Err(UnknownVariant {
                field: "moatValue",
                value: other.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }
}

impl fmt::Display for MoatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasoning service answer as parsed from its text output
///
/// Nothing here is trusted. Enumerations stay strings and numbers stay
/// unchecked until [`crate::validation::ResponseValidator`] accepts the draft.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningDraft {
    #[serde(default)]
    pub decision: Option<String>,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub moat_value: Option<String>,
    #[serde(default)]
    pub urgency_score: Option<f64>,
    #[serde(default)]
    pub cost_estimate_usd: Option<f64>,
    #[serde(default)]
    pub required_changes: Option<Vec<String>>,
    #[serde(default)]
    pub strategic_upgrades: Option<Vec<String>>,
    #[serde(default)]
    pub execution_steps: Option<Vec<String>>,
    #[serde(default)]
    pub references: Option<Vec<String>>,
}

/// Validated reasoning answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningResponse {
    pub decision: Decision,
    pub rationale: String,
    pub risk_score: f64,
    pub moat_value: MoatValue,
    pub urgency_score: f64,
    #[serde(default)]
    pub cost_estimate_usd: f64,
    #[serde(default)]
    pub required_changes: Vec<String>,
    #[serde(default)]
    pub strategic_upgrades: Vec<String>,
    #[serde(default)]
    pub execution_steps: Vec<String>,
    #[serde(default)]
    pub references: Vec<String>,
}

impl From<&ReasoningResponse> for ReasoningDraft {
    fn from(response: &ReasoningResponse) -> Self {
        Self {
            decision: Some(response.decision.as_str().to_string()),
            rationale: Some(response.rationale.clone()),
            risk_score: Some(response.risk_score),
            moat_value: Some(response.moat_value.as_str().to_string()),
            urgency_score: Some(response.urgency_score),
            cost_estimate_usd: Some(response.cost_estimate_usd),
            required_changes: Some(response.required_changes.clone()),
            strategic_upgrades: Some(response.strategic_upgrades.clone()),
            execution_steps: Some(response.execution_steps.clone()),
            references: Some(response.references.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_draft_accepts_partial_json() {
        let draft: ReasoningDraft = serde_json::from_value(json!({
            "decision": "maybe",
            "riskScore": 140,
        }))
        .unwrap();
        assert_eq!(draft.decision.as_deref(), Some("maybe"));
        assert_eq!(draft.risk_score, Some(140.0));
        assert!(draft.rationale.is_none());
    }

    #[test]
    fn test_draft_tolerates_null_lists() {
        let draft: ReasoningDraft =
            serde_json::from_value(json!({ "requiredChanges": null, "references": ["a"] })).unwrap();
        assert!(draft.required_changes.is_none());
        assert_eq!(draft.references, Some(vec!["a".to_string()]));
    }

    #[test]
    fn test_draft_rejects_wrong_types() {
        let result = serde_json::from_value::<ReasoningDraft>(json!({ "riskScore": "high" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("reject".parse::<Decision>().unwrap(), Decision::Reject);
        assert!("Approve".parse::<Decision>().is_err());
        assert_eq!("unknown".parse::<MoatValue>().unwrap(), MoatValue::Unknown);
    }
}
