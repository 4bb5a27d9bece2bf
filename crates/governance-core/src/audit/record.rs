//! Audit record lifecycle
//!
//! An [`OpenAuditRecord`] is created in `processing` when a request arrives
//! and is consumed by [`OpenAuditRecord::conclude`], so a record can reach a
//! terminal status exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Instant;
use uuid::Uuid;

use crate::contracts::{DecisionRequestInput, MoatValue, ReasoningResponse};
use crate::error::{ErrorKind, GovernanceError};
use crate::policy::SafetyCheckResult;

/// Actor recorded when the request did not name one
pub const UNKNOWN_ACTOR: &str = "unknown";

/// Lifecycle status of an audit record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Processing,
    Approved,
    Blocked,
    Error,
}

impl AuditStatus {
    pub const ALLOWED: &'static [&'static str] = &["processing", "approved", "blocked", "error"];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Processing => "processing",
            AuditStatus::Approved => "approved",
            AuditStatus::Blocked => "blocked",
            AuditStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AuditStatus::Processing)
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditStatus {
    type Err = crate::contracts::UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(AuditStatus::Processing),
            "approved" => Ok(AuditStatus::Approved),
            "blocked" => Ok(AuditStatus::Blocked),
            "error" => Ok(AuditStatus::Error),
            other => Err(crate::contracts::UnknownVariant {
                field: "status",
                value: other.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }
}

/// One signed, append-only entry in the audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: Uuid,
    pub request_id: String,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    /// The request exactly as submitted
    pub request_payload: DecisionRequestInput,
    pub reasoning_response: Option<ReasoningResponse>,
    pub decision_text: Option<String>,
    pub risk_score: Option<f64>,
    pub moat_value: Option<MoatValue>,
    pub safety_check: Option<SafetyCheckResult>,
    pub status: AuditStatus,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub processing_time_ms: u64,
    pub signed_with_default_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl AuditRecord {
    /// Deterministic bytes covered by the signature
    ///
    /// Every field except `signature`, serialized as JSON with object keys
    /// sorted at every depth.
    pub fn canonical_bytes(&self) -> serde_json::Result<Vec<u8>> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.remove("signature");
        }
        serde_json::to_vec(&sort_keys(value))
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = serde_json::Map::new();
            for (key, inner) in entries {
                sorted.insert(key, sort_keys(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// How a decision ended
#[derive(Debug, Clone)]
pub enum Conclusion {
    Approved {
        response: ReasoningResponse,
        safety: SafetyCheckResult,
    },
    Blocked {
        response: ReasoningResponse,
        safety: SafetyCheckResult,
    },
    Failed {
        error: GovernanceError,
    },
}

impl Conclusion {
    pub fn status(&self) -> AuditStatus {
        match self {
            Conclusion::Approved { .. } => AuditStatus::Approved,
            Conclusion::Blocked { .. } => AuditStatus::Blocked,
            Conclusion::Failed { .. } => AuditStatus::Error,
        }
    }
}

/// An audit record still in `processing`
#[derive(Debug)]
pub struct OpenAuditRecord {
    record: AuditRecord,
    started: Instant,
}

impl OpenAuditRecord {
    pub(crate) fn new(payload: DecisionRequestInput, opened_at: DateTime<Utc>, signed_with_default_key: bool) -> Self {
        let actor = payload
            .actor
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(UNKNOWN_ACTOR)
            .to_string();
        let request_id = payload.request_id.clone().unwrap_or_default();
        Self {
            record: AuditRecord {
                id: Uuid::new_v4(),
                request_id,
                actor,
                timestamp: opened_at,
                request_payload: payload,
                reasoning_response: None,
                decision_text: None,
                risk_score: None,
                moat_value: None,
                safety_check: None,
                status: AuditStatus::Processing,
                error_kind: None,
                error_message: None,
                processing_time_ms: 0,
                signed_with_default_key,
                signature: None,
            },
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.record.id
    }

    pub fn request_id(&self) -> &str {
        &self.record.request_id
    }

    /// View of the record while it is still processing
    pub fn record(&self) -> &AuditRecord {
        &self.record
    }

    /// Move the record to its terminal status; the result is still unsigned
    pub fn conclude(self, conclusion: Conclusion) -> AuditRecord {
        let mut record = self.record;
        record.status = conclusion.status();
        record.processing_time_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match conclusion {
            Conclusion::Approved { response, safety } | Conclusion::Blocked { response, safety } => {
                record.decision_text = Some(response.decision.as_str().to_string());
                record.risk_score = Some(response.risk_score);
                record.moat_value = Some(response.moat_value);
                record.reasoning_response = Some(response);
                record.safety_check = Some(safety);
            }
            Conclusion::Failed { error } => {
                record.error_kind = Some(error.kind());
                record.error_message = Some(error.to_string());
            }
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{Decision, Urgency};
    use serde_json::json;

    fn response() -> ReasoningResponse {
        ReasoningResponse {
            decision: Decision::Approve,
            rationale: "fits the plan".to_string(),
            risk_score: 30.0,
            moat_value: MoatValue::High,
            urgency_score: 40.0,
            cost_estimate_usd: 12.0,
            required_changes: vec![],
            strategic_upgrades: vec!["expand".to_string()],
            execution_steps: vec![],
            references: vec![],
        }
    }

    fn safety() -> SafetyCheckResult {
        SafetyCheckResult {
            allowed: true,
            requires_human_review: false,
            triggered_checks: vec![],
            reasoning: "All safety checks passed".to_string(),
        }
    }

    #[test]
    fn test_open_record_defaults() {
        let open = OpenAuditRecord::new(DecisionRequestInput::default(), Utc::now(), true);
        assert_eq!(open.record().status, AuditStatus::Processing);
        assert_eq!(open.record().actor, UNKNOWN_ACTOR);
        assert!(open.record().signed_with_default_key);
        assert!(!open.record().is_signed());
    }

    #[test]
    fn test_conclude_approved_denormalizes() {
        let input = DecisionRequestInput::new("cfo", "Acquire Beta", Urgency::High).with_request_id("req-9");
        let open = OpenAuditRecord::new(input.clone(), Utc::now(), false);
        let record = open.conclude(Conclusion::Approved {
            response: response(),
            safety: safety(),
        });
        assert_eq!(record.status, AuditStatus::Approved);
        assert_eq!(record.request_id, "req-9");
        assert_eq!(record.actor, "cfo");
        assert_eq!(record.decision_text.as_deref(), Some("approve"));
        assert_eq!(record.risk_score, Some(30.0));
        assert_eq!(record.moat_value, Some(MoatValue::High));
        assert_eq!(record.request_payload, input);
        assert!(record.error_kind.is_none());
    }

    #[test]
    fn test_conclude_failed_keeps_reasoning_empty() {
        let open = OpenAuditRecord::new(DecisionRequestInput::default(), Utc::now(), false);
        let record = open.conclude(Conclusion::Failed {
            error: GovernanceError::unavailable("connect refused"),
        });
        assert_eq!(record.status, AuditStatus::Error);
        assert_eq!(record.error_kind, Some(ErrorKind::ReasoningUnavailable));
        assert!(record.error_message.unwrap().contains("connect refused"));
        assert!(record.reasoning_response.is_none());
        assert!(record.safety_check.is_none());
    }

    #[test]
    fn test_canonical_bytes_sorted_and_unsigned() {
        let input = DecisionRequestInput::new("cfo", "x", Urgency::Low)
            .with_business_context("zeta", json!(1))
            .with_business_context("alpha", json!({ "b": 1, "a": 2 }));
        let mut record = OpenAuditRecord::new(input, Utc::now(), false).conclude(Conclusion::Approved {
            response: response(),
            safety: safety(),
        });
        let unsigned = record.canonical_bytes().unwrap();
        record.signature = Some("abc".to_string());
        assert_eq!(record.canonical_bytes().unwrap(), unsigned);

        let text = String::from_utf8(unsigned).unwrap();
        assert!(!text.contains("\"signature\""));
        assert!(text.find("\"actor\"").unwrap() < text.find("\"id\"").unwrap());
        assert!(text.find("\"alpha\"").unwrap() < text.find("\"zeta\"").unwrap());
        assert!(text.contains("{\"a\":2,\"b\":1}"));
    }

    #[test]
    fn test_status_round_trip() {
        for name in AuditStatus::ALLOWED {
            let status: AuditStatus = name.parse().unwrap();
            assert_eq!(status.as_str(), *name);
        }
        assert!("done".parse::<AuditStatus>().is_err());
        assert!(!AuditStatus::Processing.is_terminal());
        assert!(AuditStatus::Blocked.is_terminal());
    }
}
