//! Decision request contract

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::UnknownVariant;

/// Opaque structured context supplied by the caller
pub type ContextMap = serde_json::Map<String, serde_json::Value>;

/// Urgency of a decision request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    pub const ALLOWED: &'static [&'static str] = &["low", "medium", "high", "critical"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Critical => "critical",
        }
    }
}

impl FromStr for Urgency {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Urgency::Low),
            "medium" => Ok(Urgency::Medium),
            "high" => Ok(Urgency::High),
            "critical" => Ok(Urgency::Critical),
            other => Err(UnknownVariant {
                field: "urgency",
                value: other.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prompt family used when asking the reasoning service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningMode {
    #[default]
    Strategic,
    Crisis,
    Innovation,
    Investor,
}

impl ReasoningMode {
    pub const ALLOWED: &'static [&'static str] = &["strategic", "crisis", "innovation", "investor"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningMode::Strategic => "strategic",
            ReasoningMode::Crisis => "crisis",
            ReasoningMode::Innovation => "innovation",
            ReasoningMode::Investor => "investor",
        }
    }
}

impl FromStr for ReasoningMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strategic" => Ok(ReasoningMode::Strategic),
            "crisis" => Ok(ReasoningMode::Crisis),
            "innovation" => Ok(ReasoningMode::Innovation),
            "investor" => Ok(ReasoningMode::Investor),
            other => Err(UnknownVariant {
                field: "reasoningMode",
                value: other.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }
}

impl fmt::Display for ReasoningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision request exactly as submitted by the caller
///
/// Every field is optional so that an incomplete request still reaches the
/// orchestrator and is audited. Use [`crate::validation::ContractValidator`]
/// to obtain a [`DecisionRequest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequestInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_context: Option<ContextMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_context: Option<ContextMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_context: Option<ContextMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_override_token: Option<String>,
}

impl DecisionRequestInput {
    /// Create a complete request with empty contexts, timestamped now
    pub fn new(actor: impl Into<String>, requested_action: impl Into<String>, urgency: Urgency) -> Self {
        Self {
            actor: Some(actor.into()),
            request_id: None,
            timestamp: Some(Utc::now()),
            requested_action: Some(requested_action.into()),
            business_context: Some(ContextMap::new()),
            technical_context: Some(ContextMap::new()),
            safety_context: Some(ContextMap::new()),
            urgency: Some(urgency.as_str().to_string()),
            reasoning_mode: None,
            human_override_token: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_mode(mut self, mode: ReasoningMode) -> Self {
        self.reasoning_mode = Some(mode.as_str().to_string());
        self
    }

    pub fn with_override_token(mut self, token: impl Into<String>) -> Self {
        self.human_override_token = Some(token.into());
        self
    }

    pub fn with_business_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.business_context
            .get_or_insert_with(ContextMap::new)
            .insert(key.into(), value);
        self
    }

    pub fn with_technical_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.technical_context
            .get_or_insert_with(ContextMap::new)
            .insert(key.into(), value);
        self
    }

    pub fn with_safety_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.safety_context
            .get_or_insert_with(ContextMap::new)
            .insert(key.into(), value);
        self
    }

    /// Fill in a generated request id if the caller did not supply one
    pub fn ensure_request_id(&mut self, now: DateTime<Utc>) -> &str {
        let missing = self
            .request_id
            .as_deref()
            .map_or(true, |id| id.trim().is_empty());
        if missing {
            self.request_id = Some(generate_request_id(now));
        }
        self.request_id.as_deref().unwrap_or_default()
    }
}

/// Validated decision request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub actor: String,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub requested_action: String,
    pub business_context: ContextMap,
    pub technical_context: ContextMap,
    pub safety_context: ContextMap,
    pub urgency: Urgency,
    pub reasoning_mode: ReasoningMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_override_token: Option<String>,
}

/// Generate a request id of the form `req_<epochMillis>_<random>`
pub fn generate_request_id(now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("req_{}_{}", now.timestamp_millis(), &random[..9])
}
