//! Contracts for the governance engine
//!
//! Wire-level (loose) and validated (typed) shapes for the decision request
//! and the reasoning service's answer. Loose shapes accept anything the
//! caller or the reasoning service sends; only the validators in
//! [`crate::validation`] produce the typed forms.

pub mod reasoning;
pub mod request;

pub use reasoning::{Decision, MoatValue, ReasoningDraft, ReasoningResponse};
pub use request::{
    generate_request_id, ContextMap, DecisionRequest, DecisionRequestInput, ReasoningMode, Urgency,
};

/// Error returned when a string does not name a member of an enumerated contract field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub field: &'static str,
    pub value: String,
    pub allowed: &'static [&'static str],
}

impl std::fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} must be one of [{}], got '{}'",
            self.field,
            self.allowed.join(", "),
            self.value
        )
    }
}

impl std::error::Error for UnknownVariant {}
