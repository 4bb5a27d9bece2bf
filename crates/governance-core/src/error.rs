//! Error types for the governance engine
//!
//! Every failure path of a decision carries one of these variants. The tag
//! returned by [`GovernanceError::kind`] is stable and safe to expose to
//! callers; messages never include key material or service credentials.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for governance operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GovernanceError {
    /// The inbound decision request failed contract validation
    #[error("Invalid decision request: {}", .errors.join("; "))]
    InvalidRequestContract { errors: Vec<String> },

    /// The reasoning service could not be reached or answered with a failure status
    #[error("Reasoning service unavailable: {0}")]
    ReasoningUnavailable(String),

    /// The reasoning service answered, but not with the expected JSON shape
    #[error("Reasoning service returned malformed output: {0}")]
    ReasoningMalformed(String),

    /// The parsed reasoning output failed response validation
    #[error("Reasoning output violates contract: {}", .errors.join("; "))]
    InvalidReasoningContract { errors: Vec<String> },

    /// Writing an audit record to the durable store failed
    #[error("Audit persistence failed: {0}")]
    PersistenceFailure(String),

    /// Invalid or incomplete engine configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Stable taxonomy tag for a [`GovernanceError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidRequestContract,
    ReasoningUnavailable,
    ReasoningMalformed,
    InvalidReasoningContract,
    PersistenceFailure,
    Configuration,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequestContract => "INVALID_REQUEST_CONTRACT",
            ErrorKind::ReasoningUnavailable => "REASONING_UNAVAILABLE",
            ErrorKind::ReasoningMalformed => "REASONING_MALFORMED",
            ErrorKind::InvalidReasoningContract => "INVALID_REASONING_CONTRACT",
            ErrorKind::PersistenceFailure => "PERSISTENCE_FAILURE",
            ErrorKind::Configuration => "CONFIGURATION_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl GovernanceError {
    /// Create a reasoning-unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        GovernanceError::ReasoningUnavailable(msg.into())
    }

    /// Create a reasoning-malformed error
    pub fn malformed(msg: impl Into<String>) -> Self {
        GovernanceError::ReasoningMalformed(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        GovernanceError::Configuration(msg.into())
    }

    /// Taxonomy tag of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            GovernanceError::InvalidRequestContract { .. } => ErrorKind::InvalidRequestContract,
            GovernanceError::ReasoningUnavailable(_) => ErrorKind::ReasoningUnavailable,
            GovernanceError::ReasoningMalformed(_) => ErrorKind::ReasoningMalformed,
            GovernanceError::InvalidReasoningContract { .. } => ErrorKind::InvalidReasoningContract,
            GovernanceError::PersistenceFailure(_) => ErrorKind::PersistenceFailure,
            GovernanceError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Validator errors carried by this error (empty for non-validation failures)
    pub fn errors(&self) -> Vec<String> {
        match self {
            GovernanceError::InvalidRequestContract { errors }
            | GovernanceError::InvalidReasoningContract { errors } => errors.clone(),
            other => vec![other.to_string()],
        }
    }

    /// Whether the caller may reasonably retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self, GovernanceError::ReasoningUnavailable(_))
    }

    /// Whether the failure was caused by the caller's input
    pub fn is_user_error(&self) -> bool {
        matches!(self, GovernanceError::InvalidRequestContract { .. })
    }
}

impl From<serde_json::Error> for GovernanceError {
    fn from(err: serde_json::Error) -> Self {
        GovernanceError::ReasoningMalformed(format!("JSON error: {}", err))
    }
}

impl From<toml::de::Error> for GovernanceError {
    fn from(err: toml::de::Error) -> Self {
        GovernanceError::Configuration(format!("TOML error: {}", err))
    }
}

/// Result type alias for governance operations
pub type Result<T> = std::result::Result<T, GovernanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GovernanceError::InvalidRequestContract {
            errors: vec!["actor is required".to_string(), "urgency is required".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Invalid decision request: actor is required; urgency is required"
        );
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(
            GovernanceError::unavailable("x").kind().as_str(),
            "REASONING_UNAVAILABLE"
        );
        assert_eq!(
            GovernanceError::malformed("x").kind(),
            ErrorKind::ReasoningMalformed
        );
        let json = serde_json::to_string(&ErrorKind::InvalidReasoningContract).unwrap();
        assert_eq!(json, "\"INVALID_REASONING_CONTRACT\"");
    }

    #[test]
    fn test_retryable_and_user_errors() {
        assert!(GovernanceError::unavailable("timeout").is_retryable());
        assert!(!GovernanceError::malformed("bad").is_retryable());
        assert!(GovernanceError::InvalidRequestContract { errors: vec![] }.is_user_error());
        assert!(!GovernanceError::configuration("x").is_user_error());
    }

    #[test]
    fn test_errors_list() {
        let err = GovernanceError::InvalidReasoningContract {
            errors: vec!["riskScore out of range".to_string()],
        };
        assert_eq!(err.errors(), vec!["riskScore out of range".to_string()]);
        assert_eq!(GovernanceError::unavailable("down").errors().len(), 1);
    }
}
