//! HTTP handler module for the governance server
//!
//! - `routes`: router, shared state and endpoint handlers
//!
//! Every JSON endpoint answers with the [`ApiResponse`] envelope so that
//! clients can branch on `success` and `error.code` without inspecting the
//! HTTP status.

pub mod routes;

pub use routes::{
    create_router, decide, health_check, issue_override_token, metrics, query_audit, status,
    ApiError, AppState,
};

use serde::{Deserialize, Serialize};

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the operation was successful
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error information (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    pub metadata: ResponseMetadata,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, request_id: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: ResponseMetadata::new(request_id),
        }
    }

    pub fn error(error: ErrorInfo, request_id: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(error),
            metadata: ResponseMetadata::new(request_id),
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.metadata = self.metadata.with_duration(duration_ms);
        self
    }
}

/// Error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error code, e.g. `REASONING_UNAVAILABLE`
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Response metadata for tracing and debugging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub request_id: String,
    /// Timestamp of response generation (RFC 3339)
    pub timestamp: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ResponseMetadata {
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            duration_ms: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// Body of `POST /api/v1/override-tokens`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverrideTokenRequest {
    #[serde(default)]
    pub actor: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub signature: String,
}

/// Liveness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub components: ComponentHealth,
    pub timestamp: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Serving, but decisions fall back to the offline recommendation
    Degraded,
}

/// Component-level health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub reasoning_service: bool,
    pub audit_store: String,
    pub signing_key_configured: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let response: ApiResponse<String> = ApiResponse::success("ok".to_string(), "req-1".to_string());
        assert!(response.success);
        assert_eq!(response.data.as_deref(), Some("ok"));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_api_response_error_omits_data() {
        let error = ErrorInfo::new("REASONING_UNAVAILABLE", "down");
        let response = ApiResponse::<()>::error(error, "req-2".to_string());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("data").is_none());
        assert_eq!(json["error"]["code"], "REASONING_UNAVAILABLE");
    }

    #[test]
    fn test_response_metadata_duration() {
        let response = ApiResponse::success(1, "req-3".to_string()).with_duration(42);
        assert_eq!(response.metadata.request_id, "req-3");
        assert_eq!(response.metadata.duration_ms, Some(42));
    }

    #[test]
    fn test_override_request_tolerates_missing_fields() {
        let request: OverrideTokenRequest = serde_json::from_str(r#"{"actor":"cfo"}"#).unwrap();
        assert_eq!(request.actor, "cfo");
        assert!(request.reason.is_empty());
    }
}
