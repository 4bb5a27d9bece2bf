//! Route definitions for the governance server
//!
//! - POST /api/v1/decisions - Run a strategic decision
//! - POST /api/v1/override-tokens - Issue a human override token
//! - GET /api/v1/status - Telemetry snapshot
//! - GET /api/v1/audit - Query audit records
//! - GET /health - Liveness
//! - GET /metrics - Prometheus text exposition

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use governance_core::{
    AuditQuery, AuditRecord, DecisionFailure, DecisionOrchestrator, DecisionOutcome,
    DecisionRequestInput, ErrorKind, GovernanceError, IssuedOverride, TelemetrySnapshot,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{
    ApiResponse, ComponentHealth, ErrorInfo, HealthResponse, HealthStatus, OverrideTokenRequest,
};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// State shared across all routes
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<DecisionOrchestrator>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(orchestrator: Arc<DecisionOrchestrator>) -> Self {
        Self {
            orchestrator,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// The body or query string could not be decoded
    BadRequest(String),
    /// A decision reached the `error` state; its audit record travels with it
    Decision(Box<DecisionFailure>),
    Governance(GovernanceError),
    InternalError(String),
}

fn kind_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidRequestContract => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::ReasoningUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::ReasoningMalformed | ErrorKind::InvalidReasoningContract => StatusCode::BAD_GATEWAY,
        ErrorKind::PersistenceFailure | ErrorKind::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Decision(failure) => failure.kind().as_str(),
            ApiError::Governance(error) => error.kind().as_str(),
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Decision(failure) => kind_status(failure.kind()),
            ApiError::Governance(error) => kind_status(error.kind()),
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GovernanceError> for ApiError {
    fn from(error: GovernanceError) -> Self {
        ApiError::Governance(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let (error_info, request_id) = match self {
            ApiError::BadRequest(msg) | ApiError::InternalError(msg) => {
                (ErrorInfo::new(code, msg), uuid::Uuid::new_v4().to_string())
            }
            ApiError::Decision(failure) => {
                let failure = *failure;
                let info = ErrorInfo::new(code, failure.error.to_string()).with_details(serde_json::json!({
                    "kind": code,
                    "errors": failure.error.errors(),
                    "auditRecord": failure.audit_record,
                }));
                (info, failure.request_id)
            }
            ApiError::Governance(error) => {
                let info = ErrorInfo::new(code, error.to_string())
                    .with_details(serde_json::json!({ "errors": error.errors() }));
                (info, uuid::Uuid::new_v4().to_string())
            }
        };

        let response = ApiResponse::<()>::error(error_info, request_id);
        (status, Json(response)).into_response()
    }
}

/// Create the router with all routes and the HTTP middleware stack
pub fn create_router(state: AppState) -> Router {
    let timeout = state.request_timeout;
    Router::new()
        .route("/api/v1/decisions", post(decide))
        .route("/api/v1/override-tokens", post(issue_override_token))
        .route("/api/v1/status", get(status))
        .route("/api/v1/audit", get(query_audit))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .layer(TimeoutLayer::new(timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST /api/v1/decisions
///
/// The decision runs on its own task, so a client that disconnects or a
/// request that hits the HTTP timeout still leaves a persisted audit record.
pub async fn decide(
    State(state): State<AppState>,
    payload: Result<Json<DecisionRequestInput>, JsonRejection>,
) -> Result<Json<ApiResponse<DecisionOutcome>>, ApiError> {
    let Json(input) = payload?;
    let start_time = Instant::now();

    let handle = state.orchestrator.execute_detached(input);
    let result = handle.await.map_err(|e| {
        tracing::error!(error = %e, "Decision task did not complete");
        ApiError::InternalError("Decision task did not complete".to_string())
    })?;

    match result {
        Ok(outcome) => {
            let request_id = outcome.request_id.clone();
            let duration_ms = start_time.elapsed().as_millis() as u64;
            Ok(Json(ApiResponse::success(outcome, request_id).with_duration(duration_ms)))
        }
        Err(failure) => Err(ApiError::Decision(Box::new(failure))),
    }
}

/// POST /api/v1/override-tokens
pub async fn issue_override_token(
    State(state): State<AppState>,
    payload: Result<Json<OverrideTokenRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<IssuedOverride>>, ApiError> {
    let Json(request) = payload?;
    let issued = state
        .orchestrator
        .issue_override_token(&request.actor, &request.reason, &request.signature)?;
    Ok(Json(ApiResponse::success(issued, uuid::Uuid::new_v4().to_string())))
}

/// GET /api/v1/status
pub async fn status(State(state): State<AppState>) -> Json<ApiResponse<TelemetrySnapshot>> {
    Json(ApiResponse::success(
        state.orchestrator.status(),
        uuid::Uuid::new_v4().to_string(),
    ))
}

/// A stored record and whether its signature checks out under our key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    #[serde(flatten)]
    pub record: AuditRecord,
    pub signature_valid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditQueryResult {
    pub count: usize,
    pub records: Vec<AuditEntry>,
}

/// GET /api/v1/audit
pub async fn query_audit(
    State(state): State<AppState>,
    query: Result<Query<AuditQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<AuditQueryResult>>, ApiError> {
    let Query(query) = query?;
    let records = state.orchestrator.query_audit(&query).await?;
    let records: Vec<AuditEntry> = records
        .into_iter()
        .map(|record| AuditEntry {
            signature_valid: state.orchestrator.verify_record(&record),
            record,
        })
        .collect();

    Ok(Json(ApiResponse::success(
        AuditQueryResult {
            count: records.len(),
            records,
        },
        uuid::Uuid::new_v4().to_string(),
    )))
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let reasoning_service = state.orchestrator.is_reasoning_configured();
    let ledger = state.orchestrator.ledger();

    Json(HealthResponse {
        status: if reasoning_service {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        },
        components: ComponentHealth {
            reasoning_service,
            audit_store: ledger.store().name().to_string(),
            signing_key_configured: !ledger.uses_default_key(),
        },
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = state.orchestrator.metrics().encode_text().map_err(|e| {
        tracing::error!(error = %e, "Failed to encode metrics");
        ApiError::InternalError(e.to_string())
    })?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response())
}
