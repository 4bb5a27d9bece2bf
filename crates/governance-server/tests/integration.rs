//! Router tests for the governance HTTP surface

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use governance_core::audit::MemoryAuditStore;
use governance_core::{
    AuditSigner, DecisionOrchestrator, DecisionRequest, GovernanceError, ReasoningBackend, ReasoningDraft,
};
use governance_server::{create_router, AppState};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct FixedBackend {
    result: governance_core::Result<ReasoningDraft>,
}

#[async_trait]
impl ReasoningBackend for FixedBackend {
    async fn reason(&self, _request: &DecisionRequest) -> governance_core::Result<ReasoningDraft> {
        self.result.clone()
    }

    fn is_configured(&self) -> bool {
        true
    }
}

fn draft(risk: f64) -> ReasoningDraft {
    ReasoningDraft {
        decision: Some("approve".to_string()),
        rationale: Some("Fits the three-year plan".to_string()),
        risk_score: Some(risk),
        moat_value: Some("high".to_string()),
        urgency_score: Some(40.0),
        cost_estimate_usd: Some(12.5),
        ..ReasoningDraft::default()
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryAuditStore>,
}

fn app_with(backend: Option<FixedBackend>) -> TestApp {
    let store = Arc::new(MemoryAuditStore::new());
    let mut builder = DecisionOrchestrator::builder()
        .store(store.clone())
        .signer(AuditSigner::new(SecretString::new("server-test-key".to_string())));
    if let Some(backend) = backend {
        builder = builder.backend(Arc::new(backend));
    }
    let orchestrator = Arc::new(builder.build().unwrap());
    TestApp {
        router: create_router(AppState::new(orchestrator)),
        store,
    }
}

fn decision_body(request_id: &str) -> Value {
    json!({
        "actor": "ceo",
        "requestId": request_id,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "requestedAction": "Open a second manufacturing site",
        "businessContext": {"capex": 40000000},
        "technicalContext": {},
        "safetyContext": {},
        "urgency": "high",
        "reasoningMode": "strategic"
    })
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn approved_decision_is_returned_and_queryable() {
    let app = app_with(Some(FixedBackend { result: Ok(draft(30.0)) }));

    let (status, body) = send(&app.router, post_json("/api/v1/decisions", &decision_body("req-http-1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["metadata"]["request_id"], "req-http-1");
    assert_eq!(body["data"]["status"], "approved");
    assert_eq!(body["data"]["decision"]["decision"], "approve");
    assert!(body["data"]["auditRecord"]["signature"].is_string());

    let (status, body) = send(&app.router, get("/api/v1/audit?request_id=req-http-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["records"][0]["requestId"], "req-http-1");
    assert_eq!(body["data"]["records"][0]["signatureValid"], true);
}

#[tokio::test]
async fn blocked_decision_is_still_a_success_response() {
    let app = app_with(Some(FixedBackend { result: Ok(draft(97.0)) }));

    let (status, body) = send(&app.router, post_json("/api/v1/decisions", &decision_body("req-http-2"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "blocked");
    assert_eq!(body["data"]["safetyCheck"]["allowed"], false);
}

#[tokio::test]
async fn invalid_request_returns_422_with_audit_record() {
    let app = app_with(Some(FixedBackend { result: Ok(draft(30.0)) }));

    let (status, body) = send(&app.router, post_json("/api/v1/decisions", &json!({"actor": "ceo"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST_CONTRACT");
    assert_eq!(body["error"]["details"]["auditRecord"]["status"], "error");
    let errors = body["error"]["details"]["errors"].as_array().unwrap();
    assert!(errors.iter().any(|e| e == "requestedAction is required"));
    assert_eq!(app.store.len(), 1);
}

#[tokio::test]
async fn unavailable_reasoning_maps_to_503() {
    let app = app_with(Some(FixedBackend {
        result: Err(GovernanceError::unavailable("connection refused")),
    }));

    let (status, body) = send(&app.router, post_json("/api/v1/decisions", &decision_body("req-http-3"))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "REASONING_UNAVAILABLE");
    assert_eq!(body["metadata"]["request_id"], "req-http-3");
    assert_eq!(app.store.len(), 1);
}

#[tokio::test]
async fn malformed_reasoning_maps_to_502() {
    let app = app_with(Some(FixedBackend {
        result: Err(GovernanceError::malformed("expected a JSON object")),
    }));

    let (status, body) = send(&app.router, post_json("/api/v1/decisions", &decision_body("req-http-4"))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "REASONING_MALFORMED");
}

#[tokio::test]
async fn undecodable_body_is_rejected_before_the_pipeline() {
    let app = app_with(None);
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/decisions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn override_token_endpoint_issues_and_validates_fields() {
    let app = app_with(None);

    let (status, body) = send(
        &app.router,
        post_json(
            "/api/v1/override-tokens",
            &json!({"actor": "cfo", "reason": "Board approved", "signature": "J. Doe"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["validForMinutes"], 60);
    assert!(body["data"]["token"].as_str().unwrap().starts_with("OVERRIDE_cfo_"));

    let (status, body) = send(
        &app.router,
        post_json("/api/v1/override-tokens", &json!({"actor": "cfo", "signature": "J. Doe"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"]["errors"], json!(["reason is required"]));
}

#[tokio::test]
async fn status_counts_completed_requests() {
    let app = app_with(Some(FixedBackend { result: Ok(draft(30.0)) }));
    send(&app.router, post_json("/api/v1/decisions", &decision_body("req-http-5"))).await;
    send(&app.router, post_json("/api/v1/decisions", &json!({}))).await;

    let (status, body) = send(&app.router, get("/api/v1/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "OPERATIONAL");
    assert_eq!(body["data"]["requestCount"], 2);
    assert_eq!(body["data"]["totalCostUsd"], 12.5);
}

#[tokio::test]
async fn health_reports_degraded_without_reasoning_credentials() {
    let app = app_with(None);

    let (status, body) = send(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["components"]["reasoning_service"], false);
    assert_eq!(body["components"]["audit_store"], "memory");
    assert_eq!(body["components"]["signing_key_configured"], true);
}

#[tokio::test]
async fn metrics_are_exposed_as_text() {
    let app = app_with(None);
    send(&app.router, post_json("/api/v1/decisions", &decision_body("req-http-6"))).await;

    let response = app.router.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("governance_decisions_total"));
}

#[tokio::test]
async fn audit_query_rejects_unknown_status() {
    let app = app_with(None);

    let (status, body) = send(&app.router, get("/api/v1/audit?status=pending")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

mod verify_audit {
    use super::*;
    use governance_core::{AuditQuery, DecisionRequestInput, GovernanceConfig, StoreConfig, Urgency};
    use governance_server::cli::commands::execute_verify_audit;
    use governance_server::cli::OutputFormat;
    use governance_server::ExitCode;
    use std::path::Path;

    fn config(path: &Path, key: &str) -> GovernanceConfig {
        GovernanceConfig::default()
            .with_signing_key(key)
            .with_store(StoreConfig::Sled { path: path.to_path_buf() })
    }

    async fn write_records(path: &Path) {
        let config = config(path, "ledger-key");
        let store = governance_storage::open_store(&config.audit.store).unwrap();
        let orchestrator = DecisionOrchestrator::from_config(&config, store).unwrap();
        for i in 0..3 {
            let input = DecisionRequestInput::new("coo", "Consolidate regional offices", Urgency::Low)
                .with_request_id(format!("req-verify-{}", i));
            orchestrator.execute(input).await.unwrap();
        }
    }

    #[tokio::test]
    async fn stored_records_verify_with_the_signing_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit");
        write_records(&path).await;

        let code = execute_verify_audit(config(&path, "ledger-key"), AuditQuery::new(), OutputFormat::Json)
            .await
            .unwrap();
        assert_eq!(code, ExitCode::Success);
    }

    #[tokio::test]
    async fn a_different_key_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit");
        write_records(&path).await;

        let code = execute_verify_audit(config(&path, "rotated-key"), AuditQuery::new(), OutputFormat::Text)
            .await
            .unwrap();
        assert_eq!(code, ExitCode::VerificationFailed);
    }
}
