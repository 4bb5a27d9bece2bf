//! Sled store behaviour against sealed records

use chrono::{Duration, Utc};
use governance_core::audit::{AuditLedger, AuditQuery, AuditStore, Conclusion, MemoryAuditStore, StoreError};
use governance_core::{AuditRecord, AuditSigner, AuditStatus, DecisionRequestInput, GovernanceError, SystemClock, Urgency};
use governance_storage::SledAuditStore;
use secrecy::SecretString;
use std::sync::Arc;

fn ledger() -> AuditLedger {
    AuditLedger::new(
        AuditSigner::new(SecretString::new("storage-test-key".to_string())),
        Arc::new(MemoryAuditStore::new()),
        Arc::new(SystemClock),
    )
}

fn sealed(ledger: &AuditLedger, actor: &str, request_id: &str) -> AuditRecord {
    let input = DecisionRequestInput::new(actor, "Spin out the research lab", Urgency::Medium).with_request_id(request_id);
    let open = ledger.open(input);
    ledger.seal(open.conclude(Conclusion::Failed {
        error: GovernanceError::unavailable("timeout"),
    }))
}

#[tokio::test]
async fn refuses_to_overwrite_existing_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = SledAuditStore::open(dir.path().join("audit")).unwrap();
    let ledger = ledger();

    let record = sealed(&ledger, "ceo", "req-1");
    store.append(&record).await.unwrap();

    let mut altered = record.clone();
    altered.actor = "mallory".to_string();
    let err = store.append(&altered).await.unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(id) if id == record.id));

    let stored = store.get(record.id).unwrap().unwrap();
    assert_eq!(stored.actor, "ceo");
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn records_survive_reopen_and_still_verify() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit");
    let ledger = ledger();
    let record = sealed(&ledger, "cfo", "req-2");

    {
        let store = SledAuditStore::open(&path).unwrap();
        store.append(&record).await.unwrap();
    }

    let reopened = SledAuditStore::open(&path).unwrap();
    let found = reopened.query(&AuditQuery::new()).await.unwrap();
    assert_eq!(found, vec![record]);
    assert!(ledger.verify(&found[0]));
}

#[tokio::test]
async fn query_filters_and_limits() {
    let store = SledAuditStore::temporary().unwrap();
    let ledger = ledger();

    let a = sealed(&ledger, "ceo", "req-a");
    let b = sealed(&ledger, "cfo", "req-b");
    let c = sealed(&ledger, "ceo", "req-a");
    for record in [&a, &b, &c] {
        store.append(record).await.unwrap();
    }

    let by_request = store.query(&AuditQuery::new().with_request_id("req-a")).await.unwrap();
    assert_eq!(by_request.len(), 2);
    assert!(by_request.iter().all(|r| r.request_id == "req-a"));

    let by_actor = store.query(&AuditQuery::new().with_actor("cfo")).await.unwrap();
    assert_eq!(by_actor, vec![b.clone()]);

    let errors = store
        .query(&AuditQuery::new().with_status(AuditStatus::Error).with_limit(2))
        .await
        .unwrap();
    assert_eq!(errors.len(), 2);

    let none = store
        .query(&AuditQuery::new().between(Utc::now() + Duration::hours(1), Utc::now() + Duration::hours(2)))
        .await
        .unwrap();
    assert!(none.is_empty());

    let request_prefix_only = store.query(&AuditQuery::new().with_request_id("req")).await.unwrap();
    assert!(request_prefix_only.is_empty());
}

#[tokio::test]
async fn records_with_awkward_floats_still_verify_after_storage() {
    let store = SledAuditStore::temporary().unwrap();
    let ledger = ledger();

    let input = DecisionRequestInput::new("cfo", "Hedge the currency exposure", Urgency::High)
        .with_request_id("req-float")
        .with_business_context("exposureRatio", serde_json::json!(1.0715660391465826e-75))
        .with_technical_context("latencyBudget", serde_json::json!(0.1 + 0.2))
        .with_safety_context("tolerance", serde_json::json!(5e-324));
    let record = ledger.seal(ledger.open(input).conclude(Conclusion::Failed {
        error: GovernanceError::unavailable("timeout"),
    }));
    assert!(ledger.verify(&record));

    store.append(&record).await.unwrap();
    let stored = store.get(record.id).unwrap().unwrap();
    assert_eq!(stored, record);
    assert!(ledger.verify(&stored));

    let queried = store.query(&AuditQuery::new().with_request_id("req-float")).await.unwrap();
    assert!(ledger.verify(&queried[0]));
}

#[tokio::test]
async fn request_ids_sharing_a_nul_prefix_stay_separate() {
    let store = SledAuditStore::temporary().unwrap();
    let ledger = ledger();

    let short = sealed(&ledger, "ceo", "a");
    let extended = sealed(&ledger, "ceo", "a\u{0}b");
    store.append(&short).await.unwrap();
    store.append(&extended).await.unwrap();

    let found = store.query(&AuditQuery::new().with_request_id("a")).await.unwrap();
    assert_eq!(found, vec![short]);

    let found = store.query(&AuditQuery::new().with_request_id("a\u{0}b")).await.unwrap();
    assert_eq!(found, vec![extended]);
}
