//! Audit ledger
//!
//! Opens one record per request, seals it with an HMAC signature once it
//! is concluded, and appends it to the configured [`AuditStore`].
//! Persistence failures are logged and counted, never raised: the caller
//! still receives the sealed record.

pub mod record;
pub mod store;

pub use record::{AuditRecord, AuditStatus, Conclusion, OpenAuditRecord, UNKNOWN_ACTOR};
pub use store::{AuditQuery, AuditStore, MemoryAuditStore, StoreError, StoreResult};

use std::sync::Arc;

use crate::clock::Clock;
use crate::contracts::DecisionRequestInput;
use crate::crypto::AuditSigner;
use crate::error::{GovernanceError, Result};

/// Signs and persists audit records
#[derive(Clone)]
pub struct AuditLedger {
    signer: Arc<AuditSigner>,
    store: Arc<dyn AuditStore>,
    clock: Arc<dyn Clock>,
}

impl AuditLedger {
    pub fn new(signer: AuditSigner, store: Arc<dyn AuditStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            signer: Arc::new(signer),
            store,
            clock,
        }
    }

    pub fn store(&self) -> &Arc<dyn AuditStore> {
        &self.store
    }

    pub fn uses_default_key(&self) -> bool {
        self.signer.uses_default_key()
    }

    /// Open a `processing` record for a request exactly as submitted
    pub fn open(&self, payload: DecisionRequestInput) -> OpenAuditRecord {
        let open = OpenAuditRecord::new(payload, self.clock.now(), self.signer.uses_default_key());
        tracing::debug!(audit_id = %open.id(), request_id = %open.request_id(), "Opened audit record");
        open
    }

    /// Sign a concluded record
    ///
    /// If the record cannot be serialized it is returned unsigned and the
    /// failure is logged; verification of such a record fails.
    pub fn seal(&self, mut record: AuditRecord) -> AuditRecord {
        match record.canonical_bytes() {
            Ok(bytes) => record.signature = Some(self.signer.sign(&bytes)),
            Err(e) => {
                tracing::error!(audit_id = %record.id, error = %e, "Failed to canonicalize audit record; leaving unsigned");
                record.signature = None;
            }
        }
        record
    }

    /// Recompute the signature and compare it in constant time
    pub fn verify(&self, record: &AuditRecord) -> bool {
        let Some(signature) = record.signature.as_deref() else {
            return false;
        };
        match record.canonical_bytes() {
            Ok(bytes) => self.signer.verify(&bytes, signature),
            Err(_) => false,
        }
    }

    /// Append to the store; returns whether the write succeeded
    pub async fn persist(&self, record: &AuditRecord) -> bool {
        match self.store.append(record).await {
            Ok(()) => {
                tracing::debug!(
                    audit_id = %record.id,
                    request_id = %record.request_id,
                    status = %record.status,
                    store = self.store.name(),
                    "Persisted audit record"
                );
                true
            }
            Err(e) => {
                let error = GovernanceError::PersistenceFailure(e.to_string());
                tracing::error!(
                    audit_id = %record.id,
                    request_id = %record.request_id,
                    store = self.store.name(),
                    kind = %error.kind(),
                    error = %error,
                    "Audit record was not persisted"
                );
                false
            }
        }
    }

    pub async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>> {
        self.store
            .query(query)
            .await
            .map_err(|e| GovernanceError::PersistenceFailure(e.to_string()))
    }
}

impl std::fmt::Debug for AuditLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLedger")
            .field("signer", &self.signer)
            .field("store", &self.store.name())
            .finish()
    }
}
