//! Durable store abstraction for audit records
//!
//! Stores are append-only. An implementation must refuse to overwrite a
//! record whose id it already holds; there is no update or delete.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

use super::record::{AuditRecord, AuditStatus};

/// Errors that can occur when talking to an audit store
#[derive(Error, Debug)]
pub enum StoreError {
    /// A record with this id is already stored
    #[error("Audit record already exists: {0}")]
    Duplicate(Uuid),

    /// The backing store rejected or failed the operation
    #[error("Store backend error: {0}")]
    Backend(String),

    /// Network or HTTP error (for remote stores)
    #[error("Connection error: {0}")]
    Connection(String),

    /// The remote store answered with a failure status
    #[error("Store returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether retrying the same write cannot help
    pub fn is_permanent(&self) -> bool {
        match self {
            StoreError::Duplicate(_) | StoreError::Serialization(_) => true,
            StoreError::Http { status, .. } => (400..500).contains(status) && *status != 429,
            StoreError::Backend(_) | StoreError::Connection(_) => false,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Filter for audit queries. All present criteria must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AuditStatus>,
    /// Inclusive lower bound on the record timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the record timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_status(mut self, status: AuditStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &AuditRecord) -> bool {
        self.request_id.as_deref().map_or(true, |id| record.request_id == id)
            && self.actor.as_deref().map_or(true, |actor| record.actor == actor)
            && self.status.map_or(true, |status| record.status == status)
            && self.from.map_or(true, |from| record.timestamp >= from)
            && self.to.map_or(true, |to| record.timestamp < to)
    }

    /// Sort matches oldest first and apply the limit
    pub fn finish(&self, mut records: Vec<AuditRecord>) -> Vec<AuditRecord> {
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        if let Some(limit) = self.limit {
            records.truncate(limit);
        }
        records
    }
}

/// Append-only durable store for audit records
#[async_trait]
pub trait AuditStore: Send + Sync + fmt::Debug {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Append a sealed record; fails with [`StoreError::Duplicate`] if the id exists
    async fn append(&self, record: &AuditRecord) -> StoreResult<()>;

    /// Records matching the query, oldest first
    async fn query(&self, query: &AuditQuery) -> StoreResult<Vec<AuditRecord>>;
}

/// Process-local store, used in development and tests
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    records: RwLock<Vec<AuditRecord>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every stored record in insertion order
    pub fn snapshot(&self) -> Vec<AuditRecord> {
        self.records.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append(&self, record: &AuditRecord) -> StoreResult<()> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> StoreResult<Vec<AuditRecord>> {
        let matched: Vec<AuditRecord> = self
            .records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        Ok(query.finish(matched))
    }
}
