//! Embedded audit store backed by sled
//!
//! Records are stored as JSON under their 16-byte id. Inserts use
//! compare-and-swap against an empty slot, so an existing record can never
//! be replaced. A second tree indexes record ids by request id; index keys
//! are the big-endian request id length, the request id, then the record id,
//! so no request id can be a key prefix of another.

use async_trait::async_trait;
use governance_core::audit::{AuditQuery, AuditRecord, AuditStore, StoreError, StoreResult};
use std::path::Path;
use uuid::Uuid;

const RECORDS_TREE: &str = "audit_records";
const REQUEST_INDEX_TREE: &str = "audit_by_request";

fn backend(err: sled::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Append-only sled store
#[derive(Debug, Clone)]
pub struct SledAuditStore {
    db: sled::Db,
    records: sled::Tree,
    by_request: sled::Tree,
}

impl SledAuditStore {
    /// Open (or create) a store at `path`
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = sled::open(path.as_ref()).map_err(backend)?;
        Self::from_db(db)
    }

    /// Store that lives only as long as the process
    pub fn temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open().map_err(backend)?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> StoreResult<Self> {
        let records = db.open_tree(RECORDS_TREE).map_err(backend)?;
        let by_request = db.open_tree(REQUEST_INDEX_TREE).map_err(backend)?;
        Ok(Self { db, records, by_request })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fetch one record by id
    pub fn get(&self, id: Uuid) -> StoreResult<Option<AuditRecord>> {
        match self.records.get(id.as_bytes()).map_err(backend)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn request_prefix(request_id: &str) -> Vec<u8> {
        let len = request_id.len() as u32;
        let mut prefix = Vec::with_capacity(4 + request_id.len() + 16);
        prefix.extend_from_slice(&len.to_be_bytes());
        prefix.extend_from_slice(request_id.as_bytes());
        prefix
    }

    fn index_key(request_id: &str, id: Uuid) -> Vec<u8> {
        let mut key = Self::request_prefix(request_id);
        key.extend_from_slice(id.as_bytes());
        key
    }

    fn ids_for_request(&self, request_id: &str) -> StoreResult<Vec<Uuid>> {
        let prefix = Self::request_prefix(request_id);
        let mut ids = Vec::new();
        for entry in self.by_request.scan_prefix(&prefix) {
            let (key, _) = entry.map_err(backend)?;
            let raw = &key[prefix.len()..];
            let id = Uuid::from_slice(raw).map_err(|e| StoreError::Backend(format!("corrupt index entry: {}", e)))?;
            ids.push(id);
        }
        Ok(ids)
    }

    fn scan(&self, query: &AuditQuery) -> StoreResult<Vec<AuditRecord>> {
        let mut matched = Vec::new();
        if let Some(request_id) = query.request_id.as_deref() {
            for id in self.ids_for_request(request_id)? {
                if let Some(record) = self.get(id)? {
                    if query.matches(&record) {
                        matched.push(record);
                    }
                }
            }
        } else {
            for entry in self.records.iter() {
                let (_, bytes) = entry.map_err(backend)?;
                let record: AuditRecord = serde_json::from_slice(&bytes)?;
                if query.matches(&record) {
                    matched.push(record);
                }
            }
        }
        Ok(query.finish(matched))
    }
}

#[async_trait]
impl AuditStore for SledAuditStore {
    fn name(&self) -> &str {
        "sled"
    }

    async fn append(&self, record: &AuditRecord) -> StoreResult<()> {
        let bytes = serde_json::to_vec(record)?;
        let swapped = self
            .records
            .compare_and_swap(record.id.as_bytes(), None as Option<&[u8]>, Some(bytes))
            .map_err(backend)?;
        if swapped.is_err() {
            return Err(StoreError::Duplicate(record.id));
        }

        self.by_request
            .insert(Self::index_key(&record.request_id, record.id), Vec::<u8>::new())
            .map_err(backend)?;
        self.db.flush_async().await.map_err(backend)?;

        tracing::trace!(audit_id = %record.id, "Appended audit record to sled");
        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> StoreResult<Vec<AuditRecord>> {
        self.scan(query)
    }
}
