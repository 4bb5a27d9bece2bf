//! Durable audit stores
//!
//! - [`SledAuditStore`]: embedded, append-only, survives restarts
//! - [`open_store`]: builds whichever store a [`StoreConfig`] names

pub mod sled_store;

pub use sled_store::SledAuditStore;

use governance_core::audit::{AuditStore, MemoryAuditStore, StoreResult};
use governance_core::client::HttpAuditStore;
use governance_core::config::StoreConfig;
use std::sync::Arc;

/// Open the audit store described by the configuration
pub fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn AuditStore>> {
    let store: Arc<dyn AuditStore> = match config {
        StoreConfig::Memory => Arc::new(MemoryAuditStore::new()),
        StoreConfig::Sled { path } => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    governance_core::audit::StoreError::Backend(format!(
                        "Failed to create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
            Arc::new(SledAuditStore::open(path)?)
        }
        StoreConfig::Http(http) => Arc::new(HttpAuditStore::with_config(http.clone())?),
    };
    tracing::info!(store = store.name(), "Opened audit store");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_memory_store() {
        let store = open_store(&StoreConfig::Memory).unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[test]
    fn test_open_sled_store_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("audit");
        let store = open_store(&StoreConfig::Sled { path: path.clone() }).unwrap();
        assert_eq!(store.name(), "sled");
        assert!(path.exists());
    }
}
