//! HTTP clients for external services

pub mod http_store;
pub mod reasoning;

pub use http_store::{HttpAuditStore, HttpAuditStoreBuilder, HttpStoreConfig};
pub use reasoning::{ReasoningClient, ReasoningClientConfig};
