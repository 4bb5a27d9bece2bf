//! Remote audit store over HTTP
//!
//! Appends sealed audit records to an external audit service with
//! `POST {base_url}/api/v1/audit-records` and queries them with
//! `GET {base_url}/api/v1/audit-records`. Transient failures are retried
//! with exponential backoff; client errors are not.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::audit::{AuditQuery, AuditRecord, AuditStore, StoreError, StoreResult};

/// Configuration for the HTTP audit store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpStoreConfig {
    /// Base URL of the audit service
    pub base_url: String,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,

    /// Maximum retry attempts after the first try
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    pub max_backoff_ms: u64,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8090".to_string(),
            timeout_ms: 5000,
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 5000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Acknowledgement returned by the audit service
#[derive(Debug, Deserialize, Serialize)]
pub struct AppendResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// HTTP client implementing [`AuditStore`]
#[derive(Debug)]
pub struct HttpAuditStore {
    client: Client,
    config: HttpStoreConfig,
}

impl HttpAuditStore {
    pub fn new(base_url: impl Into<String>) -> StoreResult<Self> {
        Self::with_config(HttpStoreConfig {
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    pub fn with_config(config: HttpStoreConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    fn records_url(&self) -> String {
        format!("{}/api/v1/audit-records", self.config.base_url.trim_end_matches('/'))
    }

    async fn send_record(&self, url: &str, record: &AuditRecord) -> StoreResult<()> {
        let response = self
            .client
            .post(url)
            .json(record)
            .header("X-Audit-Record-Id", record.id.to_string())
            .header("X-Request-Id", &record.request_id)
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            // Some services answer 204 with no body
            let body = response.text().await.unwrap_or_default();
            if body.trim().is_empty() {
                return Ok(());
            }
            let ack: AppendResponse = serde_json::from_str(&body)?;
            if ack.success {
                Ok(())
            } else {
                Err(StoreError::Backend(ack.error.unwrap_or_else(|| "append rejected".to_string())))
            }
        } else if status == StatusCode::CONFLICT {
            Err(StoreError::Duplicate(record.id))
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(StoreError::Http {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl AuditStore for HttpAuditStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn append(&self, record: &AuditRecord) -> StoreResult<()> {
        let url = self.records_url();
        let mut last_error = None;
        let mut backoff_ms = self.config.initial_backoff_ms;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::debug!(
                    attempt = attempt,
                    backoff_ms = backoff_ms,
                    audit_id = %record.id,
                    "Retrying audit record append"
                );
                sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms as f64 * self.config.backoff_multiplier) as u64;
                backoff_ms = backoff_ms.min(self.config.max_backoff_ms);
            }

            match self.send_record(&url, record).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt,
                        error = %e,
                        audit_id = %record.id,
                        "Failed to append audit record"
                    );
                    let permanent = e.is_permanent();
                    last_error = Some(e);
                    if permanent {
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| StoreError::Backend("Unknown error during audit append".to_string())))
    }

    async fn query(&self, query: &AuditQuery) -> StoreResult<Vec<AuditRecord>> {
        let response = self
            .client
            .get(self.records_url())
            .query(query)
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let records: Vec<AuditRecord> = response
            .json()
            .await
            .map_err(|e| StoreError::Serialization(format!("Failed to parse response: {}", e)))?;
        Ok(query.finish(records))
    }
}

/// Builder for [`HttpAuditStore`]
#[derive(Debug, Default)]
pub struct HttpAuditStoreBuilder {
    config: HttpStoreConfig,
}

impl HttpAuditStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn timeout_ms(mut self, timeout: u64) -> Self {
        self.config.timeout_ms = timeout;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn initial_backoff_ms(mut self, backoff: u64) -> Self {
        self.config.initial_backoff_ms = backoff;
        self
    }

    pub fn max_backoff_ms(mut self, backoff: u64) -> Self {
        self.config.max_backoff_ms = backoff;
        self
    }

    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.config.backoff_multiplier = multiplier;
        self
    }

    pub fn build(self) -> StoreResult<HttpAuditStore> {
        HttpAuditStore::with_config(self.config)
    }
}
