//! Operational telemetry
//!
//! - `TelemetryAggregator` - running counters behind `getStatus`
//! - `metrics` - Prometheus metrics for scraping
//!
//! The aggregator is an injected object rather than process-global state,
//! so every orchestrator (and every test) owns its own counters.

pub mod metrics;

pub use metrics::{DecisionTimer, GovernanceMetrics, MetricsRegistry};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Instant;
use thiserror::Error;

/// Telemetry errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Metrics error: {0}")]
    MetricsError(#[from] prometheus::Error),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Whether the engine can reach a real reasoning service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    Operational,
    Offline,
}

/// Point-in-time view of the aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub status: ServiceStatus,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub request_count: u64,
    pub total_cost_usd: f64,
    pub avg_cost_per_request: f64,
}

#[derive(Debug, Default)]
struct Counters {
    request_count: u64,
    total_cost_usd: f64,
}

/// Lock-protected running counters
#[derive(Debug)]
pub struct TelemetryAggregator {
    counters: Mutex<Counters>,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl TelemetryAggregator {
    /// Start a fresh set of counters
    pub fn init(started_at: DateTime<Utc>) -> Self {
        Self {
            counters: Mutex::new(Counters::default()),
            started: Instant::now(),
            started_at,
        }
    }

    /// Count one completed orchestration; `cost_usd` is only given for validated reasoning
    pub fn record_completion(&self, cost_usd: Option<f64>) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters.request_count += 1;
        if let Some(cost) = cost_usd.filter(|c| c.is_finite() && *c > 0.0) {
            counters.total_cost_usd += cost;
        }
    }

    pub fn snapshot(&self, reasoning_configured: bool) -> TelemetrySnapshot {
        let (request_count, total_cost_usd) = {
            let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
            (counters.request_count, counters.total_cost_usd)
        };
        let avg_cost_per_request = if request_count > 0 {
            total_cost_usd / request_count as f64
        } else {
            0.0
        };
        TelemetrySnapshot {
            status: if reasoning_configured {
                ServiceStatus::Operational
            } else {
                ServiceStatus::Offline
            },
            started_at: self.started_at,
            uptime_seconds: self.started.elapsed().as_secs(),
            request_count,
            total_cost_usd,
            avg_cost_per_request,
        }
    }
}
