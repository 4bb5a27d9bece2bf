//! Prometheus metrics for the governance engine
//!
//! - `governance_decisions_total` (counter) - terminal decisions by status
//! - `governance_decision_duration_seconds` (histogram) - end-to-end latency by status
//! - `governance_safety_checks_total` (counter) - fired safety checks by name
//! - `governance_reasoning_failures_total` (counter) - gateway/validator failures by kind
//! - `governance_audit_persist_failures_total` (counter) - audit writes that failed
//! - `governance_reasoning_cost_usd_total` (counter) - estimated spend
//! - `governance_decisions_in_flight` (gauge)
//! - `governance_override_tokens_issued_total` (counter)

use prometheus::{Counter, CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Arc;
use std::time::Instant;

use super::{Result, TelemetryError};
use crate::audit::AuditStatus;
use crate::error::ErrorKind;
use crate::policy::SafetyCheck;

const NAMESPACE: &str = "governance";

/// Decision metrics for Prometheus
pub struct GovernanceMetrics {
    decisions_total: CounterVec,
    duration_seconds: HistogramVec,
    safety_checks_total: CounterVec,
    reasoning_failures_total: CounterVec,
    audit_persist_failures_total: Counter,
    reasoning_cost_usd_total: Counter,
    in_flight: Gauge,
    override_tokens_issued_total: Counter,
}

impl GovernanceMetrics {
    /// Create the metrics and register them with the provided registry
    pub fn new(registry: &Registry) -> Result<Self> {
        let decisions_total = CounterVec::new(
            Opts::new("decisions_total", "Terminal strategic decisions by audit status").namespace(NAMESPACE),
            &["status"],
        )?;

        let duration_seconds = HistogramVec::new(
            HistogramOpts::new("decision_duration_seconds", "End-to-end decision processing time in seconds")
                .namespace(NAMESPACE)
                .buckets(vec![0.005, 0.025, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["status"],
        )?;

        let safety_checks_total = CounterVec::new(
            Opts::new("safety_checks_total", "Safety checks that fired").namespace(NAMESPACE),
            &["check"],
        )?;

        let reasoning_failures_total = CounterVec::new(
            Opts::new("reasoning_failures_total", "Decisions that ended in an error, by error kind")
                .namespace(NAMESPACE),
            &["kind"],
        )?;

        let audit_persist_failures_total = Counter::with_opts(
            Opts::new("audit_persist_failures_total", "Audit records that could not be persisted")
                .namespace(NAMESPACE),
        )?;

        let reasoning_cost_usd_total = Counter::with_opts(
            Opts::new("reasoning_cost_usd_total", "Cumulative estimated cost of reasoned decisions in USD")
                .namespace(NAMESPACE),
        )?;

        let in_flight = Gauge::with_opts(
            Opts::new("decisions_in_flight", "Decisions currently being processed").namespace(NAMESPACE),
        )?;

        let override_tokens_issued_total = Counter::with_opts(
            Opts::new("override_tokens_issued_total", "Human override tokens issued").namespace(NAMESPACE),
        )?;

        registry.register(Box::new(decisions_total.clone()))?;
        registry.register(Box::new(duration_seconds.clone()))?;
        registry.register(Box::new(safety_checks_total.clone()))?;
        registry.register(Box::new(reasoning_failures_total.clone()))?;
        registry.register(Box::new(audit_persist_failures_total.clone()))?;
        registry.register(Box::new(reasoning_cost_usd_total.clone()))?;
        registry.register(Box::new(in_flight.clone()))?;
        registry.register(Box::new(override_tokens_issued_total.clone()))?;

        Ok(Self {
            decisions_total,
            duration_seconds,
            safety_checks_total,
            reasoning_failures_total,
            audit_persist_failures_total,
            reasoning_cost_usd_total,
            in_flight,
            override_tokens_issued_total,
        })
    }

    /// Record a terminal decision and its duration
    pub fn record_decision(&self, status: AuditStatus, duration_secs: f64) {
        self.decisions_total.with_label_values(&[status.as_str()]).inc();
        self.duration_seconds
            .with_label_values(&[status.as_str()])
            .observe(duration_secs);
    }

    pub fn record_safety_checks(&self, checks: &[SafetyCheck]) {
        for check in checks {
            self.safety_checks_total.with_label_values(&[check.as_str()]).inc();
        }
    }

    pub fn record_failure(&self, kind: ErrorKind) {
        self.reasoning_failures_total.with_label_values(&[kind.as_str()]).inc();
    }

    pub fn record_persist_failure(&self) {
        self.audit_persist_failures_total.inc();
    }

    /// Add estimated spend; negative values are ignored
    pub fn record_cost(&self, cost_usd: f64) {
        if cost_usd > 0.0 && cost_usd.is_finite() {
            self.reasoning_cost_usd_total.inc_by(cost_usd);
        }
    }

    pub fn record_token_issued(&self) {
        self.override_tokens_issued_total.inc();
    }

    /// Start tracking an in-flight decision (the guard decrements on drop)
    pub fn start_timer(&self) -> DecisionTimer<'_> {
        self.in_flight.inc();
        DecisionTimer {
            start: Instant::now(),
            metrics: self,
        }
    }

    pub fn in_flight(&self) -> f64 {
        self.in_flight.get()
    }
}

/// RAII guard for an in-flight decision
pub struct DecisionTimer<'a> {
    start: Instant,
    metrics: &'a GovernanceMetrics,
}

impl DecisionTimer<'_> {
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Drop for DecisionTimer<'_> {
    fn drop(&mut self) {
        self.metrics.in_flight.dec();
    }
}

/// Registry owning the governance metrics
pub struct MetricsRegistry {
    registry: Arc<Registry>,
    governance: GovernanceMetrics,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        Self::with_registry(Arc::new(Registry::new()))
    }

    /// Register the governance metrics with an existing Prometheus registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let governance = GovernanceMetrics::new(&registry)?;
        Ok(Self { registry, governance })
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn governance(&self) -> &GovernanceMetrics {
        &self.governance
    }

    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    /// Encode metrics as text for scraping
    pub fn encode_text(&self) -> Result<String> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.gather(), &mut buffer)
            .map_err(|e| TelemetryError::MetricsError(prometheus::Error::Msg(e.to_string())))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsError(prometheus::Error::Msg(e.to_string())))
    }
}
