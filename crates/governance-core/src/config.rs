//! Engine configuration
//!
//! Loaded from a TOML file, then overridden from the environment:
//!
//! | Variable | Setting |
//! |---|---|
//! | `GOVERNANCE_ENVIRONMENT` | `development`, `staging` or `production` |
//! | `GOVERNANCE_BIND_ADDR` | HTTP listen address |
//! | `GOVERNANCE_LOG_LEVEL` / `GOVERNANCE_LOG_JSON` | logging |
//! | `REASONING_ENDPOINT` / `REASONING_MODEL` / `REASONING_TIMEOUT_MS` | reasoning service |
//! | `REASONING_API_KEY` | reasoning credential (offline mode when absent) |
//! | `AUDIT_SIGNING_KEY` | audit HMAC key (required in production) |
//! | `GOVERNANCE_AUDIT_STORE` | `memory`, `sled` or `http` |
//! | `GOVERNANCE_AUDIT_SLED_PATH` / `GOVERNANCE_AUDIT_HTTP_URL` | store location |
//! | `GOVERNANCE_HIGH_RISK_THRESHOLD` / `GOVERNANCE_CRITICAL_RISK_THRESHOLD` / `GOVERNANCE_HIGH_COST_USD` | policy |
//!
//! Secrets are held as [`SecretString`] and never printed.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::client::{HttpStoreConfig, ReasoningClientConfig};
use crate::error::{GovernanceError, Result};
use crate::policy::PolicyThresholds;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl DeploymentEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentEnvironment::Development => "development",
            DeploymentEnvironment::Staging => "staging",
            DeploymentEnvironment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, DeploymentEnvironment::Production)
    }
}

impl FromStr for DeploymentEnvironment {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(DeploymentEnvironment::Development),
            "staging" | "stage" => Ok(DeploymentEnvironment::Staging),
            "production" | "prod" => Ok(DeploymentEnvironment::Production),
            other => Err(GovernanceError::configuration(format!("Unknown environment: {}", other))),
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.map(SecretString::new))
}

fn is_blank(secret: Option<&SecretString>) -> bool {
    secret.map_or(true, |s| s.expose_secret().trim().is_empty())
}

/// Reasoning service settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReasoningSettings {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    #[serde(deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,
}

impl Default for ReasoningSettings {
    fn default() -> Self {
        let client = ReasoningClientConfig::default();
        Self {
            endpoint: client.endpoint,
            model: client.model,
            temperature: client.temperature,
            max_tokens: client.max_tokens,
            timeout_ms: 30_000,
            api_key: None,
        }
    }
}

impl ReasoningSettings {
    pub fn client_config(&self) -> ReasoningClientConfig {
        ReasoningClientConfig {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn has_credential(&self) -> bool {
        !is_blank(self.api_key.as_ref())
    }
}

/// Where audit records are persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    Memory,
    Sled { path: PathBuf },
    Http(HttpStoreConfig),
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory
    }
}

/// Audit ledger settings
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    #[serde(deserialize_with = "deserialize_secret")]
    pub signing_key: Option<SecretString>,
    pub store: StoreConfig,
}

impl AuditSettings {
    pub fn has_signing_key(&self) -> bool {
        !is_blank(self.signing_key.as_ref())
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
    /// Request timeout applied by the HTTP layer
    pub request_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            request_timeout_ms: 120_000,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    pub environment: DeploymentEnvironment,
    pub reasoning: ReasoningSettings,
    pub audit: AuditSettings,
    pub policy: PolicyThresholds,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

impl GovernanceConfig {
    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            GovernanceError::configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Load from an optional file, apply process environment, validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("GOVERNANCE_ENVIRONMENT") {
            self.environment = v.parse()?;
        }
        if let Some(v) = var("GOVERNANCE_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Some(v) = var("GOVERNANCE_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = var("GOVERNANCE_LOG_JSON") {
            self.logging.json = parse_var("GOVERNANCE_LOG_JSON", &v)?;
        }
        if let Some(v) = var("REASONING_ENDPOINT") {
            self.reasoning.endpoint = v;
        }
        if let Some(v) = var("REASONING_MODEL") {
            self.reasoning.model = v;
        }
        if let Some(v) = var("REASONING_TIMEOUT_MS") {
            self.reasoning.timeout_ms = parse_var("REASONING_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = var("REASONING_API_KEY") {
            self.reasoning.api_key = Some(SecretString::new(v));
        }
        if let Some(v) = var("AUDIT_SIGNING_KEY") {
            self.audit.signing_key = Some(SecretString::new(v));
        }
        if let Some(v) = var("GOVERNANCE_AUDIT_STORE") {
            self.audit.store = match v.trim().to_lowercase().as_str() {
                "memory" => StoreConfig::Memory,
                "sled" => StoreConfig::Sled {
                    path: var("GOVERNANCE_AUDIT_SLED_PATH")
                        .map(PathBuf::from)
                        .unwrap_or_else(|| PathBuf::from("./data/audit")),
                },
                "http" => StoreConfig::Http(HttpStoreConfig {
                    base_url: var("GOVERNANCE_AUDIT_HTTP_URL").unwrap_or_else(|| HttpStoreConfig::default().base_url),
                    ..Default::default()
                }),
                other => {
                    return Err(GovernanceError::configuration(format!(
                        "GOVERNANCE_AUDIT_STORE must be one of [memory, sled, http], got '{}'",
                        other
                    )))
                }
            };
        } else {
            match &mut self.audit.store {
                StoreConfig::Sled { path } => {
                    if let Some(v) = var("GOVERNANCE_AUDIT_SLED_PATH") {
                        *path = PathBuf::from(v);
                    }
                }
                StoreConfig::Http(http) => {
                    if let Some(v) = var("GOVERNANCE_AUDIT_HTTP_URL") {
                        http.base_url = v;
                    }
                }
                StoreConfig::Memory => {}
            }
        }
        if let Some(v) = var("GOVERNANCE_HIGH_RISK_THRESHOLD") {
            self.policy.high_risk = parse_var("GOVERNANCE_HIGH_RISK_THRESHOLD", &v)?;
        }
        if let Some(v) = var("GOVERNANCE_CRITICAL_RISK_THRESHOLD") {
            self.policy.critical_risk = parse_var("GOVERNANCE_CRITICAL_RISK_THRESHOLD", &v)?;
        }
        if let Some(v) = var("GOVERNANCE_HIGH_COST_USD") {
            self.policy.high_cost_usd = parse_var("GOVERNANCE_HIGH_COST_USD", &v)?;
        }
        Ok(())
    }

    /// Check the configuration is usable; run once at startup
    pub fn validate(&self) -> Result<()> {
        if self.environment.is_production() && !self.audit.has_signing_key() {
            return Err(GovernanceError::configuration(
                "AUDIT_SIGNING_KEY must be set in production",
            ));
        }
        if !(0.0..=2.0).contains(&self.reasoning.temperature) {
            return Err(GovernanceError::configuration(format!(
                "reasoning.temperature must be within [0, 2], got {}",
                self.reasoning.temperature
            )));
        }
        if self.reasoning.timeout_ms == 0 {
            return Err(GovernanceError::configuration("reasoning.timeout_ms must be greater than 0"));
        }
        if self.reasoning.has_credential() && self.reasoning.endpoint.trim().is_empty() {
            return Err(GovernanceError::configuration("reasoning.endpoint must not be empty"));
        }

        let p = &self.policy;
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !in_range(p.high_risk) || !in_range(p.critical_risk) || p.high_risk > p.critical_risk {
            return Err(GovernanceError::configuration(format!(
                "policy thresholds must satisfy 0 <= high_risk <= critical_risk <= 100, got {} / {}",
                p.high_risk, p.critical_risk
            )));
        }
        if !(p.high_cost_usd.is_finite() && p.high_cost_usd >= 0.0) {
            return Err(GovernanceError::configuration("policy.high_cost_usd must be a non-negative number"));
        }

        match &self.audit.store {
            StoreConfig::Memory => {
                if self.environment.is_production() {
                    tracing::warn!("In-memory audit store configured in production; records will not survive a restart");
                }
            }
            StoreConfig::Sled { path } if path.as_os_str().is_empty() => {
                return Err(GovernanceError::configuration("audit.store.path must not be empty"));
            }
            StoreConfig::Http(http) if http.base_url.trim().is_empty() => {
                return Err(GovernanceError::configuration("audit.store.base_url must not be empty"));
            }
            _ => {}
        }
        Ok(())
    }

    pub fn with_environment(mut self, environment: DeploymentEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_signing_key(mut self, key: impl Into<String>) -> Self {
        self.audit.signing_key = Some(SecretString::new(key.into()));
        self
    }

    pub fn with_reasoning_key(mut self, key: impl Into<String>) -> Self {
        self.reasoning.api_key = Some(SecretString::new(key.into()));
        self
    }

    pub fn with_reasoning_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.reasoning.endpoint = endpoint.into();
        self
    }

    pub fn with_policy(mut self, policy: PolicyThresholds) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.audit.store = store;
        self
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| GovernanceError::configuration(format!("{} has invalid value '{}': {}", name, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = GovernanceConfig::default();
        assert_eq!(config.environment, DeploymentEnvironment::Development);
        assert_eq!(config.policy, PolicyThresholds::default());
        assert_eq!(config.audit.store, StoreConfig::Memory);
        assert!(!config.reasoning.has_credential());
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_toml() {
        let config = GovernanceConfig::from_toml_str(
            r#"
            environment = "staging"

            [reasoning]
            endpoint = "http://llm.internal/v1"
            model = "strategist-large"
            timeout_ms = 15000
            api_key = "sk-from-file"

            [audit]
            signing_key = "file-key"

            [audit.store]
            kind = "sled"
            path = "/var/lib/governance/audit"

            [policy]
            high_risk = 70.0
            "#,
        )
        .unwrap();
        assert_eq!(config.environment, DeploymentEnvironment::Staging);
        assert_eq!(config.reasoning.timeout(), Duration::from_secs(15));
        assert!(config.reasoning.has_credential());
        assert_eq!(
            config.audit.store,
            StoreConfig::Sled {
                path: PathBuf::from("/var/lib/governance/audit")
            }
        );
        assert_eq!(config.policy.high_risk, 70.0);
        assert_eq!(config.policy.critical_risk, 95.0);
        config.validate().unwrap();
    }

    #[test]
    fn test_http_store_toml() {
        let config = GovernanceConfig::from_toml_str(
            r#"
            [audit.store]
            kind = "http"
            base_url = "http://audit:9000"
            max_retries = 5
            "#,
        )
        .unwrap();
        match config.audit.store {
            StoreConfig::Http(http) => {
                assert_eq!(http.base_url, "http://audit:9000");
                assert_eq!(http.max_retries, 5);
                assert_eq!(http.timeout_ms, 5000);
            }
            other => panic!("unexpected store {:?}", other),
        }
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GovernanceConfig::default();
        config
            .apply_env_from(env(&[
                ("GOVERNANCE_ENVIRONMENT", "prod"),
                ("REASONING_API_KEY", "sk-env"),
                ("AUDIT_SIGNING_KEY", "env-key"),
                ("GOVERNANCE_AUDIT_STORE", "sled"),
                ("GOVERNANCE_AUDIT_SLED_PATH", "/tmp/audit"),
                ("GOVERNANCE_CRITICAL_RISK_THRESHOLD", "90"),
                ("GOVERNANCE_LOG_JSON", "true"),
            ]))
            .unwrap();
        assert!(config.environment.is_production());
        assert_eq!(config.reasoning.api_key.as_ref().unwrap().expose_secret(), "sk-env");
        assert!(config.audit.has_signing_key());
        assert_eq!(config.audit.store, StoreConfig::Sled { path: PathBuf::from("/tmp/audit") });
        assert_eq!(config.policy.critical_risk, 90.0);
        assert!(config.logging.json);
        config.validate().unwrap();
    }

    #[test]
    fn test_invalid_env_values() {
        let mut config = GovernanceConfig::default();
        let err = config
            .apply_env_from(env(&[("REASONING_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("REASONING_TIMEOUT_MS"));

        let err = GovernanceConfig::default()
            .apply_env_from(env(&[("GOVERNANCE_AUDIT_STORE", "postgres")]))
            .unwrap_err();
        assert!(err.to_string().contains("postgres"));
    }

    #[test]
    fn test_production_requires_signing_key() {
        let config = GovernanceConfig::default().with_environment(DeploymentEnvironment::Production);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, GovernanceError::Configuration(_)));

        let config = config.with_signing_key("   ");
        assert!(config.validate().is_err());

        let config = GovernanceConfig::default()
            .with_environment(DeploymentEnvironment::Production)
            .with_signing_key("prod-key");
        config.validate().unwrap();
    }

    #[test]
    fn test_threshold_validation() {
        let config = GovernanceConfig::default().with_policy(PolicyThresholds {
            high_risk: 96.0,
            critical_risk: 95.0,
            high_cost_usd: 1000.0,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_does_not_leak_secrets() {
        let config = GovernanceConfig::default()
            .with_signing_key("signing-secret-value")
            .with_reasoning_key("sk-secret-value");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("signing-secret-value"));
        assert!(!debug.contains("sk-secret-value"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            b"environment = \"staging\"\n[audit.store]\nkind = \"sled\"\npath = \"/var/lib/governance/audit\"\n",
        )
        .unwrap();
        let config = GovernanceConfig::from_file(file.path()).unwrap();
        assert_eq!(config.environment, DeploymentEnvironment::Staging);
        assert_eq!(
            config.audit.store,
            StoreConfig::Sled {
                path: PathBuf::from("/var/lib/governance/audit")
            }
        );
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = GovernanceConfig::from_file("/nonexistent/governance.toml").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }
}
