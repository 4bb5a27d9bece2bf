//! Output formatting for CLI results

use clap::ValueEnum;
use governance_core::{AuditRecord, AuditStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// Human-readable lines
    #[default]
    Text,
    Json,
}

/// Outcome of re-verifying stored audit records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub checked: usize,
    pub valid: usize,
    /// Records written without a configured signing key
    pub default_key: usize,
    pub failures: Vec<VerificationFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationFailure {
    pub id: Uuid,
    pub request_id: String,
    pub status: AuditStatus,
    pub unsigned: bool,
}

impl VerificationReport {
    pub fn from_records<F>(records: &[AuditRecord], verify: F) -> Self
    where
        F: Fn(&AuditRecord) -> bool,
    {
        let mut report = Self::default();
        for record in records {
            report.checked += 1;
            if record.signed_with_default_key {
                report.default_key += 1;
            }
            if verify(record) {
                report.valid += 1;
            } else {
                report.failures.push(VerificationFailure {
                    id: record.id,
                    request_id: record.request_id.clone(),
                    status: record.status,
                    unsigned: !record.is_signed(),
                });
            }
        }
        report
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn render(&self, format: OutputFormat) -> serde_json::Result<()> {
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(self)?),
            OutputFormat::Text => {
                for failure in &self.failures {
                    let reason = if failure.unsigned { "unsigned" } else { "bad signature" };
                    println!("FAIL {} request={} status={} ({})", failure.id, failure.request_id, failure.status, reason);
                }
                println!(
                    "{} checked, {} valid, {} failed, {} signed with the development key",
                    self.checked,
                    self.valid,
                    self.failures.len(),
                    self.default_key
                );
            }
        }
        Ok(())
    }
}
