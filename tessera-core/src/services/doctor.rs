//! Doctor service - ledger and session health checks

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::domain::result::Result;
use crate::ports::{Clock, Repository};

/// Doctor service for health checks
pub struct DoctorService {
    repository: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
}

impl DoctorService {
    pub fn new(repository: Arc<dyn Repository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Run all health checks
    pub fn run_checks(&self) -> Result<DoctorResult> {
        let mut checks = BTreeMap::new();

        // Latest ledger snapshot must equal the stored balance
        let mismatches = self.repository.find_unreconciled_accounts()?;
        let mismatch_details: Vec<serde_json::Value> = mismatches
            .iter()
            .map(|m| {
                json!({
                    "account_id": m.account_id,
                    "credits_remaining": m.credits_remaining,
                    "latest_snapshot": m.latest_snapshot,
                })
            })
            .collect();
        checks.insert(
            "ledger_reconciliation".to_string(),
            CheckResult {
                status: if mismatches.is_empty() { "pass" } else { "error" }.to_string(),
                message: if mismatches.is_empty() {
                    "Every balance matches its latest ledger entry".to_string()
                } else {
                    format!("{} account(s) disagree with their ledger", mismatches.len())
                },
                details: if mismatches.is_empty() { None } else { Some(mismatch_details) },
            },
        );

        let orphans = self.repository.find_orphaned_ledger_entries()?;
        let orphan_details: Vec<serde_json::Value> = orphans
            .iter()
            .map(|(entry_id, account_id)| json!({"entry_id": entry_id, "account_id": account_id}))
            .collect();
        checks.insert(
            "orphaned_ledger_entries".to_string(),
            CheckResult {
                status: if orphans.is_empty() { "pass" } else { "error" }.to_string(),
                message: if orphans.is_empty() {
                    "No orphaned ledger entries found".to_string()
                } else {
                    format!("{} ledger entr(ies) reference missing accounts", orphans.len())
                },
                details: if orphans.is_empty() { None } else { Some(orphan_details) },
            },
        );

        // Expired rows are harmless to validation but should be purged
        let expired = self.repository.count_expired_sessions(self.clock.now())?;
        checks.insert(
            "expired_sessions".to_string(),
            CheckResult {
                status: if expired == 0 { "pass" } else { "warning" }.to_string(),
                message: if expired == 0 {
                    "No expired sessions stored".to_string()
                } else {
                    format!("{} expired session(s) can be purged", expired)
                },
                details: None,
            },
        );

        let passed = checks.values().filter(|c| c.status == "pass").count() as i64;
        let warnings = checks.values().filter(|c| c.status == "warning").count() as i64;
        let errors = checks.values().filter(|c| c.status == "error").count() as i64;

        Ok(DoctorResult {
            checks,
            summary: DoctorSummary {
                passed,
                warnings,
                errors,
            },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorResult {
    pub checks: BTreeMap<String, CheckResult>,
    pub summary: DoctorSummary,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
pub struct DoctorSummary {
    pub passed: i64,
    pub warnings: i64,
    pub errors: i64,
}
