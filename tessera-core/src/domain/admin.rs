//! Administrative adjustments and their audit records

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ledger::TransactionType;
use super::result::Error;

/// Kind of manual balance adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminCreditAction {
    Add,
    Remove,
    Reset,
}

impl AdminCreditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminCreditAction::Add => "add",
            AdminCreditAction::Remove => "remove",
            AdminCreditAction::Reset => "reset",
        }
    }

    /// Ledger type recorded for this adjustment
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            AdminCreditAction::Add => TransactionType::Bonus,
            AdminCreditAction::Remove => TransactionType::Expired,
            AdminCreditAction::Reset => TransactionType::Reset,
        }
    }

    /// Default description when the admin gives none
    pub fn default_description(&self, amount: u32) -> String {
        match self {
            AdminCreditAction::Add => format!("Admin added {} credits", amount),
            AdminCreditAction::Remove => format!("Admin removed {} credits", amount),
            AdminCreditAction::Reset => "Admin reset credits".to_string(),
        }
    }
}

impl fmt::Display for AdminCreditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminCreditAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(AdminCreditAction::Add),
            "remove" => Ok(AdminCreditAction::Remove),
            "reset" => Ok(AdminCreditAction::Reset),
            other => Err(Error::validation(format!("Invalid action: {}", other))),
        }
    }
}

/// Boundary request for a manual adjustment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminCreditRequest {
    pub user_id: Uuid,
    pub action: AdminCreditAction,
    pub amount: u32,
    #[serde(default)]
    pub description: Option<String>,
}

/// Write-only audit row attributing a balance change to an administrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminAction {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub target_account_id: Uuid,
    /// e.g. "credit_add"
    pub action_type: String,
    pub amount: u32,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a manual adjustment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminAdjustment {
    pub user_id: Uuid,
    pub action: AdminCreditAction,
    pub amount: u32,
    pub old_credits: u32,
    pub new_credits: u32,
    /// False when the audit row could not be written
    pub audited: bool,
}

/// Result of the monthly bulk reset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResetReport {
    pub users_reset: u64,
    pub failures: u64,
    /// Listed as metered but subscribed or admin by the time of the reset
    #[serde(default)]
    pub skipped: u64,
    pub reset_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_maps_to_ledger_type() {
        assert_eq!(AdminCreditAction::Add.transaction_type(), TransactionType::Bonus);
        assert_eq!(AdminCreditAction::Remove.transaction_type(), TransactionType::Expired);
        assert_eq!(AdminCreditAction::Reset.transaction_type(), TransactionType::Reset);
    }

    #[test]
    fn test_parse_action() {
        assert_eq!("remove".parse::<AdminCreditAction>().unwrap(), AdminCreditAction::Remove);
        let err = "double".parse::<AdminCreditAction>().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_default_description() {
        assert_eq!(AdminCreditAction::Add.default_description(3), "Admin added 3 credits");
    }
}
