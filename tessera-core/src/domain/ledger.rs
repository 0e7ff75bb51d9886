//! Ledger domain model
//!
//! A ledger entry records one balance-changing event together with the
//! balance left after it. Entries are immutable; per account they are
//! totally ordered by `sequence`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::Error;

/// Kind of balance-changing event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Usage debit for a billable action
    Download,
    /// Paid top-up
    Purchase,
    /// Credits granted (signup allowance, admin add)
    Bonus,
    /// Credits taken away by an admin
    Expired,
    /// Balance set back to the baseline allowance
    Reset,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Download => "download",
            TransactionType::Purchase => "purchase",
            TransactionType::Bonus => "bonus",
            TransactionType::Expired => "expired",
            TransactionType::Reset => "reset",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "download" => Ok(TransactionType::Download),
            "purchase" => Ok(TransactionType::Purchase),
            "bonus" => Ok(TransactionType::Bonus),
            "expired" => Ok(TransactionType::Expired),
            "reset" => Ok(TransactionType::Reset),
            other => Err(Error::validation(format!("Unknown transaction type: {}", other))),
        }
    }
}

/// How a posting moves the balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceChange {
    /// Subtract exactly this amount; refused when the balance is too low
    Debit(u32),
    /// Add this amount
    Credit(u32),
    /// Subtract up to this amount, stopping at zero
    RemoveFloored(u32),
    /// Replace the balance with this value
    SetTo(u32),
}

impl BalanceChange {
    /// Balance after applying this change to `current`.
    ///
    /// Returns `None` only for a debit larger than the balance. Credits
    /// saturate at `u32::MAX`.
    pub fn apply(&self, current: u32) -> Option<u32> {
        match *self {
            BalanceChange::Debit(amount) => current.checked_sub(amount),
            BalanceChange::Credit(amount) => Some(current.saturating_add(amount)),
            BalanceChange::RemoveFloored(amount) => Some(current.saturating_sub(amount)),
            BalanceChange::SetTo(value) => Some(value),
        }
    }

    /// Build a change from a signed delta. Negative deltas are strict debits
    /// for usage and floored removals for everything else.
    pub fn from_delta(kind: TransactionType, delta: i64) -> Self {
        let magnitude = u32::try_from(delta.unsigned_abs()).unwrap_or(u32::MAX);
        if delta >= 0 {
            BalanceChange::Credit(magnitude)
        } else if kind == TransactionType::Download {
            BalanceChange::Debit(magnitude)
        } else {
            BalanceChange::RemoveFloored(magnitude)
        }
    }
}

/// Unsigned projection of a balance movement: `(credits_used, credits_added)`
pub fn project_delta(previous: u32, new: u32) -> (u32, u32) {
    if new >= previous {
        (0, new - previous)
    } else {
        (previous - new, 0)
    }
}

/// A single immutable ledger record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub account_id: Uuid,
    /// Position in the account's ledger, starting at 1
    pub sequence: i64,
    pub transaction_type: TransactionType,
    /// Free-form label, e.g. the billable action or "monthly_reset"
    pub action_type: String,
    pub credits_used: u32,
    pub credits_added: u32,
    /// Balance after this entry
    pub credits_remaining: u32,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A request to change one account's balance and append the matching entry
#[derive(Debug, Clone)]
pub struct LedgerPosting {
    pub account_id: Uuid,
    pub transaction_type: TransactionType,
    pub action_type: String,
    pub change: BalanceChange,
    pub description: String,
    /// Also stamp `credits_reset_date` on the account
    pub stamp_reset_date: bool,
    /// Skip the posting unless the account is, at write time, a
    /// non-subscribed free account
    pub only_if_metered: bool,
    pub at: DateTime<Utc>,
}

impl LedgerPosting {
    pub fn new(
        account_id: Uuid,
        transaction_type: TransactionType,
        action_type: impl Into<String>,
        change: BalanceChange,
        description: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id,
            transaction_type,
            action_type: action_type.into(),
            change,
            description: description.into(),
            stamp_reset_date: false,
            only_if_metered: false,
            at,
        }
    }

    pub fn stamping_reset_date(mut self) -> Self {
        self.stamp_reset_date = true;
        self
    }

    pub fn metered_only(mut self) -> Self {
        self.only_if_metered = true;
        self
    }

    /// Materialize the entry this posting appends, given the balance it
    /// moved from and to.
    pub fn to_entry(&self, sequence: i64, previous: u32, new: u32) -> LedgerEntry {
        let (credits_used, credits_added) = project_delta(previous, new);
        LedgerEntry {
            id: Uuid::new_v4(),
            account_id: self.account_id,
            sequence,
            transaction_type: self.transaction_type,
            action_type: self.action_type.clone(),
            credits_used,
            credits_added,
            credits_remaining: new,
            description: self.description.clone(),
            created_at: self.at,
        }
    }
}

/// What the store did with a posting
#[derive(Debug, Clone)]
pub enum PostingOutcome {
    /// Balance written and entry appended atomically
    Applied {
        previous_balance: u32,
        entry: LedgerEntry,
    },
    /// A debit found too few credits; nothing was written
    Insufficient { credits_remaining: u32 },
    /// A metered-only posting found a subscribed or admin account; nothing
    /// was written
    Skipped,
}

/// A page of ledger history, newest first
#[derive(Debug, Clone, Serialize)]
pub struct LedgerPage {
    pub entries: Vec<LedgerEntry>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_refuses_overdraw() {
        assert_eq!(BalanceChange::Debit(2).apply(3), Some(1));
        assert_eq!(BalanceChange::Debit(3).apply(3), Some(0));
        assert_eq!(BalanceChange::Debit(4).apply(3), None);
    }

    #[test]
    fn test_remove_floors_at_zero() {
        assert_eq!(BalanceChange::RemoveFloored(5).apply(2), Some(0));
        assert_eq!(BalanceChange::RemoveFloored(1).apply(2), Some(1));
    }

    #[test]
    fn test_credit_and_set() {
        assert_eq!(BalanceChange::Credit(10).apply(5), Some(15));
        assert_eq!(BalanceChange::Credit(1).apply(u32::MAX), Some(u32::MAX));
        assert_eq!(BalanceChange::SetTo(5).apply(0), Some(5));
        assert_eq!(BalanceChange::SetTo(5).apply(9), Some(5));
    }

    #[test]
    fn test_from_delta() {
        assert_eq!(
            BalanceChange::from_delta(TransactionType::Download, -2),
            BalanceChange::Debit(2)
        );
        assert_eq!(
            BalanceChange::from_delta(TransactionType::Expired, -2),
            BalanceChange::RemoveFloored(2)
        );
        assert_eq!(
            BalanceChange::from_delta(TransactionType::Purchase, 30),
            BalanceChange::Credit(30)
        );
    }

    #[test]
    fn test_projection_is_unsigned() {
        assert_eq!(project_delta(5, 2), (3, 0));
        assert_eq!(project_delta(2, 5), (0, 3));
        assert_eq!(project_delta(5, 5), (0, 0));
    }

    #[test]
    fn test_entry_snapshot_matches_new_balance() {
        let posting = LedgerPosting::new(
            Uuid::new_v4(),
            TransactionType::Download,
            "download_png",
            BalanceChange::Debit(2),
            "Downloaded download_png",
            Utc::now(),
        );
        let entry = posting.to_entry(4, 5, 3);
        assert_eq!(entry.sequence, 4);
        assert_eq!(entry.credits_used, 2);
        assert_eq!(entry.credits_added, 0);
        assert_eq!(entry.credits_remaining, 3);
    }

    #[test]
    fn test_transaction_type_parse() {
        assert_eq!("reset".parse::<TransactionType>().unwrap(), TransactionType::Reset);
        assert!("refund".parse::<TransactionType>().is_err());
    }
}
