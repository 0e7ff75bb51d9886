//! Repository port - durable row store abstraction

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{
    Account, AdminAction, CreditPackage, CreditPurchase, LedgerEntry, LedgerPosting,
    PostingOutcome, Session,
};

/// Durable row store used by every service.
///
/// Implementations must make [`Repository::post`] atomic: the balance write
/// and the ledger append either both commit or neither does, and no other
/// posting for the same account may interleave between reading the old
/// balance and writing the new one.
pub trait Repository: Send + Sync {
    // === Accounts ===

    /// Insert a new account together with its opening ledger entry.
    ///
    /// Fails with `Error::Conflict` if the email is already registered.
    fn create_account(&self, account: &Account, opening_entry: &LedgerEntry) -> Result<()>;

    /// Get account by ID
    fn get_account_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    /// Get account by (normalized) email
    fn get_account_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Page through accounts, newest first, optionally filtered by an email substring
    fn list_accounts(&self, search: Option<&str>, limit: u32, offset: u64) -> Result<Vec<Account>>;

    /// Count accounts matching the same filter as `list_accounts`
    fn count_accounts(&self, search: Option<&str>) -> Result<u64>;

    /// Ids of every non-subscribed free account
    fn list_metered_account_ids(&self) -> Result<Vec<Uuid>>;

    /// Mark an account as subscribed to `plan`
    fn set_subscription(&self, id: Uuid, plan: &str, at: DateTime<Utc>) -> Result<()>;

    // === Ledger ===

    /// Apply a posting: read-modify-write the balance and append one entry
    /// as a single atomic unit.
    ///
    /// A debit that finds too few credits returns
    /// `PostingOutcome::Insufficient` and writes nothing. A metered-only
    /// posting for a subscribed or admin account returns
    /// `PostingOutcome::Skipped`. An unknown account is `Error::NotFound`.
    fn post(&self, posting: &LedgerPosting) -> Result<PostingOutcome>;

    /// Ledger entries for an account, newest first
    fn get_ledger_entries(&self, account_id: Uuid, limit: u32, offset: u64) -> Result<Vec<LedgerEntry>>;

    /// Number of ledger entries for an account
    fn count_ledger_entries(&self, account_id: Uuid) -> Result<u64>;

    /// Most recent ledger entry for an account
    fn get_latest_ledger_entry(&self, account_id: Uuid) -> Result<Option<LedgerEntry>>;

    /// Most recent entries across all accounts, with the owner's email
    fn get_recent_ledger_activity(&self, limit: u32) -> Result<Vec<LedgerActivity>>;

    /// Ledger entries whose account no longer exists, as `(entry_id, account_id)`
    fn find_orphaned_ledger_entries(&self) -> Result<Vec<(Uuid, Uuid)>>;

    /// Accounts whose balance differs from their latest ledger snapshot
    fn find_unreconciled_accounts(&self) -> Result<Vec<ReconciliationMismatch>>;

    /// Sum of all balances
    fn total_credits_in_circulation(&self) -> Result<u64>;

    /// Number of subscribed accounts
    fn count_subscribed_accounts(&self) -> Result<u64>;

    // === Sessions ===

    /// Persist a newly issued session
    fn insert_session(&self, session: &Session) -> Result<()>;

    /// Look up a session by token hash
    fn get_session(&self, token_hash: &str) -> Result<Option<Session>>;

    /// Delete a session; returns whether a row was removed
    fn delete_session(&self, token_hash: &str) -> Result<bool>;

    /// Delete every session of an account
    fn delete_sessions_for_account(&self, account_id: Uuid) -> Result<u64>;

    /// Delete sessions that expired at or before `now`
    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Count sessions that expired at or before `now`
    fn count_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64>;

    // === Packages & purchases ===

    /// Active packages ordered by credits
    fn get_active_packages(&self) -> Result<Vec<CreditPackage>>;

    /// An active package by id
    fn get_active_package(&self, id: i64) -> Result<Option<CreditPackage>>;

    /// Record a completed payment
    fn insert_purchase(&self, purchase: &CreditPurchase) -> Result<()>;

    /// Number of purchases made by an account
    fn count_purchases(&self, account_id: Uuid) -> Result<u64>;

    // === Audit & legacy mirror ===

    /// Append an admin audit row
    fn insert_admin_action(&self, action: &AdminAction) -> Result<()>;

    /// Number of audit rows targeting an account
    fn count_admin_actions(&self, target_account_id: Uuid) -> Result<u64>;

    /// Append a row to the legacy usage table (non-authoritative)
    fn record_usage(&self, account_id: Uuid, action_type: &str, at: DateTime<Utc>) -> Result<()>;

    /// Number of legacy usage rows for an account
    fn count_usage(&self, account_id: Uuid) -> Result<u64>;
}

/// A ledger entry joined with its owner's email
#[derive(Debug, Clone, Serialize)]
pub struct LedgerActivity {
    pub email: String,
    #[serde(flatten)]
    pub entry: LedgerEntry,
}

/// Balance and latest snapshot that disagree
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationMismatch {
    pub account_id: Uuid,
    pub credits_remaining: u32,
    /// `None` when the account has no ledger entries at all
    pub latest_snapshot: Option<u32>,
}
