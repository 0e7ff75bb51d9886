//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::types::Type;
use duckdb::{params, Connection, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, AdminAction, CreditPackage, CreditPurchase, LedgerEntry, LedgerPosting,
    PostingOutcome, Session, TransactionType, UserType,
};
use crate::ports::{LedgerActivity, ReconciliationMismatch, Repository};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const ACCOUNT_COLUMNS: &str = "account_id, email, password_hash, subscribed, subscription_plan,
     subscription_date, credits_remaining, user_type, credits_reset_date, created_at, updated_at";

const ENTRY_COLUMNS: &str = "entry_id, account_id, seq, transaction_type, action_type,
     credits_used, credits_added, credits_remaining, description, created_at";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

fn is_unique_violation(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("duplicate key") || lower.contains("unique constraint")
}

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Error::Database(e.to_string())
    }
}

/// DuckDB repository implementation
///
/// A single connection guarded by a mutex; every write that touches more
/// than one row runs inside an explicit transaction on it.
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) a database file.
    ///
    /// Retries with exponential backoff while another process holds the
    /// file lock.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            "database busy, retrying: {}",
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error.map(Error::from).unwrap_or_else(|| {
            Error::database(format!("failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// In-memory database, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> duckdb::Result<Connection> {
        // Cached extensions are never needed; keep autoloading off
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    /// Path of the backing file, `None` when in memory
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        let result = self.run_migrations()?;
        if !result.applied.is_empty() {
            debug!(count = result.applied.len(), "schema migrated");
        }
        Ok(())
    }

    /// Names of migrations still waiting to be applied
    pub fn pending_migrations(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        MigrationService::new(&conn).get_pending()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::database("connection lock poisoned"))
    }

    fn count(&self, sql: &str, args: &[&dyn duckdb::ToSql]) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(sql, args, |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn query_account(&self, filter: &str, key: &str) -> Result<Option<Account>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM accounts WHERE {} = ?", ACCOUNT_COLUMNS, filter);
        match conn.query_row(&sql, params![key], row_to_account) {
            Ok(account) => Ok(Some(account)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl Repository for DuckDbRepository {
    // === Accounts ===

    fn create_account(&self, account: &Account, opening_entry: &LedgerEntry) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT INTO accounts (account_id, email, password_hash, subscribed, subscription_plan,
                                   subscription_date, credits_remaining, user_type, credits_reset_date,
                                   created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                account.id.to_string(),
                account.email,
                account.password_hash,
                account.subscribed,
                account.subscription_plan,
                account.subscription_date.map(format_timestamp),
                i64::from(account.credits_remaining),
                account.user_type.as_str(),
                account.credits_reset_date.map(format_timestamp),
                format_timestamp(account.created_at),
                format_timestamp(account.updated_at),
            ],
        );
        if let Err(e) = inserted {
            let msg = e.to_string();
            if is_unique_violation(&msg) {
                return Err(Error::Conflict("Email already registered".to_string()));
            }
            return Err(Error::Database(msg));
        }

        insert_entry(&tx, opening_entry)?;
        tx.commit()?;
        Ok(())
    }

    fn get_account_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        self.query_account("account_id", &id.to_string())
    }

    fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.query_account("email", email)
    }

    fn list_accounts(&self, search: Option<&str>, limit: u32, offset: u64) -> Result<Vec<Account>> {
        let conn = self.lock()?;
        let filter = if search.is_some() { "WHERE email LIKE ? ESCAPE '\\'" } else { "" };
        let sql = format!(
            "SELECT {} FROM accounts {} ORDER BY created_at DESC LIMIT {} OFFSET {}",
            ACCOUNT_COLUMNS, filter, limit, offset
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = match search {
            Some(term) => stmt
                .query_map(params![contains_pattern(term)], row_to_account)?
                .collect::<duckdb::Result<Vec<_>>>()?,
            None => stmt
                .query_map([], row_to_account)?
                .collect::<duckdb::Result<Vec<_>>>()?,
        };
        Ok(rows)
    }

    fn count_accounts(&self, search: Option<&str>) -> Result<u64> {
        match search {
            Some(term) => self.count(
                "SELECT COUNT(*) FROM accounts WHERE email LIKE ? ESCAPE '\\'",
                &[&contains_pattern(term)],
            ),
            None => self.count("SELECT COUNT(*) FROM accounts", &[]),
        }
    }

    fn list_metered_account_ids(&self) -> Result<Vec<Uuid>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT account_id FROM accounts
             WHERE subscribed = FALSE AND user_type = 'free'
             ORDER BY created_at",
        )?;
        let ids = stmt
            .query_map([], |row| parse_uuid(row, 0))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(ids)
    }

    fn set_subscription(&self, id: Uuid, plan: &str, at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock()?;
        let ts = format_timestamp(at);
        let updated = conn.execute(
            "UPDATE accounts
             SET subscribed = TRUE, subscription_plan = ?, subscription_date = ?, updated_at = ?
             WHERE account_id = ?",
            params![plan, ts, ts, id.to_string()],
        )?;
        if updated == 0 {
            return Err(Error::not_found("User not found"));
        }
        Ok(())
    }

    // === Ledger ===

    fn post(&self, posting: &LedgerPosting) -> Result<PostingOutcome> {
        let mut conn = self.lock()?;
        // Dropping `tx` without commit rolls everything back
        let tx = conn.transaction()?;
        let account_id = posting.account_id.to_string();

        let (stored, subscribed, user_type): (i64, bool, String) = match tx.query_row(
            "SELECT credits_remaining, subscribed, user_type FROM accounts WHERE account_id = ?",
            params![account_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        ) {
            Ok(value) => value,
            Err(duckdb::Error::QueryReturnedNoRows) => {
                return Err(Error::not_found("User not found"))
            }
            Err(e) => return Err(e.into()),
        };
        // Re-checked here so a subscription committed after the caller
        // picked this account still wins
        if posting.only_if_metered && (subscribed || user_type != UserType::Free.as_str()) {
            return Ok(PostingOutcome::Skipped);
        }
        let previous = u32::try_from(stored)
            .map_err(|_| Error::database(format!("balance out of range: {}", stored)))?;

        let new = match posting.change.apply(previous) {
            Some(value) => value,
            None => {
                return Ok(PostingOutcome::Insufficient {
                    credits_remaining: previous,
                })
            }
        };

        let at = format_timestamp(posting.at);
        let updated = if posting.stamp_reset_date {
            tx.execute(
                "UPDATE accounts
                 SET credits_remaining = ?, credits_reset_date = ?, updated_at = ?
                 WHERE account_id = ? AND credits_remaining = ?",
                params![i64::from(new), at, at, account_id, stored],
            )?
        } else {
            tx.execute(
                "UPDATE accounts SET credits_remaining = ?, updated_at = ?
                 WHERE account_id = ? AND credits_remaining = ?",
                params![i64::from(new), at, account_id, stored],
            )?
        };
        if updated != 1 {
            return Err(Error::database("balance changed while posting"));
        }

        let sequence: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM ledger_entries WHERE account_id = ?",
            params![account_id],
            |row| row.get(0),
        )?;
        let entry = posting.to_entry(sequence, previous, new);
        insert_entry(&tx, &entry)?;
        tx.commit()?;

        Ok(PostingOutcome::Applied {
            previous_balance: previous,
            entry,
        })
    }

    fn get_ledger_entries(&self, account_id: Uuid, limit: u32, offset: u64) -> Result<Vec<LedgerEntry>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM ledger_entries WHERE account_id = ?
             ORDER BY seq DESC LIMIT {} OFFSET {}",
            ENTRY_COLUMNS, limit, offset
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![account_id.to_string()], |row| row_to_entry(row, 0))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(entries)
    }

    fn count_ledger_entries(&self, account_id: Uuid) -> Result<u64> {
        self.count(
            "SELECT COUNT(*) FROM ledger_entries WHERE account_id = ?",
            &[&account_id.to_string()],
        )
    }

    fn get_latest_ledger_entry(&self, account_id: Uuid) -> Result<Option<LedgerEntry>> {
        Ok(self.get_ledger_entries(account_id, 1, 0)?.into_iter().next())
    }

    fn get_recent_ledger_activity(&self, limit: u32) -> Result<Vec<LedgerActivity>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT a.email, l.entry_id, l.account_id, l.seq, l.transaction_type, l.action_type,
                    l.credits_used, l.credits_added, l.credits_remaining, l.description, l.created_at
             FROM ledger_entries l
             JOIN accounts a ON a.account_id = l.account_id
             ORDER BY l.created_at DESC, l.seq DESC
             LIMIT {}",
            limit
        );
        let mut stmt = conn.prepare(&sql)?;
        let activity = stmt
            .query_map([], |row| {
                Ok(LedgerActivity {
                    email: row.get(0)?,
                    entry: row_to_entry(row, 1)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(activity)
    }

    fn find_orphaned_ledger_entries(&self) -> Result<Vec<(Uuid, Uuid)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT l.entry_id, l.account_id FROM ledger_entries l
             LEFT JOIN accounts a ON l.account_id = a.account_id
             WHERE a.account_id IS NULL",
        )?;
        let orphans = stmt
            .query_map([], |row| Ok((parse_uuid(row, 0)?, parse_uuid(row, 1)?)))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(orphans)
    }

    fn find_unreconciled_accounts(&self) -> Result<Vec<ReconciliationMismatch>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT a.account_id, a.credits_remaining, latest.credits_remaining
             FROM accounts a
             LEFT JOIN (
                 SELECT account_id, credits_remaining,
                        ROW_NUMBER() OVER (PARTITION BY account_id ORDER BY seq DESC) AS rn
                 FROM ledger_entries
             ) latest ON latest.account_id = a.account_id AND latest.rn = 1
             WHERE latest.credits_remaining IS NULL
                OR latest.credits_remaining <> a.credits_remaining",
        )?;
        let mismatches = stmt
            .query_map([], |row| {
                Ok(ReconciliationMismatch {
                    account_id: parse_uuid(row, 0)?,
                    credits_remaining: get_credits(row, 1)?,
                    latest_snapshot: match row.get::<_, Option<i64>>(2)? {
                        Some(value) => Some(
                            u32::try_from(value).map_err(|e| conversion_error(2, Type::BigInt, e))?,
                        ),
                        None => None,
                    },
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(mismatches)
    }

    fn total_credits_in_circulation(&self) -> Result<u64> {
        self.count(
            "SELECT CAST(COALESCE(SUM(credits_remaining), 0) AS BIGINT) FROM accounts",
            &[],
        )
    }

    fn count_subscribed_accounts(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM accounts WHERE subscribed = TRUE", &[])
    }

    // === Sessions ===

    fn insert_session(&self, session: &Session) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sessions (token_hash, account_id, issued_at, expires_at) VALUES (?, ?, ?, ?)",
            params![
                session.token_hash,
                session.account_id.to_string(),
                format_timestamp(session.issued_at),
                format_timestamp(session.expires_at),
            ],
        )?;
        Ok(())
    }

    fn get_session(&self, token_hash: &str) -> Result<Option<Session>> {
        let conn = self.lock()?;
        let result = conn.query_row(
            "SELECT token_hash, account_id, issued_at, expires_at FROM sessions WHERE token_hash = ?",
            params![token_hash],
            |row| {
                Ok(Session {
                    token_hash: row.get(0)?,
                    account_id: parse_uuid(row, 1)?,
                    issued_at: get_timestamp(row, 2)?,
                    expires_at: get_timestamp(row, 3)?,
                })
            },
        );
        match result {
            Ok(session) => Ok(Some(session)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_session(&self, token_hash: &str) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE token_hash = ?",
            params![token_hash],
        )?;
        Ok(deleted > 0)
    }

    fn delete_sessions_for_account(&self, account_id: Uuid) -> Result<u64> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE account_id = ?",
            params![account_id.to_string()],
        )?;
        Ok(deleted as u64)
    }

    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?",
            params![format_timestamp(now)],
        )?;
        Ok(deleted as u64)
    }

    fn count_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        self.count(
            "SELECT COUNT(*) FROM sessions WHERE expires_at <= ?",
            &[&format_timestamp(now)],
        )
    }

    // === Packages & purchases ===

    fn get_active_packages(&self) -> Result<Vec<CreditPackage>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT package_id, name, credits, price_cents, is_active
             FROM credit_packages WHERE is_active = TRUE ORDER BY credits",
        )?;
        let packages = stmt
            .query_map([], row_to_package)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(packages)
    }

    fn get_active_package(&self, id: i64) -> Result<Option<CreditPackage>> {
        let conn = self.lock()?;
        match conn.query_row(
            "SELECT package_id, name, credits, price_cents, is_active
             FROM credit_packages WHERE package_id = ? AND is_active = TRUE",
            params![id],
            row_to_package,
        ) {
            Ok(package) => Ok(Some(package)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn insert_purchase(&self, purchase: &CreditPurchase) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO credit_purchases (purchase_id, account_id, package_id, credits_purchased,
                                           amount_paid_cents, payment_status, payment_reference, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                purchase.id.to_string(),
                purchase.account_id.to_string(),
                purchase.package_id,
                i64::from(purchase.credits_purchased),
                purchase.amount_paid_cents,
                purchase.payment_status,
                purchase.payment_reference,
                format_timestamp(purchase.created_at),
            ],
        )?;
        Ok(())
    }

    fn count_purchases(&self, account_id: Uuid) -> Result<u64> {
        self.count(
            "SELECT COUNT(*) FROM credit_purchases WHERE account_id = ?",
            &[&account_id.to_string()],
        )
    }

    // === Audit & legacy mirror ===

    fn insert_admin_action(&self, action: &AdminAction) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO admin_actions (action_id, admin_account_id, target_account_id, action_type,
                                        credits_amount, description, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                action.id.to_string(),
                action.admin_id.to_string(),
                action.target_account_id.to_string(),
                action.action_type,
                i64::from(action.amount),
                action.description,
                format_timestamp(action.created_at),
            ],
        )?;
        Ok(())
    }

    fn count_admin_actions(&self, target_account_id: Uuid) -> Result<u64> {
        self.count(
            "SELECT COUNT(*) FROM admin_actions WHERE target_account_id = ?",
            &[&target_account_id.to_string()],
        )
    }

    fn record_usage(&self, account_id: Uuid, action_type: &str, at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO usage_tracking (usage_id, account_id, action_type, created_at)
             VALUES (?, ?, ?, ?)",
            params![
                Uuid::new_v4().to_string(),
                account_id.to_string(),
                action_type,
                format_timestamp(at),
            ],
        )?;
        Ok(())
    }

    fn count_usage(&self, account_id: Uuid) -> Result<u64> {
        self.count(
            "SELECT COUNT(*) FROM usage_tracking WHERE account_id = ?",
            &[&account_id.to_string()],
        )
    }
}

fn insert_entry(conn: &Connection, entry: &LedgerEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO ledger_entries (entry_id, account_id, seq, transaction_type, action_type,
                                     credits_used, credits_added, credits_remaining, description, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            entry.id.to_string(),
            entry.account_id.to_string(),
            entry.sequence,
            entry.transaction_type.as_str(),
            entry.action_type,
            i64::from(entry.credits_used),
            i64::from(entry.credits_added),
            i64::from(entry.credits_remaining),
            entry.description,
            format_timestamp(entry.created_at),
        ],
    )?;
    Ok(())
}

// === Row mapping ===

fn row_to_account(row: &Row) -> duckdb::Result<Account> {
    let user_type: String = row.get(7)?;
    Ok(Account {
        id: parse_uuid(row, 0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        subscribed: row.get(3)?,
        subscription_plan: row.get(4)?,
        subscription_date: get_optional_timestamp(row, 5)?,
        credits_remaining: get_credits(row, 6)?,
        user_type: user_type
            .parse::<UserType>()
            .map_err(|e| conversion_error(7, Type::Text, e))?,
        credits_reset_date: get_optional_timestamp(row, 8)?,
        created_at: get_timestamp(row, 9)?,
        updated_at: get_timestamp(row, 10)?,
    })
}

/// Map the ten entry columns starting at `base`
fn row_to_entry(row: &Row, base: usize) -> duckdb::Result<LedgerEntry> {
    let kind: String = row.get(base + 3)?;
    Ok(LedgerEntry {
        id: parse_uuid(row, base)?,
        account_id: parse_uuid(row, base + 1)?,
        sequence: row.get(base + 2)?,
        transaction_type: kind
            .parse::<TransactionType>()
            .map_err(|e| conversion_error(base + 3, Type::Text, e))?,
        action_type: row.get(base + 4)?,
        credits_used: get_credits(row, base + 5)?,
        credits_added: get_credits(row, base + 6)?,
        credits_remaining: get_credits(row, base + 7)?,
        description: row.get(base + 8)?,
        created_at: get_timestamp(row, base + 9)?,
    })
}

fn row_to_package(row: &Row) -> duckdb::Result<CreditPackage> {
    Ok(CreditPackage {
        id: row.get(0)?,
        name: row.get(1)?,
        credits: get_credits(row, 2)?,
        price_cents: row.get(3)?,
        is_active: row.get(4)?,
    })
}

fn conversion_error<E>(idx: usize, ty: Type, e: E) -> duckdb::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    duckdb::Error::FromSqlConversionFailure(idx, ty, Box::new(e))
}

fn parse_uuid(row: &Row, idx: usize) -> duckdb::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, Type::Text, e))
}

fn get_credits(row: &Row, idx: usize) -> duckdb::Result<u32> {
    let raw: i64 = row.get(idx)?;
    u32::try_from(raw).map_err(|e| conversion_error(idx, Type::BigInt, e))
}

fn get_timestamp(row: &Row, idx: usize) -> duckdb::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).map_err(|e| conversion_error(idx, Type::Text, e))
}

fn get_optional_timestamp(row: &Row, idx: usize) -> duckdb::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .map_err(|e| conversion_error(idx, Type::Text, e)),
        None => Ok(None),
    }
}

/// `LIKE` pattern matching `term` as a literal, case-folded substring
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Fixed-width RFC 3339, so string order equals time order
fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}
