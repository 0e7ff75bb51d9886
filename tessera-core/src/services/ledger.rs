//! Ledger engine - the only writer of balances and ledger entries
//!
//! Every balance change goes through [`Repository::post`], which applies the
//! change and appends the matching entry in one transaction. Concurrent
//! debits on the same account are linearized there: the balance is re-read
//! inside the transaction and written back with a conditional update, so
//! two callers can never both spend the same credit.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, BalanceChange, BulkResetReport, LedgerEntry, LedgerPage, LedgerPosting,
    PostingOutcome, TransactionType,
};
use crate::ports::{Clock, Repository};

pub const MONTHLY_RESET_ACTION: &str = "monthly_reset";
pub const SIGNUP_ACTION: &str = "signup_allowance";

const MAX_PAGE_SIZE: u32 = 100;

pub struct LedgerService {
    repository: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
}

impl LedgerService {
    pub fn new(repository: Arc<dyn Repository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Apply a signed delta and return the new balance.
    ///
    /// Negative deltas are strict debits for `Download` (refused with
    /// `InsufficientCredits` when the balance is too low) and removals
    /// floored at zero for every other kind.
    pub fn apply_transaction(
        &self,
        account_id: Uuid,
        kind: TransactionType,
        action_type: &str,
        delta: i64,
        description: &str,
    ) -> Result<u32> {
        let change = BalanceChange::from_delta(kind, delta);
        let posting = LedgerPosting::new(
            account_id,
            kind,
            action_type,
            change,
            description,
            self.clock.now(),
        );
        match self.post(&posting)? {
            PostingOutcome::Applied { entry, .. } => Ok(entry.credits_remaining),
            PostingOutcome::Insufficient { credits_remaining } => Err(Error::InsufficientCredits {
                credits_remaining,
                cost: u32::try_from(delta.unsigned_abs()).unwrap_or(u32::MAX),
            }),
            PostingOutcome::Skipped => Err(unexpected_skip()),
        }
    }

    /// Debit `cost` if the balance covers it. A refusal writes nothing.
    pub fn try_debit(&self, account_id: Uuid, action_type: &str, cost: u32) -> Result<PostingOutcome> {
        let posting = LedgerPosting::new(
            account_id,
            TransactionType::Download,
            action_type,
            BalanceChange::Debit(cost),
            format!("Downloaded {}", action_type),
            self.clock.now(),
        );
        self.post(&posting)
    }

    /// Add credits; returns `(previous_balance, entry)`
    pub fn credit(
        &self,
        account_id: Uuid,
        kind: TransactionType,
        action_type: &str,
        amount: u32,
        description: &str,
    ) -> Result<(u32, LedgerEntry)> {
        self.post_applied(LedgerPosting::new(
            account_id,
            kind,
            action_type,
            BalanceChange::Credit(amount),
            description,
            self.clock.now(),
        ))
    }

    /// Take credits away, stopping at zero; returns `(previous_balance, entry)`
    pub fn remove(
        &self,
        account_id: Uuid,
        action_type: &str,
        amount: u32,
        description: &str,
    ) -> Result<(u32, LedgerEntry)> {
        self.post_applied(LedgerPosting::new(
            account_id,
            TransactionType::Expired,
            action_type,
            BalanceChange::RemoveFloored(amount),
            description,
            self.clock.now(),
        ))
    }

    /// Set the balance to `baseline` and stamp the reset date
    pub fn reset(
        &self,
        account_id: Uuid,
        action_type: &str,
        baseline: u32,
        description: &str,
    ) -> Result<(u32, LedgerEntry)> {
        self.post_applied(
            LedgerPosting::new(
                account_id,
                TransactionType::Reset,
                action_type,
                BalanceChange::SetTo(baseline),
                description,
                self.clock.now(),
            )
            .stamping_reset_date(),
        )
    }

    /// Reset every non-subscribed free account to `baseline`.
    ///
    /// Accounts are reset one by one in their own transactions; a failure
    /// is logged and counted and the loop moves on. An account that became
    /// subscribed or admin after the listing is skipped, not reset.
    pub fn bulk_reset(&self, baseline: u32) -> Result<BulkResetReport> {
        let reset_date = self.clock.now();
        let account_ids = self.repository.list_metered_account_ids()?;
        let mut users_reset = 0u64;
        let mut failures = 0u64;
        let mut skipped = 0u64;

        for account_id in account_ids {
            let posting = LedgerPosting::new(
                account_id,
                TransactionType::Reset,
                MONTHLY_RESET_ACTION,
                BalanceChange::SetTo(baseline),
                "Monthly credit reset",
                reset_date,
            )
            .stamping_reset_date()
            .metered_only();

            match self.repository.post(&posting) {
                Ok(PostingOutcome::Applied { .. }) => users_reset += 1,
                Ok(PostingOutcome::Skipped) => skipped += 1,
                Ok(PostingOutcome::Insufficient { .. }) => failures += 1,
                Err(e) => {
                    warn!(%account_id, error = %e, "monthly reset failed for account");
                    failures += 1;
                }
            }
        }

        info!(users_reset, failures, skipped, baseline, "monthly reset complete");
        Ok(BulkResetReport {
            users_reset,
            failures,
            skipped,
            reset_date,
        })
    }

    /// One page of an account's ledger, newest first. Pages start at 1.
    pub fn history(&self, account_id: Uuid, page: u32, limit: u32) -> Result<LedgerPage> {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let offset = u64::from(page - 1) * u64::from(limit);

        let entries = self.repository.get_ledger_entries(account_id, limit, offset)?;
        let total = self.repository.count_ledger_entries(account_id)?;
        Ok(LedgerPage {
            entries,
            page,
            limit,
            total,
            pages: total.div_ceil(u64::from(limit)),
        })
    }

    /// Most recent `limit` entries of an account
    pub fn recent(&self, account_id: Uuid, limit: u32) -> Result<Vec<LedgerEntry>> {
        self.repository.get_ledger_entries(account_id, limit, 0)
    }

    /// Whether the latest entry's snapshot equals the stored balance
    pub fn is_reconciled(&self, account_id: Uuid) -> Result<bool> {
        let account = self
            .repository
            .get_account_by_id(account_id)?
            .ok_or_else(|| Error::not_found("User not found"))?;
        let latest = self.repository.get_latest_ledger_entry(account_id)?;
        Ok(latest.map(|e| e.credits_remaining) == Some(account.credits_remaining))
    }

    /// First entry of a new account, recording its starting allowance
    pub fn opening_entry(account: &Account) -> LedgerEntry {
        LedgerPosting::new(
            account.id,
            TransactionType::Bonus,
            SIGNUP_ACTION,
            BalanceChange::SetTo(account.credits_remaining),
            "Signup allowance",
            account.created_at,
        )
        .to_entry(1, 0, account.credits_remaining)
    }

    fn post(&self, posting: &LedgerPosting) -> Result<PostingOutcome> {
        let outcome = self.repository.post(posting)?;
        match &outcome {
            PostingOutcome::Applied { previous_balance, entry } => debug!(
                account_id = %posting.account_id,
                kind = %posting.transaction_type,
                action_type = %posting.action_type,
                previous = previous_balance,
                remaining = entry.credits_remaining,
                "ledger posting applied"
            ),
            PostingOutcome::Insufficient { credits_remaining } => debug!(
                account_id = %posting.account_id,
                action_type = %posting.action_type,
                remaining = credits_remaining,
                "debit refused"
            ),
            PostingOutcome::Skipped => debug!(
                account_id = %posting.account_id,
                action_type = %posting.action_type,
                "posting skipped for unmetered account"
            ),
        }
        Ok(outcome)
    }

    fn post_applied(&self, posting: LedgerPosting) -> Result<(u32, LedgerEntry)> {
        match self.post(&posting)? {
            PostingOutcome::Applied { previous_balance, entry } => Ok((previous_balance, entry)),
            // Only debits can be refused
            PostingOutcome::Insufficient { credits_remaining } => Err(Error::InsufficientCredits {
                credits_remaining,
                cost: 0,
            }),
            PostingOutcome::Skipped => Err(unexpected_skip()),
        }
    }
}

/// Only metered-only postings can be skipped, and none of the callers that
/// expect an applied posting build one
fn unexpected_skip() -> Error {
    Error::database("ledger posting skipped unexpectedly")
}
