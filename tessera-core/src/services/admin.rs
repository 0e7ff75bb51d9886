//! Privileged operations: manual balance adjustments, the monthly reset,
//! user listing and dashboard stats. Every entry point checks that the
//! acting account is an administrator.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, AccountProfile, AdminAction, AdminAdjustment, AdminCreditAction, AdminCreditRequest,
    BulkResetReport, LedgerEntry,
};
use crate::ports::{Clock, LedgerActivity, Repository};
use crate::services::ledger::LedgerService;

/// Ledger label for manual adjustments
pub const ADMIN_ADJUSTMENT_ACTION: &str = "promotional_bonus";

const MAX_USERS_PAGE: u32 = 100;
const RECENT_ACTIVITY: u32 = 10;

/// A page of accounts
#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub users: Vec<AccountProfile>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

/// Dashboard numbers
#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub total_users: u64,
    pub subscribed_users: u64,
    pub total_credits_in_circulation: u64,
    pub recent_transactions: Vec<LedgerActivity>,
}

/// One account with its activity counts
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub user: AccountProfile,
    pub ledger_entries: u64,
    pub purchases: u64,
    pub admin_actions: u64,
    pub usage_records: u64,
    pub recent_transactions: Vec<LedgerEntry>,
}

pub struct AdminService {
    repository: Arc<dyn Repository>,
    ledger: Arc<LedgerService>,
    clock: Arc<dyn Clock>,
    baseline: u32,
}

impl AdminService {
    pub fn new(
        repository: Arc<dyn Repository>,
        ledger: Arc<LedgerService>,
        clock: Arc<dyn Clock>,
        baseline: u32,
    ) -> Self {
        Self {
            repository,
            ledger,
            clock,
            baseline,
        }
    }

    fn require_admin(actor: &Account) -> Result<()> {
        if actor.is_admin() {
            Ok(())
        } else {
            Err(Error::Forbidden("Admin access required".to_string()))
        }
    }

    /// Add, remove or reset a user's credits and record who did it.
    ///
    /// The audit row is written after the balance change and only on a
    /// best-effort basis; `audited` reports whether it landed.
    pub fn adjust_credits(&self, admin: &Account, request: &AdminCreditRequest) -> Result<AdminAdjustment> {
        Self::require_admin(admin)?;
        if request.action != AdminCreditAction::Reset && request.amount == 0 {
            return Err(Error::validation("Amount must be greater than zero"));
        }

        let description = request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| request.action.default_description(request.amount));

        let (old_credits, entry) = match request.action {
            AdminCreditAction::Add => self.ledger.credit(
                request.user_id,
                request.action.transaction_type(),
                ADMIN_ADJUSTMENT_ACTION,
                request.amount,
                &description,
            )?,
            AdminCreditAction::Remove => self.ledger.remove(
                request.user_id,
                ADMIN_ADJUSTMENT_ACTION,
                request.amount,
                &description,
            )?,
            AdminCreditAction::Reset => self.ledger.reset(
                request.user_id,
                ADMIN_ADJUSTMENT_ACTION,
                self.baseline,
                &description,
            )?,
        };

        let amount = match request.action {
            AdminCreditAction::Reset => self.baseline,
            _ => request.amount,
        };
        let audit = AdminAction {
            id: Uuid::new_v4(),
            admin_id: admin.id,
            target_account_id: request.user_id,
            action_type: format!("credit_{}", request.action),
            amount,
            description,
            created_at: self.clock.now(),
        };
        let audited = match self.repository.insert_admin_action(&audit) {
            Ok(()) => true,
            Err(e) => {
                warn!(admin_id = %admin.id, target = %request.user_id, error = %e, "admin audit write failed");
                false
            }
        };

        info!(
            admin_id = %admin.id,
            target = %request.user_id,
            action = %request.action,
            old_credits,
            new_credits = entry.credits_remaining,
            "credits adjusted"
        );
        Ok(AdminAdjustment {
            user_id: request.user_id,
            action: request.action,
            amount,
            old_credits,
            new_credits: entry.credits_remaining,
            audited,
        })
    }

    /// Reset every non-subscribed free account to the baseline allowance
    pub fn reset_monthly_credits(&self, admin: &Account) -> Result<BulkResetReport> {
        Self::require_admin(admin)?;
        self.ledger.bulk_reset(self.baseline)
    }

    pub fn stats(&self, admin: &Account) -> Result<AdminStats> {
        Self::require_admin(admin)?;
        Ok(AdminStats {
            total_users: self.repository.count_accounts(None)?,
            subscribed_users: self.repository.count_subscribed_accounts()?,
            total_credits_in_circulation: self.repository.total_credits_in_circulation()?,
            recent_transactions: self.repository.get_recent_ledger_activity(RECENT_ACTIVITY)?,
        })
    }

    /// Accounts newest first, optionally filtered by an email substring
    pub fn list_users(&self, admin: &Account, search: Option<&str>, page: u32, limit: u32) -> Result<UserPage> {
        Self::require_admin(admin)?;
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_USERS_PAGE);
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let offset = u64::from(page - 1) * u64::from(limit);

        let users = self
            .repository
            .list_accounts(search, limit, offset)?
            .iter()
            .map(AccountProfile::from)
            .collect();
        let total = self.repository.count_accounts(search)?;

        Ok(UserPage {
            users,
            page,
            limit,
            total,
            pages: total.div_ceil(u64::from(limit)),
        })
    }

    /// Profile, activity counts and latest ledger entries of one account
    pub fn account_summary(&self, admin: &Account, user_id: Uuid) -> Result<AccountSummary> {
        Self::require_admin(admin)?;
        let account = self
            .repository
            .get_account_by_id(user_id)?
            .ok_or_else(|| Error::not_found("User not found"))?;

        Ok(AccountSummary {
            user: AccountProfile::from(&account),
            ledger_entries: self.repository.count_ledger_entries(user_id)?,
            purchases: self.repository.count_purchases(user_id)?,
            admin_actions: self.repository.count_admin_actions(user_id)?,
            usage_records: self.repository.count_usage(user_id)?,
            recent_transactions: self.ledger.recent(user_id, RECENT_ACTIVITY)?,
        })
    }
}
