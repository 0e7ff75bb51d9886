//! Usage tracking - the boundary operation behind "track usage"

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, LedgerEntry, UserType};
use crate::ports::{Clock, Repository};
use crate::services::entitlement::{Entitlement, EntitlementResolver};

/// What a successful usage call reports back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageReceipt {
    pub action_type: String,
    pub credits_remaining: u32,
    /// Zero when the account is subscribed
    pub cost: u32,
    pub bypassed: bool,
}

/// Balance, recent activity and prices for one account
#[derive(Debug, Clone, Serialize)]
pub struct CreditsOverview {
    pub credits_remaining: u32,
    pub subscribed: bool,
    pub user_type: UserType,
    pub credits_reset_date: Option<DateTime<Utc>>,
    pub recent_transactions: Vec<LedgerEntry>,
    pub credit_costs: BTreeMap<String, u32>,
}

const RECENT_TRANSACTIONS: u32 = 10;

pub struct UsageService {
    repository: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
    resolver: Arc<EntitlementResolver>,
}

impl UsageService {
    pub fn new(
        repository: Arc<dyn Repository>,
        clock: Arc<dyn Clock>,
        resolver: Arc<EntitlementResolver>,
    ) -> Self {
        Self {
            repository,
            clock,
            resolver,
        }
    }

    /// Current balance with the latest ledger entries and the cost table
    pub fn overview(&self, account: &Account) -> Result<CreditsOverview> {
        // Re-read so the balance matches the entries listed with it
        let account = self
            .repository
            .get_account_by_id(account.id)?
            .ok_or_else(|| Error::not_found("User not found"))?;
        let recent_transactions =
            self.repository
                .get_ledger_entries(account.id, RECENT_TRANSACTIONS, 0)?;

        Ok(CreditsOverview {
            credits_remaining: account.credits_remaining,
            subscribed: account.subscribed,
            user_type: account.user_type,
            credits_reset_date: account.credits_reset_date,
            recent_transactions,
            credit_costs: self.resolver.costs().table(),
        })
    }

    /// Meter one action. Denial surfaces as `Error::InsufficientCredits`.
    pub fn track(&self, account: &Account, action_type: Option<&str>) -> Result<UsageReceipt> {
        let action_type = match action_type.map(str::trim) {
            Some(action) if !action.is_empty() => action.to_string(),
            _ => self.resolver.costs().default_action().to_string(),
        };

        match self.resolver.authorize(account, &action_type)? {
            Entitlement::Bypassed => {
                self.mirror_usage(account, &action_type);
                Ok(UsageReceipt {
                    action_type,
                    credits_remaining: account.credits_remaining,
                    cost: 0,
                    bypassed: true,
                })
            }
            Entitlement::Debited {
                credits_remaining,
                cost,
            } => {
                self.mirror_usage(account, &action_type);
                Ok(UsageReceipt {
                    action_type,
                    credits_remaining,
                    cost,
                    bypassed: false,
                })
            }
            Entitlement::Denied {
                credits_remaining,
                cost,
            } => Err(Error::InsufficientCredits {
                credits_remaining,
                cost,
            }),
        }
    }

    /// Secondary usage row for every permitted action, bypassed or debited.
    /// The ledger entry is authoritative; a failed write is only logged.
    fn mirror_usage(&self, account: &Account, action_type: &str) {
        if let Err(e) = self
            .repository
            .record_usage(account.id, action_type, self.clock.now())
        {
            warn!(account_id = %account.id, error = %e, "usage mirror write failed");
        }
    }
}
