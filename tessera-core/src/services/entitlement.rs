//! Entitlement resolver - bypass, debit or deny a billable action

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, PostingOutcome};
use crate::services::ledger::LedgerService;

/// Cost of an action nobody configured
pub const UNKNOWN_ACTION_COST: u32 = 1;

/// Static action → cost table
#[derive(Debug, Clone)]
pub struct ActionCosts {
    costs: HashMap<String, u32>,
    default_action: String,
}

impl ActionCosts {
    pub fn new(costs: HashMap<String, u32>, default_action: impl Into<String>) -> Self {
        Self {
            costs,
            default_action: default_action.into(),
        }
    }

    pub fn cost(&self, action_type: &str) -> u32 {
        self.costs
            .get(action_type)
            .copied()
            .unwrap_or(UNKNOWN_ACTION_COST)
    }

    /// Action used when a request names none
    pub fn default_action(&self) -> &str {
        &self.default_action
    }

    /// Sorted copy of the table, for display
    pub fn table(&self) -> BTreeMap<String, u32> {
        self.costs.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}

/// Decision for one billable action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum Entitlement {
    /// Subscribed: nothing metered, nothing written
    Bypassed,
    /// `cost` credits taken; `credits_remaining` is the new balance
    Debited { credits_remaining: u32, cost: u32 },
    /// Balance too low; nothing written
    Denied { credits_remaining: u32, cost: u32 },
}

pub struct EntitlementResolver {
    ledger: Arc<LedgerService>,
    costs: ActionCosts,
}

impl EntitlementResolver {
    pub fn new(ledger: Arc<LedgerService>, costs: ActionCosts) -> Self {
        Self { ledger, costs }
    }

    pub fn costs(&self) -> &ActionCosts {
        &self.costs
    }

    /// Decide whether `account` may perform `action_type`, debiting when it
    /// is metered.
    ///
    /// The sufficiency check is repeated inside the ledger transaction, so a
    /// stale `account` snapshot can never lead to an overdraw.
    pub fn authorize(&self, account: &Account, action_type: &str) -> Result<Entitlement> {
        if account.subscribed {
            return Ok(Entitlement::Bypassed);
        }

        let cost = self.costs.cost(action_type);
        match self.ledger.try_debit(account.id, action_type, cost)? {
            PostingOutcome::Applied { entry, .. } => Ok(Entitlement::Debited {
                credits_remaining: entry.credits_remaining,
                cost,
            }),
            PostingOutcome::Insufficient { credits_remaining } => {
                info!(account_id = %account.id, action_type, cost, credits_remaining, "usage denied");
                Ok(Entitlement::Denied {
                    credits_remaining,
                    cost,
                })
            }
            // Debits are never metered-only
            PostingOutcome::Skipped => Err(Error::database("usage debit skipped unexpectedly")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn costs() -> ActionCosts {
        let mut table = HashMap::new();
        table.insert("download_svg".to_string(), 1);
        table.insert("download_png".to_string(), 2);
        table.insert("download_pdf".to_string(), 3);
        ActionCosts::new(table, "download_svg")
    }

    #[test]
    fn test_known_costs() {
        let costs = costs();
        assert_eq!(costs.cost("download_png"), 2);
        assert_eq!(costs.cost("download_pdf"), 3);
    }

    #[test]
    fn test_unknown_action_costs_one() {
        assert_eq!(costs().cost("download_gif"), UNKNOWN_ACTION_COST);
    }

    #[test]
    fn test_table_is_sorted() {
        let keys: Vec<String> = costs().table().into_keys().collect();
        assert_eq!(keys, vec!["download_pdf", "download_png", "download_svg"]);
    }

    #[test]
    fn test_entitlement_serializes_with_tag() {
        let json = serde_json::to_value(Entitlement::Denied {
            credits_remaining: 0,
            cost: 2,
        })
        .unwrap();
        assert_eq!(json["decision"], "denied");
        assert_eq!(json["cost"], 2);
    }
}
