//! Credit packages, purchases and subscriptions

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, CreditPackage, CreditPurchase, PurchaseReceipt, SubscriptionPlan, TransactionType,
};
use crate::ports::{Clock, PaymentProcessor, Repository};
use crate::services::ledger::LedgerService;

pub const PURCHASE_ACTION: &str = "credit_purchase";

pub struct PurchaseService {
    repository: Arc<dyn Repository>,
    ledger: Arc<LedgerService>,
    payments: Arc<dyn PaymentProcessor>,
    clock: Arc<dyn Clock>,
    plans: Vec<SubscriptionPlan>,
}

impl PurchaseService {
    pub fn new(
        repository: Arc<dyn Repository>,
        ledger: Arc<LedgerService>,
        payments: Arc<dyn PaymentProcessor>,
        clock: Arc<dyn Clock>,
        plans: Vec<SubscriptionPlan>,
    ) -> Self {
        Self {
            repository,
            ledger,
            payments,
            clock,
            plans,
        }
    }

    pub fn list_packages(&self) -> Result<Vec<CreditPackage>> {
        self.repository.get_active_packages()
    }

    pub fn plans(&self) -> &[SubscriptionPlan] {
        &self.plans
    }

    /// Charge for a package, record the payment, then credit the balance
    pub fn purchase(&self, account: &Account, package_id: i64) -> Result<PurchaseReceipt> {
        let package = self
            .repository
            .get_active_package(package_id)?
            .ok_or_else(|| Error::not_found("Package not found"))?;

        let confirmation = self
            .payments
            .charge(account.id, package.price_cents, &package.name)?;

        let purchase = CreditPurchase {
            id: Uuid::new_v4(),
            account_id: account.id,
            package_id: package.id,
            credits_purchased: package.credits,
            amount_paid_cents: package.price_cents,
            payment_status: confirmation.status,
            payment_reference: confirmation.reference,
            created_at: self.clock.now(),
        };
        self.repository.insert_purchase(&purchase)?;

        let (_, entry) = self.ledger.credit(
            account.id,
            TransactionType::Purchase,
            PURCHASE_ACTION,
            package.credits,
            &format!("Purchased {}", package.name),
        )?;
        info!(
            account_id = %account.id,
            package = %package.name,
            credits = package.credits,
            "credits purchased"
        );

        Ok(PurchaseReceipt {
            purchase_id: purchase.id,
            package_name: package.name,
            credits_purchased: package.credits,
            credits_remaining: entry.credits_remaining,
        })
    }

    /// Subscribe an account to a configured plan and return the updated row
    pub fn subscribe(&self, account_id: Uuid, plan: &str) -> Result<Account> {
        let plan = self
            .plans
            .iter()
            .find(|p| p.name == plan)
            .ok_or_else(|| Error::validation(format!("Invalid plan: {}", plan)))?;
        if self.repository.get_account_by_id(account_id)?.is_none() {
            return Err(Error::not_found("User not found"));
        }

        self.payments
            .charge(account_id, plan.price_cents, &format!("{} subscription", plan.name))?;
        self.repository
            .set_subscription(account_id, &plan.name, self.clock.now())?;
        info!(%account_id, plan = %plan.name, "subscribed");

        self.repository
            .get_account_by_id(account_id)?
            .ok_or_else(|| Error::not_found("User not found"))
    }
}
