//! Payment processor that approves every charge without moving money

use tracing::info;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::ports::{PaymentConfirmation, PaymentProcessor};

/// Always-approving processor for local installs and tests
#[derive(Debug, Default, Clone, Copy)]
pub struct StubPaymentProcessor;

impl PaymentProcessor for StubPaymentProcessor {
    fn charge(&self, account_id: Uuid, amount_cents: i64, description: &str) -> Result<PaymentConfirmation> {
        if amount_cents < 0 {
            return Err(Error::validation("Charge amount cannot be negative"));
        }
        let reference = format!("stub_{}", Uuid::new_v4().simple());
        info!(%account_id, amount_cents, %reference, "charged: {}", description);
        Ok(PaymentConfirmation {
            reference,
            status: "completed".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_charge_completes() {
        let confirmation = StubPaymentProcessor
            .charge(Uuid::new_v4(), 499, "Starter Pack")
            .unwrap();
        assert_eq!(confirmation.status, "completed");
        assert!(confirmation.reference.starts_with("stub_"));
    }

    #[test]
    fn test_negative_charge_rejected() {
        assert!(StubPaymentProcessor.charge(Uuid::new_v4(), -1, "x").is_err());
    }
}
