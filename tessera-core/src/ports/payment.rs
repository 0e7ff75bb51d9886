//! Payment processor port

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::result::Result;

/// Confirmation returned by a successful charge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub reference: String,
    pub status: String,
}

/// Charges a buyer before purchased credits are granted
pub trait PaymentProcessor: Send + Sync {
    fn charge(&self, account_id: Uuid, amount_cents: i64, description: &str) -> Result<PaymentConfirmation>;
}
