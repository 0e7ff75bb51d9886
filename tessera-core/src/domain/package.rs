//! Credit package catalog and purchase records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Static catalog entry sold through the purchase flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditPackage {
    pub id: i64,
    pub name: String,
    pub credits: u32,
    /// Price in cents
    pub price_cents: i64,
    pub is_active: bool,
}

/// Payment record written before purchased credits are posted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditPurchase {
    pub id: Uuid,
    pub account_id: Uuid,
    pub package_id: i64,
    pub credits_purchased: u32,
    pub amount_paid_cents: i64,
    pub payment_status: String,
    pub payment_reference: String,
    pub created_at: DateTime<Utc>,
}

/// Result returned to the buyer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub purchase_id: Uuid,
    pub package_name: String,
    pub credits_purchased: u32,
    pub credits_remaining: u32,
}

/// Subscription plan offered by configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlan {
    pub name: String,
    pub price_cents: i64,
}
