//! Account domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::Error;

/// Kind of user. Admins are never metered by the bulk reset and may
/// adjust other accounts' balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Free,
    Admin,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Free => "free",
            UserType::Admin => "admin",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(UserType::Free),
            "admin" => Ok(UserType::Admin),
            other => Err(Error::validation(format!("Unknown user type: {}", other))),
        }
    }
}

/// A user account holding a credit balance
///
/// `credits_remaining` is only ever changed by the ledger engine, together
/// with a ledger entry carrying the same value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    /// Stored lowercased; uniqueness is case-insensitive
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password_hash: String,
    pub subscribed: bool,
    pub subscription_plan: Option<String>,
    pub subscription_date: Option<DateTime<Utc>>,
    pub credits_remaining: u32,
    pub user_type: UserType,
    pub credits_reset_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new free account holding `credits` credits
    pub fn new(email: &str, password_hash: impl Into<String>, credits: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            password_hash: password_hash.into(),
            subscribed: false,
            subscription_plan: None,
            subscription_date: None,
            credits_remaining: credits,
            user_type: UserType::Free,
            credits_reset_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.user_type == UserType::Admin
    }

    /// Whether the monthly reset applies to this account
    pub fn is_metered(&self) -> bool {
        !self.subscribed && self.user_type == UserType::Free
    }
}

/// Lowercase and trim an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Public view of an account returned at signup and login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountProfile {
    pub id: Uuid,
    pub email: String,
    pub subscribed: bool,
    pub subscription_plan: Option<String>,
    pub credits_remaining: u32,
    pub user_type: UserType,
    pub credits_reset_date: Option<DateTime<Utc>>,
}

impl From<&Account> for AccountProfile {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            subscribed: account.subscribed,
            subscription_plan: account.subscription_plan.clone(),
            credits_remaining: account.credits_remaining,
            user_type: account.user_type,
            credits_reset_date: account.credits_reset_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_creation() {
        let account = Account::new("  Someone@Example.COM ", "hash", 5);
        assert_eq!(account.email, "someone@example.com");
        assert_eq!(account.credits_remaining, 5);
        assert_eq!(account.user_type, UserType::Free);
        assert!(account.is_metered());
        assert!(!account.is_admin());
    }

    #[test]
    fn test_subscribed_and_admin_are_not_metered() {
        let mut account = Account::new("a@example.com", "hash", 5);
        account.subscribed = true;
        assert!(!account.is_metered());

        let mut admin = Account::new("b@example.com", "hash", 5);
        admin.user_type = UserType::Admin;
        assert!(!admin.is_metered());
    }

    #[test]
    fn test_user_type_round_trip_from_str() {
        assert_eq!("admin".parse::<UserType>().unwrap(), UserType::Admin);
        assert!("root".parse::<UserType>().is_err());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let account = Account::new("a@example.com", "secret-hash", 5);
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
