//! Signup, login and logout

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::result::{Error, Result};
use crate::domain::{normalize_email, Account, AccountProfile, UserType};
use crate::ports::{Clock, CredentialHasher, Repository};
use crate::services::admission::EmailAdmissionGate;
use crate::services::ledger::LedgerService;
use crate::services::session::SessionRegistry;

/// Returned by signup and login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: AccountProfile,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct AuthService {
    repository: Arc<dyn Repository>,
    sessions: Arc<SessionRegistry>,
    gate: Arc<EmailAdmissionGate>,
    hasher: Arc<dyn CredentialHasher>,
    clock: Arc<dyn Clock>,
    baseline: u32,
    dummy_hash: OnceLock<String>,
}

impl AuthService {
    pub fn new(
        repository: Arc<dyn Repository>,
        sessions: Arc<SessionRegistry>,
        gate: Arc<EmailAdmissionGate>,
        hasher: Arc<dyn CredentialHasher>,
        clock: Arc<dyn Clock>,
        baseline: u32,
    ) -> Self {
        Self {
            repository,
            sessions,
            gate,
            hasher,
            clock,
            baseline,
            dummy_hash: OnceLock::new(),
        }
    }

    /// Create a free account holding the baseline allowance and log it in
    pub fn signup(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let account = self.register(email, password, UserType::Free)?;
        let issued = self.sessions.issue(account.id)?;
        info!(account_id = %account.id, "account created");

        Ok(AuthResponse {
            user: AccountProfile::from(&account),
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }

    /// Verify credentials and issue a new session
    pub fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        require_fields(email, password)?;
        self.gate.check(email)?;

        let account = match self.repository.get_account_by_email(&normalize_email(email))? {
            Some(account) => account,
            None => {
                // Spend the same effort as a real check so timing does not
                // reveal whether the email is registered
                if let Some(dummy) = self.dummy_hash() {
                    let _ = self.hasher.verify(password, dummy);
                }
                return Err(Error::invalid_credentials());
            }
        };
        if !self.hasher.verify(password, &account.password_hash) {
            return Err(Error::invalid_credentials());
        }

        let issued = self.sessions.issue(account.id)?;
        info!(account_id = %account.id, "logged in");
        Ok(AuthResponse {
            user: AccountProfile::from(&account),
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }

    /// Revoke the session behind `token`. Unknown tokens are not an error.
    pub fn logout(&self, token: &str) -> Result<()> {
        self.sessions.revoke(token)
    }

    /// Create an administrator account. No session is issued.
    pub fn create_admin(&self, email: &str, password: &str) -> Result<AccountProfile> {
        let account = self.register(email, password, UserType::Admin)?;
        info!(account_id = %account.id, "admin account created");
        Ok(AccountProfile::from(&account))
    }

    fn register(&self, email: &str, password: &str, user_type: UserType) -> Result<Account> {
        require_fields(email, password)?;
        self.gate.check(email)?;

        let email = normalize_email(email);
        if self.repository.get_account_by_email(&email)?.is_some() {
            return Err(Error::Conflict("User already exists".to_string()));
        }

        let password_hash = self.hasher.hash(password)?;
        let mut account = Account::new(&email, password_hash, self.baseline);
        account.user_type = user_type;
        let now = self.clock.now();
        account.created_at = now;
        account.updated_at = now;

        // Unique email index catches a concurrent signup that passed the check above
        self.repository
            .create_account(&account, &LedgerService::opening_entry(&account))?;
        Ok(account)
    }

    fn dummy_hash(&self) -> Option<&String> {
        if let Some(hash) = self.dummy_hash.get() {
            return Some(hash);
        }
        let hash = self.hasher.hash("tessera-dummy-password").ok()?;
        Some(self.dummy_hash.get_or_init(|| hash))
    }
}

fn require_fields(email: &str, password: &str) -> Result<()> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(Error::validation("Email and password are required"));
    }
    Ok(())
}
