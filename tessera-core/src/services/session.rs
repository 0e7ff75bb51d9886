//! Session registry - issue, validate and revoke bearer tokens
//!
//! A token is valid only while its signature verifies, its expiry has not
//! passed, and the session row it hashes to still exists. Deleting the row
//! (logout) therefore takes effect immediately.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, IssuedSession, Session, SessionClaims};
use crate::ports::{Clock, Repository};
use crate::services::token::{hash_token, TokenSigner};

pub struct SessionRegistry {
    repository: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
    signer: TokenSigner,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(
        repository: Arc<dyn Repository>,
        clock: Arc<dyn Clock>,
        signer: TokenSigner,
        ttl: Duration,
    ) -> Self {
        Self {
            repository,
            clock,
            signer,
            ttl,
        }
    }

    /// Sign a token for an account and persist its session row
    pub fn issue(&self, account_id: Uuid) -> Result<IssuedSession> {
        if self.repository.get_account_by_id(account_id)?.is_none() {
            return Err(Error::not_found("User not found"));
        }

        let issued_at = self.clock.now();
        let expires_ts = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| Error::Config("session TTL out of range".to_string()))?
            .timestamp();
        // Truncated to whole seconds so the row and the claims agree
        let expires_at = DateTime::<Utc>::from_timestamp(expires_ts, 0)
            .ok_or_else(|| Error::Config("session expiry out of range".to_string()))?;

        let nonce: [u8; 16] = rand::thread_rng().gen();
        let claims = SessionClaims {
            sub: account_id,
            iat: issued_at.timestamp(),
            exp: expires_ts,
            jti: hex::encode(nonce),
        };
        let token = self.signer.sign(&claims)?;

        self.repository.insert_session(&Session {
            token_hash: hash_token(&token),
            account_id,
            issued_at,
            expires_at,
        })?;
        info!(%account_id, %expires_at, "session issued");

        Ok(IssuedSession { token, expires_at })
    }

    /// Resolve a token to its account, or fail with a uniform `Auth` error
    pub fn validate(&self, token: &str) -> Result<Account> {
        let claims = self.signer.verify(token)?;
        let now = self.clock.now();
        if now.timestamp() >= claims.exp {
            debug!(account_id = %claims.sub, "token expired");
            return Err(Error::invalid_token());
        }

        let session = self
            .repository
            .get_session(&hash_token(token))?
            .ok_or_else(|| {
                debug!(account_id = %claims.sub, "no live session for token");
                Error::invalid_token()
            })?;
        if session.account_id != claims.sub || session.is_expired(now) {
            return Err(Error::invalid_token());
        }

        self.repository
            .get_account_by_id(claims.sub)?
            .ok_or_else(Error::invalid_token)
    }

    /// Delete the session for a token. Unknown tokens are ignored.
    pub fn revoke(&self, token: &str) -> Result<()> {
        if self.repository.delete_session(&hash_token(token))? {
            debug!("session revoked");
        }
        Ok(())
    }

    /// Delete every session of an account
    pub fn revoke_all(&self, account_id: Uuid) -> Result<u64> {
        let removed = self.repository.delete_sessions_for_account(account_id)?;
        info!(%account_id, removed, "sessions revoked");
        Ok(removed)
    }

    /// Delete session rows whose expiry has passed
    pub fn purge_expired(&self) -> Result<u64> {
        let removed = self.repository.delete_expired_sessions(self.clock.now())?;
        if removed > 0 {
            info!(removed, "expired sessions purged");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{DuckDbRepository, ManualClock};
    use crate::services::ledger::LedgerService;
    use chrono::TimeZone;

    fn registry(ttl: Duration) -> (SessionRegistry, Uuid) {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        let account = Account::new("session@example.com", "hash", 5);
        repo.create_account(&account, &LedgerService::opening_entry(&account))
            .unwrap();

        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
        let signer = TokenSigner::new(b"0123456789abcdef0123456789abcdef").unwrap();
        let registry = SessionRegistry::new(Arc::new(repo), Arc::new(clock), signer, ttl);
        (registry, account.id)
    }

    #[test]
    fn test_issue_then_validate() {
        let (registry, account_id) = registry(Duration::days(7));
        let issued = registry.issue(account_id).unwrap();
        assert_eq!(
            issued.expires_at,
            Utc.with_ymd_and_hms(2026, 3, 8, 9, 0, 0).unwrap()
        );
        assert_eq!(registry.validate(&issued.token).unwrap().id, account_id);
    }

    #[test]
    fn test_unrepresentable_expiry_is_config_error() {
        let (registry, account_id) = registry(Duration::days(1_000_000_000));
        let err = registry.issue(account_id).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
