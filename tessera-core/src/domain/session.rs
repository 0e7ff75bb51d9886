//! Session domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A live binding between a bearer token and an account.
///
/// Only a hash of the token is stored. Deleting the row revokes the token
/// even though its signature keeps verifying until `expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token_hash: String,
    pub account_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Claims carried inside a signed token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account id
    pub sub: Uuid,
    /// Issued at, unix seconds
    pub iat: i64,
    /// Expires at, unix seconds
    pub exp: i64,
    /// Random nonce, makes two tokens issued in the same second distinct
    pub jti: String,
}

/// A freshly issued token. The plaintext token is only ever seen here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_session_expiry_boundary() {
        let issued_at = Utc::now();
        let session = Session {
            token_hash: "h".to_string(),
            account_id: Uuid::new_v4(),
            issued_at,
            expires_at: issued_at + Duration::days(7),
        };
        assert!(!session.is_expired(issued_at + Duration::days(6)));
        assert!(session.is_expired(issued_at + Duration::days(7)));
    }
}
