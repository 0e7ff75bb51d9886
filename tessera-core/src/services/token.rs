//! Signed bearer tokens
//!
//! Format: `base64url(json claims) "." base64url(hmac-sha256)`, no padding.
//! The signature is computed over the encoded claims segment.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::domain::result::{Error, Result};
use crate::domain::SessionClaims;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies session tokens with a shared secret
pub struct TokenSigner {
    secret: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret: &[u8]) -> Result<Self> {
        if secret.len() < 16 {
            return Err(Error::Config(
                "session secret must be at least 16 bytes".to_string(),
            ));
        }
        Ok(Self {
            secret: secret.to_vec(),
        })
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| Error::Config(format!("invalid session secret: {}", e)))
    }

    pub fn sign(&self, claims: &SessionClaims) -> Result<String> {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{}.{}", payload, signature))
    }

    /// Check the signature and decode the claims. Expiry is not checked here.
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        let (payload, signature) = token.split_once('.').ok_or_else(Error::invalid_token)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| Error::invalid_token())?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        // Constant-time comparison
        mac.verify_slice(&signature)
            .map_err(|_| Error::invalid_token())?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| Error::invalid_token())?;
        serde_json::from_slice(&json).map_err(|_| Error::invalid_token())
    }
}

/// Storage key for a token; the plaintext is never persisted
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn signer() -> TokenSigner {
        TokenSigner::new(b"0123456789abcdef0123456789abcdef").unwrap()
    }

    fn claims() -> SessionClaims {
        SessionClaims {
            sub: Uuid::new_v4(),
            iat: 1_700_000_000,
            exp: 1_700_604_800,
            jti: "nonce".to_string(),
        }
    }

    #[test]
    fn test_sign_then_verify() {
        let claims = claims();
        let token = signer().sign(&claims).unwrap();
        assert_eq!(signer().verify(&token).unwrap(), claims);
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let token = signer().sign(&claims()).unwrap();
        let (_, signature) = token.split_once('.').unwrap();
        let mut forged = claims();
        forged.exp += 86_400;
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let forged_token = format!("{}.{}", forged_payload, signature);
        assert!(matches!(signer().verify(&forged_token), Err(Error::Auth(_))));
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = signer().sign(&claims()).unwrap();
        let other = TokenSigner::new(b"ffffffffffffffffffffffffffffffff").unwrap();
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        for bad in ["", "no-dot", "a.b", "....", "!!!.???"] {
            assert!(signer().verify(bad).is_err(), "{} should not verify", bad);
        }
    }

    #[test]
    fn test_short_secret_refused() {
        assert!(matches!(TokenSigner::new(b"short"), Err(Error::Config(_))));
    }

    #[test]
    fn test_hash_token_is_stable_hex() {
        let hash = hash_token("abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("abc"));
        assert_ne!(hash, hash_token("abd"));
    }
}
