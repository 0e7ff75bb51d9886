//! Credential hashing port

use crate::domain::result::Result;

/// Opaque password hashing capability
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext password into a self-describing string
    fn hash(&self, plaintext: &str) -> Result<String>;

    /// Check a plaintext password against a stored hash.
    ///
    /// A malformed hash verifies as `false`.
    fn verify(&self, plaintext: &str, hash: &str) -> bool;
}
