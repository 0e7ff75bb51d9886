//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod clock;
mod credentials;
mod payment;
mod repository;

pub use clock::Clock;
pub use credentials::CredentialHasher;
pub use payment::{PaymentConfirmation, PaymentProcessor};
pub use repository::{LedgerActivity, ReconciliationMismatch, Repository};
