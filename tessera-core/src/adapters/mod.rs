//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the Repository port
//! - Argon2id for CredentialHasher
//! - System and manual clocks for Clock
//! - An always-approving stub for PaymentProcessor

pub mod clock;
pub mod duckdb;
pub mod password;
pub mod payment;

pub use self::clock::{ManualClock, SystemClock};
pub use self::duckdb::DuckDbRepository;
pub use self::password::Argon2CredentialHasher;
pub use self::payment::StubPaymentProcessor;
