//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
pub mod admin;
pub mod ledger;
mod package;
mod session;
pub mod result;

pub use account::{normalize_email, Account, AccountProfile, UserType};
pub use admin::{AdminAction, AdminAdjustment, AdminCreditAction, AdminCreditRequest, BulkResetReport};
pub use ledger::{BalanceChange, LedgerEntry, LedgerPage, LedgerPosting, PostingOutcome, TransactionType};
pub use package::{CreditPackage, CreditPurchase, PurchaseReceipt, SubscriptionPlan};
pub use session::{IssuedSession, Session, SessionClaims};
