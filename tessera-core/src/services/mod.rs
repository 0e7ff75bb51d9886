//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod admin;
pub mod admission;
pub mod auth;
pub mod billing;
mod doctor;
pub mod entitlement;
pub mod ledger;
pub mod migration;
pub mod session;
pub mod token;
pub mod usage;

pub use admin::{AccountSummary, AdminService, AdminStats, UserPage};
pub use admission::{Admission, EmailAdmissionGate, RejectReason};
pub use auth::{AuthResponse, AuthService};
pub use billing::PurchaseService;
pub use doctor::{CheckResult, DoctorResult, DoctorService, DoctorSummary};
pub use entitlement::{ActionCosts, Entitlement, EntitlementResolver};
pub use ledger::LedgerService;
pub use migration::{MigrationResult, MigrationService};
pub use session::SessionRegistry;
pub use token::TokenSigner;
pub use usage::{CreditsOverview, UsageReceipt, UsageService};
