//! Tessera Core - credit metering for billable exports
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Account, LedgerEntry, Session, etc.)
//! - **ports**: Trait definitions for external dependencies (Repository, Clock, ...)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB, Argon2id, ...)

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;
pub mod migrations;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;

use adapters::{Argon2CredentialHasher, DuckDbRepository, StubPaymentProcessor, SystemClock};
use config::Config;
use ports::{Clock, CredentialHasher, Repository};
use services::*;

// Re-export commonly used types at crate root
pub use domain::{
    Account, AccountProfile, BulkResetReport, LedgerEntry, LedgerPage, TransactionType, UserType,
};
pub use domain::result::{Error, OperationResult};

/// Database file inside the data directory
pub const DB_FILENAME: &str = "tessera.duckdb";

/// Main context for Tessera operations
///
/// This is the primary entry point for all business logic. It holds
/// the database connection, configuration, and all services.
pub struct TesseraContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub clock: Arc<dyn Clock>,
    pub ledger_service: Arc<LedgerService>,
    pub session_registry: Arc<SessionRegistry>,
    pub entitlement_resolver: Arc<EntitlementResolver>,
    pub usage_service: UsageService,
    pub purchase_service: PurchaseService,
    pub admin_service: AdminService,
    pub auth_service: AuthService,
    pub doctor_service: DoctorService,
}

impl TesseraContext {
    /// Create a new Tessera context for a data directory
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create data directory {}", dir.display()))?;
        let config = Config::load(dir)?;

        let repository = Arc::new(DuckDbRepository::new(&dir.join(DB_FILENAME))?);
        repository.ensure_schema()?;

        Self::assemble(
            config,
            repository,
            Arc::new(SystemClock),
            Arc::new(Argon2CredentialHasher::new()),
        )
    }

    /// Wire services over an already-migrated repository
    pub fn assemble(
        config: Config,
        repository: Arc<DuckDbRepository>,
        clock: Arc<dyn Clock>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Result<Self> {
        let store: Arc<dyn Repository> = repository.clone();
        let signer = TokenSigner::new(&config.session_secret_bytes()?)?;
        let baseline = config.free_credit_allowance;
        let session_ttl = Duration::try_days(config.session_ttl_days)
            .filter(|ttl| *ttl > Duration::zero())
            .with_context(|| format!("invalid session TTL: {} days", config.session_ttl_days))?;

        let ledger_service = Arc::new(LedgerService::new(Arc::clone(&store), Arc::clone(&clock)));
        let session_registry = Arc::new(SessionRegistry::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            signer,
            session_ttl,
        ));
        let entitlement_resolver = Arc::new(EntitlementResolver::new(
            Arc::clone(&ledger_service),
            config.action_costs(),
        ));
        let gate = Arc::new(EmailAdmissionGate::with_extra(
            &config.disposable_domains,
            &config.disposable_keywords,
        ));

        let usage_service = UsageService::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            Arc::clone(&entitlement_resolver),
        );
        let purchase_service = PurchaseService::new(
            Arc::clone(&store),
            Arc::clone(&ledger_service),
            Arc::new(StubPaymentProcessor),
            Arc::clone(&clock),
            config.subscription_plans.clone(),
        );
        let admin_service = AdminService::new(
            Arc::clone(&store),
            Arc::clone(&ledger_service),
            Arc::clone(&clock),
            baseline,
        );
        let auth_service = AuthService::new(
            Arc::clone(&store),
            Arc::clone(&session_registry),
            gate,
            hasher,
            Arc::clone(&clock),
            baseline,
        );
        let doctor_service = DoctorService::new(Arc::clone(&store), Arc::clone(&clock));

        Ok(Self {
            config,
            repository,
            clock,
            ledger_service,
            session_registry,
            entitlement_resolver,
            usage_service,
            purchase_service,
            admin_service,
            auth_service,
            doctor_service,
        })
    }

    /// Resolve a bearer token to its account
    pub fn authenticate(&self, token: &str) -> domain::result::Result<Account> {
        self.session_registry.validate(token)
    }
}
