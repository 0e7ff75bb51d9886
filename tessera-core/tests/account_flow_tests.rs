//! Integration tests for signup, sessions, purchases and the doctor checks
//!
//! Uses a real DuckDB file and a manual clock so session expiry can be
//! exercised without sleeping.
//!
//! Run with: cargo test --test account_flow_tests -- --nocapture

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;

use tessera_core::adapters::{Argon2CredentialHasher, DuckDbRepository, ManualClock};
use tessera_core::config::Config;
use tessera_core::domain::TransactionType;
use tessera_core::ports::Repository;
use tessera_core::{Error, TesseraContext, UserType};

const PASSWORD: &str = "correct horse battery";

// ============================================================================
// Test Helpers
// ============================================================================

fn create_context(temp_dir: &TempDir) -> (TesseraContext, Arc<ManualClock>) {
    let config = Config::load(temp_dir.path()).expect("Failed to load config");
    let repo = DuckDbRepository::new(&temp_dir.path().join("test.duckdb"))
        .expect("Failed to create repository");
    repo.ensure_schema().expect("Failed to initialize schema");

    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()));
    let hasher = Argon2CredentialHasher::with_params(1024, 1, 1).expect("hasher params");
    let ctx = TesseraContext::assemble(config, Arc::new(repo), clock.clone(), Arc::new(hasher))
        .expect("Failed to assemble context");
    (ctx, clock)
}

// ============================================================================
// Signup and Login
// ============================================================================

#[test]
fn test_signup_then_login() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = create_context(&temp_dir);

    let signup = ctx.auth_service.signup("New.User@Example.com", PASSWORD).unwrap();
    assert_eq!(signup.user.email, "new.user@example.com");
    assert_eq!(signup.user.credits_remaining, 5);
    assert_eq!(signup.user.user_type, UserType::Free);
    assert!(!signup.user.subscribed);

    let login = ctx.auth_service.login("new.user@example.com", PASSWORD).unwrap();
    assert_eq!(login.user.id, signup.user.id);
    assert_ne!(login.token, signup.token);
}

#[test]
fn test_duplicate_email_conflicts() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = create_context(&temp_dir);
    ctx.auth_service.signup("dup@example.com", PASSWORD).unwrap();

    let err = ctx.auth_service.signup("DUP@example.com", PASSWORD).unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(ctx.repository.count_accounts(None).unwrap(), 1);
}

#[test]
fn test_disposable_email_rejected_before_any_write() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = create_context(&temp_dir);

    let err = ctx.auth_service.signup("someone@mailinator.com", PASSWORD).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    let err = ctx.auth_service.signup("not-an-email", PASSWORD).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(ctx.repository.count_accounts(None).unwrap(), 0);
}

#[test]
fn test_login_failures_are_indistinguishable() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = create_context(&temp_dir);
    ctx.auth_service.signup("real@example.com", PASSWORD).unwrap();

    let wrong_password = ctx.auth_service.login("real@example.com", "nope").unwrap_err();
    let unknown_email = ctx.auth_service.login("ghost@example.com", PASSWORD).unwrap_err();
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    assert!(matches!(wrong_password, Error::Auth(_)));
}

#[test]
fn test_missing_fields_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = create_context(&temp_dir);

    assert!(matches!(
        ctx.auth_service.signup("a@example.com", "").unwrap_err(),
        Error::Validation(_)
    ));
    assert!(matches!(
        ctx.auth_service.signup("   ", PASSWORD).unwrap_err(),
        Error::Validation(_)
    ));
}

// ============================================================================
// Sessions
// ============================================================================

#[test]
fn test_token_resolves_to_account() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = create_context(&temp_dir);
    let signup = ctx.auth_service.signup("session@example.com", PASSWORD).unwrap();

    let account = ctx.authenticate(&signup.token).unwrap();
    assert_eq!(account.id, signup.user.id);
    assert_eq!(account.email, "session@example.com");
}

#[test]
fn test_logout_revokes_token() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = create_context(&temp_dir);
    let signup = ctx.auth_service.signup("logout@example.com", PASSWORD).unwrap();
    let other = ctx.auth_service.login("logout@example.com", PASSWORD).unwrap();

    ctx.auth_service.logout(&signup.token).unwrap();
    assert!(matches!(ctx.authenticate(&signup.token).unwrap_err(), Error::Auth(_)));
    // Other sessions of the same account survive
    assert!(ctx.authenticate(&other.token).is_ok());
    // Logging out twice is fine
    ctx.auth_service.logout(&signup.token).unwrap();
}

#[test]
fn test_revoke_all_ends_every_session() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = create_context(&temp_dir);
    let first = ctx.auth_service.signup("all@example.com", PASSWORD).unwrap();
    let second = ctx.auth_service.login("all@example.com", PASSWORD).unwrap();

    let revoked = ctx.session_registry.revoke_all(first.user.id).unwrap();
    assert_eq!(revoked, 2);
    assert!(ctx.authenticate(&first.token).is_err());
    assert!(ctx.authenticate(&second.token).is_err());
}

#[test]
fn test_token_expires_after_ttl() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, clock) = create_context(&temp_dir);
    let signup = ctx.auth_service.signup("expiry@example.com", PASSWORD).unwrap();

    clock.advance(Duration::days(6));
    assert!(ctx.authenticate(&signup.token).is_ok());

    clock.advance(Duration::days(1) + Duration::seconds(1));
    assert!(matches!(ctx.authenticate(&signup.token).unwrap_err(), Error::Auth(_)));

    assert_eq!(ctx.session_registry.purge_expired().unwrap(), 1);
    assert_eq!(ctx.session_registry.purge_expired().unwrap(), 0);
}

#[test]
fn test_tampered_token_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = create_context(&temp_dir);
    let signup = ctx.auth_service.signup("tamper@example.com", PASSWORD).unwrap();

    // Claims payload edited, signature left as issued
    let (payload, signature) = signup.token.split_once('.').unwrap();
    let first = if payload.starts_with('e') { 'f' } else { 'e' };
    let tampered = format!("{}{}.{}", first, &payload[1..], signature);

    assert!(matches!(ctx.authenticate(&tampered).unwrap_err(), Error::Auth(_)));
    assert!(matches!(ctx.authenticate("garbage").unwrap_err(), Error::Auth(_)));
    assert!(matches!(ctx.authenticate("").unwrap_err(), Error::Auth(_)));
}

#[test]
fn test_unrepresentable_ttl_fails_assembly() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::load(temp_dir.path()).unwrap();
    config.session_ttl_days = i64::MAX;
    let repo = DuckDbRepository::new(&temp_dir.path().join("test.duckdb")).unwrap();
    repo.ensure_schema().unwrap();
    let hasher = Argon2CredentialHasher::with_params(1024, 1, 1).unwrap();

    let result = TesseraContext::assemble(
        config,
        Arc::new(repo),
        Arc::new(ManualClock::new(Utc::now())),
        Arc::new(hasher),
    );
    assert!(result.is_err());
}

// ============================================================================
// Purchases and Subscriptions
// ============================================================================

#[test]
fn test_purchase_credits_package() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = create_context(&temp_dir);
    let signup = ctx.auth_service.signup("buyer@example.com", PASSWORD).unwrap();
    let account = ctx.authenticate(&signup.token).unwrap();

    let packages = ctx.purchase_service.list_packages().unwrap();
    assert_eq!(packages.len(), 3);
    let package = &packages[0];

    let receipt = ctx.purchase_service.purchase(&account, package.id).unwrap();
    assert_eq!(receipt.credits_purchased, package.credits);
    assert_eq!(receipt.credits_remaining, 5 + package.credits);
    assert_eq!(ctx.repository.count_purchases(account.id).unwrap(), 1);

    let latest = ctx.repository.get_latest_ledger_entry(account.id).unwrap().unwrap();
    assert_eq!(latest.transaction_type, TransactionType::Purchase);
    assert_eq!(latest.credits_added, package.credits);
    assert!(ctx.ledger_service.is_reconciled(account.id).unwrap());
}

#[test]
fn test_unknown_package_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = create_context(&temp_dir);
    let signup = ctx.auth_service.signup("nopkg@example.com", PASSWORD).unwrap();
    let account = ctx.authenticate(&signup.token).unwrap();

    let err = ctx.purchase_service.purchase(&account, 9999).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(ctx.repository.count_purchases(account.id).unwrap(), 0);
}

#[test]
fn test_subscribe_validates_plan() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = create_context(&temp_dir);
    let signup = ctx.auth_service.signup("plan@example.com", PASSWORD).unwrap();

    let err = ctx.purchase_service.subscribe(signup.user.id, "lifetime").unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let account = ctx.purchase_service.subscribe(signup.user.id, "yearly").unwrap();
    assert!(account.subscribed);
    assert_eq!(account.subscription_plan.as_deref(), Some("yearly"));
    assert!(account.subscription_date.is_some());
}

#[test]
fn test_overview_lists_recent_entries_and_costs() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = create_context(&temp_dir);
    let signup = ctx.auth_service.signup("overview@example.com", PASSWORD).unwrap();
    let account = ctx.authenticate(&signup.token).unwrap();
    ctx.usage_service.track(&account, Some("download_png")).unwrap();

    let overview = ctx.usage_service.overview(&account).unwrap();
    assert_eq!(overview.credits_remaining, 3);
    assert_eq!(overview.recent_transactions.len(), 2);
    assert_eq!(overview.recent_transactions[0].action_type, "download_png");
    assert_eq!(overview.credit_costs.get("download_pdf"), Some(&3));
}

// ============================================================================
// Admin Views
// ============================================================================

#[test]
fn test_admin_stats_and_user_search() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = create_context(&temp_dir);
    let admin_profile = ctx.auth_service.create_admin("boss@example.com", PASSWORD).unwrap();
    let admin = ctx.repository.get_account_by_id(admin_profile.id).unwrap().unwrap();
    ctx.auth_service.signup("alice@example.com", PASSWORD).unwrap();
    let bob = ctx.auth_service.signup("bob@example.com", PASSWORD).unwrap();
    ctx.purchase_service.subscribe(bob.user.id, "monthly").unwrap();

    let stats = ctx.admin_service.stats(&admin).unwrap();
    assert_eq!(stats.total_users, 3);
    assert_eq!(stats.subscribed_users, 1);
    assert_eq!(stats.total_credits_in_circulation, 15);

    let page = ctx.admin_service.list_users(&admin, Some("ALICE"), 1, 10).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.users[0].email, "alice@example.com");

    let everyone = ctx.admin_service.list_users(&admin, None, 1, 2).unwrap();
    assert_eq!(everyone.users.len(), 2);
    assert_eq!(everyone.pages, 2);
}

// ============================================================================
// Doctor
// ============================================================================

#[test]
fn test_doctor_passes_on_healthy_ledger() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = create_context(&temp_dir);
    ctx.auth_service.signup("healthy@example.com", PASSWORD).unwrap();

    let result = ctx.doctor_service.run_checks().unwrap();
    assert_eq!(result.summary.errors, 0);
    assert_eq!(result.summary.warnings, 0);
    assert_eq!(result.checks["ledger_reconciliation"].status, "pass");
}

#[test]
fn test_doctor_warns_about_expired_sessions() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, clock) = create_context(&temp_dir);
    ctx.auth_service.signup("stale@example.com", PASSWORD).unwrap();
    clock.advance(Duration::days(30));

    let result = ctx.doctor_service.run_checks().unwrap();
    assert_eq!(result.checks["expired_sessions"].status, "warning");
    assert_eq!(result.summary.warnings, 1);

    ctx.session_registry.purge_expired().unwrap();
    let result = ctx.doctor_service.run_checks().unwrap();
    assert_eq!(result.checks["expired_sessions"].status, "pass");
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_context_reopens_existing_data_dir() {
    let temp_dir = TempDir::new().unwrap();
    let token = {
        let ctx = TesseraContext::new(temp_dir.path()).unwrap();
        ctx.auth_service.signup("persist@example.com", PASSWORD).unwrap().token
    };

    // Same directory, same generated secret, same database
    let ctx = TesseraContext::new(temp_dir.path()).unwrap();
    let account = ctx.authenticate(&token).unwrap();
    assert_eq!(account.email, "persist@example.com");
    assert!(ctx.repository.pending_migrations().unwrap().is_empty());
}
