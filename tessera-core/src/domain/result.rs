//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Uniform message for every credential or token failure, so callers
/// cannot tell an unknown email from a wrong password.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const INVALID_TOKEN: &str = "Invalid token";

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input or a disposable email, rejected before any mutation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Bad credentials or an invalid, expired or revoked token
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Expected outcome rather than a fault; carries what the caller needs
    /// to present an upgrade path.
    #[error("Insufficient credits: {credits_remaining} remaining, {cost} required")]
    InsufficientCredits { credits_remaining: u32, cost: u32 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_credentials() -> Self {
        Self::Auth(INVALID_CREDENTIALS.to_string())
    }

    pub fn invalid_token() -> Self {
        Self::Auth(INVALID_TOKEN.to_string())
    }

    /// True for errors caused by the request (4xx-equivalent), false for
    /// storage and environment failures (500-equivalent).
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Error::Database(_) | Error::Config(_) | Error::Io(_) | Error::Json(_)
        )
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }

    /// Create a failed result with context
    pub fn fail_with_context(
        error: impl Into<String>,
        context: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: Some(context),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(Error::InsufficientCredits { credits_remaining, cost }) => {
                let mut context = HashMap::new();
                context.insert("credits_remaining".to_string(), credits_remaining.into());
                context.insert("cost".to_string(), cost.into());
                Self::fail_with_context("Insufficient credits", context)
            }
            Err(e) => Self::fail(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_result_ok() {
        let result: OperationResult<i32> = OperationResult::ok(42);
        assert!(result.success);
        assert_eq!(result.data, Some(42));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_insufficient_credits_keeps_balance_and_cost() {
        let err: Result<i32> = Err(Error::InsufficientCredits {
            credits_remaining: 1,
            cost: 3,
        });
        let result: OperationResult<i32> = err.into();
        assert!(!result.success);
        let context = result.context.unwrap();
        assert_eq!(context["credits_remaining"], 1);
        assert_eq!(context["cost"], 3);
    }

    #[test]
    fn test_from_result() {
        let err: Result<i32> = Err(Error::validation("bad input"));
        let result: OperationResult<i32> = err.into();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Validation error"));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::invalid_token().is_client_error());
        assert!(Error::InsufficientCredits { credits_remaining: 0, cost: 1 }.is_client_error());
        assert!(!Error::database("connection lost").is_client_error());
    }

    #[test]
    fn test_auth_messages_are_uniform() {
        assert_eq!(
            Error::invalid_credentials().to_string(),
            "Authentication error: Invalid credentials"
        );
        assert_eq!(Error::invalid_token().to_string(), "Authentication error: Invalid token");
    }
}
