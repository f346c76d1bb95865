//! # DomainError
//!
//! Centralized error handling for the blogsite crates.
//! Every expected business-rule violation is returned as one of these
//! variants, carrying the message that is shown to the user.

use thiserror::Error;

/// The primary error type for all domain and service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or rule-breaking input (e.g., empty comment, too many images)
    #[error("{0}")]
    Validation(String),

    /// An id that does not resolve (e.g., Post, Comment, table record)
    #[error("{0}")]
    NotFound(String),

    /// The acting user lacks permission (wrong author, non-admin, protected admin row)
    #[error("{0}")]
    Forbidden(String),

    /// Duplicate email/username, wrong current password
    #[error("{0}")]
    Conflict(String),

    /// Mail or media service failure
    #[error("{0}")]
    Upstream(String),

    /// Verification code missing, expired, already used or mismatched.
    /// The message never says which.
    #[error("{0}")]
    Expired(String),

    /// Infrastructure failure (e.g., database error)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The single outcome for every failed verification-code check.
    pub fn invalid_code() -> Self {
        Self::Expired("The verification code is invalid or expired.".into())
    }
}

/// A specialized Result type for domain logic.
pub type Result<T> = std::result::Result<T, DomainError>;

/// A successful use case: the produced value plus the message flashed to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T = ()> {
    pub value: T,
    pub message: String,
}

impl<T> Outcome<T> {
    pub fn new(value: T, message: impl Into<String>) -> Self {
        Self { value, message: message.into() }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome { value: f(self.value), message: self.message }
    }
}

impl Outcome<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self { value: (), message: message.into() }
    }
}
