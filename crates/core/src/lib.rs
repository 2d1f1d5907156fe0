//! Shared primitives for all Rust crates in Keystone.

#![forbid(unsafe_code)]

/// Token failure reasons shared across services.
pub mod auth;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::TokenFailure;

/// Result type used across Keystone crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// No usable credentials were presented.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Presented token was rejected.
    #[error("token rejected: {0}")]
    Token(TokenFailure),

    /// Authenticated subject lacks one or more required permissions.
    #[error("missing permissions: {}", missing.join(", "))]
    InsufficientPermission {
        /// Requested permission names the subject does not hold.
        missing: Vec<String>,
    },

    /// Subject does not actively hold the referenced role.
    #[error("missing role: {0}")]
    MissingRole(String),

    /// Credential store could not be reached or failed mid-operation.
    #[error("credential store unavailable: {0}")]
    StoreUnavailable(String),

    /// Shared cache could not be reached or failed mid-operation.
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns whether callers may retry the failed operation.
    ///
    /// Only infrastructure outages qualify.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::CacheUnavailable(_))
    }
}

impl From<TokenFailure> for AppError {
    fn from(value: TokenFailure) -> Self {
        Self::Token(value)
    }
}
