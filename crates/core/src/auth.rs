use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Reasons a presented session token is rejected.
///
/// None of these are retried automatically; the client must refresh or
/// re-authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenFailure {
    /// Signature did not verify or the token is malformed.
    InvalidSignature,
    /// Token lifetime has elapsed.
    Expired,
    /// Token hash is present in the blacklist.
    Revoked,
    /// Refresh token does not match the live entry for its session.
    SessionMismatch,
}

impl TokenFailure {
    /// Returns the stable reason code exposed to clients.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSignature => "INVALID_TOKEN",
            Self::Expired => "TOKEN_EXPIRED",
            Self::Revoked | Self::SessionMismatch => "SESSION_INVALID",
        }
    }
}

impl Display for TokenFailure {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::InvalidSignature => "invalid token signature",
            Self::Expired => "token has expired",
            Self::Revoked => "token has been revoked",
            Self::SessionMismatch => "refresh token does not match the active session",
        };

        formatter.write_str(message)
    }
}
