//! Session token issuance, verification, rotation and revocation.
//!
//! Access and refresh tokens are stateless signed credentials. The only
//! shared state lives in the [`SessionCache`]: the live refresh token per
//! session, the session-id set per user, and hashes of revoked access tokens.

use std::sync::Arc;

use keystone_core::{AppError, AppResult, TokenFailure};
use keystone_domain::{SessionClaims, SessionId, TokenClaims, UserClass, UserId};

use crate::auth_ports::{Clock, IdGenerator, SessionCache, TokenCodec, TokenKind};

mod issue;
mod refresh;
mod revoke;
mod token_hash;
mod verify;


pub use token_hash::hash_token;

/// Upper bound for either token lifetime; one year.
pub const MAX_TOKEN_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

/// Lifetimes applied by [`TokenService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSettings {
    /// Access token lifetime in seconds.
    pub access_ttl_seconds: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_ttl_seconds: i64,
    /// Lower bound for blacklist entry ttl.
    pub blacklist_min_ttl_seconds: u64,
}

impl TokenSettings {
    /// Validates the lifetimes.
    pub fn validate(self) -> AppResult<Self> {
        if self.access_ttl_seconds <= 0 || self.refresh_ttl_seconds <= 0 {
            return Err(AppError::Validation(
                "token lifetimes must be positive".to_owned(),
            ));
        }

        if self.access_ttl_seconds > MAX_TOKEN_TTL_SECONDS
            || self.refresh_ttl_seconds > MAX_TOKEN_TTL_SECONDS
        {
            return Err(AppError::Validation(format!(
                "token lifetimes must not exceed {MAX_TOKEN_TTL_SECONDS} seconds"
            )));
        }

        if self.refresh_ttl_seconds < self.access_ttl_seconds {
            return Err(AppError::Validation(
                "refresh token lifetime must not be shorter than access token lifetime"
                    .to_owned(),
            ));
        }

        Ok(Self {
            blacklist_min_ttl_seconds: self.blacklist_min_ttl_seconds.max(1),
            ..self
        })
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            access_ttl_seconds: 15 * 60,
            refresh_ttl_seconds: 7 * 24 * 60 * 60,
            blacklist_min_ttl_seconds: 1,
        }
    }
}

/// Signed token pair returned by issuance and rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Short-lived request credential.
    pub access_token: String,
    /// Single-use rotation credential.
    pub refresh_token: String,
    /// Seconds until the access token expires.
    pub access_expires_in: i64,
    /// Seconds until the refresh token expires.
    pub refresh_expires_in: i64,
    /// Session both tokens belong to.
    pub session_id: SessionId,
}

/// Application service owning every token lifecycle transition.
#[derive(Clone)]
pub struct TokenService {
    codec: Arc<dyn TokenCodec>,
    cache: Arc<dyn SessionCache>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    settings: TokenSettings,
}

impl TokenService {
    /// Creates a token service from its ports.
    #[must_use]
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        cache: Arc<dyn SessionCache>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        settings: TokenSettings,
    ) -> Self {
        Self {
            codec,
            cache,
            clock,
            ids,
            settings,
        }
    }

    /// Returns the configured lifetimes.
    #[must_use]
    pub fn settings(&self) -> TokenSettings {
        self.settings
    }

    /// Builds base claims for a fresh login session.
    pub fn new_session_claims(&self, sub: UserId, class: UserClass) -> AppResult<SessionClaims> {
        let session_id = SessionId::new(self.ids.next_id().to_string())?;
        Ok(SessionClaims {
            sub,
            session_id,
            class,
        })
    }

    fn now_seconds(&self) -> i64 {
        self.clock.now().timestamp()
    }

    fn decode_unexpired(&self, kind: TokenKind, token: &str) -> AppResult<TokenClaims> {
        let claims = self.codec.decode(kind, token)?;
        if claims.is_expired_at(self.now_seconds()) {
            return Err(TokenFailure::Expired.into());
        }

        Ok(claims)
    }
}
