//! Request authentication and authorization in a fixed order.
//!
//! 1. extract the bearer token,
//! 2. verify it (401 on failure, before any permission lookup),
//! 3. check the route's required permissions for the verified subject (403).

use keystone_core::{AppError, AppResult};
use keystone_domain::{PermissionName, TokenClaims};

use crate::{CheckMode, PermissionResolver, TokenService};

#[cfg(test)]
mod tests;

/// Verified caller of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedCaller {
    /// Verified access token claims.
    pub claims: TokenClaims,
    /// Raw access token, kept for logout.
    pub access_token: String,
}

/// Permission requirement declared by a route.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PermissionRequirement {
    /// Required permission names.
    pub permissions: Vec<PermissionName>,
    /// How the names combine.
    pub mode: CheckMode,
}

impl PermissionRequirement {
    /// Requires every listed permission.
    #[must_use]
    pub fn all(permissions: Vec<PermissionName>) -> Self {
        Self {
            permissions,
            mode: CheckMode::All,
        }
    }

    /// Requires at least one listed permission.
    #[must_use]
    pub fn any(permissions: Vec<PermissionName>) -> Self {
        Self {
            permissions,
            mode: CheckMode::Any,
        }
    }
}

/// Boundary composition of [`TokenService`] and [`PermissionResolver`].
#[derive(Clone)]
pub struct AuthGuard {
    tokens: TokenService,
    permissions: PermissionResolver,
}

impl AuthGuard {
    /// Creates a guard over the two services.
    #[must_use]
    pub fn new(tokens: TokenService, permissions: PermissionResolver) -> Self {
        Self {
            tokens,
            permissions,
        }
    }

    /// Verifies the bearer token carried by an `Authorization` header value.
    pub async fn authenticate(&self, authorization: Option<&str>) -> AppResult<AuthenticatedCaller> {
        let access_token = bearer_token(authorization)?;
        let claims = self.tokens.verify(access_token).await?;

        Ok(AuthenticatedCaller {
            claims,
            access_token: access_token.to_owned(),
        })
    }

    /// Like [`Self::authenticate`], but any token failure yields `Ok(None)`.
    ///
    /// Store and cache outages still propagate.
    pub async fn authenticate_optional(
        &self,
        authorization: Option<&str>,
    ) -> AppResult<Option<AuthenticatedCaller>> {
        match self.authenticate(authorization).await {
            Ok(caller) => Ok(Some(caller)),
            Err(AppError::Unauthorized(_) | AppError::Token(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Authenticates the caller and enforces the route's requirement.
    pub async fn authorize(
        &self,
        authorization: Option<&str>,
        requirement: &PermissionRequirement,
    ) -> AppResult<AuthenticatedCaller> {
        let caller = self.authenticate(authorization).await?;
        if !requirement.permissions.is_empty() {
            self.permissions
                .authorize(
                    &caller.claims.sub,
                    &requirement.permissions,
                    requirement.mode,
                )
                .await?;
        }

        Ok(caller)
    }
}

/// Extracts the token from a `Bearer <token>` header value.
pub fn bearer_token(authorization: Option<&str>) -> AppResult<&str> {
    let value = authorization
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_owned()))?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or_else(|| AppError::Unauthorized("malformed authorization header".to_owned()))?;

    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AppError::Unauthorized(
            "malformed authorization header".to_owned(),
        ));
    }

    Ok(token)
}
