//! Application services and ports.

#![forbid(unsafe_code)]

mod auth_guard;
mod auth_ports;
mod permission_resolver;
mod token_service;

#[cfg(test)]
mod test_support;

pub use auth_guard::{AuthGuard, AuthenticatedCaller, PermissionRequirement, bearer_token};
pub use auth_ports::{
    ChangeLogQuery, Clock, CredentialStore, GrantMutation, IdGenerator, PermissionSnapshotCache,
    SessionCache, TokenCodec, TokenKind, cache_keys,
};
pub use permission_resolver::{
    ChangeContext, CheckMode, GrantPermissionInput, GrantRoleInput, PermissionCheck,
    PermissionResolver, ResolverSettings, RevokePermissionInput, RevokeRoleInput, UserGrants,
};
pub use token_service::{
    MAX_TOKEN_TTL_SECONDS, TokenPair, TokenService, TokenSettings, hash_token,
};
