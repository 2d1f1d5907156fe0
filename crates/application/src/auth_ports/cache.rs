use async_trait::async_trait;
use keystone_core::AppResult;
use keystone_domain::{PermissionSnapshot, SessionId, UserId};

/// Shared-cache port holding session existence and token revocation state.
///
/// Implementations must honour the key layout in [`super::cache_keys`] so
/// that every process sharing the cache agrees on session state.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Marks a token hash as revoked for `ttl_seconds`.
    async fn blacklist_token(&self, token_hash: &str, ttl_seconds: u64) -> AppResult<()>;

    /// Returns whether a token hash is currently revoked.
    async fn is_token_blacklisted(&self, token_hash: &str) -> AppResult<bool>;

    /// Stores the live refresh token of one session.
    async fn store_refresh_token(
        &self,
        session_id: &SessionId,
        refresh_token: &str,
        ttl_seconds: u64,
    ) -> AppResult<()>;

    /// Deletes the session's refresh entry only if it equals `expected`.
    ///
    /// Returns `true` for exactly one caller among concurrent attempts
    /// presenting the same token.
    async fn consume_refresh_token(&self, session_id: &SessionId, expected: &str)
    -> AppResult<bool>;

    /// Deletes the session's refresh entry; missing entries are not an error.
    async fn delete_refresh_token(&self, session_id: &SessionId) -> AppResult<()>;

    /// Adds a session id to the user's session set and extends the set ttl.
    async fn add_user_session(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
        ttl_seconds: u64,
    ) -> AppResult<()>;

    /// Lists the session ids recorded for a user.
    async fn list_user_sessions(&self, user_id: &UserId) -> AppResult<Vec<SessionId>>;

    /// Removes the user's session set.
    async fn clear_user_sessions(&self, user_id: &UserId) -> AppResult<()>;
}

/// Shared-cache port for computed permission snapshots.
///
/// Every user has a snapshot generation that only grows. Eviction bumps it,
/// and a snapshot is written only while the generation it was computed
/// under is still current. A load racing a grant mutation therefore never
/// caches pre-mutation state after the mutation's eviction.
#[async_trait]
pub trait PermissionSnapshotCache: Send + Sync {
    /// Returns the cached snapshot for a user, if any.
    async fn get_snapshot(&self, user_id: &UserId) -> AppResult<Option<PermissionSnapshot>>;

    /// Returns the user's current snapshot generation; `0` when never evicted.
    async fn snapshot_generation(&self, user_id: &UserId) -> AppResult<u64>;

    /// Stores a snapshot with ttl if the user's generation still equals
    /// `generation`. Returns whether the snapshot was written.
    async fn set_snapshot(
        &self,
        snapshot: &PermissionSnapshot,
        ttl_seconds: u64,
        generation: u64,
    ) -> AppResult<bool>;

    /// Bumps the user's generation and removes the cached snapshot.
    async fn evict_snapshot(&self, user_id: &UserId) -> AppResult<()>;
}
