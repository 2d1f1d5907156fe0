use keystone_application::{AuthGuard, PermissionResolver, TokenService};
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Session token lifecycle.
    pub token_service: TokenService,
    /// Effective permissions and grant administration.
    pub permission_resolver: PermissionResolver,
    /// Request authentication and authorization.
    pub auth_guard: AuthGuard,
    /// Shared secret guarding session issuance.
    pub bootstrap_token: String,
    /// Pool probed by the health check, when backed by PostgreSQL.
    pub postgres_pool: Option<PgPool>,
    /// Client probed by the health check, when backed by Redis.
    pub redis_client: Option<redis::Client>,
}
