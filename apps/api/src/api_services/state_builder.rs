use std::sync::Arc;

use keystone_application::{
    AuthGuard, Clock, CredentialStore, IdGenerator, PermissionResolver, PermissionSnapshotCache,
    SessionCache, TokenCodec, TokenService,
};
use keystone_core::AppError;
use keystone_infrastructure::{
    InMemoryPermissionSnapshotCache, InMemorySessionCache, JwtTokenCodec,
    PostgresCredentialStore, RedisPermissionSnapshotCache, RedisSessionCache, SystemClock,
    UuidIdGenerator,
};
use sqlx::PgPool;

use crate::api_config::{ApiConfig, CacheBackend};
use crate::state::AppState;

use super::redis_client::build_redis_client;

/// Port implementations backing the application services.
#[derive(Clone)]
pub struct ServicePorts {
    /// Durable roles, grants and change log.
    pub store: Arc<dyn CredentialStore>,
    /// Session and blacklist state.
    pub session_cache: Arc<dyn SessionCache>,
    /// Permission snapshot cache.
    pub snapshot_cache: Arc<dyn PermissionSnapshotCache>,
    /// Token signer.
    pub codec: Arc<dyn TokenCodec>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Identifier source.
    pub ids: Arc<dyn IdGenerator>,
}

/// Builds production state: PostgreSQL store plus the configured cache.
pub fn build_app_state(pool: PgPool, config: &ApiConfig) -> Result<AppState, AppError> {
    let redis_client = match config.cache_backend {
        CacheBackend::Redis => {
            let redis_url = config.redis_url.as_deref().ok_or_else(|| {
                AppError::Validation("REDIS_URL is required when CACHE_BACKEND=redis".to_owned())
            })?;
            Some(build_redis_client(redis_url)?)
        }
        CacheBackend::InMemory => None,
    };

    let (session_cache, snapshot_cache): (Arc<dyn SessionCache>, Arc<dyn PermissionSnapshotCache>) =
        match &redis_client {
            Some(client) => (
                Arc::new(RedisSessionCache::new(client.clone())),
                Arc::new(RedisPermissionSnapshotCache::new(client.clone())),
            ),
            None => (
                Arc::new(InMemorySessionCache::new()),
                Arc::new(InMemoryPermissionSnapshotCache::new()),
            ),
        };

    let ports = ServicePorts {
        store: Arc::new(PostgresCredentialStore::new(pool.clone())),
        session_cache,
        snapshot_cache,
        codec: Arc::new(JwtTokenCodec::new(
            config.access_token_secret.as_str(),
            config.refresh_token_secret.as_str(),
        )?),
        clock: Arc::new(SystemClock),
        ids: Arc::new(UuidIdGenerator),
    };

    let mut state = build_state_from_ports(ports, config)?;
    state.postgres_pool = Some(pool);
    state.redis_client = redis_client;
    Ok(state)
}

/// Builds state over arbitrary port implementations.
///
/// Health probes are left unset.
pub fn build_state_from_ports(
    ports: ServicePorts,
    config: &ApiConfig,
) -> Result<AppState, AppError> {
    let token_service = TokenService::new(
        ports.codec,
        ports.session_cache,
        ports.clock.clone(),
        ports.ids.clone(),
        config.token_settings.validate()?,
    );
    let permission_resolver = PermissionResolver::new(
        ports.store,
        ports.snapshot_cache,
        ports.clock,
        ports.ids,
        config.resolver_settings,
    );
    let auth_guard = AuthGuard::new(token_service.clone(), permission_resolver.clone());

    Ok(AppState {
        token_service,
        permission_resolver,
        auth_guard,
        bootstrap_token: config.bootstrap_token.clone(),
        postgres_pool: None,
        redis_client: None,
    })
}
