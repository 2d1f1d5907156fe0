//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_credential_store;
mod in_memory_permission_snapshot_cache;
mod in_memory_session_cache;
mod jwt_token_codec;
mod postgres_credential_store;
mod redis_permission_snapshot_cache;
mod redis_session_cache;
mod redis_support;
mod system_runtime;

pub use in_memory_credential_store::InMemoryCredentialStore;
pub use in_memory_permission_snapshot_cache::InMemoryPermissionSnapshotCache;
pub use in_memory_session_cache::InMemorySessionCache;
pub use jwt_token_codec::{JwtTokenCodec, MIN_SECRET_LENGTH};
pub use postgres_credential_store::PostgresCredentialStore;
pub use redis_permission_snapshot_cache::RedisPermissionSnapshotCache;
pub use redis_session_cache::RedisSessionCache;
pub use system_runtime::{SystemClock, UuidIdGenerator};
