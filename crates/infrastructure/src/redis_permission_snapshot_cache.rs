//! Redis-backed permission snapshot cache.

use async_trait::async_trait;
use keystone_application::{PermissionSnapshotCache, cache_keys};
use keystone_core::{AppError, AppResult};
use keystone_domain::{PermissionSnapshot, UserId};
use redis::{AsyncCommands, Script};
use tracing::warn;

use crate::redis_support::{cache_unavailable, connect};

/// Writes the snapshot only while the generation still matches.
/// KEYS: generation, snapshot. ARGV: expected generation, json, ttl.
const SET_IF_GENERATION_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1]) or '0'
if current == ARGV[1] then
  redis.call('SET', KEYS[2], ARGV[2], 'EX', ARGV[3])
  return 1
end
return 0
"#;

/// KEYS: generation, snapshot. ARGV: generation ttl.
const EVICT_SCRIPT: &str = r#"
redis.call('INCR', KEYS[1])
redis.call('EXPIRE', KEYS[1], ARGV[1])
redis.call('DEL', KEYS[2])
return 1
"#;

/// Generation counters outlive any snapshot ttl; seven days.
const GENERATION_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Redis implementation of the permission snapshot cache port.
///
/// Snapshots are stored as JSON under `user_permissions:<userId>` next to a
/// counter at `user_permissions_generation:<userId>` that eviction bumps.
#[derive(Clone)]
pub struct RedisPermissionSnapshotCache {
    client: redis::Client,
}

impl RedisPermissionSnapshotCache {
    /// Creates a cache adapter with a configured Redis client.
    #[must_use]
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PermissionSnapshotCache for RedisPermissionSnapshotCache {
    async fn get_snapshot(&self, user_id: &UserId) -> AppResult<Option<PermissionSnapshot>> {
        let mut connection = connect(&self.client).await?;

        let encoded: Option<String> = connection
            .get(cache_keys::user_permissions(user_id))
            .await
            .map_err(|error| cache_unavailable("read permission snapshot", error))?;

        let Some(encoded) = encoded else {
            return Ok(None);
        };

        match serde_json::from_str::<PermissionSnapshot>(&encoded) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(error) => {
                warn!(user_id = %user_id, error = %error, "discarding undecodable permission snapshot");
                Ok(None)
            }
        }
    }

    async fn snapshot_generation(&self, user_id: &UserId) -> AppResult<u64> {
        let mut connection = connect(&self.client).await?;

        let generation: Option<u64> = connection
            .get(cache_keys::user_permissions_generation(user_id))
            .await
            .map_err(|error| cache_unavailable("read snapshot generation", error))?;

        Ok(generation.unwrap_or_default())
    }

    async fn set_snapshot(
        &self,
        snapshot: &PermissionSnapshot,
        ttl_seconds: u64,
        generation: u64,
    ) -> AppResult<bool> {
        if ttl_seconds == 0 {
            return Ok(false);
        }

        let encoded = serde_json::to_string(snapshot).map_err(|error| {
            AppError::Internal(format!("failed to encode permission snapshot: {error}"))
        })?;
        let script = Script::new(SET_IF_GENERATION_SCRIPT);
        let mut connection = connect(&self.client).await?;

        let written = script
            .key(cache_keys::user_permissions_generation(&snapshot.user_id))
            .key(cache_keys::user_permissions(&snapshot.user_id))
            .arg(generation)
            .arg(encoded)
            .arg(ttl_seconds)
            .invoke_async::<i32>(&mut connection)
            .await
            .map_err(|error| cache_unavailable("write permission snapshot", error))?;

        Ok(written > 0)
    }

    async fn evict_snapshot(&self, user_id: &UserId) -> AppResult<()> {
        let script = Script::new(EVICT_SCRIPT);
        let mut connection = connect(&self.client).await?;

        script
            .key(cache_keys::user_permissions_generation(user_id))
            .key(cache_keys::user_permissions(user_id))
            .arg(GENERATION_TTL_SECONDS)
            .invoke_async::<i32>(&mut connection)
            .await
            .map_err(|error| cache_unavailable("evict permission snapshot", error))?;

        Ok(())
    }
}
