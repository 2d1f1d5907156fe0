//! Redis-backed session state: refresh tokens, session sets and the access
//! token blacklist.

use async_trait::async_trait;
use keystone_application::{SessionCache, cache_keys};
use keystone_core::{AppError, AppResult};
use keystone_domain::{SessionId, UserId};
use redis::{AsyncCommands, Script};

use crate::redis_support::{cache_unavailable, connect};

const CONSUME_REFRESH_TOKEN_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  return redis.call('DEL', KEYS[1])
else
  return 0
end
"#;

const BLACKLIST_SENTINEL: &str = "1";

/// Redis implementation of the session cache port.
#[derive(Clone)]
pub struct RedisSessionCache {
    client: redis::Client,
}

impl RedisSessionCache {
    /// Creates a cache adapter with a configured Redis client.
    #[must_use]
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

fn require_ttl(ttl_seconds: u64, what: &str) -> AppResult<()> {
    if ttl_seconds == 0 {
        return Err(AppError::Validation(format!(
            "{what} ttl must be greater than zero"
        )));
    }
    Ok(())
}

fn ttl_as_i64(ttl_seconds: u64) -> AppResult<i64> {
    i64::try_from(ttl_seconds)
        .map_err(|error| AppError::Validation(format!("ttl {ttl_seconds} is too large: {error}")))
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn blacklist_token(&self, token_hash: &str, ttl_seconds: u64) -> AppResult<()> {
        require_ttl(ttl_seconds, "blacklist entry")?;
        let mut connection = connect(&self.client).await?;

        connection
            .set_ex::<_, _, ()>(
                cache_keys::blacklist(token_hash),
                BLACKLIST_SENTINEL,
                ttl_seconds,
            )
            .await
            .map_err(|error| cache_unavailable("write blacklist entry", error))
    }

    async fn is_token_blacklisted(&self, token_hash: &str) -> AppResult<bool> {
        let mut connection = connect(&self.client).await?;

        connection
            .exists(cache_keys::blacklist(token_hash))
            .await
            .map_err(|error| cache_unavailable("read blacklist entry", error))
    }

    async fn store_refresh_token(
        &self,
        session_id: &SessionId,
        refresh_token: &str,
        ttl_seconds: u64,
    ) -> AppResult<()> {
        require_ttl(ttl_seconds, "refresh token")?;
        let mut connection = connect(&self.client).await?;

        connection
            .set_ex::<_, _, ()>(
                cache_keys::refresh_token(session_id),
                refresh_token,
                ttl_seconds,
            )
            .await
            .map_err(|error| cache_unavailable("write refresh token", error))
    }

    async fn consume_refresh_token(
        &self,
        session_id: &SessionId,
        expected: &str,
    ) -> AppResult<bool> {
        let script = Script::new(CONSUME_REFRESH_TOKEN_SCRIPT);
        let mut connection = connect(&self.client).await?;

        let deleted = script
            .key(cache_keys::refresh_token(session_id))
            .arg(expected)
            .invoke_async::<i32>(&mut connection)
            .await
            .map_err(|error| cache_unavailable("consume refresh token", error))?;

        Ok(deleted > 0)
    }

    async fn delete_refresh_token(&self, session_id: &SessionId) -> AppResult<()> {
        let mut connection = connect(&self.client).await?;

        connection
            .del::<_, ()>(cache_keys::refresh_token(session_id))
            .await
            .map_err(|error| cache_unavailable("delete refresh token", error))
    }

    async fn add_user_session(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
        ttl_seconds: u64,
    ) -> AppResult<()> {
        require_ttl(ttl_seconds, "session set")?;
        let key = cache_keys::user_sessions(user_id);
        let mut connection = connect(&self.client).await?;

        redis::pipe()
            .atomic()
            .sadd(key.as_str(), session_id.as_str())
            .ignore()
            .expire(key.as_str(), ttl_as_i64(ttl_seconds)?)
            .ignore()
            .query_async::<()>(&mut connection)
            .await
            .map_err(|error| cache_unavailable("record user session", error))
    }

    async fn list_user_sessions(&self, user_id: &UserId) -> AppResult<Vec<SessionId>> {
        let mut connection = connect(&self.client).await?;

        let members: Vec<String> = connection
            .smembers(cache_keys::user_sessions(user_id))
            .await
            .map_err(|error| cache_unavailable("read user sessions", error))?;

        members.into_iter().map(SessionId::new).collect()
    }

    async fn clear_user_sessions(&self, user_id: &UserId) -> AppResult<()> {
        let mut connection = connect(&self.client).await?;

        connection
            .del::<_, ()>(cache_keys::user_sessions(user_id))
            .await
            .map_err(|error| cache_unavailable("clear user sessions", error))
    }
}
