use keystone_core::AppError;
use redis::aio::MultiplexedConnection;
use tracing::warn;

pub(crate) async fn connect(client: &redis::Client) -> Result<MultiplexedConnection, AppError> {
    client
        .get_multiplexed_async_connection()
        .await
        .map_err(|error| cache_unavailable("connect to redis", error))
}

pub(crate) fn cache_unavailable(operation: &str, error: redis::RedisError) -> AppError {
    warn!(operation, error = %error, "redis command failed");
    AppError::CacheUnavailable(format!("failed to {operation}: {error}"))
}

#[cfg(test)]
pub(crate) fn test_client() -> Option<redis::Client> {
    let url = std::env::var("REDIS_URL").ok()?;
    redis::Client::open(url).ok()
}
