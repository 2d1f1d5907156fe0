use redis::AsyncCommands;
use tracing::warn;

use crate::dto::HealthDependencyStatus;

fn disabled() -> HealthDependencyStatus {
    HealthDependencyStatus {
        status: "disabled",
        detail: None,
    }
}

fn healthy() -> HealthDependencyStatus {
    HealthDependencyStatus {
        status: "ok",
        detail: None,
    }
}

fn failed(dependency: &str, detail: String) -> HealthDependencyStatus {
    warn!(dependency, detail = %detail, "health check failed");
    HealthDependencyStatus {
        status: "error",
        detail: Some(format!("{dependency} check failed")),
    }
}

pub(super) async fn check_postgres(pool: Option<sqlx::PgPool>) -> HealthDependencyStatus {
    let Some(pool) = pool else {
        return disabled();
    };

    match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&pool)
        .await
    {
        Ok(_) => healthy(),
        Err(error) => failed("postgres", error.to_string()),
    }
}

pub(super) async fn check_redis(redis_client: Option<redis::Client>) -> HealthDependencyStatus {
    let Some(redis_client) = redis_client else {
        return disabled();
    };

    let mut connection = match redis_client.get_multiplexed_async_connection().await {
        Ok(connection) => connection,
        Err(error) => return failed("redis", error.to_string()),
    };

    match connection.ping::<String>().await {
        Ok(value) if value.eq_ignore_ascii_case("pong") => healthy(),
        Ok(value) => failed("redis", format!("unexpected ping response: {value}")),
        Err(error) => failed("redis", error.to_string()),
    }
}
