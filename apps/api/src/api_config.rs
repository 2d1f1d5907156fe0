//! Environment-driven runtime configuration.

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use keystone_application::{ResolverSettings, TokenSettings};
use keystone_core::AppError;
use keystone_infrastructure::MIN_SECRET_LENGTH;
use tracing_subscriber::EnvFilter;

/// Backend holding session state and permission snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// Shared Redis instance; required when more than one node serves traffic.
    Redis,
    /// Process-local maps; single-node deployments only.
    InMemory,
}

impl CacheBackend {
    fn parse(value: &str) -> Result<Self, AppError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" | "in_memory" => Ok(Self::InMemory),
            other => Err(AppError::Validation(format!(
                "CACHE_BACKEND must be either 'redis' or 'memory', got '{other}'"
            ))),
        }
    }
}

/// Runtime configuration of the API process.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Applies migrations and exits when set.
    pub migrate_only: bool,
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Pool size for the credential store.
    pub database_max_connections: u32,
    /// Selected cache backend.
    pub cache_backend: CacheBackend,
    /// Redis connection string; required for the Redis backend.
    pub redis_url: Option<String>,
    /// HS256 secret for access tokens.
    pub access_token_secret: String,
    /// HS256 secret for refresh tokens.
    pub refresh_token_secret: String,
    /// Token lifetimes.
    pub token_settings: TokenSettings,
    /// Snapshot cache tuning.
    pub resolver_settings: ResolverSettings,
    /// Shared secret guarding session issuance.
    pub bootstrap_token: String,
    /// Bind host.
    pub api_host: String,
    /// Bind port.
    pub api_port: u16,
}

impl ApiConfig {
    /// Loads configuration from the process environment.
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let database_url = required_non_empty_env("DATABASE_URL")?;
        let database_max_connections = parse_env_or("DATABASE_MAX_CONNECTIONS", 10_u32)?;
        if database_max_connections == 0 {
            return Err(AppError::Validation(
                "DATABASE_MAX_CONNECTIONS must be greater than zero".to_owned(),
            ));
        }

        let cache_backend = CacheBackend::parse(
            env::var("CACHE_BACKEND")
                .unwrap_or_else(|_| "redis".to_owned())
                .as_str(),
        )?;
        let redis_url = env::var("REDIS_URL")
            .ok()
            .filter(|value| !value.trim().is_empty());
        if cache_backend == CacheBackend::Redis && redis_url.is_none() {
            return Err(AppError::Validation(
                "REDIS_URL is required when CACHE_BACKEND=redis".to_owned(),
            ));
        }

        let access_token_secret = required_env("ACCESS_TOKEN_SECRET")?;
        let refresh_token_secret = required_env("REFRESH_TOKEN_SECRET")?;
        validate_secrets(&access_token_secret, &refresh_token_secret)?;

        let defaults = TokenSettings::default();
        let token_settings = TokenSettings {
            access_ttl_seconds: parse_env_or("ACCESS_TOKEN_TTL_SECONDS", defaults.access_ttl_seconds)?,
            refresh_ttl_seconds: parse_env_or(
                "REFRESH_TOKEN_TTL_SECONDS",
                defaults.refresh_ttl_seconds,
            )?,
            blacklist_min_ttl_seconds: parse_env_or(
                "BLACKLIST_MIN_TTL_SECONDS",
                defaults.blacklist_min_ttl_seconds,
            )?,
        }
        .validate()?;

        let resolver_settings = ResolverSettings {
            snapshot_ttl_seconds: parse_env_or(
                "PERMISSION_CACHE_TTL_SECONDS",
                ResolverSettings::default().snapshot_ttl_seconds,
            )?,
        };

        let bootstrap_token = required_non_empty_env("AUTH_BOOTSTRAP_TOKEN")?;
        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = parse_env_or("API_PORT", 3001_u16)?;

        Ok(Self {
            migrate_only,
            database_url,
            database_max_connections,
            cache_backend,
            redis_url,
            access_token_secret,
            refresh_token_secret,
            token_settings,
            resolver_settings,
            bootstrap_token,
            api_host,
            api_port,
        })
    }

    /// Returns the socket address the server binds to.
    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

/// Installs the global tracing subscriber.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn validate_secrets(access_secret: &str, refresh_secret: &str) -> Result<(), AppError> {
    if access_secret.len() < MIN_SECRET_LENGTH {
        return Err(AppError::Validation(format!(
            "ACCESS_TOKEN_SECRET must be at least {MIN_SECRET_LENGTH} characters"
        )));
    }

    if refresh_secret.len() < MIN_SECRET_LENGTH {
        return Err(AppError::Validation(format!(
            "REFRESH_TOKEN_SECRET must be at least {MIN_SECRET_LENGTH} characters"
        )));
    }

    if access_secret == refresh_secret {
        return Err(AppError::Validation(
            "ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ".to_owned(),
        ));
    }

    Ok(())
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn parse_env_or<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use keystone_core::AppError;

    use super::{CacheBackend, validate_secrets};

    #[test]
    fn secrets_must_be_long_and_distinct() {
        let long = "a".repeat(32);
        let other = "b".repeat(32);

        assert!(validate_secrets(&long, &other).is_ok());
        assert!(matches!(
            validate_secrets("short", &other),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_secrets(&long, &long),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn cache_backend_parses_known_values() {
        assert!(matches!(CacheBackend::parse("Redis"), Ok(CacheBackend::Redis)));
        assert!(matches!(
            CacheBackend::parse("memory"),
            Ok(CacheBackend::InMemory)
        ));
        assert!(CacheBackend::parse("memcached").is_err());
    }
}
