use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use keystone_application::{SessionCache, cache_keys};
use keystone_core::{AppError, AppResult};
use keystone_domain::{SessionId, UserId};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
enum CachedValue {
    Text(String),
    Members(BTreeSet<String>),
}

#[derive(Debug, Clone)]
struct SessionCacheEntry {
    value: CachedValue,
    /// `None` when the ttl reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl SessionCacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// In-process session cache for single-node deployments and tests.
///
/// Uses the same key layout as the Redis adapter.
#[derive(Debug, Default)]
pub struct InMemorySessionCache {
    entries: RwLock<HashMap<String, SessionCacheEntry>>,
}

impl InMemorySessionCache {
    /// Creates an empty session cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a live value; an expired entry is removed on the way out.
    async fn read_live(&self, key: &str) -> Option<CachedValue> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_live(Instant::now()) => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|entry| !entry.is_live(Instant::now()))
        {
            entries.remove(key);
        }

        None
    }

    /// Inserts an entry after sweeping every expired key.
    async fn insert_entry(&self, key: String, value: CachedValue, expires_at: Option<Instant>) {
        let mut entries = self.entries.write().await;
        sweep_expired(&mut entries, Instant::now());
        entries.insert(key, SessionCacheEntry { value, expires_at });
    }
}

fn sweep_expired(entries: &mut HashMap<String, SessionCacheEntry>, now: Instant) {
    entries.retain(|_, entry| entry.is_live(now));
}

fn expires_in(ttl_seconds: u64) -> AppResult<Option<Instant>> {
    if ttl_seconds == 0 {
        return Err(AppError::Validation(
            "cache entry ttl must be greater than zero".to_owned(),
        ));
    }

    Ok(Instant::now().checked_add(Duration::from_secs(ttl_seconds)))
}

#[async_trait]
impl SessionCache for InMemorySessionCache {
    async fn blacklist_token(&self, token_hash: &str, ttl_seconds: u64) -> AppResult<()> {
        let expires_at = expires_in(ttl_seconds)?;
        self.insert_entry(
            cache_keys::blacklist(token_hash),
            CachedValue::Text("1".to_owned()),
            expires_at,
        )
        .await;
        Ok(())
    }

    async fn is_token_blacklisted(&self, token_hash: &str) -> AppResult<bool> {
        Ok(self
            .read_live(cache_keys::blacklist(token_hash).as_str())
            .await
            .is_some())
    }

    async fn store_refresh_token(
        &self,
        session_id: &SessionId,
        refresh_token: &str,
        ttl_seconds: u64,
    ) -> AppResult<()> {
        let expires_at = expires_in(ttl_seconds)?;
        self.insert_entry(
            cache_keys::refresh_token(session_id),
            CachedValue::Text(refresh_token.to_owned()),
            expires_at,
        )
        .await;
        Ok(())
    }

    async fn consume_refresh_token(
        &self,
        session_id: &SessionId,
        expected: &str,
    ) -> AppResult<bool> {
        let key = cache_keys::refresh_token(session_id);
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let is_match = entries.get(&key).is_some_and(|entry| {
            entry.is_live(now) && matches!(&entry.value, CachedValue::Text(value) if value == expected)
        });
        if is_match {
            entries.remove(&key);
        }

        Ok(is_match)
    }

    async fn delete_refresh_token(&self, session_id: &SessionId) -> AppResult<()> {
        self.entries
            .write()
            .await
            .remove(&cache_keys::refresh_token(session_id));
        Ok(())
    }

    async fn add_user_session(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
        ttl_seconds: u64,
    ) -> AppResult<()> {
        let expires_at = expires_in(ttl_seconds)?;
        let key = cache_keys::user_sessions(user_id);
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        sweep_expired(&mut entries, now);

        let mut members = match entries.remove(&key) {
            Some(SessionCacheEntry {
                value: CachedValue::Members(members),
                ..
            }) => members,
            _ => BTreeSet::new(),
        };
        members.insert(session_id.as_str().to_owned());

        entries.insert(
            key,
            SessionCacheEntry {
                value: CachedValue::Members(members),
                expires_at,
            },
        );
        Ok(())
    }

    async fn list_user_sessions(&self, user_id: &UserId) -> AppResult<Vec<SessionId>> {
        match self
            .read_live(cache_keys::user_sessions(user_id).as_str())
            .await
        {
            Some(CachedValue::Members(members)) => {
                members.into_iter().map(SessionId::new).collect()
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn clear_user_sessions(&self, user_id: &UserId) -> AppResult<()> {
        self.entries
            .write()
            .await
            .remove(&cache_keys::user_sessions(user_id));
        Ok(())
    }
}
