use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use keystone_application::PermissionSnapshotCache;
use keystone_core::AppResult;
use keystone_domain::{PermissionSnapshot, UserId};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct SnapshotCacheEntry {
    snapshot: PermissionSnapshot,
    /// `None` when the ttl reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl SnapshotCacheEntry {
    fn is_live_at(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

#[derive(Debug, Default)]
struct SnapshotCacheState {
    entries: HashMap<UserId, SnapshotCacheEntry>,
    generations: HashMap<UserId, u64>,
}

impl SnapshotCacheState {
    fn generation(&self, user_id: &UserId) -> u64 {
        self.generations.get(user_id).copied().unwrap_or_default()
    }
}

/// In-memory cache adapter for permission snapshots.
#[derive(Debug, Default)]
pub struct InMemoryPermissionSnapshotCache {
    state: RwLock<SnapshotCacheState>,
}

impl InMemoryPermissionSnapshotCache {
    /// Creates an empty in-memory snapshot cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionSnapshotCache for InMemoryPermissionSnapshotCache {
    async fn get_snapshot(&self, user_id: &UserId) -> AppResult<Option<PermissionSnapshot>> {
        {
            let state = self.state.read().await;
            match state.entries.get(user_id) {
                Some(entry) if entry.is_live_at(Instant::now()) => {
                    return Ok(Some(entry.snapshot.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut state = self.state.write().await;
        if state
            .entries
            .get(user_id)
            .is_some_and(|entry| !entry.is_live_at(Instant::now()))
        {
            state.entries.remove(user_id);
        }

        Ok(None)
    }

    async fn snapshot_generation(&self, user_id: &UserId) -> AppResult<u64> {
        Ok(self.state.read().await.generation(user_id))
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

        let now = Instant::now();
        let expires_at = now.checked_add(Duration::from_secs(ttl_seconds));

        let mut state = self.state.write().await;
        if state.generation(&snapshot.user_id) != generation {
            return Ok(false);
        }
        state.entries.retain(|_, entry| entry.is_live_at(now));
        state.entries.insert(
            snapshot.user_id.clone(),
            SnapshotCacheEntry {
                snapshot: snapshot.clone(),
                expires_at,
            },
        );

        Ok(true)
    }

    async fn evict_snapshot(&self, user_id: &UserId) -> AppResult<()> {
        let mut state = self.state.write().await;
        *state.generations.entry(user_id.clone()).or_default() += 1;
        state.entries.remove(user_id);
        Ok(())
    }
}
