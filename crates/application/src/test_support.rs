use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use keystone_core::{AppError, AppResult, TokenFailure};
use keystone_domain::{
    ActivePermissionGrant, ActiveRoleGrant, GrantState, PermissionChangeLogEntry,
    PermissionDefinition, PermissionId, PermissionName, PermissionSnapshot, Role, RoleId,
    RoleKind, RoleWithPermissions, SessionId, TokenClaims, UserId, UserPermissionGrant,
    UserRoleGrant,
};
use uuid::Uuid;

use crate::auth_ports::{
    ChangeLogQuery, Clock, CredentialStore, GrantMutation, IdGenerator, PermissionSnapshotCache,
    SessionCache, TokenCodec, TokenKind,
};

fn lock_error(error: impl std::fmt::Display) -> AppError {
    AppError::Internal(format!("failed to lock test state: {error}"))
}

pub fn user(value: &str) -> UserId {
    UserId::new(value).unwrap_or_else(|_| unreachable!())
}

pub fn permission(value: &str) -> PermissionName {
    PermissionName::new(value).unwrap_or_else(|_| unreachable!())
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 8, 30, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|_| start())
    }
}

#[derive(Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> Uuid {
        Uuid::from_u128(u128::from(self.next.fetch_add(1, Ordering::SeqCst)) + 1)
    }
}

/// Unsigned codec: `<kind>.<json>`; a kind mismatch or a malformed body
/// counts as a bad signature.
#[derive(Default)]
pub struct PlainTokenCodec;

impl TokenCodec for PlainTokenCodec {
    fn encode(&self, kind: TokenKind, claims: &TokenClaims) -> AppResult<String> {
        let body = serde_json::to_string(claims)
            .map_err(|error| AppError::Internal(format!("failed to encode claims: {error}")))?;
        Ok(format!("{}.{body}", kind.as_str()))
    }

    fn decode(&self, kind: TokenKind, token: &str) -> AppResult<TokenClaims> {
        let Some((prefix, body)) = token.split_once('.') else {
            return Err(TokenFailure::InvalidSignature.into());
        };
        if prefix != kind.as_str() {
            return Err(TokenFailure::InvalidSignature.into());
        }

        serde_json::from_str(body).map_err(|_| TokenFailure::InvalidSignature.into())
    }
}

#[derive(Default)]
pub struct MemorySessionCache {
    pub blacklist: Mutex<HashMap<String, u64>>,
    pub refresh_tokens: Mutex<HashMap<SessionId, String>>,
    pub sessions: Mutex<HashMap<UserId, Vec<SessionId>>>,
    pub unavailable: AtomicBool,
}

impl MemorySessionCache {
    fn ensure_available(&self) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::CacheUnavailable(
                "session cache is offline".to_owned(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn blacklist_token(&self, token_hash: &str, ttl_seconds: u64) -> AppResult<()> {
        self.ensure_available()?;
        self.blacklist
            .lock()
            .map_err(lock_error)?
            .insert(token_hash.to_owned(), ttl_seconds);
        Ok(())
    }

    async fn is_token_blacklisted(&self, token_hash: &str) -> AppResult<bool> {
        self.ensure_available()?;
        Ok(self
            .blacklist
            .lock()
            .map_err(lock_error)?
            .contains_key(token_hash))
    }

    async fn store_refresh_token(
        &self,
        session_id: &SessionId,
        refresh_token: &str,
        _ttl_seconds: u64,
    ) -> AppResult<()> {
        self.ensure_available()?;
        self.refresh_tokens
            .lock()
            .map_err(lock_error)?
            .insert(session_id.clone(), refresh_token.to_owned());
        Ok(())
    }

    async fn consume_refresh_token(
        &self,
        session_id: &SessionId,
        expected: &str,
    ) -> AppResult<bool> {
        self.ensure_available()?;
        let mut tokens = self.refresh_tokens.lock().map_err(lock_error)?;
        if tokens.get(session_id).map(String::as_str) == Some(expected) {
            tokens.remove(session_id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn delete_refresh_token(&self, session_id: &SessionId) -> AppResult<()> {
        self.ensure_available()?;
        self.refresh_tokens
            .lock()
            .map_err(lock_error)?
            .remove(session_id);
        Ok(())
    }

    async fn add_user_session(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
        _ttl_seconds: u64,
    ) -> AppResult<()> {
        self.ensure_available()?;
        let mut sessions = self.sessions.lock().map_err(lock_error)?;
        let entry = sessions.entry(user_id.clone()).or_default();
        if !entry.contains(session_id) {
            entry.push(session_id.clone());
        }
        Ok(())
    }

    async fn list_user_sessions(&self, user_id: &UserId) -> AppResult<Vec<SessionId>> {
        self.ensure_available()?;
        Ok(self
            .sessions
            .lock()
            .map_err(lock_error)?
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn clear_user_sessions(&self, user_id: &UserId) -> AppResult<()> {
        self.ensure_available()?;
        self.sessions.lock().map_err(lock_error)?.remove(user_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySnapshotCache {
    pub entries: Mutex<HashMap<UserId, (PermissionSnapshot, u64)>>,
    pub generations: Mutex<HashMap<UserId, u64>>,
    pub fail_evictions: AtomicBool,
}

impl MemorySnapshotCache {
    pub fn cached_ttl(&self, user_id: &UserId) -> Option<u64> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(user_id).map(|(_, ttl)| *ttl))
    }

    pub fn put(&self, snapshot: PermissionSnapshot) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(snapshot.user_id.clone(), (snapshot, 300));
        }
    }
}

#[async_trait]
impl PermissionSnapshotCache for MemorySnapshotCache {
    async fn get_snapshot(&self, user_id: &UserId) -> AppResult<Option<PermissionSnapshot>> {
        Ok(self
            .entries
            .lock()
            .map_err(lock_error)?
            .get(user_id)
            .map(|(snapshot, _)| snapshot.clone()))
    }

    async fn snapshot_generation(&self, user_id: &UserId) -> AppResult<u64> {
        Ok(self
            .generations
            .lock()
            .map_err(lock_error)?
            .get(user_id)
            .copied()
            .unwrap_or_default())
    }

    async fn set_snapshot(
        &self,
        snapshot: &PermissionSnapshot,
        ttl_seconds: u64,
        generation: u64,
    ) -> AppResult<bool> {
        let generations = self.generations.lock().map_err(lock_error)?;
        let current = generations
            .get(&snapshot.user_id)
            .copied()
            .unwrap_or_default();
        if current != generation {
            return Ok(false);
        }
        self.entries
            .lock()
            .map_err(lock_error)?
            .insert(snapshot.user_id.clone(), (snapshot.clone(), ttl_seconds));
        Ok(true)
    }

    async fn evict_snapshot(&self, user_id: &UserId) -> AppResult<()> {
        if self.fail_evictions.load(Ordering::SeqCst) {
            return Err(AppError::CacheUnavailable(
                "snapshot cache is offline".to_owned(),
            ));
        }
        let mut generations = self.generations.lock().map_err(lock_error)?;
        *generations.entry(user_id.clone()).or_default() += 1;
        self.entries.lock().map_err(lock_error)?.remove(user_id);
        Ok(())
    }
}

#[derive(Default)]
struct StoreState {
    roles: Vec<Role>,
    permissions: Vec<PermissionDefinition>,
    role_permissions: Vec<(RoleId, PermissionId)>,
    role_grants: Vec<UserRoleGrant>,
    permission_grants: Vec<UserPermissionGrant>,
    change_log: Vec<PermissionChangeLogEntry>,
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    state: Mutex<StoreState>,
    pub snapshot_loads: AtomicUsize,
}

impl MemoryCredentialStore {
    pub fn add_role(&self, name: &str, is_active: bool, permissions: &[&str]) -> Role {
        let role = Role {
            id: RoleId::from_uuid(Uuid::new_v4()),
            name: name.to_owned(),
            display_name: name.to_owned(),
            kind: RoleKind::Custom,
            is_system: false,
            is_active,
        };

        if let Ok(mut state) = self.state.lock() {
            state.roles.push(role.clone());
            for value in permissions {
                let id = ensure_permission(&mut state, value);
                state.role_permissions.push((role.id, id));
            }
        }
        role
    }

    pub fn add_permission(&self, name: &str) -> PermissionId {
        self.state
            .lock()
            .map(|mut state| ensure_permission(&mut state, name))
            .unwrap_or_else(|_| PermissionId::from_uuid(Uuid::nil()))
    }

    pub fn insert_role_grant(&self, grant: UserRoleGrant) {
        if let Ok(mut state) = self.state.lock() {
            state.role_grants.push(grant);
        }
    }

    pub fn change_log(&self) -> Vec<PermissionChangeLogEntry> {
        self.state
            .lock()
            .map(|state| state.change_log.clone())
            .unwrap_or_default()
    }

    pub fn permission_grants(&self) -> Vec<UserPermissionGrant> {
        self.state
            .lock()
            .map(|state| state.permission_grants.clone())
            .unwrap_or_default()
    }

    pub fn role_grants(&self) -> Vec<UserRoleGrant> {
        self.state
            .lock()
            .map(|state| state.role_grants.clone())
            .unwrap_or_default()
    }
}

fn ensure_permission(state: &mut StoreState, value: &str) -> PermissionId {
    if let Some(existing) = state
        .permissions
        .iter()
        .find(|definition| definition.name.as_str() == value)
    {
        return existing.id;
    }

    let name = permission(value);
    let mut parts = value.split(':');
    let definition = PermissionDefinition {
        id: PermissionId::from_uuid(Uuid::new_v4()),
        name,
        module: parts.next().unwrap_or_default().to_owned(),
        operation: parts.next().unwrap_or_default().to_owned(),
        resource: parts.next().map(str::to_owned),
        is_system: false,
    };
    let id = definition.id;
    state.permissions.push(definition);
    id
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn list_active_role_grants(&self, user_id: &UserId) -> AppResult<Vec<ActiveRoleGrant>> {
        self.snapshot_loads.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().map_err(lock_error)?;
        Ok(state
            .role_grants
            .iter()
            .filter(|grant| grant.is_active && &grant.user_id == user_id)
            .filter_map(|grant| {
                state
                    .roles
                    .iter()
                    .find(|role| role.id == grant.role_id)
                    .map(|role| ActiveRoleGrant {
                        grant: grant.clone(),
                        role: role.clone(),
                    })
            })
            .collect())
    }

    async fn list_permissions_for_roles(
        &self,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<(RoleId, PermissionName)>> {
        let state = self.state.lock().map_err(lock_error)?;
        Ok(state
            .role_permissions
            .iter()
            .filter(|(role_id, _)| role_ids.contains(role_id))
            .filter_map(|(role_id, permission_id)| {
                state
                    .permissions
                    .iter()
                    .find(|definition| definition.id == *permission_id)
                    .map(|definition| (*role_id, definition.name.clone()))
            })
            .collect())
    }

    async fn list_active_permission_grants(
        &self,
        user_id: &UserId,
    ) -> AppResult<Vec<ActivePermissionGrant>> {
        let state = self.state.lock().map_err(lock_error)?;
        Ok(state
            .permission_grants
            .iter()
            .filter(|grant| grant.is_active && &grant.user_id == user_id)
            .filter_map(|grant| {
                state
                    .permissions
                    .iter()
                    .find(|definition| definition.id == grant.permission_id)
                    .map(|definition| ActivePermissionGrant {
                        grant: grant.clone(),
                        permission: definition.name.clone(),
                    })
            })
            .collect())
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        let state = self.state.lock().map_err(lock_error)?;
        Ok(state.roles.iter().find(|role| role.name == name).cloned())
    }

    async fn find_permission_by_name(
        &self,
        name: &PermissionName,
    ) -> AppResult<Option<PermissionDefinition>> {
        let state = self.state.lock().map_err(lock_error)?;
        Ok(state
            .permissions
            .iter()
            .find(|definition| &definition.name == name)
            .cloned())
    }

    async fn find_active_role_grant(
        &self,
        user_id: &UserId,
        role_id: RoleId,
    ) -> AppResult<Option<UserRoleGrant>> {
        let state = self.state.lock().map_err(lock_error)?;
        Ok(state
            .role_grants
            .iter()
            .find(|grant| grant.is_active && &grant.user_id == user_id && grant.role_id == role_id)
            .cloned())
    }

    async fn find_active_permission_grant(
        &self,
        user_id: &UserId,
        permission_id: PermissionId,
    ) -> AppResult<Option<UserPermissionGrant>> {
        let state = self.state.lock().map_err(lock_error)?;
        Ok(state
            .permission_grants
            .iter()
            .find(|grant| {
                grant.is_active && &grant.user_id == user_id && grant.permission_id == permission_id
            })
            .cloned())
    }

    async fn apply_grant_mutation(&self, mutation: GrantMutation) -> AppResult<()> {
        let mut state = self.state.lock().map_err(lock_error)?;

        match mutation.deactivated {
            Some(GrantState::RoleGrant(updated)) => {
                let row = state
                    .role_grants
                    .iter_mut()
                    .find(|grant| grant.id == updated.id && grant.is_active)
                    .ok_or_else(|| AppError::Conflict("role grant changed concurrently".to_owned()))?;
                *row = updated;
            }
            Some(GrantState::PermissionGrant(updated)) => {
                let row = state
                    .permission_grants
                    .iter_mut()
                    .find(|grant| grant.id == updated.id && grant.is_active)
                    .ok_or_else(|| {
                        AppError::Conflict("permission grant changed concurrently".to_owned())
                    })?;
                *row = updated;
            }
            None => {}
        }

        match mutation.inserted {
            Some(GrantState::RoleGrant(grant)) => state.role_grants.push(grant),
            Some(GrantState::PermissionGrant(grant)) => state.permission_grants.push(grant),
            None => {}
        }

        state.change_log.push(mutation.entry);
        Ok(())
    }

    async fn list_roles(&self) -> AppResult<Vec<RoleWithPermissions>> {
        let state = self.state.lock().map_err(lock_error)?;
        Ok(state
            .roles
            .iter()
            .map(|role| RoleWithPermissions {
                role: role.clone(),
                permissions: state
                    .role_permissions
                    .iter()
                    .filter(|(role_id, _)| *role_id == role.id)
                    .filter_map(|(_, permission_id)| {
                        state
                            .permissions
                            .iter()
                            .find(|definition| definition.id == *permission_id)
                            .map(|definition| definition.name.clone())
                    })
                    .collect(),
            })
            .collect())
    }

    async fn list_permissions(&self) -> AppResult<Vec<PermissionDefinition>> {
        let state = self.state.lock().map_err(lock_error)?;
        Ok(state.permissions.clone())
    }

    async fn list_change_log(
        &self,
        query: ChangeLogQuery,
    ) -> AppResult<Vec<PermissionChangeLogEntry>> {
        let state = self.state.lock().map_err(lock_error)?;
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        Ok(state
            .change_log
            .iter()
            .rev()
            .filter(|entry| {
                query
                    .user_id
                    .as_ref()
                    .is_none_or(|user_id| &entry.user_id == user_id)
            })
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

pub fn live_refresh_sessions(cache: &MemorySessionCache) -> HashSet<SessionId> {
    cache
        .refresh_tokens
        .lock()
        .map(|tokens| tokens.keys().cloned().collect())
        .unwrap_or_default()
}
