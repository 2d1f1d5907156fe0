//! Effective permission resolution, caching and grant administration.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use keystone_core::{AppError, AppResult};
use keystone_domain::{
    ActivePermissionGrant, ActiveRoleGrant, ChangeAction, ChangeLogEntryId, GrantState,
    PermissionChangeLogEntry, PermissionDecision, PermissionId, PermissionName,
    PermissionSnapshot, RoleId, UserId,
};

use crate::auth_ports::{Clock, CredentialStore, IdGenerator, PermissionSnapshotCache};

mod evaluation;
mod permission_grants;
mod queries;
mod role_grants;


/// How per-permission decisions combine into one verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckMode {
    /// At least one requested permission must be held.
    #[default]
    Any,
    /// Every requested permission must be held.
    All,
}

/// Result of checking a set of permission names for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionCheck {
    /// Combination mode applied.
    pub mode: CheckMode,
    /// One decision per requested name, in request order.
    pub decisions: Vec<PermissionDecision>,
    /// Combined verdict. An empty request is always allowed.
    pub allowed: bool,
}

impl PermissionCheck {
    fn from_decisions(mode: CheckMode, decisions: Vec<PermissionDecision>) -> Self {
        let allowed = decisions.is_empty()
            || match mode {
                CheckMode::Any => decisions.iter().any(|decision| decision.held),
                CheckMode::All => decisions.iter().all(|decision| decision.held),
            };

        Self {
            mode,
            decisions,
            allowed,
        }
    }

    /// Returns the requested names that caused a denial.
    ///
    /// In `Any` mode a failed check reports every requested name, since any
    /// one of them would have sufficed.
    #[must_use]
    pub fn missing(&self) -> Vec<String> {
        if self.allowed {
            return Vec::new();
        }

        self.decisions
            .iter()
            .filter(|decision| !decision.held)
            .map(|decision| decision.permission.as_str().to_owned())
            .collect()
    }
}

/// Actor metadata recorded with every grant mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeContext {
    /// User performing the mutation.
    pub actor: UserId,
    /// Free-form reason for the audit trail.
    pub reason: Option<String>,
    /// Extra attributes copied into the change-log entry.
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl ChangeContext {
    /// Creates a context with no reason and no extensions.
    #[must_use]
    pub fn new(actor: UserId) -> Self {
        Self {
            actor,
            reason: None,
            extensions: BTreeMap::new(),
        }
    }
}

/// Input payload for granting a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantRoleInput {
    /// Grantee.
    pub user_id: UserId,
    /// Unique role name.
    pub role_name: String,
    /// Optional expiry; must be in the future.
    pub expires_at: Option<DateTime<Utc>>,
    /// Actor metadata.
    pub context: ChangeContext,
}

/// Input payload for revoking a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokeRoleInput {
    /// User losing the role.
    pub user_id: UserId,
    /// Unique role name.
    pub role_name: String,
    /// Actor metadata.
    pub context: ChangeContext,
}

/// Input payload for a direct grant or denial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantPermissionInput {
    /// Grantee.
    pub user_id: UserId,
    /// Permission to grant or deny.
    pub permission: PermissionName,
    /// Records a denial instead of a grant.
    pub is_denied: bool,
    /// Optional expiry; must be in the future.
    pub expires_at: Option<DateTime<Utc>>,
    /// Actor metadata.
    pub context: ChangeContext,
}

/// Input payload for lifting a direct grant or denial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokePermissionInput {
    /// User whose row is deactivated.
    pub user_id: UserId,
    /// Permission the row refers to.
    pub permission: PermissionName,
    /// Actor metadata.
    pub context: ChangeContext,
}

/// Grants currently in effect for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserGrants {
    /// Effective role grants.
    pub roles: Vec<ActiveRoleGrant>,
    /// Effective direct grants and denials.
    pub permissions: Vec<ActivePermissionGrant>,
}

/// Tuning for [`PermissionResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Upper bound for snapshot cache entries.
    pub snapshot_ttl_seconds: u64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            snapshot_ttl_seconds: 300,
        }
    }
}

/// Application service computing effective permissions and administering
/// grants.
#[derive(Clone)]
pub struct PermissionResolver {
    store: Arc<dyn CredentialStore>,
    cache: Arc<dyn PermissionSnapshotCache>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    settings: ResolverSettings,
}

impl PermissionResolver {
    /// Creates a resolver from its ports.
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        cache: Arc<dyn PermissionSnapshotCache>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            store,
            cache,
            clock,
            ids,
            settings,
        }
    }

    async fn evict(&self, user_id: &UserId) -> AppResult<()> {
        self.cache.evict_snapshot(user_id).await
    }

    #[allow(clippy::too_many_arguments)]
    fn change_entry(
        &self,
        action: ChangeAction,
        user_id: &UserId,
        role_id: Option<RoleId>,
        permission_id: Option<PermissionId>,
        before: Option<GrantState>,
        after: Option<GrantState>,
        context: ChangeContext,
        now: DateTime<Utc>,
    ) -> PermissionChangeLogEntry {
        PermissionChangeLogEntry {
            id: ChangeLogEntryId::from_uuid(self.ids.next_id()),
            action,
            user_id: user_id.clone(),
            role_id,
            permission_id,
            before,
            after,
            actor: context.actor,
            created_at: now,
            reason: context.reason,
            extensions: context.extensions,
        }
    }
}

fn ensure_future_expiry(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> AppResult<()> {
    match expires_at {
        Some(expires_at) if expires_at <= now => Err(AppError::Validation(format!(
            "expiry '{}' must be in the future",
            expires_at.to_rfc3339()
        ))),
        _ => Ok(()),
    }
}
