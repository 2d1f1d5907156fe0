//! Effective permission computation.
//!
//! `effective = role_permissions ∪ direct_grants \ direct_denials`. The
//! subtraction is applied last, so an effective denial beats every grant of
//! the same name no matter which row was created first.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    ActivePermissionGrant, ActiveRoleGrant, GrantSource, PermissionName, RoleId, RoleKind, UserId,
};

/// Role contributing to a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSummary {
    /// Role identifier.
    pub id: RoleId,
    /// Unique role name.
    pub name: String,
    /// Role category.
    pub kind: RoleKind,
}

/// Direct grant or denial contributing to a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectGrantSummary {
    /// Permission name.
    pub permission: PermissionName,
    /// Whether the row is a denial.
    pub is_denied: bool,
    /// Origin of the row.
    pub source: GrantSource,
    /// Optional expiry of the row.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Where a permission decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// Conferred by a role.
    Role,
    /// Granted directly.
    Direct,
    /// Blocked by a direct denial.
    Denied,
}

/// Outcome of evaluating one permission name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDecision {
    /// Evaluated permission name.
    pub permission: PermissionName,
    /// Whether the user holds the permission.
    pub held: bool,
    /// Source of the decision; `None` when nothing matched.
    pub source: Option<DecisionSource>,
}

/// Computed set of a user's effective permissions at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSnapshot {
    /// Subject user.
    pub user_id: UserId,
    /// Roles currently conferring permissions.
    pub roles: Vec<RoleSummary>,
    /// Names conferred through roles.
    pub role_permissions: BTreeSet<PermissionName>,
    /// Effective direct grants and denials.
    pub direct_grants: Vec<DirectGrantSummary>,
    /// Final effective set.
    pub effective_permissions: BTreeSet<PermissionName>,
    /// Computation timestamp.
    pub computed_at: DateTime<Utc>,
    /// Earliest expiry among contributing grants.
    pub valid_until: Option<DateTime<Utc>>,
}

impl PermissionSnapshot {
    /// Computes a snapshot from store rows, discarding anything not effective
    /// at `now`.
    #[must_use]
    pub fn compute(
        user_id: UserId,
        role_grants: &[ActiveRoleGrant],
        role_permissions: &[(RoleId, PermissionName)],
        direct_grants: &[ActivePermissionGrant],
        now: DateTime<Utc>,
    ) -> Self {
        let mut valid_until: Option<DateTime<Utc>> = None;
        let mut track_expiry = |expires_at: Option<DateTime<Utc>>| {
            if let Some(expires_at) = expires_at {
                valid_until = Some(valid_until.map_or(expires_at, |current| current.min(expires_at)));
            }
        };

        let mut roles = Vec::new();
        let mut contributing_roles = HashSet::new();
        for active in role_grants {
            if !active.role.is_active || !active.grant.is_effective_at(now) {
                continue;
            }

            track_expiry(active.grant.expires_at);
            if contributing_roles.insert(active.role.id) {
                roles.push(RoleSummary {
                    id: active.role.id,
                    name: active.role.name.clone(),
                    kind: active.role.kind,
                });
            }
        }
        roles.sort_by(|left, right| left.name.cmp(&right.name));

        let role_permissions = role_permissions
            .iter()
            .filter(|(role_id, _)| contributing_roles.contains(role_id))
            .map(|(_, permission)| permission.clone())
            .collect::<BTreeSet<_>>();

        let mut direct = Vec::new();
        for active in direct_grants {
            if !active.grant.is_effective_at(now) {
                continue;
            }

            track_expiry(active.grant.expires_at);
            direct.push(DirectGrantSummary {
                permission: active.permission.clone(),
                is_denied: active.grant.is_denied,
                source: active.grant.source,
                expires_at: active.grant.expires_at,
            });
        }
        direct.sort_by(|left, right| {
            left.permission
                .cmp(&right.permission)
                .then(left.is_denied.cmp(&right.is_denied))
        });

        let mut snapshot = Self {
            user_id,
            roles,
            role_permissions,
            direct_grants: direct,
            effective_permissions: BTreeSet::new(),
            computed_at: now,
            valid_until,
        };
        snapshot.effective_permissions = snapshot.merge();
        snapshot
    }

    fn merge(&self) -> BTreeSet<PermissionName> {
        let denied = self.denied_names();
        let mut effective = self.role_permissions.clone();
        effective.extend(
            self.direct_grants
                .iter()
                .filter(|grant| !grant.is_denied)
                .map(|grant| grant.permission.clone()),
        );
        effective.retain(|permission| !denied.contains(permission));
        effective
    }

    fn denied_names(&self) -> BTreeSet<PermissionName> {
        self.direct_grants
            .iter()
            .filter(|grant| grant.is_denied)
            .map(|grant| grant.permission.clone())
            .collect()
    }

    /// Evaluates one permission name against the snapshot.
    #[must_use]
    pub fn evaluate(&self, permission: &PermissionName) -> PermissionDecision {
        let is_denied = self
            .direct_grants
            .iter()
            .any(|grant| grant.is_denied && &grant.permission == permission);
        if is_denied {
            return PermissionDecision {
                permission: permission.clone(),
                held: false,
                source: Some(DecisionSource::Denied),
            };
        }

        let source = if self.role_permissions.contains(permission) {
            Some(DecisionSource::Role)
        } else if self
            .direct_grants
            .iter()
            .any(|grant| !grant.is_denied && &grant.permission == permission)
        {
            Some(DecisionSource::Direct)
        } else {
            None
        };

        PermissionDecision {
            permission: permission.clone(),
            held: source.is_some(),
            source,
        }
    }

    /// Returns whether the snapshot still reflects the grants at `now`.
    #[must_use]
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_none_or(|valid_until| now < valid_until)
    }

    /// Returns the ids of contributing roles.
    #[must_use]
    pub fn role_ids(&self) -> Vec<RoleId> {
        self.roles.iter().map(|role| role.id).collect()
    }

    /// Returns the effective set as plain strings.
    #[must_use]
    pub fn permission_names(&self) -> Vec<String> {
        self.effective_permissions
            .iter()
            .map(|permission| permission.as_str().to_owned())
            .collect()
    }
}
