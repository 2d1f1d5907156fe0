use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use keystone_core::AppError;
use serde::{Deserialize, Serialize};

use crate::{
    ChangeLogEntryId, PermissionId, RoleId, UserId, UserPermissionGrant, UserRoleGrant,
};

/// Stable kinds of permission mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// A role was granted to a user.
    RoleGranted,
    /// A role grant was deactivated.
    RoleRevoked,
    /// A permission was granted directly to a user.
    PermissionGranted,
    /// A permission was denied directly to a user.
    PermissionDenied,
    /// A direct grant or denial was deactivated.
    PermissionRevoked,
}

impl ChangeAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleGranted => "role.granted",
            Self::RoleRevoked => "role.revoked",
            Self::PermissionGranted => "permission.granted",
            Self::PermissionDenied => "permission.denied",
            Self::PermissionRevoked => "permission.revoked",
        }
    }
}

impl FromStr for ChangeAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "role.granted" => Ok(Self::RoleGranted),
            "role.revoked" => Ok(Self::RoleRevoked),
            "permission.granted" => Ok(Self::PermissionGranted),
            "permission.denied" => Ok(Self::PermissionDenied),
            "permission.revoked" => Ok(Self::PermissionRevoked),
            _ => Err(AppError::Validation(format!(
                "unknown change action value '{value}'"
            ))),
        }
    }
}

/// Before/after image of the grant row touched by a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrantState {
    /// Role grant row.
    RoleGrant(UserRoleGrant),
    /// Direct permission grant row.
    PermissionGrant(UserPermissionGrant),
}

/// Append-only audit row describing one permission mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionChangeLogEntry {
    /// Entry identifier.
    pub id: ChangeLogEntryId,
    /// Mutation kind.
    pub action: ChangeAction,
    /// User whose grants changed.
    pub user_id: UserId,
    /// Affected role, for role mutations.
    pub role_id: Option<RoleId>,
    /// Affected permission, for direct grant mutations.
    pub permission_id: Option<PermissionId>,
    /// Row image before the mutation.
    pub before: Option<GrantState>,
    /// Row image after the mutation.
    pub after: Option<GrantState>,
    /// Actor performing the mutation.
    pub actor: UserId,
    /// Mutation timestamp.
    pub created_at: DateTime<Utc>,
    /// Reason supplied by the actor.
    pub reason: Option<String>,
    /// Forward-compatible extra attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, serde_json::Value>,
}
