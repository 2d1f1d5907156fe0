use std::str::FromStr;

use chrono::{DateTime, Utc};
use keystone_core::AppError;
use serde::{Deserialize, Serialize};

use crate::{GrantId, PermissionId, PermissionName, RoleId, UserId};

/// Origin of a direct permission grant row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantSource {
    /// Materialised from a role assignment.
    Role,
    /// Assigned directly by an administrator.
    Direct,
    /// Time-boxed assignment.
    Temporary,
}

impl GrantSource {
    /// Returns a stable storage value for this source.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::Direct => "direct",
            Self::Temporary => "temporary",
        }
    }
}

impl FromStr for GrantSource {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "role" => Ok(Self::Role),
            "direct" => Ok(Self::Direct),
            "temporary" => Ok(Self::Temporary),
            _ => Err(AppError::Validation(format!(
                "unknown grant source value '{value}'"
            ))),
        }
    }
}

/// Revocation stamp on a deactivated grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revocation {
    /// Actor who deactivated the grant.
    pub revoked_by: UserId,
    /// Deactivation timestamp.
    pub revoked_at: DateTime<Utc>,
}

/// Assignment of a role to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRoleGrant {
    /// Grant row identifier.
    pub id: GrantId,
    /// Grantee.
    pub user_id: UserId,
    /// Granted role.
    pub role_id: RoleId,
    /// Actor who created the grant.
    pub granted_by: UserId,
    /// Creation timestamp.
    pub granted_at: DateTime<Utc>,
    /// Optional expiry; the grant is void afterwards whatever `is_active` says.
    pub expires_at: Option<DateTime<Utc>>,
    /// Soft-deactivation flag.
    pub is_active: bool,
    /// Set when the grant was deactivated.
    pub revocation: Option<Revocation>,
    /// Free-form reason captured at grant time.
    pub reason: Option<String>,
}

impl UserRoleGrant {
    /// Returns whether the grant confers its role at `now`.
    #[must_use]
    pub fn is_effective_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !is_expired(self.expires_at, now)
    }
}

/// Direct grant or denial of one permission to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPermissionGrant {
    /// Grant row identifier.
    pub id: GrantId,
    /// Grantee.
    pub user_id: UserId,
    /// Granted or denied permission.
    pub permission_id: PermissionId,
    /// Actor who created the grant.
    pub granted_by: UserId,
    /// Creation timestamp.
    pub granted_at: DateTime<Utc>,
    /// Optional expiry; the grant is void afterwards whatever `is_active` says.
    pub expires_at: Option<DateTime<Utc>>,
    /// Soft-deactivation flag.
    pub is_active: bool,
    /// Denials override every grant of the same permission.
    pub is_denied: bool,
    /// Origin of the row.
    pub source: GrantSource,
    /// Set when the grant was deactivated.
    pub revocation: Option<Revocation>,
    /// Free-form reason captured at grant time.
    pub reason: Option<String>,
}

impl UserPermissionGrant {
    /// Returns whether the grant takes part in evaluation at `now`.
    #[must_use]
    pub fn is_effective_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !is_expired(self.expires_at, now)
    }
}

/// Active role grant joined with its role's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRoleGrant {
    /// Grant row.
    pub grant: UserRoleGrant,
    /// Granted role.
    pub role: crate::Role,
}

/// Active direct grant joined with its permission name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivePermissionGrant {
    /// Grant row.
    pub grant: UserPermissionGrant,
    /// Permission name the row refers to.
    pub permission: PermissionName,
}

fn is_expired(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|expires_at| expires_at <= now)
}
