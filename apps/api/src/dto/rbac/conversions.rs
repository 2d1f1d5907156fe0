use keystone_application::{CheckMode, PermissionCheck, UserGrants};
use keystone_core::AppError;
use keystone_domain::{
    ActivePermissionGrant, ActiveRoleGrant, DecisionSource, GrantState, PermissionChangeLogEntry,
    PermissionDecision, PermissionDefinition, PermissionSnapshot, RoleWithPermissions, UserId,
};
use serde_json::Value;

use super::types::{
    ChangeLogEntryResponse, DirectGrantResponse, PermissionCheckResponse,
    PermissionDecisionResponse, PermissionGrantResponse, PermissionResponse,
    PermissionSnapshotResponse, RoleGrantResponse, RoleResponse, RoleSummaryResponse,
    UserGrantsResponse,
};

fn decision_source_label(source: DecisionSource) -> &'static str {
    match source {
        DecisionSource::Role => "role",
        DecisionSource::Direct => "direct",
        DecisionSource::Denied => "denied",
    }
}

fn check_mode_label(mode: CheckMode) -> &'static str {
    match mode {
        CheckMode::Any => "any",
        CheckMode::All => "all",
    }
}

impl From<RoleWithPermissions> for RoleResponse {
    fn from(value: RoleWithPermissions) -> Self {
        Self {
            role_id: value.role.id.as_uuid().to_string(),
            name: value.role.name,
            display_name: value.role.display_name,
            kind: value.role.kind.as_str().to_owned(),
            is_system: value.role.is_system,
            is_active: value.role.is_active,
            permissions: value
                .permissions
                .iter()
                .map(|permission| permission.as_str().to_owned())
                .collect(),
        }
    }
}

impl From<PermissionDefinition> for PermissionResponse {
    fn from(value: PermissionDefinition) -> Self {
        Self {
            permission_id: value.id.as_uuid().to_string(),
            name: value.name.as_str().to_owned(),
            module: value.module,
            operation: value.operation,
            resource: value.resource,
            is_system: value.is_system,
        }
    }
}

impl From<PermissionSnapshot> for PermissionSnapshotResponse {
    fn from(value: PermissionSnapshot) -> Self {
        Self {
            user_id: value.user_id.as_str().to_owned(),
            roles: value
                .roles
                .into_iter()
                .map(|role| RoleSummaryResponse {
                    role_id: role.id.as_uuid().to_string(),
                    name: role.name,
                    kind: role.kind.as_str().to_owned(),
                })
                .collect(),
            role_permissions: value
                .role_permissions
                .iter()
                .map(|permission| permission.as_str().to_owned())
                .collect(),
            direct_grants: value
                .direct_grants
                .into_iter()
                .map(|grant| DirectGrantResponse {
                    permission: grant.permission.as_str().to_owned(),
                    is_denied: grant.is_denied,
                    source: grant.source.as_str().to_owned(),
                    expires_at: grant.expires_at.map(|value| value.to_rfc3339()),
                })
                .collect(),
            effective_permissions: value
                .effective_permissions
                .iter()
                .map(|permission| permission.as_str().to_owned())
                .collect(),
            computed_at: value.computed_at.to_rfc3339(),
            valid_until: value.valid_until.map(|value| value.to_rfc3339()),
        }
    }
}

impl From<PermissionDecision> for PermissionDecisionResponse {
    fn from(value: PermissionDecision) -> Self {
        Self {
            permission: value.permission.as_str().to_owned(),
            held: value.held,
            source: value
                .source
                .map(|source| decision_source_label(source).to_owned()),
        }
    }
}

impl From<PermissionCheck> for PermissionCheckResponse {
    fn from(value: PermissionCheck) -> Self {
        Self {
            allowed: value.allowed,
            mode: check_mode_label(value.mode).to_owned(),
            decisions: value
                .decisions
                .into_iter()
                .map(PermissionDecisionResponse::from)
                .collect(),
        }
    }
}

impl From<ActiveRoleGrant> for RoleGrantResponse {
    fn from(value: ActiveRoleGrant) -> Self {
        Self {
            grant_id: value.grant.id.as_uuid().to_string(),
            role_id: value.role.id.as_uuid().to_string(),
            role_name: value.role.name,
            granted_by: value.grant.granted_by.as_str().to_owned(),
            granted_at: value.grant.granted_at.to_rfc3339(),
            expires_at: value.grant.expires_at.map(|value| value.to_rfc3339()),
            reason: value.grant.reason,
        }
    }
}

impl From<ActivePermissionGrant> for PermissionGrantResponse {
    fn from(value: ActivePermissionGrant) -> Self {
        Self {
            grant_id: value.grant.id.as_uuid().to_string(),
            permission_id: value.grant.permission_id.as_uuid().to_string(),
            permission: value.permission.as_str().to_owned(),
            is_denied: value.grant.is_denied,
            source: value.grant.source.as_str().to_owned(),
            granted_by: value.grant.granted_by.as_str().to_owned(),
            granted_at: value.grant.granted_at.to_rfc3339(),
            expires_at: value.grant.expires_at.map(|value| value.to_rfc3339()),
            reason: value.grant.reason,
        }
    }
}

impl UserGrantsResponse {
    /// Creates a response for the given user's grants.
    #[must_use]
    pub fn from_grants(user_id: &UserId, grants: UserGrants) -> Self {
        Self {
            user_id: user_id.as_str().to_owned(),
            roles: grants.roles.into_iter().map(RoleGrantResponse::from).collect(),
            permissions: grants
                .permissions
                .into_iter()
                .map(PermissionGrantResponse::from)
                .collect(),
        }
    }
}

fn encode_state(state: Option<GrantState>) -> Result<Option<Value>, AppError> {
    state
        .map(|state| {
            serde_json::to_value(state).map_err(|error| {
                AppError::Internal(format!("failed to encode grant state: {error}"))
            })
        })
        .transpose()
}

impl TryFrom<PermissionChangeLogEntry> for ChangeLogEntryResponse {
    type Error = AppError;

    fn try_from(value: PermissionChangeLogEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            entry_id: value.id.as_uuid().to_string(),
            action: value.action.as_str().to_owned(),
            user_id: value.user_id.as_str().to_owned(),
            role_id: value.role_id.map(|role_id| role_id.as_uuid().to_string()),
            permission_id: value
                .permission_id
                .map(|permission_id| permission_id.as_uuid().to_string()),
            before: encode_state(value.before)?,
            after: encode_state(value.after)?,
            actor: value.actor.as_str().to_owned(),
            created_at: value.created_at.to_rfc3339(),
            reason: value.reason,
            extensions: value.extensions,
        })
    }
}
