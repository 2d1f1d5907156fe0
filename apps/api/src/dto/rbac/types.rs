use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// API representation of a role and the permissions it confers.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../../packages/api-types/src/generated/role-response.ts"
)]
pub struct RoleResponse {
    pub role_id: String,
    pub name: String,
    pub display_name: String,
    pub kind: String,
    pub is_system: bool,
    pub is_active: bool,
    pub permissions: Vec<String>,
}

/// API representation of a permission definition.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../../packages/api-types/src/generated/permission-response.ts"
)]
pub struct PermissionResponse {
    pub permission_id: String,
    pub name: String,
    pub module: String,
    pub operation: String,
    pub resource: Option<String>,
    pub is_system: bool,
}

/// Role contributing to a permission snapshot.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../../packages/api-types/src/generated/role-summary-response.ts"
)]
pub struct RoleSummaryResponse {
    pub role_id: String,
    pub name: String,
    pub kind: String,
}

/// Direct grant or denial contributing to a permission snapshot.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../../packages/api-types/src/generated/direct-grant-response.ts"
)]
pub struct DirectGrantResponse {
    pub permission: String,
    pub is_denied: bool,
    pub source: String,
    pub expires_at: Option<String>,
}

/// Effective permissions of one user.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../../packages/api-types/src/generated/permission-snapshot-response.ts"
)]
pub struct PermissionSnapshotResponse {
    pub user_id: String,
    pub roles: Vec<RoleSummaryResponse>,
    pub role_permissions: Vec<String>,
    pub direct_grants: Vec<DirectGrantResponse>,
    pub effective_permissions: Vec<String>,
    pub computed_at: String,
    pub valid_until: Option<String>,
}

/// Incoming payload for a permission check.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../../packages/api-types/src/generated/check-permissions-request.ts"
)]
pub struct CheckPermissionsRequest {
    pub user_id: String,
    pub permissions: Vec<String>,
    /// `any` (default) or `all`.
    #[ts(optional)]
    pub mode: Option<String>,
}

/// Outcome for one requested permission.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../../packages/api-types/src/generated/permission-decision-response.ts"
)]
pub struct PermissionDecisionResponse {
    pub permission: String,
    pub held: bool,
    pub source: Option<String>,
}

/// Combined outcome of a permission check.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../../packages/api-types/src/generated/permission-check-response.ts"
)]
pub struct PermissionCheckResponse {
    pub allowed: bool,
    pub mode: String,
    pub decisions: Vec<PermissionDecisionResponse>,
}

/// Incoming payload for role grants.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../../packages/api-types/src/generated/grant-role-request.ts"
)]
pub struct GrantRoleRequest {
    pub role_name: String,
    /// RFC 3339 timestamp.
    #[ts(optional)]
    pub expires_at: Option<String>,
    #[ts(optional)]
    pub reason: Option<String>,
    #[ts(optional)]
    pub extensions: Option<BTreeMap<String, Value>>,
}

/// Incoming payload for role revocation.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../../packages/api-types/src/generated/revoke-role-request.ts"
)]
pub struct RevokeRoleRequest {
    pub role_name: String,
    #[ts(optional)]
    pub reason: Option<String>,
    #[ts(optional)]
    pub extensions: Option<BTreeMap<String, Value>>,
}

/// Incoming payload for direct grants and denials.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../../packages/api-types/src/generated/grant-permission-request.ts"
)]
pub struct GrantPermissionRequest {
    pub permission: String,
    #[ts(optional)]
    pub is_denied: Option<bool>,
    /// RFC 3339 timestamp.
    #[ts(optional)]
    pub expires_at: Option<String>,
    #[ts(optional)]
    pub reason: Option<String>,
    #[ts(optional)]
    pub extensions: Option<BTreeMap<String, Value>>,
}

/// Incoming payload for lifting a direct grant or denial.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../../packages/api-types/src/generated/revoke-permission-request.ts"
)]
pub struct RevokePermissionRequest {
    pub permission: String,
    #[ts(optional)]
    pub reason: Option<String>,
    #[ts(optional)]
    pub extensions: Option<BTreeMap<String, Value>>,
}

/// API representation of an effective role grant.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../../packages/api-types/src/generated/role-grant-response.ts"
)]
pub struct RoleGrantResponse {
    pub grant_id: String,
    pub role_id: String,
    pub role_name: String,
    pub granted_by: String,
    pub granted_at: String,
    pub expires_at: Option<String>,
    pub reason: Option<String>,
}

/// API representation of an effective direct grant or denial.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../../packages/api-types/src/generated/permission-grant-response.ts"
)]
pub struct PermissionGrantResponse {
    pub grant_id: String,
    pub permission_id: String,
    pub permission: String,
    pub is_denied: bool,
    pub source: String,
    pub granted_by: String,
    pub granted_at: String,
    pub expires_at: Option<String>,
    pub reason: Option<String>,
}

/// Grants currently in effect for one user.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../../packages/api-types/src/generated/user-grants-response.ts"
)]
pub struct UserGrantsResponse {
    pub user_id: String,
    pub roles: Vec<RoleGrantResponse>,
    pub permissions: Vec<PermissionGrantResponse>,
}

/// API representation of a permission change-log entry.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../../packages/api-types/src/generated/change-log-entry-response.ts"
)]
pub struct ChangeLogEntryResponse {
    pub entry_id: String,
    pub action: String,
    pub user_id: String,
    pub role_id: Option<String>,
    pub permission_id: Option<String>,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub actor: String,
    pub created_at: String,
    pub reason: Option<String>,
    pub extensions: BTreeMap<String, Value>,
}

/// Query parameters for change-log reads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogQueryParams {
    pub user_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
