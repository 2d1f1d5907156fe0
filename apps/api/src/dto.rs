//! Request and response payloads exposed over HTTP.

mod auth;
mod health;
mod rbac;

pub use auth::{
    IssueSessionRequest, RefreshSessionRequest, RevokedSessionsResponse, SessionClaimsResponse,
    SessionInfoResponse, TokenPairResponse,
};
pub use health::{HealthDependencyStatus, HealthResponse};
pub use rbac::{
    ChangeLogEntryResponse, ChangeLogQueryParams, CheckPermissionsRequest, DirectGrantResponse,
    GrantPermissionRequest, GrantRoleRequest, PermissionCheckResponse, PermissionDecisionResponse,
    PermissionGrantResponse, PermissionResponse, PermissionSnapshotResponse,
    RevokePermissionRequest, RevokeRoleRequest, RoleGrantResponse, RoleResponse,
    RoleSummaryResponse, UserGrantsResponse,
};
