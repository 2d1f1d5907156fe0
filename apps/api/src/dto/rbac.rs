mod conversions;
mod types;

pub use types::{
    ChangeLogEntryResponse, ChangeLogQueryParams, CheckPermissionsRequest, DirectGrantResponse,
    GrantPermissionRequest, GrantRoleRequest, PermissionCheckResponse, PermissionDecisionResponse,
    PermissionGrantResponse, PermissionResponse, PermissionSnapshotResponse,
    RevokePermissionRequest, RevokeRoleRequest, RoleGrantResponse, RoleResponse,
    RoleSummaryResponse, UserGrantsResponse,
};
