//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod change_log;
mod claims;
mod grants;
mod ids;
mod rbac;
mod snapshot;

pub use change_log::{ChangeAction, GrantState, PermissionChangeLogEntry};
pub use claims::{AdminProfile, MemberProfile, SessionClaims, TokenClaims, UserClass};
pub use grants::{
    ActivePermissionGrant, ActiveRoleGrant, GrantSource, Revocation, UserPermissionGrant,
    UserRoleGrant,
};
pub use ids::{ChangeLogEntryId, GrantId, PermissionId, RoleId, SessionId, UserId};
pub use rbac::{PermissionDefinition, PermissionName, Role, RoleKind, RoleWithPermissions};
pub use snapshot::{
    DecisionSource, DirectGrantSummary, PermissionDecision, PermissionSnapshot, RoleSummary,
};
