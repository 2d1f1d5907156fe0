use async_trait::async_trait;
use keystone_core::AppResult;
use keystone_domain::{
    ActivePermissionGrant, ActiveRoleGrant, GrantState, PermissionChangeLogEntry,
    PermissionDefinition, PermissionId, PermissionName, Role, RoleId, RoleWithPermissions,
    UserId, UserPermissionGrant, UserRoleGrant,
};

/// One single-user grant mutation, applied atomically together with its
/// change-log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantMutation {
    /// Previously active row, carrying its deactivated image.
    pub deactivated: Option<GrantState>,
    /// New row to insert as active.
    pub inserted: Option<GrantState>,
    /// Audit entry describing the mutation.
    pub entry: PermissionChangeLogEntry,
}

/// Filter for change-log reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeLogQuery {
    /// Restricts entries to one subject user.
    pub user_id: Option<UserId>,
    /// Maximum number of entries.
    pub limit: u32,
    /// Entries to skip, newest first.
    pub offset: u32,
}

/// Durable store for roles, permissions, grants and the change log.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Lists the user's active role grants joined with their roles.
    ///
    /// Rows past `expires_at` may be returned; callers filter on time.
    async fn list_active_role_grants(&self, user_id: &UserId) -> AppResult<Vec<ActiveRoleGrant>>;

    /// Lists `(role, permission)` links for the given roles.
    async fn list_permissions_for_roles(
        &self,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<(RoleId, PermissionName)>>;

    /// Lists the user's active direct grants and denials.
    ///
    /// Rows past `expires_at` may be returned; callers filter on time.
    async fn list_active_permission_grants(
        &self,
        user_id: &UserId,
    ) -> AppResult<Vec<ActivePermissionGrant>>;

    /// Finds a role by its unique name.
    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>>;

    /// Finds a permission definition by its unique name.
    async fn find_permission_by_name(
        &self,
        name: &PermissionName,
    ) -> AppResult<Option<PermissionDefinition>>;

    /// Finds the active grant row for one `(user, role)` pair.
    async fn find_active_role_grant(
        &self,
        user_id: &UserId,
        role_id: RoleId,
    ) -> AppResult<Option<UserRoleGrant>>;

    /// Finds the active direct row for one `(user, permission)` pair.
    async fn find_active_permission_grant(
        &self,
        user_id: &UserId,
        permission_id: PermissionId,
    ) -> AppResult<Option<UserPermissionGrant>>;

    /// Applies a grant mutation and appends its change-log entry in one
    /// transaction.
    ///
    /// Fails with `Conflict` when the deactivated row is no longer active or
    /// the inserted row collides with another active row.
    async fn apply_grant_mutation(&self, mutation: GrantMutation) -> AppResult<()>;

    /// Lists roles with the permission names they confer.
    async fn list_roles(&self) -> AppResult<Vec<RoleWithPermissions>>;

    /// Lists permission definitions.
    async fn list_permissions(&self) -> AppResult<Vec<PermissionDefinition>>;

    /// Lists change-log entries, newest first.
    async fn list_change_log(
        &self,
        query: ChangeLogQuery,
    ) -> AppResult<Vec<PermissionChangeLogEntry>>;
}
