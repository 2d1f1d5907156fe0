use keystone_domain::{PermissionDefinition, RoleWithPermissions};

use super::*;
use crate::auth_ports::ChangeLogQuery;

impl PermissionResolver {
    /// Lists roles with the permissions they confer.
    pub async fn list_roles(&self) -> AppResult<Vec<RoleWithPermissions>> {
        self.store.list_roles().await
    }

    /// Lists permission definitions.
    pub async fn list_permissions(&self) -> AppResult<Vec<PermissionDefinition>> {
        self.store.list_permissions().await
    }

    /// Lists the grants in effect for a user right now.
    pub async fn list_user_grants(&self, user_id: &UserId) -> AppResult<UserGrants> {
        let now = self.clock.now();
        let roles = self
            .store
            .list_active_role_grants(user_id)
            .await?
            .into_iter()
            .filter(|active| active.grant.is_effective_at(now))
            .collect();
        let permissions = self
            .store
            .list_active_permission_grants(user_id)
            .await?
            .into_iter()
            .filter(|active| active.grant.is_effective_at(now))
            .collect();

        Ok(UserGrants { roles, permissions })
    }

    /// Reads the change log, newest first.
    pub async fn list_change_log(
        &self,
        query: ChangeLogQuery,
    ) -> AppResult<Vec<PermissionChangeLogEntry>> {
        if query.limit == 0 {
            return Err(AppError::Validation(
                "change log limit must be positive".to_owned(),
            ));
        }

        self.store.list_change_log(query).await
    }
}
