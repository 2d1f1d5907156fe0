use super::*;

const ROLE_GRANT_COLUMNS: &str = r#"
    grants.id,
    grants.user_id,
    grants.role_id,
    grants.granted_by,
    grants.granted_at,
    grants.expires_at,
    grants.is_active,
    grants.revoked_by,
    grants.revoked_at,
    grants.reason
"#;

const PERMISSION_GRANT_COLUMNS: &str = r#"
    grants.id,
    grants.user_id,
    grants.permission_id,
    grants.granted_by,
    grants.granted_at,
    grants.expires_at,
    grants.is_active,
    grants.is_denied,
    grants.source,
    grants.revoked_by,
    grants.revoked_at,
    grants.reason
"#;

impl PostgresCredentialStore {
    pub(super) async fn list_active_role_grants_impl(
        &self,
        user_id: &UserId,
    ) -> AppResult<Vec<ActiveRoleGrant>> {
        let sql = format!(
            r#"
            SELECT
                {ROLE_GRANT_COLUMNS},
                roles.name AS role_name,
                roles.display_name AS role_display_name,
                roles.kind AS role_kind,
                roles.is_system AS role_is_system,
                roles.is_active AS role_is_active
            FROM rbac_user_roles AS grants
            INNER JOIN rbac_roles AS roles
                ON roles.id = grants.role_id
            WHERE grants.user_id = $1
              AND grants.is_active
            ORDER BY roles.name
            "#
        );

        let rows = sqlx::query_as::<_, ActiveRoleGrantRow>(sql.as_str())
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|error| store_unavailable("list active role grants", error))?;

        rows.into_iter().map(ActiveRoleGrant::try_from).collect()
    }

    pub(super) async fn list_permissions_for_roles_impl(
        &self,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<(RoleId, PermissionName)>> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        let role_ids = role_ids.iter().map(RoleId::as_uuid).collect::<Vec<_>>();
        let rows = sqlx::query_as::<_, (uuid::Uuid, String)>(
            r#"
            SELECT links.role_id, permissions.name
            FROM rbac_role_permissions AS links
            INNER JOIN rbac_permissions AS permissions
                ON permissions.id = links.permission_id
            WHERE links.role_id = ANY($1)
            ORDER BY permissions.name
            "#,
        )
        .bind(role_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_unavailable("list role permissions", error))?;

        rows.into_iter()
            .map(|(role_id, name)| Ok((RoleId::from_uuid(role_id), PermissionName::new(name)?)))
            .collect()
    }

    pub(super) async fn list_active_permission_grants_impl(
        &self,
        user_id: &UserId,
    ) -> AppResult<Vec<ActivePermissionGrant>> {
        let sql = format!(
            r#"
            SELECT
                {PERMISSION_GRANT_COLUMNS},
                permissions.name AS permission_name
            FROM rbac_user_permissions AS grants
            INNER JOIN rbac_permissions AS permissions
                ON permissions.id = grants.permission_id
            WHERE grants.user_id = $1
              AND grants.is_active
            ORDER BY permissions.name
            "#
        );

        let rows = sqlx::query_as::<_, ActivePermissionGrantRow>(sql.as_str())
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|error| store_unavailable("list active permission grants", error))?;

        rows.into_iter().map(ActivePermissionGrant::try_from).collect()
    }

    pub(super) async fn find_active_role_grant_impl(
        &self,
        user_id: &UserId,
        role_id: RoleId,
    ) -> AppResult<Option<UserRoleGrant>> {
        let sql = format!(
            r#"
            SELECT {ROLE_GRANT_COLUMNS}
            FROM rbac_user_roles AS grants
            WHERE grants.user_id = $1
              AND grants.role_id = $2
              AND grants.is_active
            "#
        );

        sqlx::query_as::<_, RoleGrantRow>(sql.as_str())
            .bind(user_id.as_str())
            .bind(role_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| store_unavailable("find active role grant", error))?
            .map(UserRoleGrant::try_from)
            .transpose()
    }

    pub(super) async fn find_active_permission_grant_impl(
        &self,
        user_id: &UserId,
        permission_id: PermissionId,
    ) -> AppResult<Option<UserPermissionGrant>> {
        let sql = format!(
            r#"
            SELECT {PERMISSION_GRANT_COLUMNS}
            FROM rbac_user_permissions AS grants
            WHERE grants.user_id = $1
              AND grants.permission_id = $2
              AND grants.is_active
            "#
        );

        sqlx::query_as::<_, PermissionGrantRow>(sql.as_str())
            .bind(user_id.as_str())
            .bind(permission_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| store_unavailable("find active permission grant", error))?
            .map(UserPermissionGrant::try_from)
            .transpose()
    }
}
