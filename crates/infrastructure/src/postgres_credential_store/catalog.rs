use std::collections::BTreeMap;

use super::*;

#[derive(Debug, FromRow)]
struct RoleWithPermissionRow {
    #[sqlx(flatten)]
    role: RoleRow,
    permission: Option<String>,
}

impl PostgresCredentialStore {
    pub(super) async fn find_role_by_name_impl(&self, name: &str) -> AppResult<Option<Role>> {
        sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, display_name, kind, is_system, is_active
            FROM rbac_roles
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_unavailable("find role", error))?
        .map(Role::try_from)
        .transpose()
    }

    pub(super) async fn find_permission_by_name_impl(
        &self,
        name: &PermissionName,
    ) -> AppResult<Option<PermissionDefinition>> {
        sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, module, operation, resource, is_system
            FROM rbac_permissions
            WHERE name = $1
            "#,
        )
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_unavailable("find permission", error))?
        .map(PermissionDefinition::try_from)
        .transpose()
    }

    pub(super) async fn list_roles_impl(&self) -> AppResult<Vec<RoleWithPermissions>> {
        let rows = sqlx::query_as::<_, RoleWithPermissionRow>(
            r#"
            SELECT
                roles.id,
                roles.name,
                roles.display_name,
                roles.kind,
                roles.is_system,
                roles.is_active,
                permissions.name AS permission
            FROM rbac_roles AS roles
            LEFT JOIN rbac_role_permissions AS links
                ON links.role_id = roles.id
            LEFT JOIN rbac_permissions AS permissions
                ON permissions.id = links.permission_id
            ORDER BY roles.name, permissions.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_unavailable("list roles", error))?;

        let mut grouped: BTreeMap<String, RoleWithPermissions> = BTreeMap::new();
        for row in rows {
            let permission = row.permission.map(PermissionName::new).transpose()?;
            let name = row.role.name.clone();
            let entry = match grouped.entry(name) {
                std::collections::btree_map::Entry::Occupied(entry) => entry.into_mut(),
                std::collections::btree_map::Entry::Vacant(entry) => {
                    entry.insert(RoleWithPermissions {
                        role: Role::try_from(row.role)?,
                        permissions: Vec::new(),
                    })
                }
            };

            if let Some(permission) = permission {
                entry.permissions.push(permission);
            }
        }

        Ok(grouped.into_values().collect())
    }

    pub(super) async fn list_permissions_impl(&self) -> AppResult<Vec<PermissionDefinition>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, module, operation, resource, is_system
            FROM rbac_permissions
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_unavailable("list permissions", error))?;

        rows.into_iter().map(PermissionDefinition::try_from).collect()
    }
}
