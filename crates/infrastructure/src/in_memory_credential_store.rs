use std::collections::HashMap;

use async_trait::async_trait;
use keystone_application::{ChangeLogQuery, CredentialStore, GrantMutation};
use keystone_core::{AppError, AppResult};
use keystone_domain::{
    ActivePermissionGrant, ActiveRoleGrant, GrantId, GrantState, PermissionChangeLogEntry,
    PermissionDefinition, PermissionId, PermissionName, Role, RoleId, RoleKind,
    RoleWithPermissions, UserId, UserPermissionGrant, UserRoleGrant,
};
use tokio::sync::RwLock;
use uuid::Uuid;

const SYSTEM_PERMISSIONS: [&str; 4] = ["rbac:read", "rbac:manage", "rbac:audit", "session:revoke"];

#[derive(Debug, Default)]
struct CatalogState {
    roles: Vec<Role>,
    permissions: Vec<PermissionDefinition>,
    role_permissions: Vec<(RoleId, PermissionId)>,
    role_grants: HashMap<GrantId, UserRoleGrant>,
    permission_grants: HashMap<GrantId, UserPermissionGrant>,
    change_log: Vec<PermissionChangeLogEntry>,
}

impl CatalogState {
    fn permission_name(&self, permission_id: PermissionId) -> Option<&PermissionName> {
        self.permissions
            .iter()
            .find(|definition| definition.id == permission_id)
            .map(|definition| &definition.name)
    }

    fn ensure_permission(&mut self, name: PermissionName, is_system: bool) -> PermissionId {
        if let Some(existing) = self
            .permissions
            .iter()
            .find(|definition| definition.name == name)
        {
            return existing.id;
        }

        let mut parts = name.as_str().splitn(3, ':');
        let module = parts.next().unwrap_or_default().to_owned();
        let operation = parts.next().unwrap_or_default().to_owned();
        let resource = parts.next().map(str::to_owned);
        let id = PermissionId::from_uuid(Uuid::new_v4());

        self.permissions.push(PermissionDefinition {
            id,
            name,
            module,
            operation,
            resource,
            is_system,
        });
        id
    }
}

/// In-memory credential store for tests and local development.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    state: RwLock<CatalogState>,
}

impl InMemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with the built-in roles and permissions.
    pub async fn with_system_catalog() -> AppResult<Self> {
        let store = Self::new();
        for name in SYSTEM_PERMISSIONS {
            store.seed_permission(name, true).await?;
        }
        store
            .insert_role(
                "super_admin",
                "Super Administrator",
                RoleKind::SuperAdmin,
                &SYSTEM_PERMISSIONS,
                true,
            )
            .await?;
        store
            .insert_role(
                "security_viewer",
                "Security Viewer",
                RoleKind::Viewer,
                &["rbac:read", "rbac:audit"],
                true,
            )
            .await?;
        Ok(store)
    }

    /// Adds a permission definition, returning the existing one when the
    /// name is already known.
    pub async fn seed_permission(&self, name: &str, is_system: bool) -> AppResult<PermissionId> {
        let name = PermissionName::new(name)?;
        Ok(self.state.write().await.ensure_permission(name, is_system))
    }

    /// Adds an active role conferring the listed permissions.
    pub async fn seed_role(
        &self,
        name: &str,
        display_name: &str,
        kind: RoleKind,
        permissions: &[&str],
    ) -> AppResult<Role> {
        self.insert_role(name, display_name, kind, permissions, false)
            .await
    }

    async fn insert_role(
        &self,
        name: &str,
        display_name: &str,
        kind: RoleKind,
        permissions: &[&str],
        is_system: bool,
    ) -> AppResult<Role> {
        let names = permissions
            .iter()
            .map(|value| PermissionName::new(*value))
            .collect::<AppResult<Vec<_>>>()?;

        let mut state = self.state.write().await;
        if state.roles.iter().any(|role| role.name == name) {
            return Err(AppError::Conflict(format!("role '{name}' already exists")));
        }

        let role = Role {
            id: RoleId::from_uuid(Uuid::new_v4()),
            name: name.to_owned(),
            display_name: display_name.to_owned(),
            kind,
            is_system,
            is_active: true,
        };
        state.roles.push(role.clone());

        for permission in names {
            let permission_id = state.ensure_permission(permission, false);
            state.role_permissions.push((role.id, permission_id));
        }

        Ok(role)
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn list_active_role_grants(&self, user_id: &UserId) -> AppResult<Vec<ActiveRoleGrant>> {
        let state = self.state.read().await;
        let mut grants = state
            .role_grants
            .values()
            .filter(|grant| grant.is_active && &grant.user_id == user_id)
            .filter_map(|grant| {
                state
                    .roles
                    .iter()
                    .find(|role| role.id == grant.role_id)
                    .map(|role| ActiveRoleGrant {
                        grant: grant.clone(),
                        role: role.clone(),
                    })
            })
            .collect::<Vec<_>>();
        grants.sort_by(|left, right| left.role.name.cmp(&right.role.name));
        Ok(grants)
    }

    async fn list_permissions_for_roles(
        &self,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<(RoleId, PermissionName)>> {
        let state = self.state.read().await;
        Ok(state
            .role_permissions
            .iter()
            .filter(|(role_id, _)| role_ids.contains(role_id))
            .filter_map(|(role_id, permission_id)| {
                state
                    .permission_name(*permission_id)
                    .map(|name| (*role_id, name.clone()))
            })
            .collect())
    }

    async fn list_active_permission_grants(
        &self,
        user_id: &UserId,
    ) -> AppResult<Vec<ActivePermissionGrant>> {
        let state = self.state.read().await;
        let mut grants = state
            .permission_grants
            .values()
            .filter(|grant| grant.is_active && &grant.user_id == user_id)
            .filter_map(|grant| {
                state
                    .permission_name(grant.permission_id)
                    .map(|name| ActivePermissionGrant {
                        grant: grant.clone(),
                        permission: name.clone(),
                    })
            })
            .collect::<Vec<_>>();
        grants.sort_by(|left, right| left.permission.cmp(&right.permission));
        Ok(grants)
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        let state = self.state.read().await;
        Ok(state.roles.iter().find(|role| role.name == name).cloned())
    }

    async fn find_permission_by_name(
        &self,
        name: &PermissionName,
    ) -> AppResult<Option<PermissionDefinition>> {
        let state = self.state.read().await;
        Ok(state
            .permissions
            .iter()
            .find(|definition| &definition.name == name)
            .cloned())
    }

    async fn find_active_role_grant(
        &self,
        user_id: &UserId,
        role_id: RoleId,
    ) -> AppResult<Option<UserRoleGrant>> {
        let state = self.state.read().await;
        Ok(state
            .role_grants
            .values()
            .find(|grant| grant.is_active && &grant.user_id == user_id && grant.role_id == role_id)
            .cloned())
    }

    async fn find_active_permission_grant(
        &self,
        user_id: &UserId,
        permission_id: PermissionId,
    ) -> AppResult<Option<UserPermissionGrant>> {
        let state = self.state.read().await;
        Ok(state
            .permission_grants
            .values()
            .find(|grant| {
                grant.is_active && &grant.user_id == user_id && grant.permission_id == permission_id
            })
            .cloned())
    }

    async fn apply_grant_mutation(&self, mutation: GrantMutation) -> AppResult<()> {
        let mut state = self.state.write().await;

        // All checks run before the first write.
        if let Some(deactivated) = &mutation.deactivated {
            let still_active = match deactivated {
                GrantState::RoleGrant(grant) => state
                    .role_grants
                    .get(&grant.id)
                    .is_some_and(|row| row.is_active),
                GrantState::PermissionGrant(grant) => state
                    .permission_grants
                    .get(&grant.id)
                    .is_some_and(|row| row.is_active),
            };
            if !still_active {
                return Err(AppError::Conflict(
                    "grant is no longer active".to_owned(),
                ));
            }
        }

        let replaced = mutation.deactivated.as_ref().map(|grant_state| match grant_state {
            GrantState::RoleGrant(grant) => grant.id,
            GrantState::PermissionGrant(grant) => grant.id,
        });
        let collides = match &mutation.inserted {
            Some(GrantState::RoleGrant(inserted)) => state.role_grants.values().any(|row| {
                row.is_active
                    && Some(row.id) != replaced
                    && row.user_id == inserted.user_id
                    && row.role_id == inserted.role_id
            }),
            Some(GrantState::PermissionGrant(inserted)) => {
                state.permission_grants.values().any(|row| {
                    row.is_active
                        && Some(row.id) != replaced
                        && row.user_id == inserted.user_id
                        && row.permission_id == inserted.permission_id
                })
            }
            None => false,
        };
        if collides {
            return Err(AppError::Conflict(
                "an active grant already exists for this user".to_owned(),
            ));
        }

        for grant_state in [mutation.deactivated, mutation.inserted].into_iter().flatten() {
            match grant_state {
                GrantState::RoleGrant(grant) => {
                    state.role_grants.insert(grant.id, grant);
                }
                GrantState::PermissionGrant(grant) => {
                    state.permission_grants.insert(grant.id, grant);
                }
            }
        }
        state.change_log.push(mutation.entry);

        Ok(())
    }

    async fn list_roles(&self) -> AppResult<Vec<RoleWithPermissions>> {
        let state = self.state.read().await;
        let mut roles = state
            .roles
            .iter()
            .map(|role| {
                let mut permissions = state
                    .role_permissions
                    .iter()
                    .filter(|(role_id, _)| *role_id == role.id)
                    .filter_map(|(_, permission_id)| state.permission_name(*permission_id).cloned())
                    .collect::<Vec<_>>();
                permissions.sort();
                RoleWithPermissions {
                    role: role.clone(),
                    permissions,
                }
            })
            .collect::<Vec<_>>();
        roles.sort_by(|left, right| left.role.name.cmp(&right.role.name));
        Ok(roles)
    }

    async fn list_permissions(&self) -> AppResult<Vec<PermissionDefinition>> {
        let mut permissions = self.state.read().await.permissions.clone();
        permissions.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(permissions)
    }

    async fn list_change_log(
        &self,
        query: ChangeLogQuery,
    ) -> AppResult<Vec<PermissionChangeLogEntry>> {
        let state = self.state.read().await;
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);

        Ok(state
            .change_log
            .iter()
            .rev()
            .filter(|entry| {
                query
                    .user_id
                    .as_ref()
                    .is_none_or(|user_id| &entry.user_id == user_id)
            })
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use keystone_application::{ChangeLogQuery, CredentialStore, GrantMutation};
    use keystone_core::AppError;
    use keystone_domain::{
        ChangeAction, ChangeLogEntryId, GrantId, GrantState, PermissionChangeLogEntry, UserId,
        UserRoleGrant,
    };
    use uuid::Uuid;

    use super::InMemoryCredentialStore;

    fn user(value: &str) -> UserId {
        UserId::new(value).unwrap_or_else(|_| unreachable!())
    }

    fn role_grant_mutation(grant: &UserRoleGrant) -> GrantMutation {
        GrantMutation {
            deactivated: None,
            inserted: Some(GrantState::RoleGrant(grant.clone())),
            entry: PermissionChangeLogEntry {
                id: ChangeLogEntryId::from_uuid(Uuid::new_v4()),
                action: ChangeAction::RoleGranted,
                user_id: grant.user_id.clone(),
                role_id: Some(grant.role_id),
                permission_id: None,
                before: None,
                after: Some(GrantState::RoleGrant(grant.clone())),
                actor: grant.granted_by.clone(),
                created_at: grant.granted_at,
                reason: None,
                extensions: BTreeMap::new(),
            },
        }
    }

    #[tokio::test]
    async fn system_catalog_is_seeded() {
        let store = InMemoryCredentialStore::with_system_catalog()
            .await
            .unwrap_or_default();
        let roles = store.list_roles().await.unwrap_or_default();

        let names = roles
            .iter()
            .map(|role| role.role.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["security_viewer", "super_admin"]);
        assert_eq!(roles[1].permissions.len(), 4);
        assert_eq!(store.list_permissions().await.unwrap_or_default().len(), 4);
    }

    #[tokio::test]
    async fn colliding_insert_is_rejected_without_log_entry() {
        let store = InMemoryCredentialStore::with_system_catalog()
            .await
            .unwrap_or_default();
        let role = store
            .find_role_by_name("super_admin")
            .await
            .unwrap_or_default()
            .unwrap_or_else(|| unreachable!());

        let grant = UserRoleGrant {
            id: GrantId::from_uuid(Uuid::new_v4()),
            user_id: user("u1"),
            role_id: role.id,
            granted_by: user("root"),
            granted_at: Utc::now(),
            expires_at: None,
            is_active: true,
            revocation: None,
            reason: None,
        };
        assert!(store.apply_grant_mutation(role_grant_mutation(&grant)).await.is_ok());

        let duplicate = UserRoleGrant {
            id: GrantId::from_uuid(Uuid::new_v4()),
            ..grant
        };
        let result = store
            .apply_grant_mutation(role_grant_mutation(&duplicate))
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let log = store
            .list_change_log(ChangeLogQuery {
                user_id: Some(user("u1")),
                limit: 10,
                offset: 0,
            })
            .await
            .unwrap_or_default();
        assert_eq!(log.len(), 1);
    }
}
