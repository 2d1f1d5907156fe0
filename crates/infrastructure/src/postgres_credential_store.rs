use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::warn;

use keystone_application::{ChangeLogQuery, CredentialStore, GrantMutation};
use keystone_core::{AppError, AppResult};
use keystone_domain::{
    ActivePermissionGrant, ActiveRoleGrant, ChangeAction, ChangeLogEntryId, GrantId,
    GrantSource, GrantState, PermissionChangeLogEntry, PermissionDefinition, PermissionId,
    PermissionName, Revocation, Role, RoleId, RoleKind, RoleWithPermissions, UserId,
    UserPermissionGrant, UserRoleGrant,
};

mod catalog;
mod change_log;
mod grants;
mod mutations;


/// PostgreSQL-backed credential store.
#[derive(Clone)]
pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: uuid::Uuid,
    name: String,
    display_name: String,
    kind: String,
    is_system: bool,
    is_active: bool,
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: uuid::Uuid,
    name: String,
    module: String,
    operation: String,
    resource: Option<String>,
    is_system: bool,
}

#[derive(Debug, FromRow)]
struct RoleGrantRow {
    id: uuid::Uuid,
    user_id: String,
    role_id: uuid::Uuid,
    granted_by: String,
    granted_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
    revoked_by: Option<String>,
    revoked_at: Option<DateTime<Utc>>,
    reason: Option<String>,
}

#[derive(Debug, FromRow)]
struct ActiveRoleGrantRow {
    #[sqlx(flatten)]
    grant: RoleGrantRow,
    role_name: String,
    role_display_name: String,
    role_kind: String,
    role_is_system: bool,
    role_is_active: bool,
}

#[derive(Debug, FromRow)]
struct PermissionGrantRow {
    id: uuid::Uuid,
    user_id: String,
    permission_id: uuid::Uuid,
    granted_by: String,
    granted_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
    is_denied: bool,
    source: String,
    revoked_by: Option<String>,
    revoked_at: Option<DateTime<Utc>>,
    reason: Option<String>,
}

#[derive(Debug, FromRow)]
struct ActivePermissionGrantRow {
    #[sqlx(flatten)]
    grant: PermissionGrantRow,
    permission_name: String,
}

#[derive(Debug, FromRow)]
struct ChangeLogRow {
    id: uuid::Uuid,
    action: String,
    user_id: String,
    role_id: Option<uuid::Uuid>,
    permission_id: Option<uuid::Uuid>,
    before_state: Option<serde_json::Value>,
    after_state: Option<serde_json::Value>,
    actor: String,
    created_at: DateTime<Utc>,
    reason: Option<String>,
    extensions: serde_json::Value,
}

fn store_unavailable(operation: &str, error: sqlx::Error) -> AppError {
    warn!(operation, error = %error, "credential store query failed");
    AppError::StoreUnavailable(format!("failed to {operation}: {error}"))
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(database_error)
        if database_error.code().as_deref() == Some("23505"))
}

fn revocation_from_row(
    revoked_by: Option<String>,
    revoked_at: Option<DateTime<Utc>>,
) -> AppResult<Option<Revocation>> {
    match (revoked_by, revoked_at) {
        (Some(revoked_by), Some(revoked_at)) => Ok(Some(Revocation {
            revoked_by: UserId::new(revoked_by)?,
            revoked_at,
        })),
        (None, None) => Ok(None),
        _ => Err(AppError::Internal(
            "grant row has a partial revocation stamp".to_owned(),
        )),
    }
}

impl TryFrom<RoleRow> for Role {
    type Error = AppError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: RoleId::from_uuid(row.id),
            name: row.name,
            display_name: row.display_name,
            kind: RoleKind::from_str(row.kind.as_str())?,
            is_system: row.is_system,
            is_active: row.is_active,
        })
    }
}

impl TryFrom<PermissionRow> for PermissionDefinition {
    type Error = AppError;

    fn try_from(row: PermissionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PermissionId::from_uuid(row.id),
            name: PermissionName::new(row.name)?,
            module: row.module,
            operation: row.operation,
            resource: row.resource,
            is_system: row.is_system,
        })
    }
}

impl TryFrom<RoleGrantRow> for UserRoleGrant {
    type Error = AppError;

    fn try_from(row: RoleGrantRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: GrantId::from_uuid(row.id),
            user_id: UserId::new(row.user_id)?,
            role_id: RoleId::from_uuid(row.role_id),
            granted_by: UserId::new(row.granted_by)?,
            granted_at: row.granted_at,
            expires_at: row.expires_at,
            is_active: row.is_active,
            revocation: revocation_from_row(row.revoked_by, row.revoked_at)?,
            reason: row.reason,
        })
    }
}

impl TryFrom<ActiveRoleGrantRow> for ActiveRoleGrant {
    type Error = AppError;

    fn try_from(row: ActiveRoleGrantRow) -> Result<Self, Self::Error> {
        let role = Role::try_from(RoleRow {
            id: row.grant.role_id,
            name: row.role_name,
            display_name: row.role_display_name,
            kind: row.role_kind,
            is_system: row.role_is_system,
            is_active: row.role_is_active,
        })?;

        Ok(Self {
            grant: UserRoleGrant::try_from(row.grant)?,
            role,
        })
    }
}

impl TryFrom<PermissionGrantRow> for UserPermissionGrant {
    type Error = AppError;

    fn try_from(row: PermissionGrantRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: GrantId::from_uuid(row.id),
            user_id: UserId::new(row.user_id)?,
            permission_id: PermissionId::from_uuid(row.permission_id),
            granted_by: UserId::new(row.granted_by)?,
            granted_at: row.granted_at,
            expires_at: row.expires_at,
            is_active: row.is_active,
            is_denied: row.is_denied,
            source: GrantSource::from_str(row.source.as_str())?,
            revocation: revocation_from_row(row.revoked_by, row.revoked_at)?,
            reason: row.reason,
        })
    }
}

impl TryFrom<ActivePermissionGrantRow> for ActivePermissionGrant {
    type Error = AppError;

    fn try_from(row: ActivePermissionGrantRow) -> Result<Self, Self::Error> {
        Ok(Self {
            permission: PermissionName::new(row.permission_name)?,
            grant: UserPermissionGrant::try_from(row.grant)?,
        })
    }
}

fn decode_state(value: Option<serde_json::Value>) -> AppResult<Option<GrantState>> {
    value
        .map(|value| {
            serde_json::from_value::<GrantState>(value).map_err(|error| {
                AppError::Internal(format!("invalid grant state in change log: {error}"))
            })
        })
        .transpose()
}

impl TryFrom<ChangeLogRow> for PermissionChangeLogEntry {
    type Error = AppError;

    fn try_from(row: ChangeLogRow) -> Result<Self, Self::Error> {
        let extensions = serde_json::from_value(row.extensions).map_err(|error| {
            AppError::Internal(format!("invalid change log extensions: {error}"))
        })?;

        Ok(Self {
            id: ChangeLogEntryId::from_uuid(row.id),
            action: ChangeAction::from_str(row.action.as_str())?,
            user_id: UserId::new(row.user_id)?,
            role_id: row.role_id.map(RoleId::from_uuid),
            permission_id: row.permission_id.map(PermissionId::from_uuid),
            before: decode_state(row.before_state)?,
            after: decode_state(row.after_state)?,
            actor: UserId::new(row.actor)?,
            created_at: row.created_at,
            reason: row.reason,
            extensions,
        })
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn list_active_role_grants(&self, user_id: &UserId) -> AppResult<Vec<ActiveRoleGrant>> {
        self.list_active_role_grants_impl(user_id).await
    }

    async fn list_permissions_for_roles(
        &self,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<(RoleId, PermissionName)>> {
        self.list_permissions_for_roles_impl(role_ids).await
    }

    async fn list_active_permission_grants(
        &self,
        user_id: &UserId,
    ) -> AppResult<Vec<ActivePermissionGrant>> {
        self.list_active_permission_grants_impl(user_id).await
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        self.find_role_by_name_impl(name).await
    }

    async fn find_permission_by_name(
        &self,
        name: &PermissionName,
    ) -> AppResult<Option<PermissionDefinition>> {
        self.find_permission_by_name_impl(name).await
    }

    async fn find_active_role_grant(
        &self,
        user_id: &UserId,
        role_id: RoleId,
    ) -> AppResult<Option<UserRoleGrant>> {
        self.find_active_role_grant_impl(user_id, role_id).await
    }

    async fn find_active_permission_grant(
        &self,
        user_id: &UserId,
        permission_id: PermissionId,
    ) -> AppResult<Option<UserPermissionGrant>> {
        self.find_active_permission_grant_impl(user_id, permission_id)
            .await
    }

    async fn apply_grant_mutation(&self, mutation: GrantMutation) -> AppResult<()> {
        self.apply_grant_mutation_impl(mutation).await
    }

    async fn list_roles(&self) -> AppResult<Vec<RoleWithPermissions>> {
        self.list_roles_impl().await
    }

    async fn list_permissions(&self) -> AppResult<Vec<PermissionDefinition>> {
        self.list_permissions_impl().await
    }

    async fn list_change_log(
        &self,
        query: ChangeLogQuery,
    ) -> AppResult<Vec<PermissionChangeLogEntry>> {
        self.list_change_log_impl(query).await
    }
}
