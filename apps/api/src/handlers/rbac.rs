use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use tracing::info;

use keystone_application::{
    AuthenticatedCaller, ChangeContext, ChangeLogQuery, CheckMode, GrantPermissionInput,
    GrantRoleInput, RevokePermissionInput, RevokeRoleInput,
};
use keystone_core::{AppError, AppResult};
use keystone_domain::{PermissionName, UserId};

use crate::dto::{
    ChangeLogEntryResponse, ChangeLogQueryParams, CheckPermissionsRequest, GrantPermissionRequest,
    GrantRoleRequest, PermissionCheckResponse, PermissionResponse, PermissionSnapshotResponse,
    RevokePermissionRequest, RevokeRoleRequest, RevokedSessionsResponse, RoleResponse,
    UserGrantsResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

mod audit;
mod catalog;
mod evaluation;
mod grants;

pub use audit::{list_change_log_handler, revoke_user_sessions_handler};
pub use catalog::{list_permissions_handler, list_roles_handler, user_grants_handler};
pub use evaluation::{check_permissions_handler, my_permissions_handler};
pub use grants::{
    grant_permission_handler, grant_role_handler, revoke_permission_handler, revoke_role_handler,
};

fn change_context(
    caller: &AuthenticatedCaller,
    reason: Option<String>,
    extensions: Option<BTreeMap<String, serde_json::Value>>,
) -> ChangeContext {
    ChangeContext {
        actor: caller.claims.sub.clone(),
        reason,
        extensions: extensions.unwrap_or_default(),
    }
}
