use super::*;

pub async fn grant_role_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedCaller>,
    Path(user_id): Path<String>,
    Json(payload): Json<GrantRoleRequest>,
) -> ApiResult<(StatusCode, Json<ChangeLogEntryResponse>)> {
    let entry = state
        .permission_resolver
        .grant_role(GrantRoleInput {
            user_id: UserId::new(user_id)?,
            role_name: payload.role_name,
            expires_at: parse_expires_at(payload.expires_at.as_deref())?,
            context: change_context(&caller, payload.reason, payload.extensions),
        })
        .await?;

    info!(
        actor = %caller.claims.sub,
        user_id = %entry.user_id,
        "role granted"
    );
    Ok((
        StatusCode::CREATED,
        Json(ChangeLogEntryResponse::try_from(entry)?),
    ))
}

pub async fn revoke_role_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedCaller>,
    Path(user_id): Path<String>,
    Json(payload): Json<RevokeRoleRequest>,
) -> ApiResult<Json<ChangeLogEntryResponse>> {
    let entry = state
        .permission_resolver
        .revoke_role(RevokeRoleInput {
            user_id: UserId::new(user_id)?,
            role_name: payload.role_name,
            context: change_context(&caller, payload.reason, payload.extensions),
        })
        .await?;

    info!(
        actor = %caller.claims.sub,
        user_id = %entry.user_id,
        "role revoked"
    );
    Ok(Json(ChangeLogEntryResponse::try_from(entry)?))
}

pub async fn grant_permission_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedCaller>,
    Path(user_id): Path<String>,
    Json(payload): Json<GrantPermissionRequest>,
) -> ApiResult<(StatusCode, Json<ChangeLogEntryResponse>)> {
    let entry = state
        .permission_resolver
        .grant_permission(GrantPermissionInput {
            user_id: UserId::new(user_id)?,
            permission: PermissionName::new(payload.permission)?,
            is_denied: payload.is_denied.unwrap_or(false),
            expires_at: parse_expires_at(payload.expires_at.as_deref())?,
            context: change_context(&caller, payload.reason, payload.extensions),
        })
        .await?;

    info!(
        actor = %caller.claims.sub,
        user_id = %entry.user_id,
        action = entry.action.as_str(),
        "permission granted"
    );
    Ok((
        StatusCode::CREATED,
        Json(ChangeLogEntryResponse::try_from(entry)?),
    ))
}

pub async fn revoke_permission_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedCaller>,
    Path(user_id): Path<String>,
    Json(payload): Json<RevokePermissionRequest>,
) -> ApiResult<Json<ChangeLogEntryResponse>> {
    let entry = state
        .permission_resolver
        .revoke_permission(RevokePermissionInput {
            user_id: UserId::new(user_id)?,
            permission: PermissionName::new(payload.permission)?,
            context: change_context(&caller, payload.reason, payload.extensions),
        })
        .await?;

    info!(
        actor = %caller.claims.sub,
        user_id = %entry.user_id,
        "permission revoked"
    );
    Ok(Json(ChangeLogEntryResponse::try_from(entry)?))
}

fn parse_expires_at(value: Option<&str>) -> AppResult<Option<DateTime<Utc>>> {
    value
        .map(|value| {
            DateTime::parse_from_rfc3339(value)
                .map(|timestamp| timestamp.with_timezone(&Utc))
                .map_err(|error| {
                    AppError::Validation(format!("expiresAt must be an RFC 3339 timestamp: {error}"))
                })
        })
        .transpose()
}
