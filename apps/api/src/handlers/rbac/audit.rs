use super::*;

const DEFAULT_CHANGE_LOG_LIMIT: u32 = 50;
const MAX_CHANGE_LOG_LIMIT: u32 = 500;

pub async fn list_change_log_handler(
    State(state): State<AppState>,
    Query(query): Query<ChangeLogQueryParams>,
) -> ApiResult<Json<Vec<ChangeLogEntryResponse>>> {
    let limit = query.limit.unwrap_or(DEFAULT_CHANGE_LOG_LIMIT);
    if limit > MAX_CHANGE_LOG_LIMIT {
        return Err(AppError::Validation(format!(
            "limit must not exceed {MAX_CHANGE_LOG_LIMIT}"
        ))
        .into());
    }

    let entries = state
        .permission_resolver
        .list_change_log(ChangeLogQuery {
            user_id: query.user_id.map(UserId::new).transpose()?,
            limit,
            offset: query.offset.unwrap_or(0),
        })
        .await?
        .into_iter()
        .map(ChangeLogEntryResponse::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(entries))
}

pub async fn revoke_user_sessions_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedCaller>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<RevokedSessionsResponse>> {
    let user_id = UserId::new(user_id)?;
    let revoked_sessions = state.token_service.revoke_all_for_user(&user_id).await?;

    info!(
        actor = %caller.claims.sub,
        user_id = %user_id,
        revoked_sessions,
        "user sessions revoked"
    );
    Ok(Json(RevokedSessionsResponse { revoked_sessions }))
}
