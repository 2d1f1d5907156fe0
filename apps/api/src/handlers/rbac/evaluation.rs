use super::*;

pub async fn my_permissions_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedCaller>,
) -> ApiResult<Json<PermissionSnapshotResponse>> {
    let snapshot = state
        .permission_resolver
        .snapshot(&caller.claims.sub)
        .await?;

    Ok(Json(PermissionSnapshotResponse::from(snapshot)))
}

pub async fn check_permissions_handler(
    State(state): State<AppState>,
    Json(payload): Json<CheckPermissionsRequest>,
) -> ApiResult<Json<PermissionCheckResponse>> {
    let user_id = UserId::new(payload.user_id)?;
    let mode = parse_check_mode(payload.mode.as_deref())?;
    let permissions = payload
        .permissions
        .into_iter()
        .map(PermissionName::new)
        .collect::<AppResult<Vec<_>>>()?;

    let check = state
        .permission_resolver
        .check(&user_id, &permissions, mode)
        .await?;

    Ok(Json(PermissionCheckResponse::from(check)))
}

fn parse_check_mode(mode: Option<&str>) -> AppResult<CheckMode> {
    match mode {
        None | Some("any") => Ok(CheckMode::Any),
        Some("all") => Ok(CheckMode::All),
        Some(other) => Err(AppError::Validation(format!(
            "unknown check mode '{other}', expected 'any' or 'all'"
        ))),
    }
}
