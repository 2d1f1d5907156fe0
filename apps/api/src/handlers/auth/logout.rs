use super::*;

pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedCaller>,
) -> ApiResult<StatusCode> {
    state
        .token_service
        .revoke_access(caller.access_token.as_str())
        .await?;
    state
        .token_service
        .revoke_refresh(&caller.claims.session_id)
        .await?;

    info!(
        user_id = %caller.claims.sub,
        session_id = caller.claims.session_id.as_str(),
        "session logged out"
    );
    Ok(StatusCode::NO_CONTENT)
}

pub async fn logout_all_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedCaller>,
) -> ApiResult<Json<RevokedSessionsResponse>> {
    state
        .token_service
        .revoke_access(caller.access_token.as_str())
        .await?;
    let revoked_sessions = state
        .token_service
        .revoke_all_for_user(&caller.claims.sub)
        .await?;

    info!(user_id = %caller.claims.sub, revoked_sessions, "all sessions logged out");
    Ok(Json(RevokedSessionsResponse { revoked_sessions }))
}
