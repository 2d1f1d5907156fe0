use super::*;

pub async fn issue_session_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<IssueSessionRequest>,
) -> ApiResult<(StatusCode, Json<TokenPairResponse>)> {
    verify_bootstrap_token(&state, &headers)?;

    let user_id = UserId::new(payload.user_id)?;
    let class = match payload.user_type.as_str() {
        "member" => {
            let (Some(member_tier), Some(member_status)) =
                (payload.member_tier, payload.member_status)
            else {
                return Err(AppError::Validation(
                    "members require memberTier and memberStatus".to_owned(),
                )
                .into());
            };

            UserClass::Member(MemberProfile {
                member_tier,
                member_status,
            })
        }
        "admin" => UserClass::Admin(
            state
                .permission_resolver
                .admin_profile(&user_id, payload.department)
                .await?,
        ),
        other => {
            return Err(AppError::Validation(format!("unknown userType '{other}'")).into());
        }
    };

    let user_type = class.as_str();
    let pair = state.token_service.start_session(user_id.clone(), class).await?;
    info!(
        user_id = %user_id,
        user_type,
        session_id = pair.session_id.as_str(),
        "session issued"
    );

    Ok((StatusCode::CREATED, Json(TokenPairResponse::from(pair))))
}

pub async fn refresh_session_handler(
    State(state): State<AppState>,
    Json(payload): Json<RefreshSessionRequest>,
) -> ApiResult<Json<TokenPairResponse>> {
    let pair = state
        .token_service
        .refresh(payload.refresh_token.as_str())
        .await?;

    Ok(Json(TokenPairResponse::from(pair)))
}

pub async fn me_handler(
    Extension(OptionalCaller(caller)): Extension<OptionalCaller>,
) -> Json<SessionInfoResponse> {
    Json(SessionInfoResponse {
        authenticated: caller.is_some(),
        claims: caller.map(|caller| SessionClaimsResponse::from(caller.claims)),
    })
}

fn verify_bootstrap_token(state: &AppState, headers: &HeaderMap) -> AppResult<()> {
    let presented = headers
        .get(BOOTSTRAP_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing bootstrap token".to_owned()))?;

    // Digests have a fixed length, so the comparison does not leak the secret length.
    if hash_token(presented) != hash_token(state.bootstrap_token.as_str()) {
        return Err(AppError::Unauthorized("invalid bootstrap token".to_owned()));
    }

    Ok(())
}
