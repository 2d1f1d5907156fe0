use super::*;

impl TokenService {
    /// Issues an access/refresh pair for the base claims and registers the
    /// session in the shared cache.
    ///
    /// The session-set membership is written before the refresh entry. A
    /// failure between the two leaves an orphaned session id, which
    /// `revoke_all_for_user` deletes as a no-op, never a live refresh token
    /// that the user's session set cannot reach.
    pub async fn issue(&self, claims: SessionClaims) -> AppResult<TokenPair> {
        let iat = self.now_seconds();
        let access_exp = expiry_after(iat, self.settings.access_ttl_seconds)?;
        let refresh_exp = expiry_after(iat, self.settings.refresh_ttl_seconds)?;

        let access_claims = TokenClaims::stamp(
            claims.clone(),
            self.ids.next_id().to_string(),
            iat,
            access_exp,
        )?;
        let refresh_claims = TokenClaims::stamp(
            claims.clone(),
            self.ids.next_id().to_string(),
            iat,
            refresh_exp,
        )?;

        let access_token = self.codec.encode(TokenKind::Access, &access_claims)?;
        let refresh_token = self.codec.encode(TokenKind::Refresh, &refresh_claims)?;

        let refresh_ttl = u64::try_from(self.settings.refresh_ttl_seconds).map_err(|error| {
            AppError::Internal(format!("invalid refresh token lifetime: {error}"))
        })?;
        self.cache
            .add_user_session(&claims.sub, &claims.session_id, refresh_ttl)
            .await?;
        self.cache
            .store_refresh_token(&claims.session_id, &refresh_token, refresh_ttl)
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_in: self.settings.access_ttl_seconds,
            refresh_expires_in: self.settings.refresh_ttl_seconds,
            session_id: claims.session_id,
        })
    }

    /// Starts a new login session for a user.
    pub async fn start_session(&self, sub: UserId, class: UserClass) -> AppResult<TokenPair> {
        let claims = self.new_session_claims(sub, class)?;
        self.issue(claims).await
    }
}

fn expiry_after(iat: i64, ttl_seconds: i64) -> AppResult<i64> {
    iat.checked_add(ttl_seconds).ok_or_else(|| {
        AppError::Validation(format!("token lifetime {ttl_seconds} overflows the expiry"))
    })
}
