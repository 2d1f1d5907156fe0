use super::*;

impl TokenService {
    /// Blacklists an access token for the rest of its lifetime.
    ///
    /// Tokens that no longer verify are rejected; an already expired token is
    /// accepted as a no-op since it cannot be used anyway.
    pub async fn revoke_access(&self, access_token: &str) -> AppResult<()> {
        let claims = self.codec.decode(TokenKind::Access, access_token)?;
        let remaining = claims.remaining_seconds(self.now_seconds());
        if remaining == 0 {
            return Ok(());
        }

        let ttl = u64::try_from(remaining)
            .unwrap_or(0)
            .max(self.settings.blacklist_min_ttl_seconds);
        self.cache
            .blacklist_token(&hash_token(access_token), ttl)
            .await
    }

    /// Drops the live refresh token of one session.
    pub async fn revoke_refresh(&self, session_id: &SessionId) -> AppResult<()> {
        self.cache.delete_refresh_token(session_id).await
    }

    /// Drops every session recorded for a user and returns how many were
    /// recorded.
    pub async fn revoke_all_for_user(&self, user_id: &UserId) -> AppResult<usize> {
        let sessions = self.cache.list_user_sessions(user_id).await?;
        for session_id in &sessions {
            self.cache.delete_refresh_token(session_id).await?;
        }

        self.cache.clear_user_sessions(user_id).await?;
        Ok(sessions.len())
    }
}
