use super::*;

impl TokenService {
    /// Rotates a refresh token into a new pair for the same session.
    ///
    /// The stored entry is consumed with a compare-and-delete, so among
    /// concurrent calls presenting the same token exactly one succeeds and
    /// the rest fail with `SessionMismatch`.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let claims = self.decode_unexpired(TokenKind::Refresh, refresh_token)?;

        let consumed = self
            .cache
            .consume_refresh_token(&claims.session_id, refresh_token)
            .await?;
        if !consumed {
            return Err(TokenFailure::SessionMismatch.into());
        }

        self.issue(claims.base()).await
    }
}
