use super::*;

impl TokenService {
    /// Verifies an access token.
    ///
    /// The blacklist is consulted before the signature so a revoked token is
    /// reported as revoked even once it has also expired. No credential-store
    /// lookup happens here.
    pub async fn verify(&self, access_token: &str) -> AppResult<TokenClaims> {
        if self
            .cache
            .is_token_blacklisted(&hash_token(access_token))
            .await?
        {
            return Err(TokenFailure::Revoked.into());
        }

        self.decode_unexpired(TokenKind::Access, access_token)
    }
}
