use keystone_core::AppResult;
use keystone_domain::TokenClaims;

/// Kind of signed token; each kind is signed with its own key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Short-lived request credential.
    Access,
    /// Long-lived, single-use rotation credential.
    Refresh,
}

impl TokenKind {
    /// Returns a stable label for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

/// Signing port for token claims.
pub trait TokenCodec: Send + Sync {
    /// Signs claims into a compact token string.
    fn encode(&self, kind: TokenKind, claims: &TokenClaims) -> AppResult<String>;

    /// Verifies the signature and decodes claims.
    ///
    /// Expiry is not checked here; callers compare `exp` against their own
    /// clock. Any signature or format problem yields
    /// `AppError::Token(TokenFailure::InvalidSignature)`.
    fn decode(&self, kind: TokenKind, token: &str) -> AppResult<TokenClaims>;
}
