//! HS256 token signing with one key per token kind.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use keystone_application::{TokenCodec, TokenKind};
use keystone_core::{AppError, AppResult, TokenFailure};
use keystone_domain::TokenClaims;
use tracing::debug;

/// Minimum accepted secret length in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// JSON Web Token codec signing access and refresh tokens with separate
/// HMAC-SHA256 keys.
pub struct JwtTokenCodec {
    access: SigningKeys,
    refresh: SigningKeys,
    validation: Validation,
}

impl JwtTokenCodec {
    /// Builds a codec from the two signing secrets.
    ///
    /// Both secrets must be at least [`MIN_SECRET_LENGTH`] bytes and must
    /// differ so a token of one kind never verifies as the other.
    pub fn new(access_secret: &str, refresh_secret: &str) -> AppResult<Self> {
        for (label, secret) in [("access", access_secret), ("refresh", refresh_secret)] {
            if secret.len() < MIN_SECRET_LENGTH {
                return Err(AppError::Validation(format!(
                    "{label} token secret must be at least {MIN_SECRET_LENGTH} bytes"
                )));
            }
        }

        if access_secret == refresh_secret {
            return Err(AppError::Validation(
                "access and refresh token secrets must differ".to_owned(),
            ));
        }

        // Expiry is checked against the injected clock by the token service.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);

        Ok(Self {
            access: SigningKeys::from_secret(access_secret),
            refresh: SigningKeys::from_secret(refresh_secret),
            validation,
        })
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }
}

impl TokenCodec for JwtTokenCodec {
    fn encode(&self, kind: TokenKind, claims: &TokenClaims) -> AppResult<String> {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.keys(kind).encoding,
        )
        .map_err(|error| {
            AppError::Internal(format!("failed to sign {} token: {error}", kind.as_str()))
        })
    }

    fn decode(&self, kind: TokenKind, token: &str) -> AppResult<TokenClaims> {
        jsonwebtoken::decode::<TokenClaims>(token, &self.keys(kind).decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|error| {
                debug!(kind = kind.as_str(), error = %error, "token rejected");
                AppError::Token(TokenFailure::InvalidSignature)
            })
    }
}
