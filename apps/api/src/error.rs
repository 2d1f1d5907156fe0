use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use keystone_core::AppError;
use tracing::{error, warn};

mod types;

pub use types::ErrorResponse;

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, payload) = match self.0 {
            AppError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_ERROR", message),
            ),
            AppError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("NOT_FOUND", message),
            ),
            AppError::Conflict(message) => (
                StatusCode::CONFLICT,
                ErrorResponse::new("CONFLICT", message),
            ),
            AppError::MissingRole(message) => (
                StatusCode::CONFLICT,
                ErrorResponse::new("MISSING_ROLE", message),
            ),
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("UNAUTHORIZED", message),
            ),
            AppError::Token(failure) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new(failure.code(), failure.to_string()),
            ),
            AppError::InsufficientPermission { missing } => (
                StatusCode::FORBIDDEN,
                ErrorResponse::forbidden(missing),
            ),
            AppError::StoreUnavailable(detail) | AppError::CacheUnavailable(detail) => {
                warn!(detail = %detail, "dependency unavailable while serving request");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::new(
                        "SERVICE_UNAVAILABLE",
                        "service temporarily unavailable".to_owned(),
                    ),
                )
            }
            AppError::Internal(detail) => {
                error!(detail = %detail, "internal error while serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("INTERNAL_ERROR", "internal server error".to_owned()),
                )
            }
        };

        (status, Json(payload)).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use keystone_core::{AppError, TokenFailure};

    use super::ApiError;

    fn status_of(error: AppError) -> StatusCode {
        ApiError(error).into_response().status()
    }

    #[test]
    fn token_failures_are_unauthorized() {
        for failure in [
            TokenFailure::InvalidSignature,
            TokenFailure::Expired,
            TokenFailure::Revoked,
            TokenFailure::SessionMismatch,
        ] {
            assert_eq!(status_of(AppError::Token(failure)), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn outages_map_to_service_unavailable() {
        assert_eq!(
            status_of(AppError::StoreUnavailable("pg down".to_owned())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(AppError::CacheUnavailable("redis down".to_owned())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn permission_and_role_failures_are_distinct() {
        assert_eq!(
            status_of(AppError::InsufficientPermission {
                missing: vec!["rbac:manage".to_owned()],
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(AppError::MissingRole("operator".to_owned())),
            StatusCode::CONFLICT
        );
    }
}
