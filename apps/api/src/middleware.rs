//! Request guards: bearer authentication, then route permissions.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use keystone_application::{AuthGuard, AuthenticatedCaller, PermissionRequirement};
use keystone_core::{AppError, AppResult};
use keystone_domain::PermissionName;

use crate::error::ApiResult;
use crate::state::AppState;

/// Caller identity on optional-auth routes; `None` when no usable token was
/// presented.
#[derive(Debug, Clone)]
pub struct OptionalCaller(pub Option<AuthenticatedCaller>);

/// Route-level permission requirement bound to the guard enforcing it.
#[derive(Clone)]
pub struct PermissionGate {
    auth_guard: AuthGuard,
    requirement: PermissionRequirement,
}

impl PermissionGate {
    /// Requires every listed permission.
    pub fn all(state: &AppState, permissions: &[&str]) -> AppResult<Self> {
        Ok(Self {
            auth_guard: state.auth_guard.clone(),
            requirement: PermissionRequirement::all(parse_permissions(permissions)?),
        })
    }
}

fn parse_permissions(permissions: &[&str]) -> AppResult<Vec<PermissionName>> {
    permissions
        .iter()
        .map(|permission| PermissionName::new(*permission))
        .collect()
}

fn authorization_header(headers: &HeaderMap) -> AppResult<Option<String>> {
    headers
        .get(header::AUTHORIZATION)
        .map(|value| {
            value.to_str().map(str::to_owned).map_err(|_| {
                AppError::Unauthorized("authorization header is not valid text".to_owned())
            })
        })
        .transpose()
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let authorization = authorization_header(request.headers())?;
    let caller = state
        .auth_guard
        .authenticate(authorization.as_deref())
        .await?;

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

pub async fn require_permissions(
    State(gate): State<PermissionGate>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let authorization = authorization_header(request.headers())?;
    let caller = gate
        .auth_guard
        .authorize(authorization.as_deref(), &gate.requirement)
        .await?;

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let caller = match authorization_header(request.headers()) {
        Ok(authorization) => {
            state
                .auth_guard
                .authenticate_optional(authorization.as_deref())
                .await?
        }
        Err(_) => None,
    };

    request.extensions_mut().insert(OptionalCaller(caller));
    Ok(next.run(request).await)
}
