use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use keystone_core::AppError;
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, health, rbac};
use crate::middleware::{self, PermissionGate};
use crate::state::AppState;

/// Builds the HTTP surface over a fully wired state.
pub fn build_router(app_state: AppState) -> Result<Router, AppError> {
    let authenticated_routes = Router::new()
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/logout-all", post(auth::logout_all_handler))
        .route(
            "/api/rbac/me/permissions",
            get(rbac::my_permissions_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_auth,
        ));

    let optional_auth_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::optional_auth,
        ));

    let rbac_read_routes = Router::new()
        .route("/api/rbac/check", post(rbac::check_permissions_handler))
        .route("/api/rbac/roles", get(rbac::list_roles_handler))
        .route("/api/rbac/permissions", get(rbac::list_permissions_handler))
        .route(
            "/api/rbac/users/{user_id}/grants",
            get(rbac::user_grants_handler),
        )
        .route_layer(from_fn_with_state(
            PermissionGate::all(&app_state, &["rbac:read"])?,
            middleware::require_permissions,
        ));

    let rbac_manage_routes = Router::new()
        .route(
            "/api/rbac/users/{user_id}/roles",
            post(rbac::grant_role_handler),
        )
        .route(
            "/api/rbac/users/{user_id}/roles/revoke",
            post(rbac::revoke_role_handler),
        )
        .route(
            "/api/rbac/users/{user_id}/permissions",
            post(rbac::grant_permission_handler),
        )
        .route(
            "/api/rbac/users/{user_id}/permissions/revoke",
            post(rbac::revoke_permission_handler),
        )
        .route_layer(from_fn_with_state(
            PermissionGate::all(&app_state, &["rbac:manage"])?,
            middleware::require_permissions,
        ));

    let session_admin_routes = Router::new()
        .route(
            "/api/rbac/users/{user_id}/sessions/revoke",
            post(rbac::revoke_user_sessions_handler),
        )
        .route_layer(from_fn_with_state(
            PermissionGate::all(&app_state, &["session:revoke"])?,
            middleware::require_permissions,
        ));

    let audit_routes = Router::new()
        .route("/api/rbac/change-log", get(rbac::list_change_log_handler))
        .route_layer(from_fn_with_state(
            PermissionGate::all(&app_state, &["rbac:audit"])?,
            middleware::require_permissions,
        ));

    Ok(Router::new()
        .route("/health", get(health::health_handler))
        .route("/auth/sessions", post(auth::issue_session_handler))
        .route("/auth/refresh", post(auth::refresh_session_handler))
        .merge(authenticated_routes)
        .merge(optional_auth_routes)
        .merge(rbac_read_routes)
        .merge(rbac_manage_routes)
        .merge(session_admin_routes)
        .merge(audit_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state))
}
