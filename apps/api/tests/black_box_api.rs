use std::sync::Arc;

use keystone_api::api_config::{ApiConfig, CacheBackend};
use keystone_api::api_services::{ServicePorts, build_state_from_ports};
use keystone_api::build_router;
use keystone_application::{ChangeContext, GrantRoleInput, ResolverSettings, TokenSettings};
use keystone_domain::UserId;
use keystone_infrastructure::{
    InMemoryCredentialStore, InMemoryPermissionSnapshotCache, InMemorySessionCache,
    JwtTokenCodec, SystemClock, UuidIdGenerator,
};
use reqwest::StatusCode;
use serde_json::{Value, json};

const BOOTSTRAP_TOKEN: &str = "test-bootstrap-token";
const ROOT_USER: &str = "root";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Spawns the production router over in-memory adapters, with `root`
    /// holding `super_admin`.
    async fn spawn() -> Self {
        let config = test_config();
        let store = InMemoryCredentialStore::with_system_catalog()
            .await
            .unwrap_or_else(|_| unreachable!());
        let codec = JwtTokenCodec::new(
            config.access_token_secret.as_str(),
            config.refresh_token_secret.as_str(),
        )
        .unwrap_or_else(|_| unreachable!());

        let state = build_state_from_ports(
            ServicePorts {
                store: Arc::new(store),
                session_cache: Arc::new(InMemorySessionCache::new()),
                snapshot_cache: Arc::new(InMemoryPermissionSnapshotCache::new()),
                codec: Arc::new(codec),
                clock: Arc::new(SystemClock),
                ids: Arc::new(UuidIdGenerator),
            },
            &config,
        )
        .unwrap_or_else(|_| unreachable!());

        let root = UserId::new(ROOT_USER).unwrap_or_else(|_| unreachable!());
        state
            .permission_resolver
            .grant_role(GrantRoleInput {
                user_id: root.clone(),
                role_name: "super_admin".to_owned(),
                expires_at: None,
                context: ChangeContext::new(root),
            })
            .await
            .unwrap_or_else(|_| unreachable!());

        let app = build_router(state).unwrap_or_else(|_| unreachable!());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|_| unreachable!());
        let address = listener.local_addr().unwrap_or_else(|_| unreachable!());

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{address}"),
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn issue_session(&self, payload: Value) -> reqwest::Response {
        self.client
            .post(self.url("/auth/sessions"))
            .header("x-bootstrap-token", BOOTSTRAP_TOKEN)
            .json(&payload)
            .send()
            .await
            .unwrap_or_else(|_| unreachable!())
    }

    async fn admin_tokens(&self, user_id: &str) -> Value {
        let response = self
            .issue_session(json!({ "userId": user_id, "userType": "admin" }))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.unwrap_or_else(|_| unreachable!())
    }

    async fn member_tokens(&self, user_id: &str) -> Value {
        let response = self
            .issue_session(json!({
                "userId": user_id,
                "userType": "member",
                "memberTier": "gold",
                "memberStatus": "active",
            }))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.unwrap_or_else(|_| unreachable!())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn test_config() -> ApiConfig {
    ApiConfig {
        migrate_only: false,
        database_url: String::new(),
        database_max_connections: 1,
        cache_backend: CacheBackend::InMemory,
        redis_url: None,
        access_token_secret: "a".repeat(32),
        refresh_token_secret: "r".repeat(32),
        token_settings: TokenSettings::default(),
        resolver_settings: ResolverSettings::default(),
        bootstrap_token: BOOTSTRAP_TOKEN.to_owned(),
        api_host: "127.0.0.1".to_owned(),
        api_port: 0,
    }
}

fn token(value: &Value, field: &str) -> String {
    value[field].as_str().unwrap_or_default().to_owned()
}

async fn body(response: reqwest::Response) -> Value {
    response.json().await.unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() {
    let server = TestServer::spawn().await;

    let response = server
        .client
        .get(server.url("/api/rbac/roles"))
        .send()
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn session_issuance_requires_the_bootstrap_token() {
    let server = TestServer::spawn().await;

    let response = server
        .client
        .post(server.url("/auth/sessions"))
        .header("x-bootstrap-token", "wrong")
        .json(&json!({ "userId": "u-1", "userType": "admin" }))
        .send()
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn member_sessions_require_tier_and_status() {
    let server = TestServer::spawn().await;

    let response = server
        .issue_session(json!({ "userId": "m-1", "userType": "member" }))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn admin_claims_carry_current_permissions() {
    let server = TestServer::spawn().await;
    let tokens = server.admin_tokens(ROOT_USER).await;

    let response = server
        .client
        .get(server.url("/auth/me"))
        .bearer_auth(token(&tokens, "accessToken"))
        .send()
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(response.status(), StatusCode::OK);
    let info = body(response).await;
    assert_eq!(info["authenticated"], true);
    assert_eq!(info["claims"]["userType"], "admin");
    let permissions = info["claims"]["permissions"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    assert!(permissions.iter().any(|name| name == "rbac:manage"));
}

#[tokio::test]
async fn me_reports_anonymous_callers_without_failing() {
    let server = TestServer::spawn().await;

    let response = server
        .client
        .get(server.url("/auth/me"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(response.status(), StatusCode::OK);
    let info = body(response).await;
    assert_eq!(info["authenticated"], false);
    assert!(info["claims"].is_null());
}

#[tokio::test]
async fn refresh_rotates_once_and_rejects_reuse() {
    let server = TestServer::spawn().await;
    let tokens = server.member_tokens("m-2").await;
    let refresh_token = token(&tokens, "refreshToken");

    let rotated = server
        .client
        .post(server.url("/auth/refresh"))
        .json(&json!({ "refreshToken": refresh_token }))
        .send()
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(rotated.status(), StatusCode::OK);
    let rotated = body(rotated).await;
    assert_eq!(rotated["sessionId"], tokens["sessionId"]);
    assert_ne!(rotated["refreshToken"], tokens["refreshToken"]);

    let reused = server
        .client
        .post(server.url("/auth/refresh"))
        .json(&json!({ "refreshToken": refresh_token }))
        .send()
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(reused.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(reused).await["code"], "SESSION_INVALID");
}

#[tokio::test]
async fn missing_permissions_are_named_in_the_forbidden_body() {
    let server = TestServer::spawn().await;
    let tokens = server.member_tokens("m-3").await;

    let response = server
        .client
        .get(server.url("/api/rbac/roles"))
        .bearer_auth(token(&tokens, "accessToken"))
        .send()
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let error = body(response).await;
    assert_eq!(error["code"], "FORBIDDEN");
    assert_eq!(error["requiredPermissions"], json!(["rbac:read"]));
}

#[tokio::test]
async fn granted_role_is_visible_to_checks_and_the_change_log() {
    let server = TestServer::spawn().await;
    let root = server.admin_tokens(ROOT_USER).await;
    let root_token = token(&root, "accessToken");

    let granted = server
        .client
        .post(server.url("/api/rbac/users/auditor-1/roles"))
        .bearer_auth(&root_token)
        .json(&json!({ "roleName": "security_viewer", "reason": "quarterly audit" }))
        .send()
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(granted.status(), StatusCode::CREATED);
    let entry = body(granted).await;
    assert_eq!(entry["action"], "role.granted");
    assert_eq!(entry["actor"], ROOT_USER);

    let check = server
        .client
        .post(server.url("/api/rbac/check"))
        .bearer_auth(&root_token)
        .json(&json!({
            "userId": "auditor-1",
            "permissions": ["rbac:audit", "rbac:manage"],
            "mode": "all",
        }))
        .send()
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(check.status(), StatusCode::OK);
    let check = body(check).await;
    assert_eq!(check["allowed"], false);
    assert_eq!(check["decisions"][0]["held"], true);
    assert_eq!(check["decisions"][1]["held"], false);

    let duplicate = server
        .client
        .post(server.url("/api/rbac/users/auditor-1/roles"))
        .bearer_auth(&root_token)
        .json(&json!({ "roleName": "security_viewer" }))
        .send()
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let log = server
        .client
        .get(server.url("/api/rbac/change-log?userId=auditor-1"))
        .bearer_auth(&root_token)
        .send()
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(log.status(), StatusCode::OK);
    let log = body(log).await;
    let entries = log.as_array().cloned().unwrap_or_default();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["reason"], "quarterly audit");
}

#[tokio::test]
async fn change_log_limit_is_bounded() {
    let server = TestServer::spawn().await;
    let root = server.admin_tokens(ROOT_USER).await;

    let response = server
        .client
        .get(server.url("/api/rbac/change-log?limit=100000"))
        .bearer_auth(token(&root, "accessToken"))
        .send()
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_invalidates_the_access_token() {
    let server = TestServer::spawn().await;
    let tokens = server.member_tokens("m-4").await;
    let access_token = token(&tokens, "accessToken");

    let logout = server
        .client
        .post(server.url("/auth/logout"))
        .bearer_auth(&access_token)
        .send()
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(logout.status(), StatusCode::NO_CONTENT);

    let after = server
        .client
        .get(server.url("/api/rbac/me/permissions"))
        .bearer_auth(&access_token)
        .send()
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(after).await["code"], "SESSION_INVALID");

    let refresh = server
        .client
        .post(server.url("/auth/refresh"))
        .json(&json!({ "refreshToken": token(&tokens, "refreshToken") }))
        .send()
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(refresh.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn administrators_can_end_every_session_of_a_user() {
    let server = TestServer::spawn().await;
    let root = server.admin_tokens(ROOT_USER).await;
    let first = server.member_tokens("m-5").await;
    let second = server.member_tokens("m-5").await;

    let response = server
        .client
        .post(server.url("/api/rbac/users/m-5/sessions/revoke"))
        .bearer_auth(token(&root, "accessToken"))
        .send()
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await["revokedSessions"], 2);

    for tokens in [first, second] {
        let refresh = server
            .client
            .post(server.url("/auth/refresh"))
            .json(&json!({ "refreshToken": token(&tokens, "refreshToken") }))
            .send()
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(refresh.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn health_reports_disabled_dependencies_as_ready() {
    let server = TestServer::spawn().await;

    let response = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(response.status(), StatusCode::OK);
    let health = body(response).await;
    assert_eq!(health["ready"], true);
    assert_eq!(health["postgres"]["status"], "disabled");
}
