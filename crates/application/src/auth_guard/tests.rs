use std::sync::Arc;

use keystone_core::{AppError, TokenFailure};
use keystone_domain::{AdminProfile, UserClass};

use super::{AuthGuard, PermissionRequirement, bearer_token};
use crate::test_support::{
    FixedClock, MemoryCredentialStore, MemorySessionCache, MemorySnapshotCache, PlainTokenCodec,
    SequentialIds, permission, start, user,
};
use crate::{
    ChangeContext, GrantRoleInput, PermissionResolver, ResolverSettings, TokenService,
    TokenSettings,
};

struct Harness {
    guard: AuthGuard,
    tokens: TokenService,
    resolver: PermissionResolver,
    store: Arc<MemoryCredentialStore>,
}

fn harness() -> Harness {
    let clock = Arc::new(FixedClock::new(start()));
    let ids = Arc::new(SequentialIds::default());
    let store = Arc::new(MemoryCredentialStore::default());

    let tokens = TokenService::new(
        Arc::new(PlainTokenCodec),
        Arc::new(MemorySessionCache::default()),
        clock.clone(),
        ids.clone(),
        TokenSettings::default(),
    );
    let resolver = PermissionResolver::new(
        store.clone(),
        Arc::new(MemorySnapshotCache::default()),
        clock,
        ids,
        ResolverSettings::default(),
    );

    Harness {
        guard: AuthGuard::new(tokens.clone(), resolver.clone()),
        tokens,
        resolver,
        store,
    }
}

fn admin_class() -> UserClass {
    UserClass::Admin(AdminProfile {
        role_ids: Vec::new(),
        permissions: Vec::new(),
        department: None,
    })
}

#[test]
fn bearer_token_requires_scheme_and_value() {
    assert!(matches!(bearer_token(Some("Bearer abc")), Ok("abc")));
    assert!(matches!(bearer_token(Some("bearer  abc ")), Ok("abc")));
    assert!(matches!(bearer_token(None), Err(AppError::Unauthorized(_))));
    assert!(matches!(
        bearer_token(Some("Basic abc")),
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        bearer_token(Some("Bearer")),
        Err(AppError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn missing_token_is_unauthorized_before_permission_lookup() {
    let harness = harness();
    let result = harness
        .guard
        .authorize(None, &PermissionRequirement::all(vec![permission("order:read")]))
        .await;

    assert!(matches!(result, Err(AppError::Unauthorized(_))));
    assert_eq!(
        harness
            .store
            .snapshot_loads
            .load(std::sync::atomic::Ordering::SeqCst),
        0
    );
}

#[tokio::test]
async fn caller_without_permission_is_forbidden_with_missing_names() {
    let harness = harness();
    let pair = harness
        .tokens
        .start_session(user("u1"), admin_class())
        .await
        .unwrap_or_else(|_| unreachable!());
    let header = format!("Bearer {}", pair.access_token);

    let result = harness
        .guard
        .authorize(
            Some(&header),
            &PermissionRequirement::all(vec![permission("order:read")]),
        )
        .await;
    assert!(matches!(
        result,
        Err(AppError::InsufficientPermission { ref missing }) if missing == &vec!["order:read".to_owned()]
    ));
}

#[tokio::test]
async fn caller_with_permission_is_admitted() {
    let harness = harness();
    harness.store.add_role("operator", true, &["order:read"]);
    assert!(
        harness
            .resolver
            .grant_role(GrantRoleInput {
                user_id: user("u1"),
                role_name: "operator".to_owned(),
                expires_at: None,
                context: ChangeContext::new(user("admin")),
            })
            .await
            .is_ok()
    );

    let pair = harness
        .tokens
        .start_session(user("u1"), admin_class())
        .await
        .unwrap_or_else(|_| unreachable!());
    let header = format!("Bearer {}", pair.access_token);

    let caller = harness
        .guard
        .authorize(
            Some(&header),
            &PermissionRequirement::any(vec![permission("order:read")]),
        )
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(caller.claims.sub, user("u1"));
    assert_eq!(caller.access_token, pair.access_token);
}

#[tokio::test]
async fn revoked_token_is_rejected_as_session_invalid() {
    let harness = harness();
    let pair = harness
        .tokens
        .start_session(user("u1"), admin_class())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(harness.tokens.revoke_access(&pair.access_token).await.is_ok());

    let header = format!("Bearer {}", pair.access_token);
    let result = harness.guard.authenticate(Some(&header)).await;
    assert!(matches!(
        result,
        Err(AppError::Token(TokenFailure::Revoked))
    ));
}

#[tokio::test]
async fn optional_authentication_swallows_token_failures() {
    let harness = harness();

    assert!(matches!(
        harness.guard.authenticate_optional(None).await,
        Ok(None)
    ));
    assert!(matches!(
        harness
            .guard
            .authenticate_optional(Some("Bearer not-a-token"))
            .await,
        Ok(None)
    ));

    let pair = harness
        .tokens
        .start_session(user("u1"), admin_class())
        .await
        .unwrap_or_else(|_| unreachable!());
    let header = format!("Bearer {}", pair.access_token);
    assert!(matches!(
        harness.guard.authenticate_optional(Some(&header)).await,
        Ok(Some(_))
    ));
}
