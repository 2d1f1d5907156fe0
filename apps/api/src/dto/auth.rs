use keystone_application::TokenPair;
use keystone_domain::{TokenClaims, UserClass};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for session issuance.
///
/// `memberTier`/`memberStatus` are required for members; `department` is
/// optional for admins, whose roles and permissions are filled from their
/// current grants.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/issue-session-request.ts"
)]
pub struct IssueSessionRequest {
    pub user_id: String,
    pub user_type: String,
    #[ts(optional)]
    pub member_tier: Option<String>,
    #[ts(optional)]
    pub member_status: Option<String>,
    #[ts(optional)]
    pub department: Option<String>,
}

/// Incoming payload for refresh-token rotation.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/refresh-session-request.ts"
)]
pub struct RefreshSessionRequest {
    pub refresh_token: String,
}

/// Issued access and refresh tokens.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/token-pair-response.ts"
)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    #[ts(type = "number")]
    pub access_expires_in: i64,
    #[ts(type = "number")]
    pub refresh_expires_in: i64,
    pub session_id: String,
}

impl From<TokenPair> for TokenPairResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer",
            access_expires_in: pair.access_expires_in,
            refresh_expires_in: pair.refresh_expires_in,
            session_id: pair.session_id.as_str().to_owned(),
        }
    }
}

/// Number of sessions terminated by a bulk revocation.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/revoked-sessions-response.ts"
)]
pub struct RevokedSessionsResponse {
    pub revoked_sessions: usize,
}

/// Claims of a verified access token.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/session-claims-response.ts"
)]
pub struct SessionClaimsResponse {
    pub user_id: String,
    pub session_id: String,
    pub user_type: String,
    #[ts(type = "number")]
    pub issued_at: i64,
    #[ts(type = "number")]
    pub expires_at: i64,
    pub member_tier: Option<String>,
    pub member_status: Option<String>,
    pub role_ids: Vec<String>,
    pub permissions: Vec<String>,
    pub department: Option<String>,
}

impl From<TokenClaims> for SessionClaimsResponse {
    fn from(claims: TokenClaims) -> Self {
        let user_type = claims.class.as_str().to_owned();
        let mut response = Self {
            user_id: claims.sub.as_str().to_owned(),
            session_id: claims.session_id.as_str().to_owned(),
            user_type,
            issued_at: claims.iat,
            expires_at: claims.exp,
            member_tier: None,
            member_status: None,
            role_ids: Vec::new(),
            permissions: Vec::new(),
            department: None,
        };

        match claims.class {
            UserClass::Member(profile) => {
                response.member_tier = Some(profile.member_tier);
                response.member_status = Some(profile.member_status);
            }
            UserClass::Admin(profile) => {
                response.role_ids = profile
                    .role_ids
                    .iter()
                    .map(|role_id| role_id.as_uuid().to_string())
                    .collect();
                response.permissions = profile.permissions;
                response.department = profile.department;
            }
        }

        response
    }
}

/// Identity of the caller on optional-auth routes.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/session-info-response.ts"
)]
pub struct SessionInfoResponse {
    pub authenticated: bool,
    pub claims: Option<SessionClaimsResponse>,
}
