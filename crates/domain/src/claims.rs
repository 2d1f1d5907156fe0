//! Session token claim set.
//!
//! Field names are part of the wire contract: `sub`, `iat`, `exp`, `type`,
//! `sessionId`, then `memberTier`/`memberStatus` for members or
//! `roleIds`/`permissions`/`department` for admins.

use keystone_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::{RoleId, SessionId, UserId};

/// Member-only claim fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    /// Loyalty or pricing tier of the member.
    pub member_tier: String,
    /// Account status of the member.
    pub member_status: String,
}

/// Admin-only claim fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    /// Roles held when the token was issued.
    #[serde(default)]
    pub role_ids: Vec<RoleId>,
    /// Effective permission names when the token was issued.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Organisational department, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

/// Closed set of user classes a token can be issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UserClass {
    /// Storefront customer.
    Member(MemberProfile),
    /// Back-office operator.
    Admin(AdminProfile),
}

impl UserClass {
    /// Returns the stable `type` claim value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member(_) => "member",
            Self::Admin(_) => "admin",
        }
    }
}

/// Claims that survive refresh unchanged; `iat`, `exp` and `jti` are stamped
/// per token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// Subject user.
    pub sub: UserId,
    /// Login session the token belongs to.
    pub session_id: SessionId,
    /// Class-specific fields.
    #[serde(flatten)]
    pub class: UserClass,
}

/// Signed token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    /// Subject user.
    pub sub: UserId,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    /// Unique token identifier.
    pub jti: String,
    /// Login session the token belongs to.
    pub session_id: SessionId,
    /// Class-specific fields.
    #[serde(flatten)]
    pub class: UserClass,
}

impl TokenClaims {
    /// Stamps base claims with a lifetime window.
    pub fn stamp(base: SessionClaims, jti: String, iat: i64, exp: i64) -> AppResult<Self> {
        if exp <= iat {
            return Err(AppError::Validation(format!(
                "token expiry {exp} must be after issued-at {iat}"
            )));
        }

        Ok(Self {
            sub: base.sub,
            iat,
            exp,
            jti,
            session_id: base.session_id,
            class: base.class,
        })
    }

    /// Returns the claims without the per-token stamps.
    #[must_use]
    pub fn base(&self) -> SessionClaims {
        SessionClaims {
            sub: self.sub.clone(),
            session_id: self.session_id.clone(),
            class: self.class.clone(),
        }
    }

    /// Returns the seconds left until expiry at `now`, never negative.
    #[must_use]
    pub fn remaining_seconds(&self, now: i64) -> i64 {
        (self.exp - now).max(0)
    }

    /// Returns whether the token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AdminProfile, MemberProfile, SessionClaims, TokenClaims, UserClass};
    use crate::{SessionId, UserId};

    fn member_base() -> SessionClaims {
        SessionClaims {
            sub: UserId::new("u1").unwrap_or_else(|_| unreachable!()),
            session_id: SessionId::new("s1").unwrap_or_else(|_| unreachable!()),
            class: UserClass::Member(MemberProfile {
                member_tier: "gold".to_owned(),
                member_status: "active".to_owned(),
            }),
        }
    }

    #[test]
    fn member_claims_use_wire_field_names() {
        let claims = TokenClaims::stamp(member_base(), "t1".to_owned(), 100, 200);
        assert!(claims.is_ok());
        let value = serde_json::to_value(claims.unwrap_or_else(|_| unreachable!()))
            .unwrap_or_default();

        assert_eq!(
            value,
            json!({
                "sub": "u1",
                "iat": 100,
                "exp": 200,
                "jti": "t1",
                "sessionId": "s1",
                "type": "member",
                "memberTier": "gold",
                "memberStatus": "active",
            })
        );
    }

    #[test]
    fn admin_claims_decode_from_wire_shape() {
        let decoded = serde_json::from_value::<TokenClaims>(json!({
            "sub": "a1",
            "iat": 10,
            "exp": 20,
            "jti": "t2",
            "sessionId": "s9",
            "type": "admin",
            "roleIds": [],
            "permissions": ["order:read"],
            "department": "ops",
        }));
        assert!(decoded.is_ok());
        let decoded = decoded.unwrap_or_else(|_| unreachable!());

        assert_eq!(
            decoded.class,
            UserClass::Admin(AdminProfile {
                role_ids: Vec::new(),
                permissions: vec!["order:read".to_owned()],
                department: Some("ops".to_owned()),
            })
        );
    }

    #[test]
    fn unknown_user_class_is_rejected() {
        let decoded = serde_json::from_value::<TokenClaims>(json!({
            "sub": "a1",
            "iat": 10,
            "exp": 20,
            "jti": "t2",
            "sessionId": "s9",
            "type": "vendor",
        }));
        assert!(decoded.is_err());
    }

    #[test]
    fn stamp_rejects_inverted_window() {
        assert!(TokenClaims::stamp(member_base(), "t".to_owned(), 200, 200).is_err());
    }

    #[test]
    fn base_strips_per_token_stamps() {
        let claims = TokenClaims::stamp(member_base(), "t1".to_owned(), 100, 200)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(claims.base(), member_base());
        assert_eq!(claims.remaining_seconds(150), 50);
        assert_eq!(claims.remaining_seconds(250), 0);
        assert!(claims.is_expired_at(200));
    }
}
