use std::fmt::{Display, Formatter};

use keystone_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MAX_OPAQUE_ID_LENGTH: usize = 128;

/// Opaque identifier of a user owned by the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Creates a validated user identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        validate_opaque_id(value.into(), "user id").map(Self)
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for UserId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl Display for UserId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Opaque identifier of one login session, unique per login.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Creates a validated session identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        validate_opaque_id(value.into(), "session id").map(Self)
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for SessionId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionId> for String {
    fn from(value: SessionId) -> Self {
        value.0
    }
}

impl Display for SessionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

fn validate_opaque_id(value: String, label: &str) -> AppResult<String> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{label} must not be empty")));
    }

    if value.len() > MAX_OPAQUE_ID_LENGTH {
        return Err(AppError::Validation(format!(
            "{label} must be at most {MAX_OPAQUE_ID_LENGTH} bytes"
        )));
    }

    if value.chars().any(char::is_whitespace) {
        return Err(AppError::Validation(format!(
            "{label} must not contain whitespace"
        )));
    }

    Ok(value)
}

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates an identifier from an existing UUID value.
            #[must_use]
            pub fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            /// Returns the underlying UUID value.
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }
    };
}

uuid_identifier!(
    /// Identifier of a role definition.
    RoleId
);
uuid_identifier!(
    /// Identifier of a permission definition.
    PermissionId
);
uuid_identifier!(
    /// Identifier of a user role or permission grant row.
    GrantId
);
uuid_identifier!(
    /// Identifier of a permission change log entry.
    ChangeLogEntryId
);

#[cfg(test)]
mod tests {
    use super::{RoleId, SessionId, UserId};

    #[test]
    fn user_id_rejects_blank_and_whitespace_values() {
        assert!(UserId::new("").is_err());
        assert!(UserId::new("user 1").is_err());
        assert!(UserId::new("u1").is_ok());
    }

    #[test]
    fn session_id_rejects_oversized_values() {
        assert!(SessionId::new("s".repeat(129)).is_err());
        assert!(SessionId::new("s".repeat(128)).is_ok());
    }

    #[test]
    fn role_id_serializes_as_bare_uuid() {
        let role_id = RoleId::from_uuid(uuid::Uuid::nil());
        let encoded = serde_json::to_string(&role_id).unwrap_or_default();
        assert_eq!(encoded, "\"00000000-0000-0000-0000-000000000000\"");
    }

    #[test]
    fn user_id_deserialization_validates() {
        let parsed = serde_json::from_str::<UserId>("\"  \"");
        assert!(parsed.is_err());
    }
}
