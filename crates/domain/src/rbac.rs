use std::fmt::{Display, Formatter};
use std::str::FromStr;

use keystone_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::{PermissionId, RoleId};

/// Built-in role categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    /// Unrestricted platform owner.
    SuperAdmin,
    /// Back-office administrator.
    Admin,
    /// Team manager.
    Manager,
    /// Day-to-day operator.
    Operator,
    /// Read-only access.
    Viewer,
    /// Tenant-defined role.
    Custom,
}

impl RoleKind {
    /// Returns a stable storage value for this role kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Operator => "operator",
            Self::Viewer => "viewer",
            Self::Custom => "custom",
        }
    }
}

impl FromStr for RoleKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "super_admin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "operator" => Ok(Self::Operator),
            "viewer" => Ok(Self::Viewer),
            "custom" => Ok(Self::Custom),
            _ => Err(AppError::Validation(format!(
                "unknown role kind value '{value}'"
            ))),
        }
    }
}

/// Role definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Stable role identifier.
    pub id: RoleId,
    /// Unique role name.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Role category.
    pub kind: RoleKind,
    /// System roles cannot be edited or deleted by administrators.
    pub is_system: bool,
    /// Inactive roles confer no permissions.
    pub is_active: bool,
}

/// Validated permission name in `module:operation[:resource]` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionName(String);

impl PermissionName {
    /// Creates a validated permission name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let segments = value.split(':').collect::<Vec<_>>();

        if !(2..=3).contains(&segments.len()) {
            return Err(AppError::Validation(format!(
                "permission name '{value}' must look like 'module:operation[:resource]'"
            )));
        }

        let valid_segment = |segment: &&str| {
            !segment.is_empty()
                && segment.chars().all(|character| {
                    character.is_ascii_alphanumeric() || matches!(character, '_' | '-' | '*' | '.')
                })
        };

        if !segments.iter().all(valid_segment) {
            return Err(AppError::Validation(format!(
                "permission name '{value}' contains an empty or invalid segment"
            )));
        }

        Ok(Self(value))
    }

    /// Builds a name from its parts.
    pub fn from_parts(module: &str, operation: &str, resource: Option<&str>) -> AppResult<Self> {
        match resource {
            Some(resource) => Self::new(format!("{module}:{operation}:{resource}")),
            None => Self::new(format!("{module}:{operation}")),
        }
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for PermissionName {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PermissionName> for String {
    fn from(value: PermissionName) -> Self {
        value.0
    }
}

impl Display for PermissionName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Permission definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDefinition {
    /// Stable permission identifier.
    pub id: PermissionId,
    /// Unique permission name.
    pub name: PermissionName,
    /// Owning module, e.g. `order`.
    pub module: String,
    /// Operation within the module, e.g. `read`.
    pub operation: String,
    /// Optional resource qualifier.
    pub resource: Option<String>,
    /// System permissions cannot be edited or deleted by administrators.
    pub is_system: bool,
}

/// Role with the permission names it confers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleWithPermissions {
    /// Role definition.
    pub role: Role,
    /// Names conferred through role-permission links.
    pub permissions: Vec<PermissionName>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{PermissionName, RoleKind};

    #[test]
    fn role_kind_roundtrip_storage_value() {
        let restored = RoleKind::from_str(RoleKind::SuperAdmin.as_str());
        assert!(matches!(restored, Ok(RoleKind::SuperAdmin)));
        assert!(RoleKind::from_str("owner").is_err());
    }

    #[test]
    fn permission_name_accepts_module_operation_and_resource() {
        assert!(PermissionName::new("order:read").is_ok());
        assert!(PermissionName::new("catalog:write:brand").is_ok());
        assert_eq!(
            PermissionName::from_parts("order", "read", None)
                .map(|name| name.as_str().to_owned())
                .unwrap_or_default(),
            "order:read"
        );
    }

    #[test]
    fn permission_name_rejects_malformed_values() {
        assert!(PermissionName::new("order").is_err());
        assert!(PermissionName::new("order::read").is_err());
        assert!(PermissionName::new("a:b:c:d").is_err());
        assert!(PermissionName::new("order:read all").is_err());
    }
}
