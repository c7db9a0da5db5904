use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use gatewarden_core::{AppError, AppResult, PermissionId, RoleId};
use serde::{Deserialize, Serialize};

/// Validated role name, unique within the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    /// Creates a validated role name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() || value.len() > 64 {
            return Err(AppError::Validation(
                "role name must be between 1 and 64 non-whitespace characters".to_owned(),
            ));
        }
        if value.trim() != value {
            return Err(AppError::Validation(
                "role name must not carry leading or trailing whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for RoleName {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoleName> for String {
    fn from(value: RoleName) -> Self {
        value.0
    }
}

impl Display for RoleName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Platform-defined roles that cannot be deleted or renamed.
///
/// The closed set replaces string comparisons on role literals; each
/// variant maps to the baseline grants provisioned at bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemRole {
    /// Wildcard role authorized for every capability.
    SuperAdmin,
    /// Platform administration across all admin surfaces.
    Admin,
    /// Finance operations: payouts, exports, taxes.
    Finance,
    /// Read-mostly support role.
    Support,
    /// Analytics and reporting access.
    Analyst,
}

impl SystemRole {
    /// Returns the stable role name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "SuperAdmin",
            Self::Admin => "Admin",
            Self::Finance => "Finance",
            Self::Support => "Support",
            Self::Analyst => "Analyst",
        }
    }

    /// Resolves a role name into a system role, if it names one.
    #[must_use]
    pub fn from_name(value: &str) -> Option<Self> {
        match value {
            "SuperAdmin" => Some(Self::SuperAdmin),
            "Admin" => Some(Self::Admin),
            "Finance" => Some(Self::Finance),
            "Support" => Some(Self::Support),
            "Analyst" => Some(Self::Analyst),
            _ => None,
        }
    }

    /// Returns all system roles.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[SystemRole] = &[
            SystemRole::SuperAdmin,
            SystemRole::Admin,
            SystemRole::Finance,
            SystemRole::Support,
            SystemRole::Analyst,
        ];

        ALL
    }

    /// Returns whether this role is the evaluator's wildcard role.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::SuperAdmin)
    }

    /// Returns the baseline `(resource, action)` grants for the role.
    ///
    /// System roles must always retain these grants; the registry rejects
    /// updates that would drop below the baseline. The wildcard role
    /// carries zero explicit grants because the evaluator names its bypass
    /// as a separate rule.
    #[must_use]
    pub fn baseline_grants(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::SuperAdmin => &[],
            Self::Admin => &[
                ("bookings", "read"),
                ("bookings", "write"),
                ("partners", "read"),
                ("partners", "write"),
                ("users", "read"),
                ("users", "write"),
                ("finance", "read"),
                ("taxes", "read"),
                ("taxes", "write"),
                ("analytics", "read"),
                ("settings", "read"),
                ("settings", "write"),
                ("security.role", "read"),
                ("security.role", "manage"),
                ("security.audit", "read"),
            ],
            Self::Finance => &[
                ("bookings", "read"),
                ("finance", "read"),
                ("finance", "export"),
                ("payouts", "read"),
                ("payouts", "approve"),
                ("taxes", "read"),
                ("analytics", "read"),
            ],
            Self::Support => &[
                ("bookings", "read"),
                ("partners", "read"),
                ("users", "read"),
            ],
            Self::Analyst => &[
                ("bookings", "read"),
                ("finance", "read"),
                ("analytics", "read"),
            ],
        }
    }
}

/// Named, reusable bundle of permissions assignable to principals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Stable role identifier.
    pub id: RoleId,
    /// Unique role name.
    pub name: RoleName,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// Marks a platform-defined role protected from deletion and rename.
    pub is_system: bool,
    /// Identifiers of the permissions granted by the role.
    pub permission_ids: BTreeSet<PermissionId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Creates a custom (non-system) role with a fresh identifier.
    #[must_use]
    pub fn custom(
        name: RoleName,
        description: Option<String>,
        permission_ids: BTreeSet<PermissionId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RoleId::new(),
            name,
            description,
            is_system: false,
            permission_ids,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the system role this role embodies, if any.
    #[must_use]
    pub fn system_role(&self) -> Option<SystemRole> {
        self.is_system
            .then(|| SystemRole::from_name(self.name.as_str()))
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::{RoleName, SystemRole};

    #[test]
    fn role_name_rejects_surrounding_whitespace() {
        assert!(RoleName::new(" Admin ").is_err());
    }

    #[test]
    fn system_role_names_round_trip() {
        for role in SystemRole::all() {
            assert_eq!(SystemRole::from_name(role.as_str()), Some(*role));
        }
    }

    #[test]
    fn wildcard_role_has_no_explicit_grants() {
        assert!(SystemRole::SuperAdmin.is_wildcard());
        assert!(SystemRole::SuperAdmin.baseline_grants().is_empty());
    }

    #[test]
    fn admin_baseline_covers_role_management() {
        let grants = SystemRole::Admin.baseline_grants();
        assert!(grants.contains(&("security.role", "manage")));
    }
}
