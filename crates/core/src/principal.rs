use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{AppError, PrincipalId};

/// Lifecycle status of a principal account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalStatus {
    /// Account is active and may be authorized.
    Active,
    /// Account is suspended by an administrator.
    Suspended,
    /// Account exists but has not completed onboarding.
    Pending,
    /// Account is soft-deleted.
    Deleted,
}

impl PrincipalStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Pending => "pending",
            Self::Deleted => "deleted",
        }
    }
}

impl FromStr for PrincipalStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "suspended" => Ok(Self::Suspended),
            "pending" => Ok(Self::Pending),
            "deleted" => Ok(Self::Deleted),
            _ => Err(AppError::Validation(format!(
                "unknown principal status '{value}'"
            ))),
        }
    }
}

/// Authenticated actor evaluated for access.
///
/// The identity itself is established by an upstream authentication
/// subsystem; this type only carries what decisions need: a stable
/// identifier, the role assignment held at decision time, and the account
/// status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    id: PrincipalId,
    display_name: String,
    roles: BTreeSet<String>,
    status: PrincipalStatus,
}

impl Principal {
    /// Creates a principal from identity and assignment data.
    #[must_use]
    pub fn new(
        id: PrincipalId,
        display_name: impl Into<String>,
        roles: impl IntoIterator<Item = String>,
        status: PrincipalStatus,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            roles: roles.into_iter().collect(),
            status,
        }
    }

    /// Returns the stable principal identifier.
    #[must_use]
    pub fn id(&self) -> PrincipalId {
        self.id
    }

    /// Returns the display name for the principal.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the role names held by the principal.
    #[must_use]
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Returns whether the principal holds the named role.
    #[must_use]
    pub fn holds_role(&self, role_name: &str) -> bool {
        self.roles.contains(role_name)
    }

    /// Returns the account status.
    #[must_use]
    pub fn status(&self) -> PrincipalStatus {
        self.status
    }

    /// Returns whether the account may be authorized at all.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == PrincipalStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use crate::PrincipalId;

    use super::{Principal, PrincipalStatus};

    #[test]
    fn suspended_principal_is_not_active() {
        let principal = Principal::new(
            PrincipalId::new(),
            "alice",
            ["Admin".to_owned()],
            PrincipalStatus::Suspended,
        );
        assert!(!principal.is_active());
        assert!(principal.holds_role("Admin"));
    }
}
