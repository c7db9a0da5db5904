use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use gatewarden_core::{AppError, AppResult, PermissionId};
use serde::{Deserialize, Serialize};

fn validate_identifier(kind: &str, value: &str) -> AppResult<()> {
    if value.is_empty() || value.len() > 64 {
        return Err(AppError::Validation(format!(
            "{kind} must be between 1 and 64 characters"
        )));
    }

    let mut chars = value.chars();
    let valid_head = chars
        .next()
        .is_some_and(|head| head.is_ascii_lowercase());
    let valid_tail = value
        .chars()
        .all(|char| char.is_ascii_lowercase() || char.is_ascii_digit() || matches!(char, '.' | '_'));

    if !valid_head || !valid_tail {
        return Err(AppError::Validation(format!(
            "{kind} '{value}' must be lowercase and contain only letters, digits, '.' or '_'"
        )));
    }

    Ok(())
}

/// Validated resource identifier of a capability, e.g. `bookings`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceName(String);

impl ResourceName {
    /// Creates a validated resource name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        validate_identifier("resource name", value.as_str())?;
        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for ResourceName {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

impl TryFrom<String> for ResourceName {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourceName> for String {
    fn from(value: ResourceName) -> Self {
        value.0
    }
}

impl Display for ResourceName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated action identifier of a capability, e.g. `read`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActionName(String);

impl ActionName {
    /// Creates a validated action name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        validate_identifier("action name", value.as_str())?;
        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for ActionName {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

impl TryFrom<String> for ActionName {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ActionName> for String {
    fn from(value: ActionName) -> Self {
        value.0
    }
}

impl Display for ActionName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Atomic capability in the permission catalog.
///
/// The `(resource, action)` pair is unique within the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Stable permission identifier.
    pub id: PermissionId,
    /// Resource the capability applies to.
    pub resource: ResourceName,
    /// Action permitted on the resource.
    pub action: ActionName,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    /// Creates a new catalog permission with a fresh identifier.
    #[must_use]
    pub fn new(resource: ResourceName, action: ActionName, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: PermissionId::new(),
            resource,
            action,
            description,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the `resource.action` display form of the capability.
    #[must_use]
    pub fn capability(&self) -> String {
        format!("{}.{}", self.resource, self.action)
    }
}

/// Derived, non-persistent grouping of catalog permissions by resource.
///
/// Presentation view only; the flat catalog stays authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionGroup {
    /// Resource shared by the grouped permissions.
    pub resource: ResourceName,
    /// Permissions for the resource, ordered by action.
    pub permissions: Vec<Permission>,
}

impl PermissionGroup {
    /// Groups permissions by resource, ordered by resource then action.
    #[must_use]
    pub fn group(permissions: Vec<Permission>) -> Vec<Self> {
        let mut sorted = permissions;
        sorted.sort_by(|left, right| {
            (&left.resource, &left.action).cmp(&(&right.resource, &right.action))
        });

        let mut groups: Vec<Self> = Vec::new();
        for permission in sorted {
            match groups.last_mut() {
                Some(group) if group.resource == permission.resource => {
                    group.permissions.push(permission);
                }
                _ => groups.push(Self {
                    resource: permission.resource.clone(),
                    permissions: vec![permission],
                }),
            }
        }

        groups
    }
}
