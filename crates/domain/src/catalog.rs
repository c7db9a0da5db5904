/// Seed entry for the bootstrap permission catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedPermission {
    /// Resource identifier.
    pub resource: &'static str,
    /// Action identifier.
    pub action: &'static str,
    /// Human-readable description.
    pub description: &'static str,
}

const fn seed(resource: &'static str, action: &'static str, description: &'static str) -> SeedPermission {
    SeedPermission {
        resource,
        action,
        description,
    }
}

/// Returns the catalog seeded at bootstrap.
///
/// Seeding is idempotent; pairs already present in the catalog are left
/// untouched, so the list can grow across releases.
#[must_use]
pub fn seed_catalog() -> &'static [SeedPermission] {
    const CATALOG: &[SeedPermission] = &[
        seed("bookings", "read", "Read bookings"),
        seed("bookings", "write", "Create and edit bookings"),
        seed("partners", "read", "Read partner accounts"),
        seed("partners", "write", "Create and edit partner accounts"),
        seed("users", "read", "Read platform users"),
        seed("users", "write", "Create and edit platform users"),
        seed("finance", "read", "Read finance records"),
        seed("finance", "export", "Export finance records"),
        seed("payouts", "read", "Read payout batches"),
        seed("payouts", "approve", "Approve payout batches"),
        seed("taxes", "read", "Read tax configuration"),
        seed("taxes", "write", "Edit tax configuration"),
        seed("analytics", "read", "Read analytics dashboards"),
        seed("settings", "read", "Read platform settings"),
        seed("settings", "write", "Edit platform settings"),
        seed("security.role", "read", "Read roles and assignments"),
        seed("security.role", "manage", "Manage roles and assignments"),
        seed("security.audit", "read", "Read the audit log"),
    ];

    CATALOG
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::seed_catalog;

    #[test]
    fn seed_pairs_are_unique() {
        let catalog = seed_catalog();
        let pairs: BTreeSet<(&str, &str)> = catalog
            .iter()
            .map(|entry| (entry.resource, entry.action))
            .collect();
        assert_eq!(pairs.len(), catalog.len());
    }
}
