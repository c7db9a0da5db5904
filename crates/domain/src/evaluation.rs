//! Pure access evaluation over immutable role snapshots.
//!
//! The evaluator is deterministic: for a fixed [`AccessSnapshot`] the same
//! `(roles, resource, action)` input always yields the same [`Decision`].
//! All side effects (persistence reads, caching, audit) live in the
//! application layer.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::permission::{ActionName, ResourceName};
use crate::role::SystemRole;

/// Name of the role granted every capability.
///
/// The bypass is a named rule checked first by [`evaluate`], not an
/// implicit fallthrough, so grants through it stay auditable.
pub const WILDCARD_ROLE: &str = "SuperAdmin";

/// Immutable projection of role names onto their granted capabilities.
///
/// Snapshots are built once per decision batch and never mutated, so
/// concurrent evaluations cannot observe a half-updated mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessSnapshot {
    grants: BTreeMap<String, BTreeSet<(ResourceName, ActionName)>>,
}

impl AccessSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the grant set for a role, replacing any previous entry.
    pub fn insert_role(
        &mut self,
        role_name: impl Into<String>,
        grants: BTreeSet<(ResourceName, ActionName)>,
    ) {
        self.grants.insert(role_name.into(), grants);
    }

    /// Returns the grant set projected for a role, if the role is known.
    #[must_use]
    pub fn role_grants(&self, role_name: &str) -> Option<&BTreeSet<(ResourceName, ActionName)>> {
        self.grants.get(role_name)
    }

    /// Returns whether the snapshot contains no roles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

/// Rule that produced a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "rule")]
pub enum GrantSource {
    /// The principal holds the wildcard role.
    Wildcard {
        /// Wildcard role name that fired.
        role: String,
    },
    /// A held role grants the capability explicitly.
    RoleGrant {
        /// Role whose grant matched.
        role: String,
    },
}

/// Reason a capability was denied.
///
/// Grants are purely additive; there is no explicit-deny semantic in the
/// model. If a deny-list is ever introduced, deny must take precedence
/// over allow and would surface as its own variant here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No held role grants the capability.
    NoGrant,
}

/// Outcome of one access evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Decision {
    /// Access is granted by the named rule.
    Granted {
        /// Rule that produced the grant.
        source: GrantSource,
    },
    /// Access is denied.
    Denied {
        /// Why no grant applied.
        reason: DenyReason,
    },
}

impl Decision {
    /// Returns whether the decision grants access.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }

    /// Returns whether the grant came from the wildcard rule.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(
            self,
            Self::Granted {
                source: GrantSource::Wildcard { .. }
            }
        )
    }
}

/// Decides whether the held roles may perform `action` on `resource`.
///
/// The wildcard rule is checked first; otherwise the decision is the
/// union of grants across held roles, any grant wins. Roles absent from
/// the snapshot contribute nothing.
#[must_use]
pub fn evaluate(
    snapshot: &AccessSnapshot,
    roles: &BTreeSet<String>,
    resource: &ResourceName,
    action: &ActionName,
) -> Decision {
    if let Some(role) = roles.iter().find(|role| role.as_str() == WILDCARD_ROLE) {
        return Decision::Granted {
            source: GrantSource::Wildcard { role: role.clone() },
        };
    }

    let wanted = (resource.clone(), action.clone());
    for role in roles {
        if let Some(grants) = snapshot.role_grants(role)
            && grants.contains(&wanted)
        {
            return Decision::Granted {
                source: GrantSource::RoleGrant { role: role.clone() },
            };
        }
    }

    Decision::Denied {
        reason: DenyReason::NoGrant,
    }
}

/// Builds a snapshot from the baseline grants of every system role.
#[must_use]
pub fn baseline_snapshot() -> AccessSnapshot {
    let mut snapshot = AccessSnapshot::new();
    for role in SystemRole::all() {
        let grants = role
            .baseline_grants()
            .iter()
            .filter_map(|(resource, action)| {
                match (ResourceName::new(*resource), ActionName::new(*action)) {
                    (Ok(resource), Ok(action)) => Some((resource, action)),
                    _ => None,
                }
            })
            .collect();
        snapshot.insert_role(role.as_str(), grants);
    }

    snapshot
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use crate::permission::{ActionName, ResourceName};

    use super::{AccessSnapshot, Decision, GrantSource, baseline_snapshot, evaluate};

    fn resource(value: &str) -> ResourceName {
        match ResourceName::new(value) {
            Ok(resource) => resource,
            Err(error) => panic!("invalid test resource: {error}"),
        }
    }

    fn action(value: &str) -> ActionName {
        match ActionName::new(value) {
            Ok(action) => action,
            Err(error) => panic!("invalid test action: {error}"),
        }
    }

    fn roles(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    fn admin_snapshot() -> AccessSnapshot {
        let mut snapshot = AccessSnapshot::new();
        snapshot.insert_role(
            "Admin",
            BTreeSet::from([
                (resource("bookings"), action("read")),
                (resource("bookings"), action("write")),
            ]),
        );
        snapshot
    }

    #[test]
    fn role_grant_allows_listed_capability() {
        let snapshot = admin_snapshot();
        let decision = evaluate(&snapshot, &roles(&["Admin"]), &resource("bookings"), &action("read"));
        assert_eq!(
            decision,
            Decision::Granted {
                source: GrantSource::RoleGrant {
                    role: "Admin".to_owned()
                }
            }
        );
    }

    #[test]
    fn missing_grant_is_denied() {
        let snapshot = admin_snapshot();
        let decision = evaluate(
            &snapshot,
            &roles(&["Admin"]),
            &resource("payouts"),
            &action("approve"),
        );
        assert!(!decision.is_granted());
    }

    #[test]
    fn wildcard_role_is_granted_everything_without_explicit_grants() {
        let snapshot = AccessSnapshot::new();
        let decision = evaluate(
            &snapshot,
            &roles(&["SuperAdmin"]),
            &resource("anything"),
            &action("anything"),
        );
        assert!(decision.is_wildcard());
    }

    #[test]
    fn grants_union_across_roles() {
        let mut snapshot = admin_snapshot();
        snapshot.insert_role(
            "Finance",
            BTreeSet::from([(resource("payouts"), action("approve"))]),
        );

        let held = roles(&["Admin", "Finance"]);
        assert!(evaluate(&snapshot, &held, &resource("bookings"), &action("write")).is_granted());
        assert!(evaluate(&snapshot, &held, &resource("payouts"), &action("approve")).is_granted());
    }

    #[test]
    fn unknown_role_contributes_nothing() {
        let snapshot = admin_snapshot();
        let decision = evaluate(
            &snapshot,
            &roles(&["Ghost"]),
            &resource("bookings"),
            &action("read"),
        );
        assert!(!decision.is_granted());
    }

    #[test]
    fn baseline_snapshot_covers_system_roles() {
        let snapshot = baseline_snapshot();
        let decision = evaluate(
            &snapshot,
            &roles(&["Finance"]),
            &resource("payouts"),
            &action("approve"),
        );
        assert!(decision.is_granted());
    }

    proptest! {
        #[test]
        fn evaluation_is_deterministic(
            grants in proptest::collection::btree_set(("[a-z]{1,8}", "[a-z]{1,8}"), 0..16),
            held in proptest::collection::btree_set("[A-Za-z]{1,8}", 0..4),
            wanted_resource in "[a-z]{1,8}",
            wanted_action in "[a-z]{1,8}",
        ) {
            let mut snapshot = AccessSnapshot::new();
            let grant_set: BTreeSet<_> = grants
                .iter()
                .map(|(res, act)| (resource(res), action(act)))
                .collect();
            snapshot.insert_role("Sampled", grant_set);

            let mut held: BTreeSet<String> = held;
            held.insert("Sampled".to_owned());

            let first = evaluate(&snapshot, &held, &resource(&wanted_resource), &action(&wanted_action));
            let second = evaluate(&snapshot, &held, &resource(&wanted_resource), &action(&wanted_action));
            prop_assert_eq!(first.clone(), second);

            let expected = held.iter().any(|role| role == super::WILDCARD_ROLE)
                || grants.contains(&(wanted_resource.clone(), wanted_action.clone()));
            prop_assert_eq!(first.is_granted(), expected);
        }
    }
}
