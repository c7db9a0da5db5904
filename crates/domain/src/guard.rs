//! Advisory guard state machine mirrored by the admin UI.
//!
//! The machine reflects server-side decisions in UI flow and is never an
//! enforcement point; every protected route is also enforced server-side
//! by the evaluator. Keeping the machine pure lets both sides be tested
//! against the same [`Decision`] contract.

use serde::Serialize;

use crate::evaluation::Decision;

/// Session and authorization state observed at a route boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    /// Session resolution is still in flight.
    Loading,
    /// No valid session exists.
    Unauthenticated,
    /// A principal is established but not yet authorized for the route.
    Authenticated,
    /// The principal may use the protected route.
    Authorized,
    /// The principal is authenticated but lacks the required capability.
    Unauthorized,
}

/// Events driving the guard machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardEvent {
    /// Session lookup finished without a principal.
    SessionMissing,
    /// Session lookup produced an active principal.
    SessionResolved,
    /// The evaluator granted the route capability.
    AccessGranted,
    /// The evaluator denied the route capability.
    AccessDenied,
}

impl GuardState {
    /// Advances the machine by one event.
    ///
    /// Events that do not apply to the current state leave it unchanged;
    /// `Unauthenticated`, `Authorized` and `Unauthorized` are terminal.
    #[must_use]
    pub fn advance(self, event: GuardEvent) -> Self {
        match (self, event) {
            (Self::Loading, GuardEvent::SessionMissing) => Self::Unauthenticated,
            (Self::Loading, GuardEvent::SessionResolved) => Self::Authenticated,
            (Self::Authenticated, GuardEvent::AccessGranted) => Self::Authorized,
            (Self::Authenticated, GuardEvent::AccessDenied) => Self::Unauthorized,
            (state, _) => state,
        }
    }

    /// Advances an authenticated guard with an evaluator decision.
    #[must_use]
    pub fn advance_with_decision(self, decision: &Decision) -> Self {
        let event = if decision.is_granted() {
            GuardEvent::AccessGranted
        } else {
            GuardEvent::AccessDenied
        };

        self.advance(event)
    }

    /// Returns whether the UI should redirect to the login boundary.
    #[must_use]
    pub fn redirects_to_login(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::Unauthorized)
    }

    /// Returns whether the protected route may render.
    #[must_use]
    pub fn renders_protected_route(&self) -> bool {
        matches!(self, Self::Authorized)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::evaluation::{AccessSnapshot, evaluate};
    use crate::permission::{ActionName, ResourceName};

    use super::{GuardEvent, GuardState};

    #[test]
    fn missing_session_redirects_to_login() {
        let state = GuardState::Loading.advance(GuardEvent::SessionMissing);
        assert_eq!(state, GuardState::Unauthenticated);
        assert!(state.redirects_to_login());
    }

    #[test]
    fn granted_session_renders_route() {
        let state = GuardState::Loading
            .advance(GuardEvent::SessionResolved)
            .advance(GuardEvent::AccessGranted);
        assert!(state.renders_protected_route());
    }

    #[test]
    fn denied_session_redirects_to_login() {
        let state = GuardState::Loading
            .advance(GuardEvent::SessionResolved)
            .advance(GuardEvent::AccessDenied);
        assert_eq!(state, GuardState::Unauthorized);
        assert!(state.redirects_to_login());
    }

    #[test]
    fn terminal_states_absorb_events() {
        let state = GuardState::Unauthenticated.advance(GuardEvent::AccessGranted);
        assert_eq!(state, GuardState::Unauthenticated);
    }

    #[test]
    fn machine_mirrors_evaluator_decision() {
        let resource = match ResourceName::new("bookings") {
            Ok(resource) => resource,
            Err(error) => panic!("invalid test resource: {error}"),
        };
        let action = match ActionName::new("read") {
            Ok(action) => action,
            Err(error) => panic!("invalid test action: {error}"),
        };

        let snapshot = AccessSnapshot::new();
        let roles: BTreeSet<String> = BTreeSet::from(["Support".to_owned()]);
        let decision = evaluate(&snapshot, &roles, &resource, &action);

        let state = GuardState::Loading
            .advance(GuardEvent::SessionResolved)
            .advance_with_decision(&decision);
        assert_eq!(state, GuardState::Unauthorized);
    }
}
