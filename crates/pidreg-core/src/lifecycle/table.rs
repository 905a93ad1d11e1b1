use crate::{
    error::RegistryError,
    lifecycle::{IdentifierState, LifecycleEvent},
};

use crate::lifecycle::IdentifierState::{Broken, Draft, Findable, Flagged, Registered, Tombstoned};

///
/// Guard
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Guard {
    Always,
    /// Minimal validity required before leaving `draft`.
    Registerable,
    /// An automated link-health check reported a failure.
    HealthCheckFailed,
}

///
/// GuardContext
///
/// Facts the guards are evaluated against.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GuardContext {
    pub registerable: bool,
    pub health_check_failed: bool,
}

impl GuardContext {
    const fn admits(self, guard: Guard) -> bool {
        match guard {
            Guard::Always => true,
            Guard::Registerable => self.registerable,
            Guard::HealthCheckFailed => self.health_check_failed,
        }
    }
}

/// `(from states, event, to, guard)` rows.
pub const TRANSITIONS: &[(&[IdentifierState], LifecycleEvent, IdentifierState, Guard)] = &[
    (&[Draft], LifecycleEvent::Register, Registered, Guard::Registerable),
    (&[Draft], LifecycleEvent::Publish, Findable, Guard::Registerable),
    (&[Registered], LifecycleEvent::Publish, Findable, Guard::Always),
    (&[Findable], LifecycleEvent::Hide, Registered, Guard::Always),
    (&[Registered], LifecycleEvent::Show, Findable, Guard::Always),
    (&[Registered, Findable], LifecycleEvent::Flag, Flagged, Guard::Always),
    (
        &[Tombstoned, Registered, Findable, Flagged],
        LifecycleEvent::LinkCheck,
        Broken,
        Guard::HealthCheckFailed,
    ),
];

///
/// Transition
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Transition {
    Applied {
        from: IdentifierState,
        to: IdentifierState,
    },
    /// No table row matched or its guard refused; the state is unchanged.
    Ignored { state: IdentifierState },
}

impl Transition {
    #[must_use]
    pub const fn state(self) -> IdentifierState {
        match self {
            Self::Applied { to, .. } => to,
            Self::Ignored { state } => state,
        }
    }

    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

///
/// TransitionPolicy
///
/// `Permissive` treats illegal transitions as no-ops; `Strict` reports them.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TransitionPolicy {
    #[default]
    Permissive,
    Strict,
}

/// Look up a transition in the table.
#[must_use]
pub fn transition(
    from: IdentifierState,
    event: LifecycleEvent,
    context: GuardContext,
) -> Transition {
    TRANSITIONS
        .iter()
        .find(|(sources, row_event, _, guard)| {
            *row_event == event && sources.contains(&from) && context.admits(*guard)
        })
        .map_or(Transition::Ignored { state: from }, |(_, _, to, _)| {
            Transition::Applied { from, to: *to }
        })
}

/// Look up a transition and apply the policy to an ignored one.
pub fn apply(
    from: IdentifierState,
    event: LifecycleEvent,
    context: GuardContext,
    policy: TransitionPolicy,
) -> Result<Transition, RegistryError> {
    let outcome = transition(from, event, context);

    match (outcome, policy) {
        (Transition::Ignored { .. }, TransitionPolicy::Strict) => Err(
            RegistryError::illegal_transition(format!("cannot {event} an identifier in state {from}")),
        ),
        _ => Ok(outcome),
    }
}
