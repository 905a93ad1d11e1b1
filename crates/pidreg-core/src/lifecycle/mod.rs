//! Module: lifecycle
//! Responsibility: identifier states, events, and the guarded transition table.
//! Does not own: persistence of the resulting state or any side effects.

mod event;
mod state;
mod table;

#[cfg(test)]
mod tests;

pub use event::{LifecycleEvent, UserEvent};
pub use state::IdentifierState;
pub use table::{Guard, GuardContext, TRANSITIONS, Transition, TransitionPolicy, apply, transition};
