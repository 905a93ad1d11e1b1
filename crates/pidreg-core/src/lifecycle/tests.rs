use crate::{
    error::ErrorClass,
    lifecycle::{
        GuardContext, IdentifierState, LifecycleEvent, TRANSITIONS, Transition, TransitionPolicy,
        UserEvent, apply, transition,
    },
};
use proptest::prelude::*;

const OPEN: GuardContext = GuardContext {
    registerable: true,
    health_check_failed: true,
};

fn table_target(from: IdentifierState, event: LifecycleEvent) -> Option<IdentifierState> {
    TRANSITIONS
        .iter()
        .find(|(sources, row_event, _, _)| *row_event == event && sources.contains(&from))
        .map(|(_, _, to, _)| *to)
}

fn any_state() -> impl Strategy<Value = IdentifierState> {
    prop::sample::select(IdentifierState::ALL.to_vec())
}

fn any_event() -> impl Strategy<Value = LifecycleEvent> {
    prop::sample::select(LifecycleEvent::ALL.to_vec())
}

#[test]
fn publish_then_hide_moves_draft_to_findable_then_registered() {
    let published = transition(IdentifierState::Draft, UserEvent::Publish.into(), OPEN);
    assert_eq!(
        published,
        Transition::Applied {
            from: IdentifierState::Draft,
            to: IdentifierState::Findable
        }
    );

    let hidden = transition(published.state(), UserEvent::Hide.into(), OPEN);
    assert_eq!(hidden.state(), IdentifierState::Registered);
}

#[test]
fn registerable_guard_keeps_draft_in_place_when_refused() {
    let refused = GuardContext {
        registerable: false,
        health_check_failed: false,
    };

    let outcome = transition(IdentifierState::Draft, LifecycleEvent::Register, refused);
    assert_eq!(
        outcome,
        Transition::Ignored {
            state: IdentifierState::Draft
        }
    );
}

#[test]
fn link_check_requires_a_reported_failure() {
    let healthy = GuardContext {
        registerable: true,
        health_check_failed: false,
    };

    assert!(!transition(IdentifierState::Findable, LifecycleEvent::LinkCheck, healthy).is_applied());
    assert_eq!(
        transition(IdentifierState::Tombstoned, LifecycleEvent::LinkCheck, OPEN).state(),
        IdentifierState::Broken
    );
}

#[test]
fn strict_policy_reports_illegal_transition_instead_of_ignoring() {
    let err = apply(
        IdentifierState::Draft,
        LifecycleEvent::Hide,
        OPEN,
        TransitionPolicy::Strict,
    )
    .expect_err("hiding a draft should be rejected under the strict policy");
    assert_eq!(err.class, ErrorClass::IllegalTransition);

    let ignored = apply(
        IdentifierState::Draft,
        LifecycleEvent::Hide,
        OPEN,
        TransitionPolicy::Permissive,
    )
    .expect("permissive policy should never fail");
    assert_eq!(ignored.state(), IdentifierState::Draft);
}

#[test]
fn user_event_parsing_accepts_only_the_four_caller_events() {
    assert_eq!("Publish".parse::<UserEvent>(), Ok(UserEvent::Publish));
    assert!("flag".parse::<UserEvent>().is_err());
    assert!("link_check".parse::<UserEvent>().is_err());
}

#[test]
fn only_drafts_are_deletable() {
    for state in IdentifierState::ALL {
        assert_eq!(state.is_deletable(), state == IdentifierState::Draft);
    }
}

proptest! {
    #[test]
    fn every_pair_matches_the_table_or_is_a_no_op(from in any_state(), event in any_event()) {
        let outcome = transition(from, event, OPEN);

        match table_target(from, event) {
            Some(to) => prop_assert_eq!(outcome, Transition::Applied { from, to }),
            None => prop_assert_eq!(outcome, Transition::Ignored { state: from }),
        }
    }

    #[test]
    fn reapplying_an_event_after_it_landed_is_a_no_op_or_table_row(
        from in any_state(),
        event in any_event(),
    ) {
        let first = transition(from, event, OPEN).state();
        let second = transition(first, event, OPEN);

        match table_target(first, event) {
            Some(to) => prop_assert_eq!(second.state(), to),
            None => prop_assert_eq!(second.state(), first),
        }
    }
}
