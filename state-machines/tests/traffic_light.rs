//! SPEC_FULL.md §8 scenario 1: a flat three-state cycle with no compound states.
//! Verifies the basic send/configuration/allowed_events contract end to end.

use std::sync::Arc;

use state_machines::core::{MachineBuilder, StateSpec, TransitionSpec};
use state_machines::{EngineConfig, StateMachine};

struct Light;

fn traffic_light() -> StateMachine<Light> {
    let def = MachineBuilder::<Light>::new()
        .state(StateSpec::new("red").initial())
        .state(StateSpec::new("green"))
        .state(StateSpec::new("yellow"))
        .transition(TransitionSpec::new("red").to("green").on_event("go"))
        .transition(TransitionSpec::new("green").to("yellow").on_event("caution"))
        .transition(TransitionSpec::new("yellow").to("red").on_event("go"))
        .build(vec![])
        .unwrap();
    StateMachine::new(Arc::new(def), Light, vec![], EngineConfig::default()).unwrap()
}

#[test]
fn starts_in_the_initial_state() {
    let machine = traffic_light();
    assert_eq!(machine.current_state(), Some("red"));
}

#[test]
fn cycles_through_every_state_on_matching_events() {
    let mut machine = traffic_light();
    machine.send("go").unwrap();
    assert_eq!(machine.current_state(), Some("green"));
    machine.send("caution").unwrap();
    assert_eq!(machine.current_state(), Some("yellow"));
    machine.send("go").unwrap();
    assert_eq!(machine.current_state(), Some("red"));
}

#[test]
fn an_event_with_no_matching_transition_is_a_no_op() {
    let mut machine = traffic_light();
    machine.send("caution").unwrap();
    assert_eq!(machine.current_state(), Some("red"));
}

#[test]
fn allowed_events_reflects_the_active_state() {
    let machine = traffic_light();
    assert_eq!(machine.allowed_events(), vec!["go".to_string()]);
}
