//! SPEC_FULL.md §8 scenario 6: a failing `on` callback under `ErrorPolicy::Resilient`
//! rolls the microstep back and reroutes through the synthesized `error.execution`
//! event instead of propagating the error to the caller.

use std::sync::Arc;

use state_machines::core::{CallbackContext, CallbackSpec, ErrorPolicy, MachineBuilder, StateSpec, TransitionSpec};
use state_machines::{EngineConfig, StateMachine};

struct Worker;

fn failing_machine() -> StateMachine<Worker> {
    let mut go = TransitionSpec::new("s1").to("s2").on_event("go");
    go.on.push(CallbackSpec::direct(Arc::new(|_ctx: &CallbackContext<Worker>| {
        Err("boom".into())
    })));
    let def = MachineBuilder::<Worker>::new()
        .state(StateSpec::new("s1").initial())
        .state(StateSpec::new("s2"))
        .state(StateSpec::new("error_state"))
        .transition(go)
        .transition(TransitionSpec::new("s1").to("error_state").on_event("error.execution"))
        .build(vec![])
        .unwrap();
    let config = EngineConfig {
        error_policy: ErrorPolicy::Resilient,
        ..EngineConfig::default()
    };
    StateMachine::new(Arc::new(def), Worker, vec![], config).unwrap()
}

#[test]
fn a_failing_callback_reroutes_to_the_error_handler_instead_of_propagating() {
    let mut machine = failing_machine();
    let result = machine.send("go");
    assert!(result.is_ok());
    assert_eq!(machine.current_state(), Some("error_state"));
}

fn propagating_machine() -> StateMachine<Worker> {
    let mut go = TransitionSpec::new("s1").to("s2").on_event("go");
    go.on.push(CallbackSpec::direct(Arc::new(|_ctx: &CallbackContext<Worker>| {
        Err("boom".into())
    })));
    let def = MachineBuilder::<Worker>::new()
        .state(StateSpec::new("s1").initial())
        .state(StateSpec::new("s2"))
        .transition(go)
        .build(vec![])
        .unwrap();
    StateMachine::new(Arc::new(def), Worker, vec![], EngineConfig::default()).unwrap()
}

#[test]
fn propagate_policy_surfaces_the_callback_error_and_leaves_the_configuration_untouched() {
    let mut machine = propagating_machine();
    let result = machine.send("go");
    assert!(result.is_err());
    assert_eq!(machine.current_state(), Some("s1"));
}
