//! Coverage for the transition-domain / entry-exit-set machinery underlying every
//! scenario in SPEC_FULL.md §8: eventless chains drain within one `send`, and a
//! transition between two children of the same compound state leaves that shared
//! ancestor's own enter/exit callbacks untouched.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use state_machines::core::{CallbackContext, CallbackSpec, MachineBuilder, StateSpec, TransitionSpec};
use state_machines::{EngineConfig, StateMachine};

struct Model;

#[test]
fn an_eventless_chain_drains_fully_within_one_send() {
    let def = MachineBuilder::<Model>::new()
        .state(StateSpec::new("a").initial())
        .state(StateSpec::new("b"))
        .state(StateSpec::new("c"))
        .transition(TransitionSpec::new("a").to("b").on_event("go"))
        .transition(TransitionSpec::new("b").to("c"))
        .build(vec![])
        .unwrap();
    let mut machine = StateMachine::new(Arc::new(def), Model, vec![], EngineConfig::default()).unwrap();
    machine.send("go").unwrap();
    assert_eq!(machine.current_state(), Some("c"));
}

#[test]
fn switching_between_siblings_does_not_exit_or_re_enter_their_shared_ancestor() {
    let group_enters = Arc::new(AtomicUsize::new(0));
    let group_exits = Arc::new(AtomicUsize::new(0));
    let enters = group_enters.clone();
    let exits = group_exits.clone();

    let def = MachineBuilder::<Model>::new()
        .state(
            StateSpec::new("group")
                .initial()
                .on_enter(CallbackSpec::direct(Arc::new(move |_ctx: &CallbackContext<Model>| {
                    enters.fetch_add(1, Ordering::SeqCst);
                    Ok(state_machines::core::unit_value())
                })))
                .on_exit(CallbackSpec::direct(Arc::new(move |_ctx: &CallbackContext<Model>| {
                    exits.fetch_add(1, Ordering::SeqCst);
                    Ok(state_machines::core::unit_value())
                }))),
        )
        .state(StateSpec::new("x").parent("group").initial())
        .state(StateSpec::new("y").parent("group"))
        .state(StateSpec::new("outside"))
        .transition(TransitionSpec::new("x").to("y").on_event("go"))
        .transition(TransitionSpec::new("group").to("outside").on_event("leave"))
        .build(vec![])
        .unwrap();
    let mut machine = StateMachine::new(Arc::new(def), Model, vec![], EngineConfig::default()).unwrap();

    assert_eq!(group_enters.load(Ordering::SeqCst), 1);
    machine.send("go").unwrap();
    assert_eq!(machine.current_state(), Some("y"));
    assert_eq!(group_enters.load(Ordering::SeqCst), 1, "switching siblings must not re-enter the shared ancestor");
    assert_eq!(group_exits.load(Ordering::SeqCst), 0, "switching siblings must not exit the shared ancestor");

    machine.send("leave").unwrap();
    assert_eq!(machine.current_state(), Some("outside"));
    assert_eq!(group_exits.load(Ordering::SeqCst), 1, "leaving the ancestor itself must exit it exactly once");
}

#[test]
fn initial_activation_is_eager_and_idempotent_to_observe() {
    let def = MachineBuilder::<Model>::new()
        .state(StateSpec::new("a").initial())
        .state(StateSpec::new("b"))
        .transition(TransitionSpec::new("a").to("b").on_event("go"))
        .build(vec![])
        .unwrap();
    let machine = StateMachine::new(Arc::new(def), Model, vec![], EngineConfig::default()).unwrap();
    // Construction alone already ran the initial activation, so the
    // configuration is non-empty before any `send`.
    assert_eq!(machine.current_state(), Some("a"));
}
