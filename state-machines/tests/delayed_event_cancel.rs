//! SPEC_FULL.md §8 scenario 5: `send_delayed` schedules and returns immediately,
//! and a `cancel_event` issued before the delay elapses suppresses the trigger.

use std::sync::Arc;
use std::time::Duration;

use state_machines::core::{MachineBuilder, Payload, StateSpec, TransitionSpec};
use state_machines::{EngineConfig, StateMachine};

struct Timer;

fn timer_machine() -> StateMachine<Timer> {
    let def = MachineBuilder::<Timer>::new()
        .state(StateSpec::new("s1").initial())
        .state(StateSpec::new("s2"))
        .transition(TransitionSpec::new("s1").to("s2").on_event("fire"))
        .build(vec![])
        .unwrap();
    StateMachine::new(Arc::new(def), Timer, vec![], EngineConfig::default()).unwrap()
}

#[test]
fn send_delayed_returns_before_the_delay_elapses() {
    let mut machine = timer_machine();
    machine
        .send_delayed("fire", Payload::new(), Duration::from_millis(50), Some("k".to_string()))
        .unwrap();
    // The trigger is not due yet, so it must not have run inline.
    assert_eq!(machine.current_state(), Some("s1"));
}

#[test]
fn a_due_delayed_trigger_fires_once_pumped() {
    let mut machine = timer_machine();
    machine
        .send_delayed("fire", Payload::new(), Duration::from_millis(20), None)
        .unwrap();
    std::thread::sleep(Duration::from_millis(40));
    machine.pump().unwrap();
    assert_eq!(machine.current_state(), Some("s2"));
}

#[test]
fn cancelling_before_the_delay_elapses_suppresses_the_trigger() {
    let mut machine = timer_machine();
    machine
        .send_delayed("fire", Payload::new(), Duration::from_millis(20), Some("k".to_string()))
        .unwrap();
    assert_eq!(machine.cancel_event("k"), 1);
    std::thread::sleep(Duration::from_millis(40));
    machine.pump().unwrap();
    assert_eq!(machine.current_state(), Some("s1"));
}
