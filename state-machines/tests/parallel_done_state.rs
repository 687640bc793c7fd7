//! SPEC_FULL.md §8 scenario 3: a parallel state with two regions, each ending in a
//! final child, whose completion should synthesize `done.state.war` once both
//! regions have finished.

use std::sync::Arc;

use state_machines::core::{MachineBuilder, StateSpec, TransitionSpec};
use state_machines::{EngineConfig, StateMachine};

struct Battle;

fn war_machine() -> StateMachine<Battle> {
    let def = MachineBuilder::<Battle>::new()
        .state(StateSpec::new("war").initial().parallel())
        .state(StateSpec::new("region_a").parent("war"))
        .state(StateSpec::new("fighting_a").parent("region_a").initial())
        .state(StateSpec::new("done_a").parent("region_a").finalize())
        .state(StateSpec::new("region_b").parent("war"))
        .state(StateSpec::new("fighting_b").parent("region_b").initial())
        .state(StateSpec::new("done_b").parent("region_b").finalize())
        .state(StateSpec::new("aftermath"))
        .transition(TransitionSpec::new("fighting_a").to("done_a").on_event("finish_a"))
        .transition(TransitionSpec::new("fighting_b").to("done_b").on_event("finish_b"))
        .transition(TransitionSpec::new("war").to("aftermath").on_event("done.state.war"))
        .build(vec![])
        .unwrap();
    StateMachine::new(Arc::new(def), Battle, vec![], EngineConfig::default()).unwrap()
}

#[test]
fn both_regions_start_active_at_once() {
    let machine = war_machine();
    let configuration = machine.configuration_ids();
    assert!(configuration.contains(&"fighting_a"));
    assert!(configuration.contains(&"fighting_b"));
}

#[test]
fn finishing_only_one_region_does_not_leave_war() {
    let mut machine = war_machine();
    machine.send("finish_a").unwrap();
    let configuration = machine.configuration_ids();
    assert!(configuration.contains(&"done_a"));
    assert!(configuration.contains(&"fighting_b"));
    assert!(configuration.contains(&"war"));
}

#[test]
fn finishing_both_regions_fires_the_parallel_done_event_and_leaves_war() {
    let mut machine = war_machine();
    machine.send("finish_a").unwrap();
    machine.send("finish_b").unwrap();
    assert_eq!(machine.current_state(), Some("aftermath"));
}
