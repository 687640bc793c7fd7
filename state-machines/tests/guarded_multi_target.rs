//! SPEC_FULL.md §8 scenario 2: two transitions sharing a source and event, picked
//! apart only by a guard, with the unguarded one as a document-order fallback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use state_machines::core::{CallbackProvider, CallbackTable, MachineBuilder, StateSpec, TransitionSpec};
use state_machines::{EngineConfig, StateMachine};

struct Review {
    valid: AtomicBool,
}

fn review_machine(valid: bool) -> StateMachine<Review> {
    let provider: Arc<dyn CallbackProvider<Review>> =
        Arc::new(CallbackTable::<Review>::new().guard("is_valid", |m: &Review| m.valid.load(Ordering::SeqCst)));
    let def = MachineBuilder::<Review>::new()
        .state(StateSpec::new("pending").initial())
        .state(StateSpec::new("approved"))
        .state(StateSpec::new("rejected"))
        .transition(
            TransitionSpec::new("pending")
                .to("approved")
                .on_event("decide")
                .cond("is_valid"),
        )
        .transition(TransitionSpec::new("pending").to("rejected").on_event("decide"))
        .build(vec![provider.clone()])
        .unwrap();
    StateMachine::new(Arc::new(def), Review { valid: AtomicBool::new(valid) }, vec![provider], EngineConfig::default())
        .unwrap()
}

#[test]
fn a_satisfied_guard_wins_over_the_later_fallback() {
    let mut machine = review_machine(true);
    machine.send("decide").unwrap();
    assert_eq!(machine.current_state(), Some("approved"));
}

#[test]
fn a_failed_guard_falls_through_to_the_next_candidate_in_document_order() {
    let mut machine = review_machine(false);
    machine.send("decide").unwrap();
    assert_eq!(machine.current_state(), Some("rejected"));
}
