use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use state_machines::core::{
    CallbackContext, CallbackPriority, CallbackProvider, CallbackSpec, CallbackTable, EngineConfig, MachineBuilder,
    StateSpec, TransitionSpec, unit_value,
};
use state_machines::StateMachine;

struct Model;

// ============================================================================
// Baseline: two flat states, no guards, no callbacks.
// ============================================================================

fn simple_light() -> Arc<state_machines::core::MachineDefinition<Model>> {
    Arc::new(
        MachineBuilder::<Model>::new()
            .state(StateSpec::new("off").initial())
            .state(StateSpec::new("on"))
            .transition(TransitionSpec::new("off").to("on").on_event("toggle_on"))
            .transition(TransitionSpec::new("on").to("off").on_event("toggle_off"))
            .build(vec![])
            .unwrap(),
    )
}

fn benchmark_simple_transition(c: &mut Criterion) {
    let def = simple_light();
    c.bench_function("simple_transition", |b| {
        b.iter(|| {
            let mut machine = StateMachine::new(def.clone(), Model, vec![], EngineConfig::default()).unwrap();
            black_box(machine.send("toggle_on").unwrap());
            black_box(machine.send("toggle_off").unwrap());
        });
    });
}

// ============================================================================
// With a guard: exercises GuardExpr evaluation plus provider resolution.
// ============================================================================

fn guarded_door() -> (Arc<state_machines::core::MachineDefinition<Model>>, Vec<Arc<dyn CallbackProvider<Model>>>) {
    let provider: Arc<dyn CallbackProvider<Model>> =
        Arc::new(CallbackTable::<Model>::new().guard("check_permission", |_: &Model| true));
    let def = MachineBuilder::<Model>::new()
        .state(StateSpec::new("closed").initial())
        .state(StateSpec::new("open"))
        .transition(
            TransitionSpec::new("closed")
                .to("open")
                .on_event("open")
                .cond("check_permission"),
        )
        .transition(TransitionSpec::new("open").to("closed").on_event("close"))
        .build(vec![provider.clone()])
        .unwrap();
    (Arc::new(def), vec![provider])
}

fn benchmark_guarded_transition(c: &mut Criterion) {
    let (def, providers) = guarded_door();
    c.bench_function("guarded_transition", |b| {
        b.iter(|| {
            let mut machine = StateMachine::new(def.clone(), Model, providers.clone(), EngineConfig::default()).unwrap();
            black_box(machine.send("open").unwrap());
            black_box(machine.send("close").unwrap());
        });
    });
}

// ============================================================================
// With enter/exit callbacks bound directly (no name resolution at dispatch time).
// ============================================================================

fn callback_engine() -> Arc<state_machines::core::MachineDefinition<Model>> {
    let enter_cb = CallbackSpec::direct(Arc::new(|_ctx: &CallbackContext<Model>| Ok(unit_value())));
    let exit_cb = CallbackSpec::direct(Arc::new(|_ctx: &CallbackContext<Model>| Ok(unit_value())));
    Arc::new(
        MachineBuilder::<Model>::new()
            .state(StateSpec::new("stopped").initial())
            .state(StateSpec::new("running").on_enter(enter_cb).on_exit(exit_cb))
            .transition(TransitionSpec::new("stopped").to("running").on_event("start"))
            .transition(TransitionSpec::new("running").to("stopped").on_event("stop"))
            .build(vec![])
            .unwrap(),
    )
}

fn benchmark_callback_transition(c: &mut Criterion) {
    let def = callback_engine();
    c.bench_function("callback_transition", |b| {
        b.iter(|| {
            let mut machine = StateMachine::new(def.clone(), Model, vec![], EngineConfig::default()).unwrap();
            black_box(machine.send("start").unwrap());
            black_box(machine.send("stop").unwrap());
        });
    });
}

// ============================================================================
// Guards + before/after transition callbacks combined.
// ============================================================================

fn full_featured() -> (Arc<state_machines::core::MachineDefinition<Model>>, Vec<Arc<dyn CallbackProvider<Model>>>) {
    let provider: Arc<dyn CallbackProvider<Model>> = Arc::new(
        CallbackTable::<Model>::new()
            .guard("can_activate", |_: &Model| true)
            .on("notify", |_: &Model| Ok(unit_value())),
    );
    let mut activate = TransitionSpec::new("idle").to("active").on_event("activate").cond("can_activate");
    activate
        .before
        .push(CallbackSpec::direct(Arc::new(|_ctx: &CallbackContext<Model>| Ok(unit_value()))));
    activate.after.push(CallbackSpec::named("notify", CallbackPriority::After));
    let def = MachineBuilder::<Model>::new()
        .state(StateSpec::new("idle").initial())
        .state(StateSpec::new("active"))
        .transition(activate)
        .transition(TransitionSpec::new("active").to("idle").on_event("deactivate"))
        .build(vec![provider.clone()])
        .unwrap();
    (Arc::new(def), vec![provider])
}

fn benchmark_full_featured_transition(c: &mut Criterion) {
    let (def, providers) = full_featured();
    c.bench_function("full_featured_transition", |b| {
        b.iter(|| {
            let mut machine =
                StateMachine::new(def.clone(), Model, providers.clone(), EngineConfig::default()).unwrap();
            black_box(machine.send("activate").unwrap());
            black_box(machine.send("deactivate").unwrap());
        });
    });
}

// ============================================================================
// Hierarchical: a compound superstate with two atomic children.
// ============================================================================

fn hierarchical_machine() -> Arc<state_machines::core::MachineDefinition<Model>> {
    Arc::new(
        MachineBuilder::<Model>::new()
            .state(StateSpec::new("standby").initial())
            .state(StateSpec::new("active"))
            .state(StateSpec::new("sub_a").parent("active").initial())
            .state(StateSpec::new("sub_b").parent("active"))
            .state(StateSpec::new("stopped"))
            .transition(TransitionSpec::new("standby").to("active").on_event("enter_active"))
            .transition(TransitionSpec::new("sub_a").to("sub_b").on_event("switch"))
            .transition(TransitionSpec::new("active").to("standby").on_event("abort"))
            .build(vec![])
            .unwrap(),
    )
}

fn benchmark_hierarchical_transition(c: &mut Criterion) {
    let def = hierarchical_machine();
    c.bench_function("hierarchical_transition", |b| {
        b.iter(|| {
            let mut machine = StateMachine::new(def.clone(), Model, vec![], EngineConfig::default()).unwrap();
            black_box(machine.send("enter_active").unwrap());
            black_box(machine.send("switch").unwrap());
            black_box(machine.send("abort").unwrap());
        });
    });
}

fn benchmark_hierarchical_polymorphic(c: &mut Criterion) {
    // Aborting directly from the nested child sub_a, rather than from the
    // superstate itself, exercises the ancestor-chain exit-set walk.
    let def = hierarchical_machine();
    c.bench_function("hierarchical_polymorphic", |b| {
        b.iter(|| {
            let mut machine = StateMachine::new(def.clone(), Model, vec![], EngineConfig::default()).unwrap();
            black_box(machine.send("enter_active").unwrap());
            black_box(machine.send("abort").unwrap());
        });
    });
}

// ============================================================================
// Allowed-events lookup: walks the active configuration's outgoing transitions.
// ============================================================================

fn benchmark_allowed_events(c: &mut Criterion) {
    let def = hierarchical_machine();
    let machine = StateMachine::new(def, Model, vec![], EngineConfig::default()).unwrap();
    c.bench_function("allowed_events_lookup", |b| {
        b.iter(|| black_box(machine.allowed_events()));
    });
}

criterion_group!(
    benches,
    benchmark_simple_transition,
    benchmark_guarded_transition,
    benchmark_callback_transition,
    benchmark_full_featured_transition,
    benchmark_hierarchical_transition,
    benchmark_hierarchical_polymorphic,
    benchmark_allowed_events,
);
criterion_main!(benches);
