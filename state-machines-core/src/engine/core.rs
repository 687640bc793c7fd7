//! The shared interpretation loop: microstep execution and the three-phase
//! macrostep, independent of whether a sync or async façade drives it. See
//! SPEC_FULL.md §4.7.3/§4.7.4.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::callback::{CallbackContext, CallbackError, CallbackProvider, CallbackValue};
use crate::definition::MachineDefinition;
use crate::errors::{AttrNotFound, MachineError, TransitionNotAllowed};
use crate::event_queue::{PriorityEventQueue, Trigger};
use crate::ordered_set::OrderedSet;
use crate::payload::Payload;
use crate::state::StateId;

use super::algorithm::{self, HistoryValues};
use super::resolve::ResolvedDefinition;

pub type EngineError = MachineError<CallbackError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    Propagate,
    Resilient,
}

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub allow_event_without_transition: bool,
    pub self_transition_entries: bool,
    pub error_policy: ErrorPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            allow_event_without_transition: false,
            self_transition_entries: false,
            error_policy: ErrorPolicy::Propagate,
        }
    }
}

/// Owns every piece of runtime state named in SPEC_FULL.md §4.7: the active
/// configuration, both queues, history values, and the resolved callback cache.
/// Does not itself provide the non-reentrant processing gate — that is
/// `SyncEngine`/`AsyncEngine`'s job, since the gate's blocking behavior differs
/// between the two.
pub struct EngineCore<M> {
    def: Arc<MachineDefinition<M>>,
    resolved: ResolvedDefinition<M>,
    providers: Vec<Arc<dyn CallbackProvider<M>>>,
    model: M,
    configuration: OrderedSet<StateId>,
    history_values: HistoryValues,
    pub internal_queue: PriorityEventQueue,
    pub external_queue: PriorityEventQueue,
    activated: bool,
    config: EngineConfig,
}

impl<M: Send + Sync + 'static> EngineCore<M> {
    pub fn new(
        def: Arc<MachineDefinition<M>>,
        model: M,
        providers: Vec<Arc<dyn CallbackProvider<M>>>,
        config: EngineConfig,
    ) -> Result<Self, AttrNotFound> {
        let resolved = ResolvedDefinition::build(&def, &providers)?;
        Ok(Self {
            def,
            resolved,
            providers,
            model,
            configuration: OrderedSet::new(),
            history_values: HistoryValues::new(),
            internal_queue: PriorityEventQueue::new(),
            external_queue: PriorityEventQueue::new(),
            activated: false,
            config,
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn configuration(&self) -> &OrderedSet<StateId> {
        &self.configuration
    }

    pub fn configuration_keys(&self) -> Vec<&str> {
        self.configuration.iter().map(|&id| self.def.state(id).key.as_str()).collect()
    }

    /// Only the atomic (leaf) states in the active configuration, omitting the
    /// compound/parallel ancestors that are also part of the formal configuration.
    /// This is what a single-state convenience accessor should report.
    pub fn leaf_configuration_keys(&self) -> Vec<&str> {
        self.configuration
            .iter()
            .filter(|&&id| self.def.state(id).is_atomic())
            .map(|&id| self.def.state(id).key.as_str())
            .collect()
    }

    pub fn is_terminated(&self) -> bool {
        self.configuration.iter().any(|&id| {
            let node = self.def.state(id);
            node.is_final && node.parent.map(|p| p == self.def.root()).unwrap_or(true)
        })
    }

    pub fn allowed_events(&self) -> Vec<String> {
        let mut events = OrderedSet::new();
        for &state in self.configuration.iter().filter(|&&s| self.def.state(s).is_atomic()) {
            for ancestor in algorithm::ancestors_inclusive(&self.def, state) {
                for &t_idx in &self.def.state(ancestor).outgoing {
                    for pattern in &self.def.transition(t_idx).events {
                        events.add(pattern.0.clone());
                    }
                }
            }
        }
        events.into_iter().collect()
    }

    /// Registers an additional lookup source and re-resolves every callback site,
    /// per the Façade's `add_listener` contract (SPEC_FULL.md §4.8).
    pub fn add_listener(&mut self, provider: Arc<dyn CallbackProvider<M>>) -> Result<(), AttrNotFound> {
        self.providers.push(provider);
        self.resolved = ResolvedDefinition::build(&self.def, &self.providers)?;
        Ok(())
    }

    pub fn cancel_event(&mut self, send_id: &str) -> usize {
        self.external_queue.remove_by_send_id(send_id)
    }

    pub fn enqueue_external(&mut self, trigger: Trigger) {
        self.external_queue.put(trigger);
    }

    /// Time remaining until the oldest external trigger is due, or `None` if the
    /// queue is empty or that trigger is already due. An async façade awaits this
    /// instead of busy-sleeping in 1ms ticks like the sync façade does.
    pub fn next_external_delay(&self) -> Option<std::time::Duration> {
        let trigger = self.external_queue.peek()?;
        trigger.due.checked_duration_since(std::time::Instant::now())
    }

    /// Whether the head of the external queue is ready to run right now. A driver
    /// loop should stop once this is false and the internal queue is empty, rather
    /// than spin-waiting — a not-yet-due delayed trigger is left queued for a later
    /// call (SPEC_FULL.md §4.7's `send(..., delay)` is schedule-and-return, not
    /// schedule-and-block).
    pub fn external_due(&self) -> bool {
        self.external_queue.peek().is_some_and(|t| t.is_due())
    }

    /// Idempotent: runs the synthetic entry-from-empty-configuration procedure
    /// exactly once.
    pub fn activate_initial_state(&mut self) -> Result<(), EngineError> {
        if self.activated {
            return Ok(());
        }
        self.activated = true;
        let targets = vec![self.def.root()];
        let entry = algorithm::entry_set(&self.def, &targets, self.def.root());
        self.apply_entry(&entry, None, "__initial__", &Payload::new())?;
        debug!(configuration = ?self.configuration_keys(), "initial state activated");
        Ok(())
    }

    /// Runs phases 1 and 2 of the macrostep (internal quiescence), then phase 3 for
    /// at most one external trigger. Returns the first callback return value
    /// produced while handling that external trigger, or `None` if it produced
    /// none / there was nothing external to process.
    pub fn run_macrostep(&mut self) -> Result<Option<CallbackValue>, EngineError> {
        self.activate_initial_state()?;
        self.drain_internal()?;

        let Some(trigger) = self.external_queue.pop() else {
            return Ok(None);
        };

        if !trigger.is_due() {
            self.external_queue.put(trigger);
            std::thread::sleep(std::time::Duration::from_millis(1));
            return Ok(None);
        }

        let result = self.handle_trigger(&trigger, true);
        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) => self.apply_error_policy(err),
        }
    }

    fn drain_internal(&mut self) -> Result<(), EngineError> {
        loop {
            let eventless = self.select_for_event(None);
            if !eventless.is_empty() {
                if let Err(err) = self.run_microstep(&eventless, None, &Payload::new()) {
                    self.handle_microstep_error(err)?;
                }
                continue;
            }

            let Some(trigger) = self.internal_queue.pop() else {
                break;
            };
            if let Err(err) = self.handle_trigger(&trigger, false) {
                self.handle_microstep_error(err)?;
            }
        }
        Ok(())
    }

    fn handle_trigger(&mut self, trigger: &Trigger, external: bool) -> Result<Option<CallbackValue>, EngineError> {
        let selected = self.select_for_event(Some(&trigger.event));
        if selected.is_empty() {
            if external {
                if self.config.allow_event_without_transition {
                    warn!(event = %trigger.event, "no enabled transition for event, ignoring");
                    return Ok(None);
                }
                return Err(TransitionNotAllowed {
                    event: trigger.event.clone(),
                    configuration: self.configuration_keys().into_iter().map(String::from).collect(),
                }
                .into());
            }
            return Ok(None);
        }
        let values = self.run_microstep(&selected, Some(&trigger.event), &trigger.payload)?;
        Ok(values.into_iter().next())
    }

    fn select_for_event(&self, event: Option<&str>) -> Vec<usize> {
        let resolved = &self.resolved;
        let empty_payload = Payload::new();
        algorithm::select_transitions(&self.def, &self.configuration, &self.history_values, |t_idx, t| {
            let event_ok = match event {
                None => t.is_eventless(),
                Some(e) => t.matches_event(e),
            };
            if !event_ok {
                return false;
            }
            match &resolved.transitions[t_idx].guard {
                None => true,
                Some(guard) => {
                    let ctx = transition_ctx(&self.def, &self.model, t_idx, event, &empty_payload);
                    guard(&ctx)
                }
            }
        })
    }

    fn handle_microstep_error(&mut self, err: EngineError) -> Result<(), EngineError> {
        match self.config.error_policy {
            ErrorPolicy::Propagate => Err(err),
            ErrorPolicy::Resilient => {
                warn!(error = %err, "rolling back microstep, raising error.execution");
                let payload = Payload::new().with_kwarg("error", err.to_string());
                self.internal_queue.put(Trigger::immediate("error.execution").with_payload(payload).internal(true));
                Ok(())
            }
        }
    }

    fn apply_error_policy(&mut self, err: EngineError) -> Result<Option<CallbackValue>, EngineError> {
        match self.config.error_policy {
            ErrorPolicy::Propagate => {
                self.external_queue.clear();
                Err(err)
            }
            ErrorPolicy::Resilient => {
                error!(error = %err, "external trigger failed under resilient policy");
                let payload = Payload::new().with_kwarg("error", err.to_string());
                self.internal_queue.put(Trigger::immediate("error.execution").with_payload(payload).internal(true));
                Ok(None)
            }
        }
    }

    /// Runs one microstep for an already conflict-resolved set of transitions.
    /// `event`/`payload` are `None`/empty for the eventless case.
    fn run_microstep(
        &mut self,
        transitions: &[usize],
        event: Option<&str>,
        payload: &Payload,
    ) -> Result<Vec<CallbackValue>, EngineError> {
        let snapshot = self.configuration.clone();
        let snapshot_history = self.history_values.clone();

        match self.run_microstep_body(transitions, event, payload) {
            Ok(outcomes) => Ok(outcomes),
            Err(callback_err) => {
                self.configuration = snapshot;
                self.history_values = snapshot_history;
                Err(MachineError::Callback(callback_err))
            }
        }
    }

    /// The uncommitted body of a microstep; on any callback error the caller
    /// restores `configuration`/`history_values` from its pre-call snapshot.
    fn run_microstep_body(
        &mut self,
        transitions: &[usize],
        event: Option<&str>,
        payload: &Payload,
    ) -> Result<Vec<CallbackValue>, CallbackError> {
        {
            let mut outcomes = Vec::new();

            for &t_idx in transitions {
                let ctx = transition_ctx(&self.def, &self.model, t_idx, event, payload);
                outcomes.extend(self.resolved.transitions[t_idx].before.call_all(&ctx)?);
            }

            let mut all_exit: Vec<StateId> = Vec::new();
            let mut domains = Vec::with_capacity(transitions.len());
            for &t_idx in transitions {
                let transition = self.def.transition(t_idx);
                let targets = algorithm::effective_targets(&self.def, transition, &self.history_values);
                let domain = algorithm::transition_domain(&self.def, transition, &targets);
                domains.push((targets, domain));
                if transition.internal && !self.config.self_transition_entries && domain == transition.source {
                    continue;
                }
                for s in algorithm::exit_set(&self.def, &self.configuration, domain) {
                    if !all_exit.contains(&s) {
                        all_exit.push(s);
                    }
                }
            }

            // History must be snapshotted against the configuration as it stood
            // before any of this microstep's exits happened — the deeper states
            // a shallow/deep history wants to remember are themselves part of
            // `all_exit`, so recording has to run as its own pass before the
            // second pass starts discarding states out of `self.configuration`.
            for &state in all_exit.iter() {
                let node = self.def.state(state);
                for &history_id in &node.histories {
                    let recorded = self.snapshot_history_for(state, history_id);
                    self.history_values.insert(history_id, recorded);
                }
            }

            for &state in all_exit.iter().rev() {
                let ctx = state_ctx(&self.def, &self.model, state, event, payload);
                outcomes.extend(self.resolved.states[state.0].exit.call_all(&ctx)?);
                self.configuration.discard(&state);
            }

            for &t_idx in transitions {
                let ctx = transition_ctx(&self.def, &self.model, t_idx, event, payload);
                outcomes.extend(self.resolved.transitions[t_idx].on.call_all(&ctx)?);
            }

            let mut all_entry = OrderedSet::new();
            for (i, &t_idx) in transitions.iter().enumerate() {
                let transition = self.def.transition(t_idx);
                let (targets, domain) = &domains[i];
                if transition.internal && !self.config.self_transition_entries && *domain == transition.source {
                    continue;
                }
                for s in algorithm::entry_set(&self.def, targets, *domain) {
                    all_entry.add(s);
                }
            }

            for &state in all_entry.iter() {
                self.configuration.add(state);
            }

            let mut done_events = Vec::new();
            for &state in all_entry.iter() {
                let ctx = state_ctx(&self.def, &self.model, state, event, payload);
                outcomes.extend(self.resolved.states[state.0].enter.call_all(&ctx)?);
                let node = self.def.state(state);
                if node.is_final {
                    if let Some(parent) = node.parent {
                        done_events.push(format!("done.state.{}", self.def.state(parent).key));
                        if let Some(grandparent) = self.def.state(parent).parent {
                            if self.def.state(grandparent).is_parallel
                                && self.all_regions_final(grandparent)
                            {
                                done_events.push(format!("done.state.{}", self.def.state(grandparent).key));
                            }
                        }
                    }
                }
            }
            for event_name in done_events {
                self.internal_queue.put(Trigger::immediate(event_name).internal(true));
            }

            for &t_idx in transitions {
                let ctx = transition_ctx(&self.def, &self.model, t_idx, event, payload);
                outcomes.extend(self.resolved.transitions[t_idx].after.call_all(&ctx)?);
            }

            Ok(outcomes)
        }
    }

    fn all_regions_final(&self, parallel_state: StateId) -> bool {
        self.def.state(parallel_state).children.iter().all(|&region| {
            self.configuration.iter().any(|&active| {
                active == region || algorithm::is_descendant(&self.def, active, region)
            }) && self.region_is_final(region)
        })
    }

    fn region_is_final(&self, region: StateId) -> bool {
        self.configuration
            .iter()
            .any(|&s| self.def.state(s).is_final && algorithm::is_descendant_or_eq(&self.def, s, region))
    }

    fn snapshot_history_for(&self, owner: StateId, history_id: crate::state::HistoryId) -> OrderedSet<StateId> {
        let deep = matches!(self.def.history(history_id).kind, crate::state::HistoryKind::Deep);
        let mut recorded = OrderedSet::new();
        for &active in self.configuration.iter() {
            if !algorithm::is_descendant(&self.def, active, owner) {
                continue;
            }
            if deep {
                if self.def.state(active).is_atomic() {
                    recorded.add(active);
                }
            } else if self.def.state(active).parent == Some(owner) {
                recorded.add(active);
            }
        }
        recorded
    }

    fn apply_entry(
        &mut self,
        entry: &OrderedSet<StateId>,
        event: Option<&str>,
        marker: &str,
        payload: &Payload,
    ) -> Result<(), EngineError> {
        for &state in entry.iter() {
            self.configuration.add(state);
        }
        for &state in entry.iter() {
            let ctx = state_ctx(&self.def, &self.model, state, event, payload);
            self.resolved.states[state.0]
                .enter
                .call_all(&ctx)
                .map_err(MachineError::Callback)?;
        }
        let _ = marker;
        Ok(())
    }

}

/// Built as a free function (rather than a `&self` method) so it borrows only
/// `def`/`model`, not the whole `EngineCore` — callers interleave this with
/// mutable access to `configuration`/`history_values` within the same microstep.
fn state_ctx<'a, M>(
    def: &'a MachineDefinition<M>,
    model: &'a M,
    state: StateId,
    event: Option<&'a str>,
    payload: &'a Payload,
) -> CallbackContext<'a, M> {
    CallbackContext {
        event: event.unwrap_or(""),
        source: None,
        target: None,
        state: def.state(state).key.as_str(),
        model,
        transition: None,
        payload,
    }
}

fn transition_ctx<'a, M>(
    def: &'a MachineDefinition<M>,
    model: &'a M,
    t_idx: usize,
    event: Option<&'a str>,
    payload: &'a Payload,
) -> CallbackContext<'a, M> {
    let transition = def.transition(t_idx);
    CallbackContext {
        event: event.unwrap_or(""),
        source: Some(def.state(transition.source).key.as_str()),
        target: transition.target.map(|id| def.state(id).key.as_str()),
        state: def.state(transition.source).key.as_str(),
        model,
        transition: None,
        payload,
    }
}
