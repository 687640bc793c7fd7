//! The synchronous, user-facing [`StateMachine`] façade.

use std::sync::Arc;

use state_machines_core::{
    CallbackProvider, CallbackValue, EngineConfig, EngineError, MachineDefinition, OrderedSet, Payload,
    StateId, SyncEngine,
};

/// A running hierarchical statechart bound to a model `M`.
///
/// Construction runs the initial activation eagerly (SPEC_FULL.md §4.7.5), so
/// `configuration()` is non-empty as soon as `new` returns. `send` is the only way
/// to mutate the machine; it enqueues the event and, unless another `send` further
/// up the call stack is already driving the processing loop, runs macrosteps to
/// completion.
pub struct StateMachine<M> {
    engine: SyncEngine<M>,
}

impl<M: Send + Sync + 'static> StateMachine<M> {
    pub fn new(
        def: Arc<MachineDefinition<M>>,
        model: M,
        listeners: Vec<Arc<dyn CallbackProvider<M>>>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            engine: SyncEngine::new(def, model, listeners, config)?,
        })
    }

    pub fn model(&self) -> &M {
        self.engine.model()
    }

    /// The active configuration, as arena ids. See [`Self::current_state`] for the
    /// common single-state case, or [`Self::configuration_ids`] for the string ids.
    pub fn configuration(&self) -> &OrderedSet<StateId> {
        self.engine.configuration()
    }

    pub fn configuration_ids(&self) -> Vec<&str> {
        self.engine.configuration_keys()
    }

    /// Convenience accessor for the non-parallel case: the sole active leaf state.
    /// Returns `None` if the machine is in a parallel configuration with more than
    /// one active leaf.
    pub fn current_state(&self) -> Option<&str> {
        let ids = self.engine.leaf_configuration_keys();
        if ids.len() == 1 {
            ids.into_iter().next()
        } else {
            None
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.engine.is_terminated()
    }

    pub fn allowed_events(&self) -> Vec<String> {
        self.engine.allowed_events()
    }

    /// Registers an additional lookup source for callback/guard names. Implicitly
    /// re-resolves every callback site, so this may fail if the new listener still
    /// leaves some required spec unresolved against model + all listeners.
    pub fn add_listener(&mut self, listener: Arc<dyn CallbackProvider<M>>) -> Result<(), state_machines_core::AttrNotFound> {
        self.engine.add_listener(listener)
    }

    /// Removes every not-yet-fired delayed event carrying this `send_id` from the
    /// external queue. Returns the number removed.
    pub fn cancel_event(&mut self, send_id: &str) -> usize {
        self.engine.cancel_event(send_id)
    }

    pub fn send(&mut self, event: impl Into<String>) -> Result<Option<CallbackValue>, EngineError> {
        self.engine.send(event, Payload::new())
    }

    pub fn send_with_payload(
        &mut self,
        event: impl Into<String>,
        payload: Payload,
    ) -> Result<Option<CallbackValue>, EngineError> {
        self.engine.send(event, payload)
    }

    /// Schedules `event` for `delay` from now and returns immediately; the trigger
    /// is processed by a later `send`/`send_delayed`/`pump` call once it comes due,
    /// never by blocking this call.
    pub fn send_delayed(
        &mut self,
        event: impl Into<String>,
        payload: Payload,
        delay: std::time::Duration,
        send_id: Option<String>,
    ) -> Result<Option<CallbackValue>, EngineError> {
        self.engine.send_delayed(event, payload, delay, send_id)
    }

    /// Processes every currently-due delayed trigger without requiring a new
    /// `send`. A no-op if nothing is due yet.
    pub fn pump(&mut self) -> Result<Option<CallbackValue>, EngineError> {
        self.engine.pump()
    }
}
