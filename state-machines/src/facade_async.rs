//! The async counterpart of [`crate::StateMachine`], gated behind the `async` feature.

use std::sync::Arc;

use state_machines_core::{
    AsyncEngine, CallbackProvider, CallbackValue, EngineConfig, EngineError, MachineDefinition, OrderedSet,
    Payload, StateId,
};

/// An async hierarchical statechart. Unlike [`crate::StateMachine`], initial
/// activation is deferred: call [`Self::activate_initial_state`] explicitly, or
/// let the first [`Self::send`] perform it lazily (SPEC_FULL.md §4.7.5).
pub struct AsyncStateMachine<M> {
    engine: AsyncEngine<M>,
}

impl<M: Send + Sync + 'static> AsyncStateMachine<M> {
    pub fn new(
        def: Arc<MachineDefinition<M>>,
        model: M,
        listeners: Vec<Arc<dyn CallbackProvider<M>>>,
        config: EngineConfig,
    ) -> Result<Self, state_machines_core::AttrNotFound> {
        Ok(Self {
            engine: AsyncEngine::new(def, model, listeners, config)?,
        })
    }

    pub fn model(&self) -> &M {
        self.engine.model()
    }

    pub fn configuration(&self) -> &OrderedSet<StateId> {
        self.engine.configuration()
    }

    pub fn configuration_ids(&self) -> Vec<&str> {
        self.engine.configuration_keys()
    }

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

    pub fn add_listener(&mut self, listener: Arc<dyn CallbackProvider<M>>) -> Result<(), state_machines_core::AttrNotFound> {
        self.engine.add_listener(listener)
    }

    pub fn cancel_event(&mut self, send_id: &str) -> usize {
        self.engine.cancel_event(send_id)
    }

    pub async fn activate_initial_state(&mut self) -> Result<(), EngineError> {
        self.engine.activate_initial_state().await
    }

    pub async fn send(&mut self, event: impl Into<String>) -> Result<Option<CallbackValue>, EngineError> {
        self.engine.send(event, Payload::new()).await
    }

    pub async fn send_with_payload(
        &mut self,
        event: impl Into<String>,
        payload: Payload,
    ) -> Result<Option<CallbackValue>, EngineError> {
        self.engine.send(event, payload).await
    }

    pub async fn send_delayed(
        &mut self,
        event: impl Into<String>,
        payload: Payload,
        delay: std::time::Duration,
        send_id: Option<String>,
    ) -> Result<Option<CallbackValue>, EngineError> {
        self.engine.send_delayed(event, payload, delay, send_id).await
    }

    pub async fn pump(&mut self) -> Result<Option<CallbackValue>, EngineError> {
        self.engine.pump().await
    }
}
