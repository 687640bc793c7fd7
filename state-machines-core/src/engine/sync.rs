//! The blocking façade over [`EngineCore`]: drives the macrostep loop with a
//! non-reentrant gate, processing everything currently due and returning promptly —
//! a delayed `send` schedules and returns rather than blocking the caller for its
//! delay. See SPEC_FULL.md §4.7.5/§4.7.6.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::callback::{CallbackProvider, CallbackValue};
use crate::definition::MachineDefinition;
use crate::errors::AttrNotFound;
use crate::event_queue::Trigger;
use crate::ordered_set::OrderedSet;
use crate::payload::Payload;
use crate::state::StateId;

use super::core::{EngineConfig, EngineCore, EngineError};

/// A synchronous, blocking state machine instance.
///
/// Initial activation runs eagerly at construction (SPEC_FULL.md §4.7.5), so the
/// configuration is non-empty the moment `new` returns. A `send` arriving while
/// another `send` is already driving the loop (the nested-callback case) only
/// enqueues its trigger and returns `Ok(None)` rather than recursing, per the
/// concurrency gate in §4.7.6.
pub struct SyncEngine<M> {
    core: EngineCore<M>,
    processing: AtomicBool,
}

impl<M: Send + Sync + 'static> SyncEngine<M> {
    pub fn new(
        def: Arc<MachineDefinition<M>>,
        model: M,
        providers: Vec<Arc<dyn CallbackProvider<M>>>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let mut core = EngineCore::new(def, model, providers, config)?;
        core.activate_initial_state()?;
        Ok(Self {
            core,
            processing: AtomicBool::new(false),
        })
    }

    pub fn model(&self) -> &M {
        self.core.model()
    }

    pub fn configuration(&self) -> &OrderedSet<StateId> {
        self.core.configuration()
    }

    pub fn configuration_keys(&self) -> Vec<&str> {
        self.core.configuration_keys()
    }

    pub fn leaf_configuration_keys(&self) -> Vec<&str> {
        self.core.leaf_configuration_keys()
    }

    pub fn is_terminated(&self) -> bool {
        self.core.is_terminated()
    }

    pub fn allowed_events(&self) -> Vec<String> {
        self.core.allowed_events()
    }

    pub fn add_listener(&mut self, provider: Arc<dyn CallbackProvider<M>>) -> Result<(), AttrNotFound> {
        self.core.add_listener(provider)
    }

    pub fn cancel_event(&mut self, send_id: &str) -> usize {
        self.core.cancel_event(send_id)
    }

    /// Enqueues `event` and, unless another `send` is already driving the loop,
    /// runs macrosteps until that event (and any internal follow-up events it
    /// raises) has been fully handled.
    pub fn send(&mut self, event: impl Into<String>, payload: Payload) -> Result<Option<CallbackValue>, EngineError> {
        self.send_trigger(Trigger::immediate(event).with_payload(payload))
    }

    pub fn send_delayed(
        &mut self,
        event: impl Into<String>,
        payload: Payload,
        delay: std::time::Duration,
        send_id: Option<String>,
    ) -> Result<Option<CallbackValue>, EngineError> {
        let mut trigger = Trigger::immediate(event).with_payload(payload).with_delay(delay);
        if let Some(id) = send_id {
            trigger = trigger.with_send_id(id);
        }
        self.send_trigger(trigger)
    }

    fn send_trigger(&mut self, trigger: Trigger) -> Result<Option<CallbackValue>, EngineError> {
        self.core.enqueue_external(trigger);
        if self.processing.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            // A send from within a callback: enqueue-and-return, per §4.7.6.
            return Ok(None);
        }
        let result = self.pump();
        self.processing.store(false, Ordering::Release);
        result
    }

    /// Drains the internal queue and every currently-due external trigger, then
    /// returns. A not-yet-due delayed trigger is left queued — it becomes due on a
    /// later `send`/`send_delayed`/`pump` call, it is never spin-waited on here, so
    /// a delayed send schedules and returns rather than blocking for its delay.
    pub fn pump(&mut self) -> Result<Option<CallbackValue>, EngineError> {
        let mut first = None;
        while !self.core.internal_queue.is_empty() || self.core.external_due() {
            let outcome = self.core.run_macrostep()?;
            if first.is_none() {
                first = outcome;
            }
        }
        Ok(first)
    }
}
