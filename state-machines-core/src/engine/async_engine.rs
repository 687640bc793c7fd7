//! The async façade over [`EngineCore`].
//!
//! Mirrors [`super::sync::SyncEngine`]'s gate/loop structure, but suspends with
//! `tokio::time::sleep` instead of blocking the OS thread, and leaves initial
//! activation to the caller (or the first `send`) instead of running it eagerly at
//! construction, per SPEC_FULL.md §4.7.5. Callbacks themselves stay synchronous
//! closures — `EngineCore` has no notion of an async callback future, so the only
//! suspension points this façade introduces are around the delayed-event wait.

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

pub struct AsyncEngine<M> {
    core: EngineCore<M>,
    processing: AtomicBool,
}

impl<M: Send + Sync + 'static> AsyncEngine<M> {
    pub fn new(
        def: Arc<MachineDefinition<M>>,
        model: M,
        providers: Vec<Arc<dyn CallbackProvider<M>>>,
        config: EngineConfig,
    ) -> Result<Self, AttrNotFound> {
        let core = EngineCore::new(def, model, providers, config)?;
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

    /// Idempotent; a no-op if already activated, or if the first `send` already
    /// triggered it lazily.
    pub async fn activate_initial_state(&mut self) -> Result<(), EngineError> {
        self.core.activate_initial_state()
    }

    pub async fn send(&mut self, event: impl Into<String>, payload: Payload) -> Result<Option<CallbackValue>, EngineError> {
        self.send_trigger(Trigger::immediate(event).with_payload(payload)).await
    }

    pub async fn send_delayed(
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
        self.send_trigger(trigger).await
    }

    async fn send_trigger(&mut self, trigger: Trigger) -> Result<Option<CallbackValue>, EngineError> {
        self.core.activate_initial_state()?;
        self.core.enqueue_external(trigger);
        if self.processing.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return Ok(None);
        }
        let result = self.pump().await;
        self.processing.store(false, Ordering::Release);
        result
    }

    /// Drains the internal queue and every currently-due external trigger,
    /// `tokio::time::sleep`-ing past the wait whenever a delayed trigger is the
    /// very next thing due — unlike the sync engine, awaiting costs nothing while
    /// other tasks run, so it's safe to wait here rather than leaving it to the
    /// caller. Returns as soon as nothing more is due.
    pub async fn pump(&mut self) -> Result<Option<CallbackValue>, EngineError> {
        let mut first = None;
        while !self.core.internal_queue.is_empty() || !self.core.external_queue.is_empty() {
            if !self.core.internal_queue.is_empty() {
                let outcome = self.core.run_macrostep()?;
                if first.is_none() {
                    first = outcome;
                }
                tokio::task::yield_now().await;
                continue;
            }
            match self.core.next_external_delay() {
                Some(delay) if !delay.is_zero() => tokio::time::sleep(delay).await,
                _ => {
                    let outcome = self.core.run_macrostep()?;
                    if first.is_none() {
                        first = outcome;
                    }
                    tokio::task::yield_now().await;
                }
            }
        }
        Ok(first)
    }
}
