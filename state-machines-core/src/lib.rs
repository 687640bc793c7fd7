//! Hierarchical statechart interpretation engine.
//!
//! Builds and runs a single-owner, arena-indexed state tree: compound, parallel,
//! atomic, and final states; eventless and event-triggered transitions; guarded
//! choices; shallow/deep history; and a run-to-completion processing loop with an
//! internal and an external event queue. See [`definition::MachineBuilder`] to
//! assemble a machine and [`engine::sync::SyncEngine`] /
//! [`engine::async_engine::AsyncEngine`] to run one.

pub mod callback;
pub mod definition;
pub mod engine;
pub mod errors;
pub mod event_queue;
pub mod guard;
pub mod ordered_set;
pub mod payload;
pub mod state;
pub mod transition;

pub use callback::{
    BoxedCallback, BoxedGuard, CallbackContext, CallbackError, CallbackPriority, CallbackProvider,
    CallbackResult, CallbackSpec, CallbackSpecList, CallbackTable, CallbackValue, IntoCallback, IntoGuard,
    unit_value,
};
pub use definition::{HistorySpec, MachineBuilder, MachineDefinition, StateSpec, TransitionSpec};
pub use engine::{EngineConfig, EngineError, ErrorPolicy, SyncEngine};
#[cfg(feature = "async")]
pub use engine::AsyncEngine;
pub use errors::{AttrNotFound, InvalidDefinition, InvalidStateValue, MachineError, TransitionNotAllowed};
pub use event_queue::{PriorityEventQueue, Trigger};
pub use guard::GuardExpr;
pub use ordered_set::OrderedSet;
pub use payload::Payload;
pub use state::{HistoryId, HistoryKind, HistoryNode, StateId, StateNode};
pub use transition::{EventPattern, TransitionDef};
