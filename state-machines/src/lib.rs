#![allow(clippy::needless_doctest_main)]
#![cfg_attr(test, allow(non_camel_case_types, non_snake_case))]

//! Hierarchical statecharts for Rust: compound, parallel, and history states,
//! guarded transitions, named callbacks, and a run-to-completion event loop, built
//! on [`state_machines_core`].
//!
//! ```
//! use std::sync::Arc;
//! use state_machines::core::{MachineBuilder, StateSpec, TransitionSpec};
//! use state_machines::{EngineConfig, StateMachine};
//!
//! struct Light;
//!
//! let def = MachineBuilder::<Light>::new()
//!     .state(StateSpec::new("red").initial())
//!     .state(StateSpec::new("green"))
//!     .transition(TransitionSpec::new("red").to("green").on_event("go"))
//!     .build(vec![])
//!     .unwrap();
//!
//! let mut machine = StateMachine::new(Arc::new(def), Light, vec![], EngineConfig::default()).unwrap();
//! machine.send("go").unwrap();
//! assert_eq!(machine.current_state(), Some("green"));
//! ```

pub mod core {
    pub use state_machines_core::*;
}

mod facade;
#[cfg(feature = "async")]
mod facade_async;

pub use facade::StateMachine;
#[cfg(feature = "async")]
pub use facade_async::AsyncStateMachine;

pub use state_machines_core::{
    AttrNotFound, CallbackContext, CallbackPriority, CallbackProvider, CallbackResult, CallbackSpec,
    CallbackSpecList, CallbackTable, CallbackValue, EngineConfig, EngineError, ErrorPolicy, GuardExpr,
    HistoryKind, HistorySpec, InvalidDefinition, MachineBuilder, MachineDefinition, MachineError, Payload,
    StateSpec, TransitionNotAllowed, TransitionSpec,
};
