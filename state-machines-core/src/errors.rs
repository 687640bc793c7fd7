//! Error kinds raised by machine construction and by the engine.
//!
//! Mirrors the source's `exceptions.py` hierarchy (`StateMachineError` ->
//! `InvalidDefinition` -> `AttrNotFound`/`InvalidStateValue`, plus the independent
//! `TransitionNotAllowed`), translated into a `thiserror` enum instead of an
//! exception class tree.

use thiserror::Error;

/// A structural error in a machine definition, raised at build time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidDefinition {
    #[error("machine has no initial state")]
    NoInitialState,

    #[error("compound state '{0}' has more than one child marked initial")]
    MultipleInitialStates(String),

    #[error("internal transition on '{0}' must be a self-transition")]
    InternalTransitionNotSelf(String),

    #[error("final state '{0}' may not declare outgoing transitions")]
    OutgoingFromFinal(String),

    #[error("guard expression '{0}' could not be parsed: {1}")]
    MalformedGuard(String, String),

    #[error("guard expression '{0}' references unknown identifier '{1}'")]
    UnknownGuardIdentifier(String, String),

    #[error("state '{0}' is unreachable from the initial configuration")]
    UnreachableState(String),

    #[error("non-final state '{0}' has no outgoing transition")]
    TrapState(String),

    #[error("non-final state '{0}' has no path to any final state")]
    NoPathToFinal(String),

    #[error("required callback '{0}' could not be resolved")]
    AttrNotFound(String),

    #[error("duplicate state id '{0}'")]
    DuplicateStateId(String),

    #[error("unknown state id '{0}' referenced by transition")]
    UnknownState(String),
}

/// The model's persisted state value does not correspond to any defined state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0:?} is not a valid state value")]
pub struct InvalidStateValue(pub String);

/// `send()` found no enabled transition and `allow_event_without_transition` is false.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("can't handle event '{event}' when in {{{}}}", configuration.join(", "))]
pub struct TransitionNotAllowed {
    pub event: String,
    pub configuration: Vec<String>,
}

/// A non-convention callback spec could not be resolved against any provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("did not find callback '{0}' on the model or any listener")]
pub struct AttrNotFound(pub String);

/// The top-level error type returned from `send()` and machine construction.
///
/// Generic over `E`, the error type the embedding application's own callbacks
/// return — the interpreter never inspects it, only propagates or wraps it,
/// mirroring how the source lets arbitrary Python exceptions fly through unmodified.
#[derive(Debug, Error)]
pub enum MachineError<E> {
    #[error(transparent)]
    InvalidDefinition(#[from] InvalidDefinition),

    #[error(transparent)]
    InvalidStateValue(#[from] InvalidStateValue),

    #[error(transparent)]
    TransitionNotAllowed(#[from] TransitionNotAllowed),

    #[error(transparent)]
    AttrNotFound(#[from] AttrNotFound),

    #[error("callback error: {0}")]
    Callback(E),
}

impl<E: Clone> Clone for MachineError<E> {
    fn clone(&self) -> Self {
        match self {
            Self::InvalidDefinition(e) => Self::InvalidDefinition(e.clone()),
            Self::InvalidStateValue(e) => Self::InvalidStateValue(e.clone()),
            Self::TransitionNotAllowed(e) => Self::TransitionNotAllowed(e.clone()),
            Self::AttrNotFound(e) => Self::AttrNotFound(e.clone()),
            Self::Callback(e) => Self::Callback(e.clone()),
        }
    }
}
