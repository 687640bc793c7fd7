//! Transition definitions and event-pattern matching.

use crate::callback::CallbackSpecList;
use crate::guard::GuardExpr;
use crate::state::{HistoryId, StateId};

/// An event-name pattern a transition's `events` set may contain.
///
/// Exact matches are the common case; a pattern ending in `.*` matches any event
/// sharing that dot-delimited prefix (`error.execution.*` matches
/// `error.execution.network`), and a bare prefix matches itself plus any
/// dot-extension of it (`error` matches `error` and `error.execution`), per
/// SPEC_FULL.md §3's event-matching rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPattern(pub String);

impl EventPattern {
    pub fn matches(&self, event: &str) -> bool {
        if let Some(prefix) = self.0.strip_suffix(".*") {
            return event == prefix || event.starts_with(&format!("{prefix}."));
        }
        event == self.0 || event.starts_with(&format!("{}.", self.0))
    }
}

/// One transition in the machine's definition.
pub struct TransitionDef<M> {
    pub source: StateId,
    /// `None` for an internal self-transition with no exit/entry.
    pub target: Option<StateId>,
    /// Set instead of `target` when this transition targets a history
    /// pseudo-state; the engine substitutes the recorded history value (or the
    /// history's default transition) for this at selection time.
    pub history_target: Option<HistoryId>,
    /// Empty means eventless (evaluated during internal quiescence).
    pub events: Vec<EventPattern>,
    /// Parsed guard expression, kept for identifier introspection; the compiled
    /// predicate lives in the engine's `ResolvedDefinition` cache (see
    /// `engine::resolve`), since resolution depends on the provider list that is
    /// only final once the façade attaches the model and any listeners.
    pub guard: Option<GuardExpr>,
    pub validators: CallbackSpecList<M>,
    pub before: CallbackSpecList<M>,
    pub on: CallbackSpecList<M>,
    pub after: CallbackSpecList<M>,
    pub internal: bool,
    /// Marks the synthetic entry transition of a compound/parallel state.
    pub initial: bool,
    pub weight: i32,
    pub document_order: usize,
}

impl<M> TransitionDef<M> {
    pub fn matches_event(&self, event: &str) -> bool {
        if self.events.is_empty() {
            return false;
        }
        self.events.iter().any(|p| p.matches(event))
    }

    pub fn is_eventless(&self) -> bool {
        self.events.is_empty()
    }
}
