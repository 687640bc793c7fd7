//! State and history-pseudo-state definitions, addressed by arena index.
//!
//! The source represents a state tree with parent back-references held as Python
//! object attributes (`state.parent`), which is awkward in Rust without `Rc<RefCell<_>>`
//! or unsafe aliasing. Per SPEC_FULL.md §9 (REDESIGN FLAGS), this crate instead stores
//! every state in a single arena (`Vec<StateNode>`) owned by the `MachineDefinition` and
//! refers to other states only by `StateId` index — no back-pointers, no interior
//! mutability, no lifetimes threaded through the definition types.

use crate::callback::CallbackSpecList;
use crate::transition::TransitionDef;

/// Index into a `MachineDefinition`'s state arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub usize);

/// Index into a `MachineDefinition`'s history-pseudo-state arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HistoryId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    Shallow,
    Deep,
}

/// A history pseudo-state attached to a compound state.
pub struct HistoryNode {
    pub id: HistoryId,
    pub name: String,
    pub kind: HistoryKind,
    pub owner: StateId,
    /// Index, within `MachineDefinition::transitions`, of the default-target
    /// transition taken the first time the enclosing compound is entered (before
    /// any history value has been recorded).
    pub default_transition: Option<usize>,
}

/// One state in the machine's definition tree.
pub struct StateNode<M> {
    pub id: StateId,
    /// The stable string identifier supplied at definition time (distinct from the
    /// arena-indexed `id`). Used for configuration reporting and for
    /// naming-convention callback lookups (`on_enter_<key>`).
    pub key: String,
    pub name: String,
    pub value: String,
    pub parent: Option<StateId>,
    pub children: Vec<StateId>,
    pub histories: Vec<HistoryId>,
    /// Indices into `MachineDefinition::transitions` whose `source` is this state,
    /// in document order.
    pub outgoing: Vec<usize>,
    pub initial: bool,
    pub is_final: bool,
    pub is_parallel: bool,
    pub enter: CallbackSpecList<M>,
    pub exit: CallbackSpecList<M>,
    /// Resolved when this is a final child of a compound; produces the payload
    /// attached to the synthetic `done.state.<parent>` event.
    pub donedata: Option<CallbackSpecList<M>>,
}

impl<M> StateNode<M> {
    pub fn is_atomic(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_compound(&self) -> bool {
        !self.children.is_empty() && !self.is_parallel
    }
}

/// Convenience wrapper pairing a `TransitionDef` with its owning index, used by the
/// selection algorithm when it needs to walk a state's outgoing transitions.
pub struct OutgoingTransitions<'a, M> {
    pub node: &'a StateNode<M>,
    pub transitions: &'a [TransitionDef<M>],
}

impl<'a, M> OutgoingTransitions<'a, M> {
    pub fn iter(&self) -> impl Iterator<Item = &'a TransitionDef<M>> {
        self.node.outgoing.iter().map(move |&i| &self.transitions[i])
    }
}
