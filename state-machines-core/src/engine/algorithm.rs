//! Pure, stateless pieces of the interpretation algorithm: ancestor walks, the
//! least-common-compound-ancestor / transition-domain computation, and exit/entry
//! set construction. See SPEC_FULL.md §4.7.1–§4.7.2.

use std::collections::HashMap;

use crate::definition::MachineDefinition;
use crate::ordered_set::OrderedSet;
use crate::state::{HistoryId, StateId};
use crate::transition::TransitionDef;

pub type HistoryValues = HashMap<HistoryId, OrderedSet<StateId>>;

pub fn ancestors_inclusive<M>(def: &MachineDefinition<M>, id: StateId) -> Vec<StateId> {
    let mut chain = vec![id];
    let mut cursor = def.state(id).parent;
    while let Some(parent) = cursor {
        chain.push(parent);
        cursor = def.state(parent).parent;
    }
    chain
}

pub fn is_descendant<M>(def: &MachineDefinition<M>, descendant: StateId, ancestor: StateId) -> bool {
    let mut cursor = def.state(descendant).parent;
    while let Some(parent) = cursor {
        if parent == ancestor {
            return true;
        }
        cursor = def.state(parent).parent;
    }
    false
}

pub fn is_descendant_or_eq<M>(def: &MachineDefinition<M>, descendant: StateId, ancestor: StateId) -> bool {
    descendant == ancestor || is_descendant(def, descendant, ancestor)
}

fn is_proper_domain_candidate<M>(def: &MachineDefinition<M>, id: StateId) -> bool {
    def.state(id).is_compound() || def.state(id).is_parallel || id == def.root()
}

/// Resolves a transition's declared target (or history target) into the concrete
/// state(s) entry proceeds from. A history target with no recorded value falls
/// back to the history's default transition's target (or, lacking that, the
/// owning compound's own initial child).
pub fn effective_targets<M>(
    def: &MachineDefinition<M>,
    transition: &TransitionDef<M>,
    history_values: &HistoryValues,
) -> Vec<StateId> {
    if let Some(target) = transition.target {
        return vec![target];
    }
    if let Some(history_id) = transition.history_target {
        if let Some(recorded) = history_values.get(&history_id) {
            if !recorded.is_empty() {
                return recorded.iter().copied().collect();
            }
        }
        let history = def.history(history_id);
        if let Some(default_idx) = history.default_transition {
            if let Some(target) = def.transition(default_idx).target {
                return vec![target];
            }
        }
        return vec![history.owner];
    }
    Vec::new()
}

/// The transition's domain: the smallest compound/parallel ancestor (or the
/// source itself, for a same-state internal transition) containing both the
/// source and every effective target.
pub fn transition_domain<M>(def: &MachineDefinition<M>, transition: &TransitionDef<M>, targets: &[StateId]) -> StateId {
    if transition.internal && targets.iter().all(|&t| is_descendant_or_eq(def, t, transition.source)) {
        return transition.source;
    }
    if targets.is_empty() {
        return transition.source;
    }
    for candidate in ancestors_inclusive(def, transition.source) {
        if !is_proper_domain_candidate(def, candidate) {
            continue;
        }
        let source_ok = is_descendant_or_eq(def, transition.source, candidate);
        let targets_ok = targets.iter().all(|&t| is_descendant_or_eq(def, t, candidate));
        if source_ok && targets_ok {
            return candidate;
        }
    }
    def.root()
}

/// Every state in `configuration` that lies strictly under `domain`, in
/// configuration order. Returning this in *reverse* document order (for exit
/// callback invocation) is the caller's job — see `engine::core::run_microstep`.
pub fn exit_set<M>(def: &MachineDefinition<M>, configuration: &OrderedSet<StateId>, domain: StateId) -> Vec<StateId> {
    configuration
        .iter()
        .copied()
        .filter(|&s| is_descendant(def, s, domain))
        .collect()
}

/// States to enter for this transition, in document order: ancestors from just
/// below `domain` down to each effective target, then each target's own
/// compound-initial/parallel-region expansion.
pub fn entry_set<M>(def: &MachineDefinition<M>, targets: &[StateId], domain: StateId) -> OrderedSet<StateId> {
    let mut order = OrderedSet::new();
    for &target in targets {
        add_ancestor_path(def, target, domain, &mut order);
        expand_into(def, target, &mut order);
    }
    order
}

fn add_ancestor_path<M>(def: &MachineDefinition<M>, state: StateId, domain: StateId, order: &mut OrderedSet<StateId>) {
    let mut chain = Vec::new();
    let mut cursor = Some(state);
    while let Some(s) = cursor {
        if s == domain {
            break;
        }
        chain.push(s);
        cursor = def.state(s).parent;
    }
    for s in chain.into_iter().rev() {
        order.add(s);
    }
}

fn expand_into<M>(def: &MachineDefinition<M>, state: StateId, order: &mut OrderedSet<StateId>) {
    order.add(state);
    let node = def.state(state);
    if node.is_parallel {
        for &child in &node.children {
            expand_into(def, child, order);
        }
    } else if node.is_compound() {
        let initial_child = node
            .children
            .iter()
            .find(|&&c| def.state(c).initial)
            .copied()
            .or_else(|| node.children.first().copied());
        if let Some(child) = initial_child {
            expand_into(def, child, order);
        }
    }
}

/// Selects the first enabled transition per atomic state, then discards losers of
/// any exit-set conflict (inner wins; otherwise earlier document order wins).
/// `enabled` receives each candidate's own index (for resolved-guard lookups) and
/// reports whether its event pattern and guard both pass.
pub fn select_transitions<M>(
    def: &MachineDefinition<M>,
    configuration: &OrderedSet<StateId>,
    history_values: &HistoryValues,
    mut enabled: impl FnMut(usize, &TransitionDef<M>) -> bool,
) -> Vec<usize> {
    let atomic_states: Vec<StateId> = configuration
        .iter()
        .copied()
        .filter(|&s| def.state(s).is_atomic())
        .collect();

    let mut candidates: Vec<usize> = Vec::new();
    for &state in &atomic_states {
        for ancestor in ancestors_inclusive(def, state) {
            let node = def.state(ancestor);
            let mut picked = None;
            for &t_idx in &node.outgoing {
                let transition = def.transition(t_idx);
                if enabled(t_idx, transition) {
                    picked = Some(t_idx);
                    break;
                }
            }
            if let Some(t_idx) = picked {
                candidates.push(t_idx);
                break;
            }
        }
    }

    let mut winners: Vec<usize> = Vec::new();
    'outer: for &candidate in &candidates {
        let c_def = def.transition(candidate);
        let c_targets = effective_targets(def, c_def, history_values);
        let c_domain = transition_domain(def, c_def, &c_targets);
        let c_exit: std::collections::HashSet<StateId> = exit_set(def, configuration, c_domain).into_iter().collect();

        let mut to_remove = Vec::new();
        for (i, &existing) in winners.iter().enumerate() {
            let e_def = def.transition(existing);
            let e_targets = effective_targets(def, e_def, history_values);
            let e_domain = transition_domain(def, e_def, &e_targets);
            let e_exit: std::collections::HashSet<StateId> = exit_set(def, configuration, e_domain).into_iter().collect();

            if c_exit.is_disjoint(&e_exit) {
                continue;
            }

            let candidate_wins = is_descendant(def, c_def.source, e_def.source)
                || (!is_descendant(def, e_def.source, c_def.source) && c_def.document_order < e_def.document_order);

            if candidate_wins {
                to_remove.push(i);
            } else {
                continue 'outer;
            }
        }
        for i in to_remove.into_iter().rev() {
            winners.remove(i);
        }
        winners.push(candidate);
    }

    winners
}
