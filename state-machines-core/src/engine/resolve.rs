//! Binds an immutable [`MachineDefinition`] to a concrete provider list, producing
//! the resolved callback/guard caches the engine actually invokes at runtime.
//!
//! Kept separate from `MachineDefinition` because the provider list isn't final
//! until the façade attaches its model (and it changes again on `add_listener`),
//! while the definition itself never changes — see SPEC_FULL.md §4.4.

use std::sync::Arc;

use crate::callback::{BoxedGuard, CallbackContext, CallbackProvider, ResolvedCallbacks};
use crate::definition::MachineDefinition;
use crate::errors::AttrNotFound;
use crate::guard::GuardExpr;

pub struct ResolvedState<M> {
    pub enter: ResolvedCallbacks<M>,
    pub exit: ResolvedCallbacks<M>,
    pub donedata: Option<ResolvedCallbacks<M>>,
}

pub struct ResolvedTransition<M> {
    pub guard: Option<BoxedGuard<M>>,
    pub validators: ResolvedCallbacks<M>,
    pub before: ResolvedCallbacks<M>,
    pub on: ResolvedCallbacks<M>,
    pub after: ResolvedCallbacks<M>,
}

/// The per-instance resolved callback/guard cache for one [`MachineDefinition`].
pub struct ResolvedDefinition<M> {
    pub states: Vec<ResolvedState<M>>,
    pub transitions: Vec<ResolvedTransition<M>>,
}

impl<M: Send + Sync + 'static> ResolvedDefinition<M> {
    pub fn build(
        def: &MachineDefinition<M>,
        providers: &[Arc<dyn CallbackProvider<M>>],
    ) -> Result<Self, AttrNotFound> {
        let mut states = Vec::with_capacity(def.states().len());
        for state in def.states() {
            let enter = state.enter.resolve(providers);
            if let Some(missing) = enter.missing().first() {
                return Err(AttrNotFound(missing.clone()));
            }
            let exit = state.exit.resolve(providers);
            if let Some(missing) = exit.missing().first() {
                return Err(AttrNotFound(missing.clone()));
            }
            let donedata = state.donedata.as_ref().map(|d| d.resolve(providers));
            states.push(ResolvedState { enter, exit, donedata });
        }

        let mut transitions = Vec::with_capacity(def.transitions().len());
        for transition in def.transitions() {
            let guard = match &transition.guard {
                Some(expr) => Some(compile_guard(expr, providers)?),
                None => None,
            };
            let validators = transition.validators.resolve(providers);
            if let Some(missing) = validators.missing().first() {
                return Err(AttrNotFound(missing.clone()));
            }
            let before = transition.before.resolve(providers);
            if let Some(missing) = before.missing().first() {
                return Err(AttrNotFound(missing.clone()));
            }
            let on = transition.on.resolve(providers);
            if let Some(missing) = on.missing().first() {
                return Err(AttrNotFound(missing.clone()));
            }
            let after = transition.after.resolve(providers);
            if let Some(missing) = after.missing().first() {
                return Err(AttrNotFound(missing.clone()));
            }
            transitions.push(ResolvedTransition {
                guard,
                validators,
                before,
                on,
                after,
            });
        }

        Ok(Self { states, transitions })
    }
}

/// Compiles a [`GuardExpr`] tree into a single boxed predicate by resolving each
/// leaf identifier against the provider list (first match wins) and folding
/// `and`/`or`/`not` into nested closures.
///
/// A bare single identifier returns the resolved leaf guard unchanged (no wrapping
/// closure), so a decorator-registered guard stays addressable by identity — see
/// SPEC_FULL.md §4.5/§9.
fn compile_guard<M: Send + Sync + 'static>(
    expr: &GuardExpr,
    providers: &[Arc<dyn CallbackProvider<M>>],
) -> Result<BoxedGuard<M>, AttrNotFound> {
    match expr {
        GuardExpr::Ident(name) => providers
            .iter()
            .find_map(|p| p.guard(name))
            .ok_or_else(|| AttrNotFound(name.clone())),
        GuardExpr::Not(inner) => {
            let inner = compile_guard(inner, providers)?;
            Ok(Arc::new(move |ctx: &CallbackContext<M>| !inner(ctx)))
        }
        GuardExpr::And(lhs, rhs) => {
            let lhs = compile_guard(lhs, providers)?;
            let rhs = compile_guard(rhs, providers)?;
            Ok(Arc::new(move |ctx: &CallbackContext<M>| lhs(ctx) && rhs(ctx)))
        }
        GuardExpr::Or(lhs, rhs) => {
            let lhs = compile_guard(lhs, providers)?;
            let rhs = compile_guard(rhs, providers)?;
            Ok(Arc::new(move |ctx: &CallbackContext<M>| lhs(ctx) || rhs(ctx)))
        }
    }
}
