//! Symbolic callback resolution and dispatch.
//!
//! The source resolves callback *names* against arbitrary Python objects via
//! `getattr`/`dir` reflection (`dispatcher.py`, `signature.py`). Rust has no such
//! reflection over a caller's own types, so this module recasts the same contract
//! as two pieces (see SPEC_FULL.md §4.3/§4.4 and §9):
//!
//! - [`CallbackProvider`] is the explicit stand-in for a "lookup object": a model or
//!   listener implements it (directly, or via the [`CallbackTable`] convenience) to
//!   expose named callbacks without reflection.
//! - [`IntoCallback`]/[`IntoGuard`] are the "signature adapter": a small family of
//!   blanket trait impls let a plain closure declare only the subset of the call
//!   context it needs. Binding happens once, at registration, producing a single
//!   boxed callable — there is no per-call signature inspection.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::payload::Payload;

pub type CallbackValue = Arc<dyn Any + Send + Sync>;
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;
pub type CallbackResult = Result<CallbackValue, CallbackError>;

pub fn unit_value() -> CallbackValue {
    Arc::new(())
}

/// The context every resolved callback is invoked with.
///
/// Carries every engine-provided name the source's `EventData.extended_kwargs`
/// carries (`event`, `source`, `target`, `state`, `model`, `transition`,
/// `event_data`); a callback reads only the fields its own signature needs.
pub struct CallbackContext<'a, M> {
    pub event: &'a str,
    pub source: Option<&'a str>,
    pub target: Option<&'a str>,
    pub state: &'a str,
    pub model: &'a M,
    pub transition: Option<&'a str>,
    pub payload: &'a Payload,
}

pub type BoxedCallback<M> = Arc<dyn Fn(&CallbackContext<M>) -> CallbackResult + Send + Sync>;
pub type BoxedGuard<M> = Arc<dyn Fn(&CallbackContext<M>) -> bool + Send + Sync>;

/// Marker types selecting which [`IntoCallback`] blanket impl a closure matches.
pub struct WantsContext;
pub struct WantsContextUnit;
pub struct WantsModel;
pub struct WantsModelUnit;

/// The "signature adapter": binds a plain closure into a [`BoxedCallback`] exactly
/// once, at registration time.
pub trait IntoCallback<M, Marker> {
    fn into_callback(self) -> BoxedCallback<M>;
}

impl<M, F> IntoCallback<M, WantsContext> for F
where
    M: Send + Sync + 'static,
    F: Fn(&CallbackContext<M>) -> CallbackResult + Send + Sync + 'static,
{
    fn into_callback(self) -> BoxedCallback<M> {
        Arc::new(self)
    }
}

impl<M, F> IntoCallback<M, WantsContextUnit> for F
where
    M: Send + Sync + 'static,
    F: Fn(&CallbackContext<M>) + Send + Sync + 'static,
{
    fn into_callback(self) -> BoxedCallback<M> {
        Arc::new(move |ctx: &CallbackContext<M>| {
            self(ctx);
            Ok(unit_value())
        })
    }
}

impl<M, F> IntoCallback<M, WantsModel> for F
where
    M: Send + Sync + 'static,
    F: Fn(&M) -> CallbackResult + Send + Sync + 'static,
{
    fn into_callback(self) -> BoxedCallback<M> {
        Arc::new(move |ctx: &CallbackContext<M>| self(ctx.model))
    }
}

impl<M, F> IntoCallback<M, WantsModelUnit> for F
where
    M: Send + Sync + 'static,
    F: Fn(&M) + Send + Sync + 'static,
{
    fn into_callback(self) -> BoxedCallback<M> {
        Arc::new(move |ctx: &CallbackContext<M>| {
            self(ctx.model);
            Ok(unit_value())
        })
    }
}

pub struct GuardWantsContext;
pub struct GuardWantsModel;

pub trait IntoGuard<M, Marker> {
    fn into_guard(self) -> BoxedGuard<M>;
}

impl<M, F> IntoGuard<M, GuardWantsContext> for F
where
    M: Send + Sync + 'static,
    F: Fn(&CallbackContext<M>) -> bool + Send + Sync + 'static,
{
    fn into_guard(self) -> BoxedGuard<M> {
        Arc::new(self)
    }
}

impl<M, F> IntoGuard<M, GuardWantsModel> for F
where
    M: Send + Sync + 'static,
    F: Fn(&M) -> bool + Send + Sync + 'static,
{
    fn into_guard(self) -> BoxedGuard<M> {
        Arc::new(move |ctx: &CallbackContext<M>| self(ctx.model))
    }
}

/// A "lookup object": a model or listener exposing named callbacks/guards.
///
/// Corresponds to an `ObjectConfig` entry in the source's dispatcher. Implement
/// this directly on a domain type for zero-overhead dispatch, or build a
/// [`CallbackTable`] when names are only known at machine-construction time.
pub trait CallbackProvider<M>: Send + Sync {
    fn callback(&self, _name: &str) -> Option<BoxedCallback<M>> {
        None
    }

    fn guard(&self, _name: &str) -> Option<BoxedGuard<M>> {
        None
    }
}

/// A name-indexed table of callbacks/guards, usable as a [`CallbackProvider`].
///
/// This is the common case for listeners attached via `add_listener`, and for
/// naming-convention callbacks the [`crate::builder::MachineBuilder`] wires up on
/// the user's behalf.
#[derive(Default)]
pub struct CallbackTable<M> {
    callbacks: HashMap<String, BoxedCallback<M>>,
    guards: HashMap<String, BoxedGuard<M>>,
}

impl<M: Send + Sync + 'static> CallbackTable<M> {
    pub fn new() -> Self {
        Self {
            callbacks: HashMap::new(),
            guards: HashMap::new(),
        }
    }

    pub fn on<Marker>(mut self, name: impl Into<String>, f: impl IntoCallback<M, Marker>) -> Self {
        self.callbacks.insert(name.into(), f.into_callback());
        self
    }

    pub fn guard<Marker>(mut self, name: impl Into<String>, f: impl IntoGuard<M, Marker>) -> Self {
        self.guards.insert(name.into(), f.into_guard());
        self
    }
}

impl<M: Send + Sync> CallbackProvider<M> for CallbackTable<M> {
    fn callback(&self, name: &str) -> Option<BoxedCallback<M>> {
        self.callbacks.get(name).cloned()
    }

    fn guard(&self, name: &str) -> Option<BoxedGuard<M>> {
        self.guards.get(name).cloned()
    }
}

/// Insertion-stable priority tags, used only to order resolved callables within a
/// single callback site. See SPEC_FULL.md §3 ("CallbackRegistry entry").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CallbackPriority {
    Generic = 0,
    Inline = 10,
    /// Reserved for a decorator-style declarative surface; unused by the builder
    /// API, kept so the priority ladder matches SPEC_FULL.md exactly.
    Decorator = 20,
    Naming = 30,
    After = 40,
}

/// One entry in a [`CallbackSpecList`]: either a name to resolve against providers,
/// or an already-bound callable.
#[derive(Clone)]
pub enum CallbackSpec<M> {
    Named {
        name: String,
        /// Convention-only specs (`on_enter_<state>`, …) are allowed to resolve to
        /// nothing; anything else missing is an `AttrNotFound` error.
        is_convention: bool,
        priority: CallbackPriority,
    },
    Direct {
        callback: BoxedCallback<M>,
        priority: CallbackPriority,
    },
}

impl<M> CallbackSpec<M> {
    pub fn named(name: impl Into<String>, priority: CallbackPriority) -> Self {
        Self::Named {
            name: name.into(),
            is_convention: false,
            priority,
        }
    }

    pub fn convention(name: impl Into<String>) -> Self {
        Self::Named {
            name: name.into(),
            is_convention: true,
            priority: CallbackPriority::Naming,
        }
    }

    pub fn direct(callback: BoxedCallback<M>) -> Self {
        Self::Direct {
            callback,
            priority: CallbackPriority::Inline,
        }
    }

    fn priority(&self) -> CallbackPriority {
        match self {
            Self::Named { priority, .. } => *priority,
            Self::Direct { priority, .. } => *priority,
        }
    }

    fn is_convention(&self) -> bool {
        matches!(self, Self::Named { is_convention: true, .. })
    }
}

/// An ordered, unresolved list of callback specs attached to one callback site
/// (a state's `enter`/`exit`, or a transition's `validators`/`before`/`on`/`after`).
#[derive(Clone)]
pub struct CallbackSpecList<M> {
    items: Vec<CallbackSpec<M>>,
}

impl<M> Default for CallbackSpecList<M> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<M: Send + Sync + 'static> CallbackSpecList<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, spec: CallbackSpec<M>) -> &mut Self {
        self.items.push(spec);
        self
    }

    pub fn with(mut self, spec: CallbackSpec<M>) -> Self {
        self.push(spec);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Resolve every spec against the given providers, in priority order
    /// (`Generic < Inline < Decorator < Naming < After`, stable on ties).
    ///
    /// Unlike a single-owner lookup, a named spec is resolved against *every*
    /// provider that has a match (a listener and the model may both contribute a
    /// callback for the same name), matching the source's `_search_name`.
    pub fn resolve(&self, providers: &[Arc<dyn CallbackProvider<M>>]) -> ResolvedCallbacks<M> {
        let mut resolved: Vec<(CallbackPriority, usize, BoxedCallback<M>)> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut missing = Vec::new();

        for spec in &self.items {
            match spec {
                CallbackSpec::Direct { callback, priority } => {
                    let key = Arc::as_ptr(callback) as *const () as usize;
                    if seen.insert(key) {
                        resolved.push((*priority, resolved.len(), callback.clone()));
                    }
                }
                CallbackSpec::Named { name, priority, .. } => {
                    let mut found_any = false;
                    for (owner_idx, provider) in providers.iter().enumerate() {
                        if let Some(callback) = provider.callback(name) {
                            found_any = true;
                            let key = owner_idx * 1_000_003 + name_hash(name);
                            if seen.insert(key) {
                                resolved.push((*priority, resolved.len(), callback));
                            }
                        }
                    }
                    if !found_any && !spec.is_convention() {
                        missing.push(name.clone());
                    }
                }
            }
        }

        resolved.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        ResolvedCallbacks {
            callbacks: resolved.into_iter().map(|(_, _, c)| c).collect(),
            missing,
        }
    }
}

fn name_hash(name: &str) -> usize {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    hasher.finish() as usize
}

/// The resolved, ordered list of callables for one callback site on one
/// state/transition instance.
pub struct ResolvedCallbacks<M> {
    callbacks: Vec<BoxedCallback<M>>,
    missing: Vec<String>,
}

impl<M> ResolvedCallbacks<M> {
    /// Required (non-convention) specs that resolved to nothing.
    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Run every callback in order, short-circuiting (and rolling back, by
    /// contract of the caller) at the first error.
    pub fn call_all(&self, ctx: &CallbackContext<M>) -> Result<Vec<CallbackValue>, CallbackError> {
        self.callbacks.iter().map(|cb| cb(ctx)).collect()
    }
}
