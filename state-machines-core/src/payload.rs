//! Type-erased positional/keyword payload passed from `send()` through to callbacks.
//!
//! The source language can destructure an arbitrary `*args, **kwargs` call into a
//! callee's own parameter list at runtime. Rust has no such reflection, so instead
//! every callback sees the same [`Payload`] and reads out only the slots it cares
//! about — the "superset of keyword arguments" becomes "superset of named slots on a
//! shared struct" (see `SignatureAdapter` in SPEC_FULL.md §4.3).

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// A single positional or keyword value attached to a `send()` call.
pub type Value = Arc<dyn Any + Send + Sync>;

/// The positional and keyword arguments a caller passed to `send()`.
#[derive(Clone, Default)]
pub struct Payload {
    positional: Vec<Value>,
    keyword: HashMap<String, Value>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arg(mut self, value: impl Any + Send + Sync) -> Self {
        self.positional.push(Arc::new(value));
        self
    }

    pub fn with_kwarg(mut self, name: impl Into<String>, value: impl Any + Send + Sync) -> Self {
        self.keyword.insert(name.into(), Arc::new(value));
        self
    }

    pub fn arg<T: 'static>(&self, index: usize) -> Option<&T> {
        self.positional.get(index).and_then(|v| v.downcast_ref())
    }

    pub fn kwarg<T: 'static>(&self, name: &str) -> Option<&T> {
        self.keyword.get(name).and_then(|v| v.downcast_ref())
    }

    pub fn arg_count(&self) -> usize {
        self.positional.len()
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Payload")
            .field("positional", &self.positional.len())
            .field("keyword", &self.keyword.keys().collect::<Vec<_>>())
            .finish()
    }
}
