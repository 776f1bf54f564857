use indexmap::IndexMap;
use std::collections::HashMap;

use crate::types::Value;

/// Variable bindings an expression is evaluated against.
pub trait Activation {
    fn resolve(&self, name: &str) -> Option<Value>;

    /// Whether `name` is deliberately left unknown, making every expression
    /// that depends on it evaluate to an Unknown value.
    fn is_unknown(&self, _name: &str) -> bool {
        false
    }
}

impl Activation for HashMap<String, Value> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl Activation for IndexMap<String, Value> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl<A: Activation + ?Sized> Activation for &A {
    fn resolve(&self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }

    fn is_unknown(&self, name: &str) -> bool {
        (**self).is_unknown(name)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyActivation;

impl Activation for EmptyActivation {
    fn resolve(&self, _name: &str) -> Option<Value> {
        None
    }
}

/// Looks names up in `child` first, then in `parent`.
pub struct HierarchicalActivation<'a> {
    parent: &'a dyn Activation,
    child: &'a dyn Activation,
}

impl<'a> HierarchicalActivation<'a> {
    pub fn new(parent: &'a dyn Activation, child: &'a dyn Activation) -> Self {
        HierarchicalActivation { parent, child }
    }
}

impl Activation for HierarchicalActivation<'_> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.child
            .resolve(name)
            .or_else(|| self.parent.resolve(name))
    }

    fn is_unknown(&self, name: &str) -> bool {
        self.child.is_unknown(name) || self.parent.is_unknown(name)
    }
}

/// Wraps an activation and marks some names as unknown. A pattern `a`
/// also covers the qualified names below it, like `a.b`.
pub struct PartialActivation<A> {
    inner: A,
    unknowns: Vec<String>,
}

impl<A: Activation> PartialActivation<A> {
    pub fn new(inner: A, unknowns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        PartialActivation {
            inner,
            unknowns: unknowns.into_iter().map(Into::into).collect(),
        }
    }
}

impl<A: Activation> Activation for PartialActivation<A> {
    fn resolve(&self, name: &str) -> Option<Value> {
        if self.is_unknown(name) {
            return None;
        }
        self.inner.resolve(name)
    }

    fn is_unknown(&self, name: &str) -> bool {
        self.unknowns.iter().any(|pattern| {
            name == pattern
                || name
                    .strip_prefix(pattern.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        }) || self.inner.is_unknown(name)
    }
}
