//! Constraint evaluation.
//!
//! A constraint decides whether a binding is eligible for a request node.
//! The helpers here cover the built-in families: target metadata, parent
//! metadata, ancestor traversal, and type identity. All of them are plain
//! predicates over [`Request`] and can be combined with [`Constraint::and`].

use std::fmt;
use std::sync::Arc;

use crate::key::ServiceId;
use crate::metadata::TagValue;
use crate::request::Request;

type Predicate = Arc<dyn Fn(&Request<'_>) -> bool + Send + Sync>;

/// A predicate over a request node. The default accepts every request.
#[derive(Clone, Default)]
pub struct Constraint {
    predicate: Option<Predicate>,
}

impl Constraint {
    /// The unconstrained predicate.
    pub fn always() -> Self {
        Self { predicate: None }
    }

    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Request<'_>) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Some(Arc::new(predicate)),
        }
    }

    #[inline]
    pub fn is_unconstrained(&self) -> bool {
        self.predicate.is_none()
    }

    pub fn check(&self, request: &Request<'_>) -> bool {
        match self.predicate {
            Some(ref predicate) => predicate(request),
            None => true,
        }
    }

    /// Both constraints must hold. Short-circuits on the left side.
    pub fn and(self, other: Constraint) -> Constraint {
        match (self.predicate, other.predicate) {
            (None, None) => Constraint::always(),
            (Some(p), None) | (None, Some(p)) => Constraint { predicate: Some(p) },
            (Some(left), Some(right)) => {
                Constraint::new(move |request| left(request) && right(request))
            }
        }
    }

    /// Applies this constraint to the request's parent. A root never matches.
    pub fn on_parent(self) -> Constraint {
        Constraint::new(move |request| request.parent().is_some_and(|parent| self.check(parent)))
    }

    /// Matches when at least one ancestor satisfies this constraint.
    pub fn on_any_ancestor(self) -> Constraint {
        Constraint::new(move |request| traverse_ancestors(request, |ancestor| self.check(ancestor)))
    }

    /// Matches when no ancestor satisfies this constraint.
    pub fn on_no_ancestor(self) -> Constraint {
        Constraint::new(move |request| !traverse_ancestors(request, |ancestor| self.check(ancestor)))
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unconstrained() {
            f.write_str("Constraint(always)")
        } else {
            f.write_str("Constraint(..)")
        }
    }
}

/// Walks parent links from `request` towards the root, stopping at the
/// first ancestor that satisfies `predicate`.
///
/// The request itself is not one of its ancestors, so a root request
/// always yields `false`.
pub fn traverse_ancestors<F>(request: &Request<'_>, predicate: F) -> bool
where
    F: Fn(&Request<'_>) -> bool,
{
    request.ancestors().any(|ancestor| predicate(ancestor))
}

/// Target carries the named annotation `name`.
pub fn named_constraint(name: impl Into<String>) -> Constraint {
    let name = name.into();
    Constraint::new(move |request| request.target().is_named(&name))
}

/// Target carries custom tag `key` with exactly `value`.
pub fn tagged_constraint(key: impl Into<String>, value: impl Into<TagValue>) -> Constraint {
    let key = key.into();
    let value = value.into();
    Constraint::new(move |request| request.target().is_tagged(&key, &value))
}

/// Target is the constructor parameter called `name`.
pub fn param_name_constraint(name: impl Into<String>) -> Constraint {
    let name = name.into();
    Constraint::new(move |request| request.target().has_param_name(&name))
}

/// Request is for `id`, or, for a type identifier, its selected binding
/// constructs that type.
pub fn type_constraint(id: impl Into<ServiceId>) -> Constraint {
    let id = id.into();
    Constraint::new(move |request| {
        if request.service_id() == &id {
            return true;
        }
        match (id.as_type(), request.binding()) {
            (Some(ty), Some(binding)) => binding.implementation_type().as_ref() == Some(ty),
            _ => false,
        }
    })
}
