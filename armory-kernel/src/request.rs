//! The in-flight resolution tree.
//!
//! Each recursive resolution step creates a fresh [`Request`] on the stack.
//! A node borrows its parent, so the ancestor chain is finite and acyclic by
//! construction and disappears when the top-level call returns. Logical
//! cycles are found by looking for the node's identifier among its
//! ancestors.

use std::fmt;
use std::sync::Arc;

use once_cell::unsync::OnceCell;
use tracing::warn;

use crate::binding::Binding;
use crate::error::{CircularDependencyError, KernelError, Result};
use crate::key::ServiceId;
use crate::metadata::Target;

/// One node of the per-call request tree.
pub struct Request<'a> {
    service_id: ServiceId,
    target: Target,
    parent: Option<&'a Request<'a>>,
    depth: usize,
    binding: OnceCell<Arc<Binding>>,
}

impl Request<'static> {
    /// Creates the root node of a top-level resolution.
    pub fn root(service_id: ServiceId, target: Target) -> Self {
        Request {
            service_id,
            target,
            parent: None,
            depth: 0,
            binding: OnceCell::new(),
        }
    }
}

impl<'a> Request<'a> {
    /// Creates a child node for one of this node's dependencies.
    pub fn child<'b>(&'b self, service_id: ServiceId, target: Target) -> Request<'b> {
        Request {
            service_id,
            target,
            parent: Some(self),
            depth: self.depth + 1,
            binding: OnceCell::new(),
        }
    }

    #[inline]
    pub fn service_id(&self) -> &ServiceId {
        &self.service_id
    }

    #[inline]
    pub fn target(&self) -> &Target {
        &self.target
    }

    #[inline]
    pub fn parent(&self) -> Option<&'a Request<'a>> {
        self.parent
    }

    /// Distance from the root; the root has depth 0.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The top-level node of the current resolution.
    pub fn root_request(&self) -> &Request<'a> {
        let mut node = self;
        while let Some(parent) = node.parent {
            node = parent;
        }
        node
    }

    /// Iterates ancestors from the parent up to the root.
    pub fn ancestors(&self) -> Ancestors<'a> {
        Ancestors { next: self.parent }
    }

    /// The binding chosen for this node, once selection has happened.
    pub fn binding(&self) -> Option<&Arc<Binding>> {
        self.binding.get()
    }

    pub(crate) fn select(&self, binding: Arc<Binding>) {
        let _ = self.binding.set(binding);
    }

    /// Ancestor identifiers, root first, excluding this node.
    pub fn chain(&self) -> Vec<ServiceId> {
        let mut chain: Vec<ServiceId> = self.ancestors().map(|a| a.service_id.clone()).collect();
        chain.reverse();
        chain
    }

    /// Fails if this node's identifier already appears among its ancestors.
    ///
    /// The reported chain runs from the root to this node, so the repeated
    /// identifier appears at both ends of the cycle section.
    pub(crate) fn ensure_acyclic(&self) -> Result<()> {
        if !self.ancestors().any(|a| a.service_id == self.service_id) {
            return Ok(());
        }

        let mut chain = self.chain();
        chain.push(self.service_id.clone());
        warn!(service = %self.service_id, depth = self.depth, "Circular dependency detected");

        Err(KernelError::CircularDependency(CircularDependencyError { chain }))
    }
}

impl fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("service_id", &self.service_id)
            .field("target", &self.target)
            .field("depth", &self.depth)
            .field("binding", &self.binding.get().map(|b| b.id()))
            .finish()
    }
}

/// Iterator over a request's ancestors, nearest first.
pub struct Ancestors<'a> {
    next: Option<&'a Request<'a>>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Request<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_has_no_ancestors() {
        let root = Request::root("INinja".into(), Target::default());
        assert!(root.is_root());
        assert_eq!(root.depth(), 0);
        assert_eq!(root.ancestors().count(), 0);
        assert!(root.chain().is_empty());
        assert!(root.ensure_acyclic().is_ok());
    }

    #[test]
    fn children_track_depth_and_root() {
        let root = Request::root("INinja".into(), Target::default());
        let weapon = root.child("IWeapon".into(), Target::default());
        let blade = weapon.child("IBlade".into(), Target::default());

        assert_eq!(blade.depth(), 2);
        assert_eq!(blade.root_request().service_id(), &ServiceId::from("INinja"));
        assert_eq!(blade.chain(), vec![ServiceId::from("INinja"), ServiceId::from("IWeapon")]);
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let root = Request::root("A".into(), Target::default());
        let again = root.child("A".into(), Target::default());
        match again.ensure_acyclic() {
            Err(KernelError::CircularDependency(err)) => {
                assert_eq!(err.chain, vec![ServiceId::from("A"), ServiceId::from("A")]);
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
    }

    #[test]
    fn three_cycle_reports_full_chain() {
        let a = Request::root("A".into(), Target::default());
        let b = a.child("B".into(), Target::default());
        let c = b.child("C".into(), Target::default());
        let back = c.child("A".into(), Target::default());

        match back.ensure_acyclic() {
            Err(KernelError::CircularDependency(err)) => {
                let names: Vec<String> = err.chain.iter().map(ToString::to_string).collect();
                assert_eq!(names, ["A", "B", "C", "A"]);
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
    }

    #[test]
    fn siblings_with_same_identifier_are_fine() {
        let root = Request::root("ISamurai".into(), Target::default());
        let first = root.child("IWeapon".into(), Target::default());
        let second = root.child("IWeapon".into(), Target::default());
        assert!(first.ensure_acyclic().is_ok());
        assert!(second.ensure_acyclic().is_ok());
    }
}
