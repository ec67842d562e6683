//! Binding registry — every binding the kernel knows, per identifier.
//!
//! Bindings for one identifier keep their registration order; that order
//! shows up in ambiguity diagnostics.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::binding::Binding;
use crate::key::ServiceId;

/// Maps identifiers to their bindings, in registration order.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    entries: HashMap<ServiceId, Vec<Arc<Binding>>>,
}

impl BindingRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, binding: Arc<Binding>) {
        debug!(
            service = %binding.service_id(),
            binding = binding.id(),
            kind = binding.kind().label(),
            "Registered binding"
        );
        self.entries
            .entry(binding.service_id().clone())
            .or_default()
            .push(binding);
    }

    /// All bindings for `service_id`. Unknown identifiers yield an empty list.
    pub fn get_all(&self, service_id: &ServiceId) -> Vec<Arc<Binding>> {
        let bindings = self.entries.get(service_id).cloned().unwrap_or_default();
        trace!(service = %service_id, count = bindings.len(), "Looked up bindings");
        bindings
    }

    pub fn has(&self, service_id: &ServiceId) -> bool {
        self.entries.get(service_id).is_some_and(|bindings| !bindings.is_empty())
    }

    /// Removes every binding for `service_id`, returning them.
    pub fn remove(&mut self, service_id: &ServiceId) -> Vec<Arc<Binding>> {
        let removed = self.entries.remove(service_id).unwrap_or_default();
        debug!(service = %service_id, removed = removed.len(), "Removed bindings");
        removed
    }

    pub fn remove_all(&mut self) {
        debug!(identifiers = self.entries.len(), "Cleared registry");
        self.entries.clear();
    }

    /// Returns the number of registered bindings.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Returns true if no bindings are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifiers with at least one binding.
    pub fn service_ids(&self) -> Vec<ServiceId> {
        self.entries
            .iter()
            .filter(|(_, bindings)| !bindings.is_empty())
            .map(|(id, _)| id.clone())
            .collect()
    }
}
