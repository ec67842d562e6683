//! Construct-once coordination for singleton bindings.
//!
//! The thread that first misses a singleton cache claims the binding and
//! builds it; other threads wait for the claim to be released. Before
//! waiting, a thread follows the owner's own wait (and that owner's, and so
//! on). Reaching itself means the threads would block each other forever,
//! which is reported as a circular dependency instead.

use std::collections::HashMap;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use tracing::{trace, warn};

use crate::binding::BindingId;
use crate::error::{CircularDependencyError, KernelError, Result};
use crate::key::ServiceId;
use crate::request::Request;

#[derive(Default)]
struct GateState {
    /// Bindings under construction: builder thread and bound identifier.
    owners: HashMap<BindingId, (ThreadId, ServiceId)>,
    /// Threads blocked on a claim, and the binding they wait for.
    waiting: HashMap<ThreadId, BindingId>,
}

impl GateState {
    /// Walks owner → awaited binding → owner, starting at `owner`.
    ///
    /// Returns the identifiers passed on the way when the walk reaches `me`.
    fn wait_cycle(&self, mut owner: ThreadId, me: ThreadId) -> Option<Vec<ServiceId>> {
        let mut passed = Vec::new();
        while owner != me {
            if passed.len() > self.waiting.len() {
                return None;
            }
            let awaited = self.waiting.get(&owner)?;
            let (next, service_id) = self.owners.get(awaited)?;
            passed.push(service_id.clone());
            owner = *next;
        }
        Some(passed)
    }
}

/// Per-kernel registry of singleton constructions in progress.
#[derive(Default)]
pub(crate) struct SingletonGate {
    state: Mutex<GateState>,
    released: Condvar,
}

impl SingletonGate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Claims `binding` for construction on the current thread, waiting
    /// while another thread holds it.
    ///
    /// # Errors
    /// [`KernelError::CircularDependency`] if the current thread already
    /// holds the claim, or if waiting would close a cycle of threads that
    /// wait on each other.
    pub(crate) fn claim(&self, binding: BindingId, request: &Request<'_>) -> Result<BuildClaim<'_>> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        loop {
            let owner = state.owners.get(&binding).map(|(thread, _)| *thread);
            let Some(owner) = owner else {
                state.owners.insert(binding, (me, request.service_id().clone()));
                return Ok(BuildClaim { gate: self, binding });
            };

            if let Some(passed) = state.wait_cycle(owner, me) {
                drop(state);
                warn!(
                    service = %request.service_id(),
                    binding,
                    "Singleton construction waits on itself"
                );
                return Err(deadlock(request, passed));
            }

            trace!(binding, "Waiting for singleton under construction");
            state.waiting.insert(me, binding);
            self.released.wait(&mut state);
            state.waiting.remove(&me);
        }
    }
}

fn deadlock(request: &Request<'_>, passed: Vec<ServiceId>) -> KernelError {
    let mut chain = request.chain();
    chain.push(request.service_id().clone());
    if passed.is_empty() {
        chain.push(request.service_id().clone());
    } else {
        chain.extend(passed);
    }
    KernelError::CircularDependency(CircularDependencyError { chain })
}

/// Held while a singleton is being built; releasing it wakes the waiters.
pub(crate) struct BuildClaim<'g> {
    gate: &'g SingletonGate,
    binding: BindingId,
}

impl Drop for BuildClaim<'_> {
    fn drop(&mut self) {
        self.gate.state.lock().owners.remove(&self.binding);
        self.gate.released.notify_all();
    }
}
