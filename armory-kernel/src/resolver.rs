//! The resolver: binding selection, instantiation, and scope caching.
//!
//! One [`Resolver`] lives for exactly one top-level `get` call. It owns the
//! request-scope cache, so request-scoped instances never outlive the call
//! that created them.
//!
//! # Algorithm
//! For every request node:
//! 1. reject the node if its identifier recurs among its ancestors
//! 2. filter the identifier's bindings by their constraints
//! 3. require exactly one eligible binding
//! 4. reuse a cached instance when the scope allows it; a singleton miss
//!    first claims the binding so only one thread builds it
//! 5. otherwise instantiate (recursing into constructor parameters) and run
//!    the binding's activation handlers, then cache per scope

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::binding::{Arguments, Binding, BindingId, Constructor, Instance, ProviderKind, downcast_instance};
use crate::error::{AmbiguousMatchError, KernelError, MissingAnnotationError, NoMatchingBindingError, Result};
use crate::kernel::Kernel;
use crate::key::ServiceId;
use crate::metadata::Target;
use crate::request::Request;
use crate::scope::Scope;

/// Resolves requests for one top-level call.
pub struct Resolver<'k> {
    kernel: &'k Kernel,
    request_cache: RefCell<HashMap<BindingId, Instance>>,
}

impl<'k> Resolver<'k> {
    pub(crate) fn new(kernel: &'k Kernel) -> Self {
        Self {
            kernel,
            request_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Resolves `service_id` as a child of `parent`, or as the root when
    /// there is no parent.
    pub fn resolve(
        &self,
        service_id: ServiceId,
        target: Target,
        parent: Option<&Request<'_>>,
    ) -> Result<Instance> {
        match parent {
            Some(parent) => self.resolve_request(&parent.child(service_id, target)),
            None => self.resolve_request(&Request::root(service_id, target)),
        }
    }

    fn resolve_request(&self, request: &Request<'_>) -> Result<Instance> {
        trace!(service = %request.service_id(), depth = request.depth(), "Resolving request");

        request.ensure_acyclic()?;
        let binding = self.select_binding(request)?;
        request.select(Arc::clone(&binding));

        match binding.scope() {
            Scope::Transient => self.instantiate(request, &binding),
            Scope::Singleton => {
                if let Some(cached) = binding.cached() {
                    trace!(binding = binding.id(), "Singleton cache hit");
                    return Ok(Arc::clone(cached));
                }
                let _claim = self.kernel.singletons().claim(binding.id(), request)?;
                if let Some(cached) = binding.cached() {
                    return Ok(Arc::clone(cached));
                }
                let instance = self.instantiate(request, &binding)?;
                let _ = binding.singleton_slot().set(Arc::clone(&instance));
                Ok(instance)
            }
            Scope::Request => {
                let cached = self.request_cache.borrow().get(&binding.id()).cloned();
                if let Some(cached) = cached {
                    trace!(binding = binding.id(), "Request cache hit");
                    return Ok(cached);
                }
                let instance = self.instantiate(request, &binding)?;
                self.request_cache
                    .borrow_mut()
                    .insert(binding.id(), Arc::clone(&instance));
                Ok(instance)
            }
        }
    }

    fn select_binding(&self, request: &Request<'_>) -> Result<Arc<Binding>> {
        let registered = self.kernel.registry().read().get_all(request.service_id());
        let mut eligible: Vec<Arc<Binding>> = registered
            .iter()
            .filter(|binding| binding.matches(request))
            .cloned()
            .collect();

        match eligible.len() {
            1 => Ok(eligible.remove(0)),
            0 => {
                warn!(
                    service = %request.service_id(),
                    registered = registered.len(),
                    "No matching bindings found"
                );
                let suggestions = if registered.is_empty() {
                    self.kernel.suggestions(request.service_id())
                } else {
                    Vec::new()
                };
                Err(KernelError::NoMatchingBindingFound(NoMatchingBindingError {
                    requested: request.service_id().clone(),
                    target: request.target().clone(),
                    chain: request.chain(),
                    constrained_out: !registered.is_empty(),
                    suggestions,
                }))
            }
            count => {
                warn!(service = %request.service_id(), eligible = count, "Ambiguous match found");
                Err(KernelError::AmbiguousMatch(AmbiguousMatchError {
                    requested: request.service_id().clone(),
                    chain: request.chain(),
                    candidates: eligible.iter().map(|binding| binding.summary()).collect(),
                }))
            }
        }
    }

    fn instantiate(&self, request: &Request<'_>, binding: &Binding) -> Result<Instance> {
        let context = Context { resolver: self, request };
        let service = request.service_id();

        let instance = match binding.kind() {
            ProviderKind::ConcreteType(ctor) => self.construct(request, ctor)?,
            ProviderKind::ConstantValue(value) => Arc::clone(value),
            ProviderKind::Factory(produce)
            | ProviderKind::Provider(produce)
            | ProviderKind::AutoFactory { produce, .. } => {
                produce(&context).map_err(|err| err.attach(service))?
            }
            ProviderKind::ConstructorReference(ctor) => Arc::new(ctor.clone()) as Instance,
        };

        binding
            .activation_handlers()
            .iter()
            .try_fold(instance, |current, handler| {
                handler(&context, current).map_err(|err| err.attach(service))
            })
    }

    fn construct(&self, request: &Request<'_>, ctor: &Constructor) -> Result<Instance> {
        let type_key = ctor.type_key();
        let params = self
            .kernel
            .metadata()
            .constructor_params(&type_key)
            .ok_or_else(|| {
                KernelError::MissingInjectableAnnotation(MissingAnnotationError {
                    type_key,
                    service: request.service_id().clone(),
                })
            })?;

        let mut args = Arguments::new(type_key);
        for param in params.iter() {
            let value = self.resolve(param.service_id.clone(), param.target.clone(), Some(request))?;
            args.push(param.service_id.clone(), value);
        }

        trace!(ty = %type_key, args = args.len(), "Constructing");
        ctor.construct(&args).map_err(|err| err.attach(request.service_id()))
    }
}

/// What factories and activation handlers see of an ongoing resolution.
pub struct Context<'a> {
    resolver: &'a Resolver<'a>,
    request: &'a Request<'a>,
}

impl<'a> Context<'a> {
    pub fn kernel(&self) -> &'a Kernel {
        self.resolver.kernel
    }

    /// The request node being resolved.
    pub fn request(&self) -> &'a Request<'a> {
        self.request
    }

    /// Resolves a dependency of the current request.
    ///
    /// Unlike calling [`Kernel::get`] from inside a factory, this stays in
    /// the current resolution: cycle detection, ancestor constraints, and
    /// request-scoped caching all see the current request as the parent.
    pub fn resolve<T: Any + Send + Sync>(&self, service_id: impl Into<ServiceId>) -> Result<Arc<T>> {
        let service_id = service_id.into();
        let instance = self.resolve_with(service_id.clone(), Target::default())?;
        downcast_instance(&service_id, instance)
    }

    pub fn resolve_with(&self, service_id: impl Into<ServiceId>, target: Target) -> Result<Instance> {
        self.resolver.resolve(service_id.into(), target, Some(self.request))
    }
}
