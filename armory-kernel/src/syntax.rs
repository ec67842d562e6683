//! Binding declaration syntax.
//!
//! `kernel.bind(id)` starts a declaration; one of the `to*` methods picks
//! the provider kind, registers the binding immediately, and returns a
//! [`BindingHandle`] for chaining scope, constraint, and activation
//! configuration onto the same record.
//!
//! ```rust
//! use armory_kernel::prelude::*;
//!
//! struct Katana;
//! struct Shuriken;
//!
//! let kernel = Kernel::new();
//! kernel.annotate::<Katana>(vec![]).unwrap();
//! kernel.annotate::<Shuriken>(vec![]).unwrap();
//!
//! kernel.bind("IWeapon")
//!     .to(Constructor::of::<Katana>(|_| Ok(Katana)))
//!     .when_target_named("strong");
//! kernel.bind("IWeapon")
//!     .to(Constructor::of::<Shuriken>(|_| Ok(Shuriken)))
//!     .in_singleton_scope()
//!     .when_target_named("weak");
//!
//! let katana = kernel.get_named::<Katana>("IWeapon", "strong");
//! assert!(katana.is_ok());
//! ```

use std::any::Any;
use std::sync::Arc;

use crate::binding::{
    Binding, Constructor, FactoryOf, Instance, ProviderKind, ProviderOf, activation, producer,
};
use crate::constraint::{
    Constraint, named_constraint, param_name_constraint, tagged_constraint, type_constraint,
};
use crate::error::{KernelError, Result};
use crate::kernel::Kernel;
use crate::key::ServiceId;
use crate::metadata::TagValue;
use crate::request::Request;
use crate::resolver::Context;
use crate::scope::Scope;

/// A declaration waiting for its provider kind.
pub struct BindingTo<'k> {
    kernel: &'k Kernel,
    service_id: ServiceId,
}

impl<'k> BindingTo<'k> {
    pub(crate) fn new(kernel: &'k Kernel, service_id: ServiceId) -> Self {
        Self { kernel, service_id }
    }

    fn register(self, kind: ProviderKind) -> BindingHandle {
        let binding = Arc::new(Binding::new(
            self.service_id,
            kind,
            self.kernel.options().default_scope,
        ));
        self.kernel.registry().write().add(Arc::clone(&binding));
        BindingHandle { binding }
    }

    /// Binds to a concrete type built from its annotated constructor.
    pub fn to(self, constructor: Constructor) -> BindingHandle {
        self.register(ProviderKind::ConcreteType(constructor))
    }

    /// Binds to a fixed value, handed out as-is.
    pub fn to_constant_value<T: Any + Send + Sync>(self, value: T) -> BindingHandle {
        self.register(ProviderKind::ConstantValue(Arc::new(value)))
    }

    /// Binds to the constructor itself; consumers receive a [`Constructor`].
    pub fn to_constructor(self, constructor: Constructor) -> BindingHandle {
        self.register(ProviderKind::ConstructorReference(constructor))
    }

    /// Binds to a factory callable produced from the resolution context.
    ///
    /// The value returned by `produce` is what consumers receive, typically
    /// a [`FactoryOf<T>`].
    pub fn to_factory<F, P>(self, produce: P) -> BindingHandle
    where
        F: Any + Send + Sync,
        P: Fn(&Context<'_>) -> Result<F> + Send + Sync + 'static,
    {
        self.register(ProviderKind::Factory(producer(move |ctx| {
            produce(ctx).map(|factory| Arc::new(factory) as Instance)
        })))
    }

    /// Binds to a synthesized [`FactoryOf<T>`] that resolves `target` on
    /// every call.
    ///
    /// The factory holds a weak kernel handle; calling it after the kernel
    /// is dropped fails with [`KernelError::KernelDropped`].
    pub fn to_auto_factory<T: Any + Send + Sync>(self, target: impl Into<ServiceId>) -> BindingHandle {
        let target = target.into();
        let produce = {
            let target = target.clone();
            producer(move |ctx| {
                let kernel = ctx.kernel().downgrade();
                let target = target.clone();
                let factory: FactoryOf<T> = Arc::new(move || -> Result<Arc<T>> {
                    let kernel = kernel.upgrade().ok_or(KernelError::KernelDropped)?;
                    kernel.get::<T>(target.clone())
                });
                Ok(Arc::new(factory) as Instance)
            })
        };
        self.register(ProviderKind::AutoFactory { target, produce })
    }

    /// Binds to a [`ProviderOf<T>`]: a callable yielding a deferred value.
    pub fn to_provider<T, P>(self, produce: P) -> BindingHandle
    where
        T: Any + Send + Sync,
        P: Fn(&Context<'_>) -> Result<ProviderOf<T>> + Send + Sync + 'static,
    {
        self.register(ProviderKind::Provider(producer(move |ctx| {
            produce(ctx).map(|provider| Arc::new(provider) as Instance)
        })))
    }
}

/// A registered binding, open for further configuration.
///
/// Configuration must be complete before the first resolution that
/// depends on it.
#[derive(Debug, Clone)]
pub struct BindingHandle {
    binding: Arc<Binding>,
}

impl BindingHandle {
    pub fn binding(&self) -> &Arc<Binding> {
        &self.binding
    }

    pub fn in_singleton_scope(self) -> Self {
        self.in_scope(Scope::Singleton)
    }

    pub fn in_transient_scope(self) -> Self {
        self.in_scope(Scope::Transient)
    }

    /// One instance per top-level `get` call.
    pub fn in_request_scope(self) -> Self {
        self.in_scope(Scope::Request)
    }

    pub fn in_scope(self, scope: Scope) -> Self {
        self.binding.set_scope(scope);
        self
    }

    /// Installs `constraint`, replacing any previous one.
    pub fn with_constraint(self, constraint: Constraint) -> Self {
        self.binding.set_constraint(constraint);
        self
    }

    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(&Request<'_>) -> bool + Send + Sync + 'static,
    {
        self.with_constraint(Constraint::new(predicate))
    }

    pub fn when_target_named(self, name: impl Into<String>) -> Self {
        self.with_constraint(named_constraint(name))
    }

    pub fn when_target_tagged(self, key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.with_constraint(tagged_constraint(key, value))
    }

    /// Matches when the target is the constructor parameter called `name`.
    pub fn when_param_named(self, name: impl Into<String>) -> Self {
        self.with_constraint(param_name_constraint(name))
    }

    pub fn when_parent_named(self, name: impl Into<String>) -> Self {
        self.with_constraint(named_constraint(name).on_parent())
    }

    pub fn when_parent_tagged(self, key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.with_constraint(tagged_constraint(key, value).on_parent())
    }

    /// Matches when the parent request is for `id` (or constructs it).
    pub fn when_injected_into(self, id: impl Into<ServiceId>) -> Self {
        self.with_constraint(type_constraint(id).on_parent())
    }

    pub fn when_any_ancestor_is(self, id: impl Into<ServiceId>) -> Self {
        self.with_constraint(type_constraint(id).on_any_ancestor())
    }

    pub fn when_no_ancestor_is(self, id: impl Into<ServiceId>) -> Self {
        self.with_constraint(type_constraint(id).on_no_ancestor())
    }

    pub fn when_any_ancestor_named(self, name: impl Into<String>) -> Self {
        self.with_constraint(named_constraint(name).on_any_ancestor())
    }

    pub fn when_no_ancestor_named(self, name: impl Into<String>) -> Self {
        self.with_constraint(named_constraint(name).on_no_ancestor())
    }

    pub fn when_any_ancestor_tagged(self, key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.with_constraint(tagged_constraint(key, value).on_any_ancestor())
    }

    pub fn when_no_ancestor_tagged(self, key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.with_constraint(tagged_constraint(key, value).on_no_ancestor())
    }

    pub fn when_any_ancestor_matches<F>(self, predicate: F) -> Self
    where
        F: Fn(&Request<'_>) -> bool + Send + Sync + 'static,
    {
        self.with_constraint(Constraint::new(predicate).on_any_ancestor())
    }

    pub fn when_no_ancestor_matches<F>(self, predicate: F) -> Self
    where
        F: Fn(&Request<'_>) -> bool + Send + Sync + 'static,
    {
        self.with_constraint(Constraint::new(predicate).on_no_ancestor())
    }

    /// Appends an activation handler; handlers run in registration order.
    pub fn on_activation<H>(self, handler: H) -> Self
    where
        H: Fn(&Context<'_>, Instance) -> Result<Instance> + Send + Sync + 'static,
    {
        self.binding.push_activation(activation(handler));
        self
    }
}
