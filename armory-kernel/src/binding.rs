//! Binding records: one registered recipe for producing an instance.
//!
//! A [`Binding`] pairs a [`ProviderKind`] payload with its scope,
//! constraint, and activation handlers. Configuration is mutable in place
//! until the first resolution that depends on it; mutating a binding while
//! other threads resolve it is not supported.

use std::any::{Any, type_name};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::constraint::Constraint;
use crate::error::{KernelError, Result};
use crate::key::{ServiceId, TypeKey};
use crate::request::Request;
use crate::resolver::Context;
use crate::scope::Scope;

/// A type-erased, shareable resolved value.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Produces the value of a factory-like binding from a resolution context.
pub type ProducerFn = Arc<dyn Fn(&Context<'_>) -> Result<Instance> + Send + Sync>;

/// Post-construction hook: receives the previous value, returns the next.
pub type ActivationFn = Arc<dyn Fn(&Context<'_>, Instance) -> Result<Instance> + Send + Sync>;

/// A callable handed out by factory and auto-factory bindings.
pub type FactoryOf<T> = Arc<dyn Fn() -> Result<Arc<T>> + Send + Sync>;

/// A value that becomes available later. The kernel never awaits it.
pub type Deferred<T> = Pin<Box<dyn Future<Output = Result<Arc<T>>> + Send>>;

/// A callable handed out by provider bindings.
pub type ProviderOf<T> = Arc<dyn Fn() -> Deferred<T> + Send + Sync>;

/// Runtime identifier of a binding, increasing in creation order.
pub type BindingId = u64;

static NEXT_BINDING_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn producer<P>(produce: P) -> ProducerFn
where
    P: Fn(&Context<'_>) -> Result<Instance> + Send + Sync + 'static,
{
    Arc::new(produce)
}

pub(crate) fn activation<H>(handler: H) -> ActivationFn
where
    H: Fn(&Context<'_>, Instance) -> Result<Instance> + Send + Sync + 'static,
{
    Arc::new(handler)
}

/// Downcasts a resolved instance to `Arc<T>`.
pub fn downcast_instance<T: Any + Send + Sync>(service: &ServiceId, instance: Instance) -> Result<Arc<T>> {
    instance.downcast::<T>().map_err(|_| KernelError::TypeMismatch {
        service: service.clone(),
        expected: type_name::<T>(),
    })
}

/// Arguments resolved for a constructor, in parameter order.
pub struct Arguments {
    owner: TypeKey,
    values: Vec<(ServiceId, Instance)>,
}

impl Arguments {
    pub fn new(owner: TypeKey) -> Self {
        Self { owner, values: Vec::new() }
    }

    pub fn push(&mut self, service: ServiceId, value: Instance) {
        self.values.push((service, value));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the argument at `index` without downcasting.
    pub fn raw(&self, index: usize) -> Result<Instance> {
        self.values
            .get(index)
            .map(|(_, value)| Arc::clone(value))
            .ok_or(KernelError::MissingArgument {
                constructor: self.owner,
                index,
                provided: self.values.len(),
            })
    }

    /// Returns the argument at `index` as `Arc<T>`.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>> {
        let value = self.raw(index)?;
        let (service, _) = &self.values[index];
        downcast_instance(service, value)
    }
}

/// A constructor function for a concrete type.
///
/// Which arguments it receives is decided by the annotation side-table,
/// not by the constructor itself.
///
/// ```
/// use armory_kernel::binding::{Arguments, Constructor};
/// use armory_kernel::key::TypeKey;
///
/// struct Katana;
///
/// let ctor = Constructor::of::<Katana>(|_| Ok(Katana));
/// assert_eq!(ctor.type_key(), TypeKey::of::<Katana>());
/// let katana = ctor.construct_as::<Katana>(&Arguments::new(ctor.type_key()));
/// assert!(katana.is_ok());
/// ```
#[derive(Clone)]
pub struct Constructor {
    type_key: TypeKey,
    construct: Arc<dyn Fn(&Arguments) -> Result<Instance> + Send + Sync>,
}

impl Constructor {
    pub fn of<T: Any + Send + Sync>(
        construct: impl Fn(&Arguments) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            type_key: TypeKey::of::<T>(),
            construct: Arc::new(move |args: &Arguments| {
                Ok(Arc::new(construct(args)?) as Instance)
            }),
        }
    }

    #[inline]
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    pub fn construct(&self, args: &Arguments) -> Result<Instance> {
        (self.construct)(args)
    }

    /// Constructs and downcasts in one step, for manual construction.
    pub fn construct_as<T: Any + Send + Sync>(&self, args: &Arguments) -> Result<Arc<T>> {
        downcast_instance(&ServiceId::Type(self.type_key), self.construct(args)?)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constructor({})", self.type_key)
    }
}

/// How a binding produces its value. Exactly one payload per record.
#[derive(Clone)]
pub enum ProviderKind {
    /// Construct the type, resolving its annotated parameters first.
    ConcreteType(Constructor),
    /// Hand out the stored value as-is.
    ConstantValue(Instance),
    /// Run the producer to obtain a factory callable.
    Factory(ProducerFn),
    /// A synthesized factory that resolves `target` on every call.
    AutoFactory { target: ServiceId, produce: ProducerFn },
    /// Like a factory, but the callable yields a [`Deferred`] value.
    Provider(ProducerFn),
    /// Hand out the constructor itself, uninvoked.
    ConstructorReference(Constructor),
}

impl ProviderKind {
    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::ConcreteType(_) => "ConcreteType",
            ProviderKind::ConstantValue(_) => "ConstantValue",
            ProviderKind::Factory(_) => "Factory",
            ProviderKind::AutoFactory { .. } => "AutoFactory",
            ProviderKind::Provider(_) => "Provider",
            ProviderKind::ConstructorReference(_) => "ConstructorReference",
        }
    }

    /// The concrete type behind the binding, when there is one.
    pub fn implementation_type(&self) -> Option<TypeKey> {
        match self {
            ProviderKind::ConcreteType(ctor) | ProviderKind::ConstructorReference(ctor) => {
                Some(ctor.type_key())
            }
            _ => None,
        }
    }
}

impl fmt::Debug for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::ConcreteType(ctor) | ProviderKind::ConstructorReference(ctor) => {
                write!(f, "{}({})", self.label(), ctor.type_key())
            }
            ProviderKind::AutoFactory { target, .. } => write!(f, "AutoFactory({target})"),
            _ => f.write_str(self.label()),
        }
    }
}

struct BindingConfig {
    scope: Scope,
    constraint: Constraint,
    activation: Vec<ActivationFn>,
}

/// One registered recipe for an identifier.
pub struct Binding {
    id: BindingId,
    service_id: ServiceId,
    kind: ProviderKind,
    config: RwLock<BindingConfig>,
    cache: OnceCell<Instance>,
}

impl Binding {
    pub fn new(service_id: ServiceId, kind: ProviderKind, scope: Scope) -> Self {
        Self {
            id: NEXT_BINDING_ID.fetch_add(1, Ordering::Relaxed),
            service_id,
            kind,
            config: RwLock::new(BindingConfig {
                scope,
                constraint: Constraint::always(),
                activation: Vec::new(),
            }),
            cache: OnceCell::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> BindingId {
        self.id
    }

    #[inline]
    pub fn service_id(&self) -> &ServiceId {
        &self.service_id
    }

    #[inline]
    pub fn kind(&self) -> &ProviderKind {
        &self.kind
    }

    pub fn scope(&self) -> Scope {
        self.config.read().scope
    }

    pub fn implementation_type(&self) -> Option<TypeKey> {
        self.kind.implementation_type()
    }

    pub fn is_constrained(&self) -> bool {
        !self.config.read().constraint.is_unconstrained()
    }

    /// Evaluates this binding's constraint against a request.
    ///
    /// The lock is released before the predicate runs.
    pub fn matches(&self, request: &Request<'_>) -> bool {
        let constraint = self.config.read().constraint.clone();
        constraint.check(request)
    }

    /// The cached singleton value, if one was constructed.
    pub fn cached(&self) -> Option<&Instance> {
        self.cache.get()
    }

    pub(crate) fn singleton_slot(&self) -> &OnceCell<Instance> {
        &self.cache
    }

    pub(crate) fn activation_handlers(&self) -> Vec<ActivationFn> {
        self.config.read().activation.clone()
    }

    pub(crate) fn set_scope(&self, scope: Scope) {
        self.config.write().scope = scope;
    }

    pub(crate) fn set_constraint(&self, constraint: Constraint) {
        self.config.write().constraint = constraint;
    }

    pub(crate) fn push_activation(&self, handler: ActivationFn) {
        self.config.write().activation.push(handler);
    }

    pub fn summary(&self) -> BindingSummary {
        let config = self.config.read();
        BindingSummary {
            id: self.id,
            service_id: self.service_id.clone(),
            kind: self.kind.label(),
            implementation: self.kind.implementation_type(),
            scope: config.scope,
            constrained: !config.constraint.is_unconstrained(),
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.config.read();
        f.debug_struct("Binding")
            .field("id", &self.id)
            .field("service_id", &self.service_id)
            .field("kind", &self.kind)
            .field("scope", &config.scope)
            .field("constrained", &!config.constraint.is_unconstrained())
            .field("activation_handlers", &config.activation.len())
            .field("cached", &self.cache.get().is_some())
            .finish()
    }
}

/// A point-in-time description of a binding, used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingSummary {
    pub id: BindingId,
    pub service_id: ServiceId,
    pub kind: &'static str,
    pub implementation: Option<TypeKey>,
    pub scope: Scope,
    pub constrained: bool,
}

impl fmt::Display for BindingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id, self.kind)?;
        if let Some(ty) = self.implementation {
            write!(f, "({ty})")?;
        }
        write!(f, " in {} scope", self.scope)?;
        if self.constrained {
            write!(f, ", constrained")?;
        }
        Ok(())
    }
}
