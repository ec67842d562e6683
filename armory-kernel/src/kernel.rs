//! # The Kernel — the entry point of Armory
//!
//! A [`Kernel`] owns the binding registry, the annotation side-table, and
//! the middleware chain. Every `get*` call runs the middleware chain around
//! a fresh [`Resolver`], so request-scoped instances and the request tree
//! never outlive the call.
//!
//! # Architecture
//! ```text
//! get(id) ──> middleware L ──> middleware R ──> Resolver
//!                                                  │
//!                                     registry ◄───┤ select (constraints)
//!                                     metadata ◄───┤ constructor params
//!                                                  ▼
//!                                         recurse per parameter
//! ```
//!
//! # Examples
//! ```rust
//! use armory_kernel::prelude::*;
//! use std::sync::Arc;
//!
//! struct Katana;
//! struct Shuriken;
//! struct Ninja {
//!     katana: Arc<Katana>,
//!     shuriken: Arc<Shuriken>,
//! }
//!
//! let kernel = Kernel::new();
//! kernel.annotate::<Katana>(vec![]).unwrap();
//! kernel.annotate::<Shuriken>(vec![]).unwrap();
//! kernel
//!     .annotate::<Ninja>(vec![ParamSpec::new("IKatana"), ParamSpec::new("IShuriken")])
//!     .unwrap();
//!
//! kernel.bind("IKatana").to(Constructor::of::<Katana>(|_| Ok(Katana)));
//! kernel.bind("IShuriken").to(Constructor::of::<Shuriken>(|_| Ok(Shuriken))).in_singleton_scope();
//! kernel.bind("INinja").to(Constructor::of::<Ninja>(|args| {
//!     Ok(Ninja { katana: args.get(0)?, shuriken: args.get(1)? })
//! }));
//!
//! let first: Arc<Ninja> = kernel.get("INinja").unwrap();
//! let second: Arc<Ninja> = kernel.get("INinja").unwrap();
//! assert!(!Arc::ptr_eq(&first.katana, &second.katana));
//! assert!(Arc::ptr_eq(&first.shuriken, &second.shuriken));
//! ```

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, info, instrument};

use armory_support::rendering::suggest_similar;

use crate::binding::{Instance, downcast_instance};
use crate::error::{KernelError, Result};
use crate::key::ServiceId;
use crate::metadata::{MetadataReader, MetadataTable, ParamSpec, TagValue, Target};
use crate::middleware::{self, Middleware, ResolveArgs};
use crate::module::KernelModule;
use crate::options::KernelOptions;
use crate::registry::BindingRegistry;
use crate::resolver::Resolver;
use crate::scope::Scope;
use crate::singleton::SingletonGate;
use crate::syntax::BindingTo;

const MAX_SUGGESTIONS: usize = 3;

// ============================================================
// KernelBuilder
// ============================================================

/// Builds a [`Kernel`] with non-default options or metadata.
///
/// ```rust
/// use armory_kernel::prelude::*;
///
/// let kernel = Kernel::builder().default_scope(Scope::Singleton).build();
/// assert_eq!(kernel.options().default_scope, Scope::Singleton);
/// ```
pub struct KernelBuilder {
    options: KernelOptions,
    table: Option<Arc<MetadataTable>>,
    reader: Option<Arc<dyn MetadataReader>>,
}

impl KernelBuilder {
    fn new() -> Self {
        Self {
            options: KernelOptions::default(),
            table: None,
            reader: None,
        }
    }

    pub fn options(mut self, options: KernelOptions) -> Self {
        self.options = options;
        self
    }

    pub fn default_scope(mut self, scope: Scope) -> Self {
        self.options.default_scope = scope;
        self
    }

    /// Shares an annotation table, e.g. between several kernels.
    pub fn metadata_table(mut self, table: Arc<MetadataTable>) -> Self {
        self.reader = None;
        self.table = Some(table);
        self
    }

    /// Uses an external metadata source. [`Kernel::annotate`] is then
    /// unavailable.
    pub fn metadata_reader(mut self, reader: Arc<dyn MetadataReader>) -> Self {
        self.table = None;
        self.reader = Some(reader);
        self
    }

    pub fn build(self) -> Kernel {
        let (metadata, table): (Arc<dyn MetadataReader>, Option<Arc<MetadataTable>>) =
            match (self.reader, self.table) {
                (Some(reader), _) => (reader, None),
                (None, Some(table)) => (Arc::clone(&table) as Arc<dyn MetadataReader>, Some(table)),
                (None, None) => {
                    let table = Arc::new(MetadataTable::new());
                    (Arc::clone(&table) as Arc<dyn MetadataReader>, Some(table))
                }
            };

        info!(default_scope = %self.options.default_scope, "Kernel created");
        Kernel {
            inner: Arc::new(KernelInner {
                registry: RwLock::new(BindingRegistry::new()),
                metadata,
                table,
                middleware: RwLock::new(Vec::new()),
                singletons: SingletonGate::new(),
                options: self.options,
            }),
        }
    }
}

// ═══════════════════════════════════════════
// Kernel
// ═══════════════════════════════════════════

struct KernelInner {
    registry: RwLock<BindingRegistry>,
    metadata: Arc<dyn MetadataReader>,
    table: Option<Arc<MetadataTable>>,
    middleware: RwLock<Vec<Arc<dyn Middleware>>>,
    singletons: SingletonGate,
    options: KernelOptions,
}

/// A thread-safe dependency injection kernel.
///
/// Cloning yields another handle to the same kernel. Independent kernels
/// share nothing.
#[derive(Clone)]
pub struct Kernel {
    inner: Arc<KernelInner>,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel {
    /// Creates a kernel with default options and its own annotation table.
    pub fn new() -> Self {
        KernelBuilder::new().build()
    }

    pub fn builder() -> KernelBuilder {
        KernelBuilder::new()
    }

    pub fn options(&self) -> &KernelOptions {
        &self.inner.options
    }

    /// A handle that does not keep the kernel alive.
    pub fn downgrade(&self) -> WeakKernel {
        WeakKernel(Arc::downgrade(&self.inner))
    }

    pub(crate) fn registry(&self) -> &RwLock<BindingRegistry> {
        &self.inner.registry
    }

    pub(crate) fn metadata(&self) -> &dyn MetadataReader {
        self.inner.metadata.as_ref()
    }

    pub(crate) fn singletons(&self) -> &SingletonGate {
        &self.inner.singletons
    }

    // ── Annotations ──

    /// Records the constructor parameters of `T` in the kernel's table.
    pub fn annotate<T: 'static>(&self, params: Vec<ParamSpec>) -> Result<()> {
        match self.inner.table {
            Some(ref table) => table.annotate::<T>(params),
            None => Err(KernelError::custom(
                "kernel reads annotations from an external metadata source",
            )),
        }
    }

    // ── Registry mutation ──

    /// Starts a binding declaration for `service_id`.
    pub fn bind(&self, service_id: impl Into<ServiceId>) -> BindingTo<'_> {
        BindingTo::new(self, service_id.into())
    }

    /// Removes every binding for `service_id`, along with cached singletons.
    ///
    /// # Errors
    /// [`KernelError::CannotUnbind`] if nothing is bound to `service_id`.
    pub fn unbind(&self, service_id: impl Into<ServiceId>) -> Result<()> {
        let service_id = service_id.into();
        let removed = self.inner.registry.write().remove(&service_id);
        if removed.is_empty() {
            return Err(KernelError::CannotUnbind(service_id));
        }
        Ok(())
    }

    pub fn unbind_all(&self) {
        self.inner.registry.write().remove_all();
    }

    pub fn is_bound(&self, service_id: impl Into<ServiceId>) -> bool {
        self.inner.registry.read().has(&service_id.into())
    }

    /// Runs each module against this kernel, in order.
    pub fn load(&self, modules: &[&dyn KernelModule]) {
        for module in modules {
            debug!(module = module.name(), "Loading module");
            module.load(self);
        }
    }

    /// Appends middlewares; the first one supplied ends up outermost.
    ///
    /// Middlewares from an earlier call stay outside those added later.
    pub fn apply_middleware(&self, middlewares: impl IntoIterator<Item = Arc<dyn Middleware>>) {
        let mut chain = self.inner.middleware.write();
        let before = chain.len();
        chain.extend(middlewares);
        debug!(added = chain.len() - before, total = chain.len(), "Applied middleware");
    }

    // ── Resolution ──

    /// Resolves `service_id` and downcasts the result to `T`.
    ///
    /// ```rust,ignore
    /// let ninja: Arc<Ninja> = kernel.get("INinja")?;
    /// ```
    pub fn get<T: Any + Send + Sync>(&self, service_id: impl Into<ServiceId>) -> Result<Arc<T>> {
        self.get_with(service_id, Target::default())
    }

    /// Resolves with a named root target.
    pub fn get_named<T: Any + Send + Sync>(
        &self,
        service_id: impl Into<ServiceId>,
        name: impl Into<String>,
    ) -> Result<Arc<T>> {
        self.get_with(service_id, Target::default().with_named(name))
    }

    /// Resolves with a tagged root target.
    pub fn get_tagged<T: Any + Send + Sync>(
        &self,
        service_id: impl Into<ServiceId>,
        key: impl Into<String>,
        value: impl Into<TagValue>,
    ) -> Result<Arc<T>> {
        self.get_with(service_id, Target::default().with_tag(key, value))
    }

    pub fn get_with<T: Any + Send + Sync>(
        &self,
        service_id: impl Into<ServiceId>,
        target: Target,
    ) -> Result<Arc<T>> {
        let service_id = service_id.into();
        let instance = self.resolve_root(service_id.clone(), target)?;
        downcast_instance(&service_id, instance)
    }

    /// Resolves without downcasting.
    pub fn get_instance(&self, service_id: impl Into<ServiceId>) -> Result<Instance> {
        self.resolve_root(service_id.into(), Target::default())
    }

    #[instrument(skip_all, fields(service = %service_id), name = "kernel_get")]
    fn resolve_root(&self, service_id: ServiceId, target: Target) -> Result<Instance> {
        let chain = self.inner.middleware.read().clone();
        let args = ResolveArgs { service_id, target };
        let innermost = |args: &ResolveArgs| self.plan_and_resolve(args);
        middleware::run(&chain, &args, &innermost)
    }

    fn plan_and_resolve(&self, args: &ResolveArgs) -> Result<Instance> {
        let resolver = Resolver::new(self);
        resolver.resolve(args.service_id.clone(), args.target.clone(), None)
    }

    pub(crate) fn suggestions(&self, service_id: &ServiceId) -> Vec<String> {
        let available: Vec<String> = self
            .inner
            .registry
            .read()
            .service_ids()
            .iter()
            .map(ToString::to_string)
            .collect();
        suggest_similar(&service_id.to_string(), &available, MAX_SUGGESTIONS)
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("bindings", &self.inner.registry.read().len())
            .field("middleware", &self.inner.middleware.read().len())
            .field("options", &self.inner.options)
            .finish()
    }
}

/// A non-owning kernel handle, used by auto factories.
#[derive(Clone)]
pub struct WeakKernel(Weak<KernelInner>);

impl WeakKernel {
    pub fn upgrade(&self) -> Option<Kernel> {
        self.0.upgrade().map(|inner| Kernel { inner })
    }
}

impl fmt::Debug for WeakKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakKernel")
            .field("alive", &(self.0.strong_count() > 0))
            .finish()
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Kernel, KernelBuilder, WeakKernel};
    pub use crate::binding::{Arguments, Constructor, Deferred, FactoryOf, Instance, ProviderOf};
    pub use crate::constraint::{
        Constraint, named_constraint, param_name_constraint, tagged_constraint,
        traverse_ancestors, type_constraint,
    };
    pub use crate::error::{KernelError, Result};
    pub use crate::key::{ServiceId, Symbol, TypeKey};
    pub use crate::metadata::{MetadataReader, MetadataTable, ParamSpec, TagValue, Target};
    pub use crate::middleware::{Middleware, Next, ResolveArgs, middleware};
    pub use crate::module::KernelModule;
    pub use crate::options::KernelOptions;
    pub use crate::request::Request;
    pub use crate::resolver::Context;
    pub use crate::scope::Scope;
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
