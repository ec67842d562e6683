//! Service identifiers.
//!
//! A [`ServiceId`] is the opaque key bindings are registered under. It can
//! be a plain name, a process-unique [`Symbol`], or a Rust type
//! ([`TypeKey`]).

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use armory_support::rendering::shorten_type_name;

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(1);

/// A unique identifier token.
///
/// Every call to [`Symbol::new`] yields a symbol distinct from all others,
/// even when the descriptions match.
///
/// ```
/// use armory_kernel::key::Symbol;
///
/// let a = Symbol::new("IWeapon");
/// let b = Symbol::new("IWeapon");
/// assert_ne!(a, b);
/// assert_eq!(a, a.clone());
/// ```
#[derive(Clone)]
pub struct Symbol {
    id: u64,
    description: Arc<str>,
}

impl Symbol {
    pub fn new(description: impl Into<Arc<str>>) -> Self {
        Self {
            id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed),
            description: description.into(),
        }
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({}#{})", self.description, self.id)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}

/// Identifies a Rust type by [`TypeId`], keeping its name for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl TypeKey {
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the fully qualified type name.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.type_name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shorten_type_name(self.type_name))
    }
}

/// The key a binding answers for.
///
/// # Examples
/// ```
/// use armory_kernel::key::{ServiceId, Symbol, TypeKey};
///
/// struct Katana;
///
/// let by_name = ServiceId::from("IKatana");
/// let by_type = ServiceId::of::<Katana>();
/// let by_symbol = ServiceId::from(Symbol::new("IKatana"));
///
/// assert_eq!(by_name, ServiceId::from(String::from("IKatana")));
/// assert_eq!(by_type, ServiceId::from(TypeKey::of::<Katana>()));
/// assert_ne!(by_name, by_symbol);
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum ServiceId {
    Name(Arc<str>),
    Symbol(Symbol),
    Type(TypeKey),
}

impl ServiceId {
    /// Identifier for the Rust type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        ServiceId::Type(TypeKey::of::<T>())
    }

    /// Returns the type key when this identifier names a Rust type.
    pub fn as_type(&self) -> Option<&TypeKey> {
        match self {
            ServiceId::Type(key) => Some(key),
            _ => None,
        }
    }
}

impl From<&str> for ServiceId {
    fn from(name: &str) -> Self {
        ServiceId::Name(Arc::from(name))
    }
}

impl From<String> for ServiceId {
    fn from(name: String) -> Self {
        ServiceId::Name(Arc::from(name))
    }
}

impl From<&ServiceId> for ServiceId {
    fn from(id: &ServiceId) -> Self {
        id.clone()
    }
}

impl From<Symbol> for ServiceId {
    fn from(symbol: Symbol) -> Self {
        ServiceId::Symbol(symbol)
    }
}

impl From<&Symbol> for ServiceId {
    fn from(symbol: &Symbol) -> Self {
        ServiceId::Symbol(symbol.clone())
    }
}

impl From<TypeKey> for ServiceId {
    fn from(key: TypeKey) -> Self {
        ServiceId::Type(key)
    }
}

impl fmt::Debug for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceId::Name(name) => write!(f, "ServiceId({name:?})"),
            ServiceId::Symbol(symbol) => write!(f, "ServiceId({symbol:?})"),
            ServiceId::Type(key) => write!(f, "ServiceId({key:?})"),
        }
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceId::Name(name) => f.write_str(name),
            ServiceId::Symbol(symbol) => fmt::Display::fmt(symbol, f),
            ServiceId::Type(key) => fmt::Display::fmt(key, f),
        }
    }
}
