//! Instance reuse policies.
//!
//! - [`Scope::Transient`]: a new instance for every resolution
//! - [`Scope::Request`]: one instance per top-level `get` call
//! - [`Scope::Singleton`]: one instance cached on the binding record

use std::fmt;

use serde::{Deserialize, Serialize};

/// Defines how long a resolved instance is reused.
///
/// # Examples
/// ```
/// use armory_kernel::scope::Scope;
///
/// assert_eq!(Scope::default(), Scope::Transient);
/// assert_eq!(Scope::Request.to_string(), "Request");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Scope {
    /// Constructed anew on every resolution. Never cached.
    #[default]
    Transient,

    /// Cached for the duration of a single top-level `get` call.
    ///
    /// Sibling dependencies within one call that resolve to the same binding
    /// share the instance; the next top-level call starts fresh.
    Request,

    /// First successful construction is cached on the binding record and
    /// reused until the binding is unbound.
    Singleton,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Singleton => write!(f, "Singleton"),
            Scope::Request => write!(f, "Request"),
            Scope::Transient => write!(f, "Transient"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_display() {
        assert_eq!(Scope::Singleton.to_string(), "Singleton");
        assert_eq!(Scope::Request.to_string(), "Request");
        assert_eq!(Scope::Transient.to_string(), "Transient");
    }

    #[test]
    fn scope_serde_names() {
        let json = serde_json::to_string(&Scope::Request).unwrap();
        assert_eq!(json, "\"Request\"");
        let scope: Scope = serde_json::from_str("\"Singleton\"").unwrap();
        assert_eq!(scope, Scope::Singleton);
    }
}
