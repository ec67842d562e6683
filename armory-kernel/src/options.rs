//! Kernel-wide configuration.

use serde::{Deserialize, Serialize};

use crate::scope::Scope;

/// Options applied to every binding a kernel creates.
///
/// Deserializable from any serde source; missing fields take their
/// defaults.
///
/// ```
/// use armory_kernel::options::KernelOptions;
/// use armory_kernel::scope::Scope;
///
/// let options = KernelOptions::default();
/// assert_eq!(options.default_scope, Scope::Transient);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelOptions {
    /// Scope given to new bindings before any `in_*_scope` call.
    pub default_scope: Scope,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_empty_uses_defaults() {
        let options: KernelOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, KernelOptions::default());
    }

    #[test]
    fn deserialize_default_scope() {
        let options: KernelOptions =
            serde_json::from_str(r#"{"default_scope":"Singleton"}"#).unwrap();
        assert_eq!(options.default_scope, Scope::Singleton);
    }
}
