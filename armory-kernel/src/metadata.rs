//! Target metadata and the constructor annotation side-table.
//!
//! Annotations are explicit: a separate registration step records, per
//! constructor type, the ordered list of parameters it needs. The resolver
//! only ever reads this table through [`MetadataReader`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{KernelError, Result};
use crate::key::{ServiceId, TypeKey};

/// Value of a custom tag attached to an injection target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<bool> for TagValue {
    fn from(value: bool) -> Self {
        TagValue::Bool(value)
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::Int(value)
    }
}

impl From<i32> for TagValue {
    fn from(value: i32) -> Self {
        TagValue::Int(i64::from(value))
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Str(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::Str(value)
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Bool(v) => write!(f, "{v}"),
            TagValue::Int(v) => write!(f, "{v}"),
            TagValue::Str(v) => write!(f, "{v:?}"),
        }
    }
}

/// What is known about the place an instance will be injected into.
///
/// The root of a `get` call has an empty target unless the caller supplies
/// one (`get_named`, `get_tagged`, `get_with`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Target {
    pub param_name: Option<String>,
    pub named: Option<String>,
    pub tags: BTreeMap<String, TagValue>,
}

impl Target {
    pub fn with_param_name(mut self, name: impl Into<String>) -> Self {
        self.param_name = Some(name.into());
        self
    }

    pub fn with_named(mut self, name: impl Into<String>) -> Self {
        self.named = Some(name.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.named.as_deref() == Some(name)
    }

    pub fn has_param_name(&self, name: &str) -> bool {
        self.param_name.as_deref() == Some(name)
    }

    pub fn is_tagged(&self, key: &str, value: &TagValue) -> bool {
        self.tags.get(key) == Some(value)
    }

    pub fn is_empty(&self) -> bool {
        self.param_name.is_none() && self.named.is_none() && self.tags.is_empty()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref name) = self.param_name {
            parts.push(format!("param={name}"));
        }
        if let Some(ref named) = self.named {
            parts.push(format!("named={named:?}"));
        }
        for (key, value) in &self.tags {
            parts.push(format!("{key}={value}"));
        }
        f.write_str(&parts.join(", "))
    }
}

/// One annotated constructor parameter.
///
/// ```
/// use armory_kernel::metadata::{ParamSpec, TagValue};
///
/// let param = ParamSpec::new("IWeapon").param_name("katana").tagged("canThrow", false);
/// assert!(param.target.has_param_name("katana"));
/// assert!(param.target.is_tagged("canThrow", &TagValue::Bool(false)));
/// ```
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub service_id: ServiceId,
    pub target: Target,
}

impl ParamSpec {
    pub fn new(service_id: impl Into<ServiceId>) -> Self {
        Self {
            service_id: service_id.into(),
            target: Target::default(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.target = self.target.with_named(name);
        self
    }

    pub fn tagged(mut self, key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.target = self.target.with_tag(key, value);
        self
    }

    pub fn param_name(mut self, name: impl Into<String>) -> Self {
        self.target = self.target.with_param_name(name);
        self
    }
}

/// Source of constructor parameter metadata.
///
/// Returns `None` for types that were never annotated.
pub trait MetadataReader: Send + Sync {
    fn constructor_params(&self, ty: &TypeKey) -> Option<Arc<[ParamSpec]>>;
}

/// Concurrent side-table from constructor type to its parameter specs.
#[derive(Debug, Default)]
pub struct MetadataTable {
    entries: DashMap<TypeKey, Arc<[ParamSpec]>>,
}

impl MetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the constructor parameters of `T`, in order.
    ///
    /// # Errors
    /// [`KernelError::DuplicateAnnotationDeclared`] if `T` is already
    /// annotated.
    pub fn annotate<T: 'static>(&self, params: Vec<ParamSpec>) -> Result<()> {
        self.annotate_key(TypeKey::of::<T>(), params)
    }

    pub fn annotate_key(&self, type_key: TypeKey, params: Vec<ParamSpec>) -> Result<()> {
        match self.entries.entry(type_key) {
            Entry::Occupied(_) => Err(KernelError::DuplicateAnnotationDeclared { type_key }),
            Entry::Vacant(slot) => {
                debug!(ty = %type_key, params = params.len(), "Annotated constructor");
                slot.insert(params.into());
                Ok(())
            }
        }
    }

    pub fn is_injectable<T: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeKey::of::<T>())
    }
}

impl MetadataReader for MetadataTable {
    fn constructor_params(&self, ty: &TypeKey) -> Option<Arc<[ParamSpec]>> {
        self.entries.get(ty).map(|entry| Arc::clone(entry.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Warrior;
    struct WarriorWithoutInjections;

    #[test]
    fn unannotated_type_has_no_metadata() {
        let table = MetadataTable::new();
        assert!(table.constructor_params(&TypeKey::of::<WarriorWithoutInjections>()).is_none());
        assert!(!table.is_injectable::<WarriorWithoutInjections>());
    }

    #[test]
    fn annotation_keeps_parameter_order() {
        let table = MetadataTable::new();
        table
            .annotate::<Warrior>(vec![ParamSpec::new("IKatana"), ParamSpec::new("IShuriken")])
            .unwrap();

        let params = table.constructor_params(&TypeKey::of::<Warrior>()).unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].service_id, ServiceId::from("IKatana"));
        assert_eq!(params[1].service_id, ServiceId::from("IShuriken"));
        assert!(params.get(2).is_none());
    }

    #[test]
    fn annotating_twice_fails() {
        let table = MetadataTable::new();
        table.annotate::<Warrior>(vec![ParamSpec::new("IKatana")]).unwrap();
        let err = table.annotate::<Warrior>(vec![ParamSpec::new("IKatana")]).unwrap_err();
        assert!(matches!(err, KernelError::DuplicateAnnotationDeclared { .. }));
    }

    #[test]
    fn target_predicates() {
        let target = Target::default()
            .with_named("strong")
            .with_tag("canThrow", true)
            .with_param_name("katana");
        assert!(target.is_named("strong"));
        assert!(!target.is_named("weak"));
        assert!(target.is_tagged("canThrow", &TagValue::Bool(true)));
        assert!(!target.is_tagged("canThrow", &TagValue::Bool(false)));
        assert!(target.has_param_name("katana"));
        assert!(!Target::default().is_named("strong"));
    }

    #[test]
    fn target_deserializes_with_defaults() {
        let target: Target =
            serde_json::from_str(r#"{"named":"strong","tags":{"canThrow":true,"rank":3}}"#)
                .unwrap();
        assert!(target.is_named("strong"));
        assert!(target.param_name.is_none());
        assert!(target.is_tagged("rank", &TagValue::Int(3)));
    }
}
