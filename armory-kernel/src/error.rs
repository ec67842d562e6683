//! Error types for kernel operations.
//!
//! Every resolution failure aborts the whole top-level `get` call and
//! carries enough context (identifier, target, ancestor chain) to find the
//! offending binding configuration.

use std::fmt;

use armory_support::rendering::{render_chain, render_list};

use crate::binding::BindingSummary;
use crate::key::{ServiceId, TypeKey};
use crate::metadata::Target;

/// Main error type for all kernel operations.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// No binding is eligible for the request.
    #[error("{}", .0)]
    NoMatchingBindingFound(NoMatchingBindingError),

    /// More than one binding is eligible for the request.
    #[error("{}", .0)]
    AmbiguousMatch(AmbiguousMatchError),

    /// The identifier already appears among the request's ancestors.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// A concrete type was bound but its constructor was never annotated.
    #[error("{}", .0)]
    MissingInjectableAnnotation(MissingAnnotationError),

    /// The annotation layer saw the same type annotated twice.
    #[error("Annotation already declared for {type_key}\n  Hint: annotate each type exactly once")]
    DuplicateAnnotationDeclared { type_key: TypeKey },

    /// A resolved instance is not of the requested Rust type.
    #[error("Type mismatch resolving {service}: expected {expected}")]
    TypeMismatch {
        service: ServiceId,
        expected: &'static str,
    },

    /// A constructor asked for an argument its annotation does not declare.
    #[error(
        "Constructor of {constructor} requested argument #{index}, but only {provided} were resolved\n  Hint: check the annotated parameter list"
    )]
    MissingArgument {
        constructor: TypeKey,
        index: usize,
        provided: usize,
    },

    /// `unbind` was called for an identifier with no bindings.
    #[error("Could not unbind {0}: no bindings registered")]
    CannotUnbind(ServiceId),

    /// An auto factory outlived the kernel it resolves from.
    #[error("Kernel was dropped before the factory was invoked")]
    KernelDropped,

    /// User code failed while building an instance for `service`.
    #[error("Failed to construct {service}: {source}")]
    ConstructionFailed {
        service: ServiceId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An error raised by user code, not yet attributed to a binding.
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl KernelError {
    /// Wraps an arbitrary error raised inside a constructor, factory, or
    /// activation handler.
    pub fn custom(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        KernelError::Custom(source.into())
    }

    /// Attributes an unattributed user error to the binding being built.
    pub(crate) fn attach(self, service: &ServiceId) -> Self {
        match self {
            KernelError::Custom(source) => KernelError::ConstructionFailed {
                service: service.clone(),
                source,
            },
            other => other,
        }
    }
}

fn write_required_by(f: &mut fmt::Formatter<'_>, chain: &[ServiceId]) -> fmt::Result {
    if chain.is_empty() {
        return Ok(());
    }
    let names: Vec<String> = chain.iter().map(ToString::to_string).collect();
    write!(f, "\n  Required by: {}", render_chain(&names))
}

/// Error when no binding is eligible for a request.
#[derive(Debug)]
pub struct NoMatchingBindingError {
    /// The identifier that was requested
    pub requested: ServiceId,
    /// Target metadata of the failing request
    pub target: Target,
    /// Ancestor identifiers, root first
    pub chain: Vec<ServiceId>,
    /// Whether bindings exist but every constraint rejected the request
    pub constrained_out: bool,
    /// Registered identifiers with similar names
    pub suggestions: Vec<String>,
}

impl fmt::Display for NoMatchingBindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No matching bindings found for {}", self.requested)?;
        if !self.target.is_empty() {
            write!(f, " ({})", self.target)?;
        }
        write_required_by(f, &self.chain)?;

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:{}", render_list(&self.suggestions, 4))?;
        }

        if self.constrained_out {
            write!(f, "\n  Hint: bindings exist, but none of their constraints match this target")
        } else {
            write!(f, "\n  Hint: did you forget to call .bind({:?})?", self.requested.to_string())
        }
    }
}

/// Error when several bindings are eligible for one request.
#[derive(Debug)]
pub struct AmbiguousMatchError {
    pub requested: ServiceId,
    pub chain: Vec<ServiceId>,
    /// Eligible bindings in registration order
    pub candidates: Vec<BindingSummary>,
}

impl fmt::Display for AmbiguousMatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ambiguous match found for {}: {} bindings are eligible",
            self.requested,
            self.candidates.len()
        )?;
        write_required_by(f, &self.chain)?;
        let rendered: Vec<String> = self.candidates.iter().map(ToString::to_string).collect();
        write!(f, "{}", render_list(&rendered, 4))?;
        write!(f, "\n  Hint: add a constraint (.when_target_named(..), .when(..)) to narrow the match")
    }
}

/// Error when an identifier recurs along the request chain.
///
/// The chain starts at the root and ends with the repeated identifier.
#[derive(Debug)]
pub struct CircularDependencyError {
    pub chain: Vec<ServiceId>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.chain.iter().map(ToString::to_string).collect();
        write!(f, "Circular dependency found: {}", render_chain(&names))?;
        write!(f, "\n  Hint: break the cycle with a factory or a provider binding")
    }
}

/// Error when a bound constructor has no parameter metadata.
#[derive(Debug)]
pub struct MissingAnnotationError {
    pub type_key: TypeKey,
    /// The identifier whose binding points at the type
    pub service: ServiceId,
}

impl fmt::Display for MissingAnnotationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Missing injectable annotation for {} (bound to {})",
            self.type_key, self.service
        )?;
        write!(
            f,
            "\n  Hint: call .annotate::<{}>(..) before resolving",
            self.type_key
        )
    }
}

/// Convenient Result type for kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_matching_binding_display() {
        let err = KernelError::NoMatchingBindingFound(NoMatchingBindingError {
            requested: ServiceId::from("IKatana"),
            target: Target::default(),
            chain: vec![ServiceId::from("INinja")],
            constrained_out: false,
            suggestions: vec!["IKatanas".into()],
        });

        let msg = err.to_string();
        assert!(msg.contains("No matching bindings found for IKatana"));
        assert!(msg.contains("Required by: INinja"));
        assert!(msg.contains("- IKatanas"));
        assert!(msg.contains(".bind(\"IKatana\")"));
    }

    #[test]
    fn circular_dependency_display() {
        let err = KernelError::CircularDependency(CircularDependencyError {
            chain: vec!["A".into(), "B".into(), "C".into(), "A".into()],
        });
        assert!(err.to_string().contains("A → B → C → A"));
    }

    #[test]
    fn custom_error_is_attributed() {
        let err = KernelError::custom("sharpening failed").attach(&ServiceId::from("IKatana"));
        match err {
            KernelError::ConstructionFailed { service, source } => {
                assert_eq!(service, ServiceId::from("IKatana"));
                assert_eq!(source.to_string(), "sharpening failed");
            }
            other => panic!("Expected ConstructionFailed, got: {other:?}"),
        }
    }

    #[test]
    fn attach_keeps_kernel_errors() {
        let err = KernelError::KernelDropped.attach(&ServiceId::from("IKatana"));
        assert!(matches!(err, KernelError::KernelDropped));
    }
}
