//! Core resolution engine for Armory DI.

pub mod binding;
pub mod constraint;
pub mod error;
pub mod kernel;
pub mod key;
pub mod metadata;
pub mod middleware;
pub mod module;
pub mod options;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod scope;
mod singleton;
pub mod syntax;

pub use error::{KernelError, Result};
pub use kernel::{Kernel, prelude};
pub use key::ServiceId;
pub use scope::Scope;
