//! # Armory — a dependency injection kernel for Rust
//!
//! Bindings map identifiers (names, symbols, or types) to providers.
//! Constraints pick between several bindings for the same identifier
//! based on where in the dependency tree the request sits.
//!
//! ```rust
//! use armory::prelude::*;
//! use std::sync::Arc;
//!
//! struct Katana;
//!
//! let kernel = Kernel::new();
//! kernel.annotate::<Katana>(vec![]).unwrap();
//! kernel.bind("IWeapon").to(Constructor::of::<Katana>(|_| Ok(Katana)));
//!
//! let weapon: Arc<Katana> = kernel.get("IWeapon").unwrap();
//! # let _ = weapon;
//! ```

pub use armory_kernel::*;
pub use armory_support::*;
