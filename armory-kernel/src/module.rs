//! Kernel modules — groups of related bindings.
//!
//! # Examples
//! ```rust
//! use armory_kernel::prelude::*;
//!
//! struct Katana;
//!
//! let weapons = |kernel: &Kernel| {
//!     kernel.bind("IKatana").to_constant_value(Katana);
//! };
//!
//! let kernel = Kernel::new();
//! kernel.load(&[&weapons]);
//! assert!(kernel.is_bound("IKatana"));
//! ```

/// A unit of binding registrations.
///
/// Any `Fn(&Kernel)` closure is a module; implement the trait directly to
/// give a module state or a readable name.
pub trait KernelModule: Send + Sync {
    /// Registers bindings into `kernel`.
    fn load(&self, kernel: &crate::kernel::Kernel);

    /// Human-readable name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> KernelModule for F
where
    F: Fn(&crate::kernel::Kernel) + Send + Sync,
{
    fn load(&self, kernel: &crate::kernel::Kernel) {
        self(kernel)
    }
}
