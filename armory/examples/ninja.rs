//! Warriors and their weapons, picked by where they are injected.
//!
//! Run with `RUST_LOG=armory_kernel=debug` to see the kernel at work.

use armory::prelude::*;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

// === Weapons ===

trait Weapon: Send + Sync {
    fn hit(&self) -> &'static str;
}

struct Katana;

impl Weapon for Katana {
    fn hit(&self) -> &'static str {
        "cut!"
    }
}

struct Shuriken;

impl Weapon for Shuriken {
    fn hit(&self) -> &'static str {
        "hit!"
    }
}

type SharedWeapon = Arc<dyn Weapon>;

// === Warriors ===

struct Warrior {
    title: &'static str,
    weapon: Arc<SharedWeapon>,
}

impl Warrior {
    fn fight(&self) -> String {
        format!("{} says {}", self.title, self.weapon.hit())
    }
}

fn warrior(title: &'static str) -> Constructor {
    Constructor::of::<Warrior>(move |args| {
        Ok(Warrior {
            title,
            weapon: args.get(0)?,
        })
    })
}

fn weapons(kernel: &Kernel) {
    kernel
        .bind("IWeapon")
        .to_constant_value::<SharedWeapon>(Arc::new(Shuriken))
        .when_any_ancestor_is("INinja");
    kernel
        .bind("IWeapon")
        .to_constant_value::<SharedWeapon>(Arc::new(Katana))
        .when_no_ancestor_is("INinja");
}

fn warriors(kernel: &Kernel) {
    kernel.bind("INinja").to(warrior("ninja"));
    kernel.bind("ISamurai").to(warrior("samurai")).in_singleton_scope();
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let kernel = Kernel::new();
    kernel.annotate::<Warrior>(vec![ParamSpec::new("IWeapon")])?;
    let modules: [&dyn KernelModule; 2] = [&weapons, &warriors];
    kernel.load(&modules);

    kernel.apply_middleware([middleware(|args, next| {
        info!(request = %args, "Resolving");
        next(args)
    })]);

    let ninja: Arc<Warrior> = kernel.get("INinja")?;
    let samurai: Arc<Warrior> = kernel.get("ISamurai")?;
    println!("{}", ninja.fight());
    println!("{}", samurai.fight());

    if let Err(err) = kernel.get::<Warrior>("IRonin") {
        println!("{err}");
    }
    Ok(())
}
