//! Middleware around top-level resolution.
//!
//! Middlewares wrap `Kernel::get*` calls only; dependencies resolved along
//! the way do not pass through them. The first middleware in the chain is
//! the outermost one.

use std::fmt;
use std::sync::Arc;

use crate::binding::Instance;
use crate::error::Result;
use crate::key::ServiceId;
use crate::metadata::Target;

/// What a middleware sees of a top-level request.
#[derive(Debug, Clone)]
pub struct ResolveArgs {
    pub service_id: ServiceId,
    pub target: Target,
}

impl fmt::Display for ResolveArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.target.is_empty() {
            write!(f, "{}", self.service_id)
        } else {
            write!(f, "{} ({})", self.service_id, self.target)
        }
    }
}

/// The next-inner stage of the chain; the innermost stage is the resolver.
pub type Next<'a> = &'a dyn Fn(&ResolveArgs) -> Result<Instance>;

/// Intercepts a top-level resolution.
///
/// To continue, call `next` (possibly with rewritten arguments). Not
/// calling it short-circuits the resolution with the returned value.
pub trait Middleware: Send + Sync {
    fn handle(&self, args: &ResolveArgs, next: Next<'_>) -> Result<Instance>;
}

impl<F> Middleware for F
where
    F: Fn(&ResolveArgs, Next<'_>) -> Result<Instance> + Send + Sync,
{
    fn handle(&self, args: &ResolveArgs, next: Next<'_>) -> Result<Instance> {
        self(args, next)
    }
}

/// Boxes a closure as a middleware.
///
/// ```
/// use armory_kernel::middleware::{middleware, ResolveArgs};
/// use tracing::debug;
///
/// let logger = middleware(|args: &ResolveArgs, next| {
///     let result = next(args);
///     debug!(service = %args.service_id, ok = result.is_ok(), "Resolved");
///     result
/// });
/// # let _ = logger;
/// ```
pub fn middleware<F>(handler: F) -> Arc<dyn Middleware>
where
    F: Fn(&ResolveArgs, Next<'_>) -> Result<Instance> + Send + Sync + 'static,
{
    Arc::new(handler)
}

/// Runs `chain` outermost-first, ending in `innermost`.
pub(crate) fn run(chain: &[Arc<dyn Middleware>], args: &ResolveArgs, innermost: Next<'_>) -> Result<Instance> {
    match chain.split_first() {
        None => innermost(args),
        Some((outer, rest)) => outer.handle(args, &|inner_args: &ResolveArgs| run(rest, inner_args, innermost)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn args() -> ResolveArgs {
        ResolveArgs {
            service_id: "INinja".into(),
            target: Target::default(),
        }
    }

    fn recording(label: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn Middleware> {
        let log = Arc::clone(log);
        middleware(move |args, next| {
            log.lock().push(format!("{label}:pre"));
            let result = next(args);
            log.lock().push(format!("{label}:post"));
            result
        })
    }

    #[test]
    fn empty_chain_calls_innermost() {
        let result = run(&[], &args(), &|_| Ok(Arc::new(7u8) as Instance)).unwrap();
        assert_eq!(result.downcast_ref::<u8>(), Some(&7));
    }

    #[test]
    fn first_middleware_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = vec![recording("L", &log), recording("R", &log)];

        let inner_log = Arc::clone(&log);
        let innermost = move |_: &ResolveArgs| -> Result<Instance> {
            inner_log.lock().push("resolve".to_string());
            Ok(Arc::new(()) as Instance)
        };
        run(&chain, &args(), &innermost).unwrap();

        assert_eq!(*log.lock(), ["L:pre", "R:pre", "resolve", "R:post", "L:post"]);
    }

    #[test]
    fn middleware_can_short_circuit() {
        let chain = vec![middleware(|_, _| Ok(Arc::new("cached") as Instance))];
        let result = run(&chain, &args(), &|_| panic!("resolver must not run")).unwrap();
        assert_eq!(result.downcast_ref::<&str>(), Some(&"cached"));
    }

    #[test]
    fn middleware_can_rewrite_arguments() {
        let chain = vec![middleware(|args, next| {
            let mut rewritten = args.clone();
            rewritten.service_id = "ISamurai".into();
            next(&rewritten)
        })];
        let result = run(&chain, &args(), &|args| Ok(Arc::new(args.service_id.to_string()) as Instance)).unwrap();
        assert_eq!(result.downcast_ref::<String>().map(String::as_str), Some("ISamurai"));
    }
}
