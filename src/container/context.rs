//! Resolver context for dependency injection.

use futures::future::BoxFuture;

use crate::container::Container;
use crate::error::DiResult;
use crate::internal::{drive, ResolutionStack};
use crate::invoker::Callable;
use crate::key::Key;
use crate::parameters::{Instance, Parameters};
use crate::traits::ResolverCore;

/// Context passed to factories for resolving their own dependencies.
///
/// It carries the resolution path of the value being built, so dependencies
/// resolved through it take part in cycle detection and see contextual
/// bindings registered for the value's key.
///
/// # Examples
///
/// ```
/// use ferrous_container::{Concrete, Container, DiError, Key};
///
/// struct Engine;
/// struct Spark;
///
/// let container = Container::new();
/// container.bind("engine", Concrete::factory(|ctx, _| {
///     assert_eq!(ctx.consumer(), Some(&Key::named("engine")));
///     ctx.make("spark")?;
///     Ok(Engine)
/// }));
/// container.bind("spark", Concrete::factory(|ctx, _| {
///     ctx.make("engine")?;
///     Ok(Spark)
/// }));
///
/// assert!(matches!(container.make("engine"), Err(DiError::CircularDependency(_))));
/// ```
#[derive(Clone)]
pub struct ResolverContext {
    container: Container,
    stack: ResolutionStack,
}

impl ResolverContext {
    pub(crate) fn new(container: Container, stack: ResolutionStack) -> Self {
        Self { container, stack }
    }

    /// The container this context resolves against.
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// The key whose value is being built, if any.
    pub fn consumer(&self) -> Option<&Key> {
        self.stack.last()
    }

    /// Keys under construction, outermost first.
    pub fn path(&self) -> &[Key] {
        self.stack.keys()
    }

    pub fn make(&self, key: impl Into<Key>) -> DiResult<Instance> {
        self.make_with(key, Parameters::new())
    }

    pub fn make_with(&self, key: impl Into<Key>, params: Parameters) -> DiResult<Instance> {
        drive(self.make_async(key, params))
    }

    /// Awaitable resolution on this context's path.
    pub fn make_async(
        &self,
        key: impl Into<Key>,
        params: Parameters,
    ) -> BoxFuture<'static, DiResult<Instance>> {
        self.container.resolve_in(self.stack.clone(), key.into(), params)
    }

    /// Invokes `callable` with arguments resolved on this context's path.
    pub fn call<R: Send + 'static>(&self, callable: &Callable<R>, params: Parameters) -> DiResult<R> {
        drive(self.container.call_in(self.stack.clone(), callable, params))
    }
}

impl ResolverCore for ResolverContext {
    fn resolve_any(&self, key: &Key, params: Parameters) -> DiResult<Instance> {
        self.make_with(key, params)
    }

    fn container(&self) -> &Container {
        &self.container
    }
}

impl std::fmt::Debug for ResolverContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverContext")
            .field("path", &self.stack.keys())
            .finish()
    }
}
