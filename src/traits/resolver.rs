//! Resolver traits for typed resolution.

use std::any::Any;
use std::sync::Arc;

use crate::container::Container;
use crate::error::DiResult;
use crate::injectable::Injectable;
use crate::key::Key;
use crate::parameters::{downcast, Instance, Parameters};

/// Core resolver trait for object-safe resolution.
///
/// Implemented by [`Container`] (resolving from an empty path) and by
/// [`ResolverContext`](crate::ResolverContext) (resolving on the path of the
/// value being built). Most code uses the typed helpers of [`Resolver`].
pub trait ResolverCore: Send + Sync {
    /// Resolves `key` with parameter overrides, type-erased.
    fn resolve_any(&self, key: &Key, params: Parameters) -> DiResult<Instance>;

    /// The container behind this resolver.
    fn container(&self) -> &Container;
}

/// Typed resolution helpers.
///
/// # Examples
///
/// ```
/// use ferrous_container::{Concrete, Container, Key, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, message: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, message: &str) -> String {
///         format!("[LOG] {}", message)
///     }
/// }
///
/// let container = Container::new();
/// container.instance("answer", Arc::new(42usize));
/// container.bind(
///     Key::of::<dyn Logger>(),
///     Concrete::trait_factory::<dyn Logger, _>(|_, _| Ok(Arc::new(ConsoleLogger))),
/// );
///
/// assert_eq!(*container.make_as::<usize>("answer").unwrap(), 42);
/// let logger = container.make_trait::<dyn Logger>().unwrap();
/// assert_eq!(logger.log("ready"), "[LOG] ready");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves `key` and downcasts the instance to `T`.
    fn make_as<T: Any + Send + Sync>(&self, key: impl Into<Key>) -> DiResult<Arc<T>> {
        let key = key.into();
        let instance = self.resolve_any(&key, Parameters::new())?;
        downcast::<T>(&key, instance)
    }

    /// Like [`make_as`](Self::make_as), with parameter overrides.
    fn make_as_with<T: Any + Send + Sync>(
        &self,
        key: impl Into<Key>,
        params: Parameters,
    ) -> DiResult<Arc<T>> {
        let key = key.into();
        let instance = self.resolve_any(&key, params)?;
        downcast::<T>(&key, instance)
    }

    /// Resolves the binding keyed by the type `T` itself.
    fn get<T: Any + Send + Sync>(&self) -> DiResult<Arc<T>> {
        self.make_as::<T>(Key::of::<T>())
    }

    /// Resolves the trait object bound under `Key::of::<T>()`.
    fn make_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.make_trait_as::<T>(Key::of::<T>())
    }

    /// Resolves a trait object bound under an arbitrary key.
    fn make_trait_as<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: impl Into<Key>,
    ) -> DiResult<Arc<T>> {
        // Trait objects are stored as Arc<Arc<dyn Trait>>.
        self.make_as::<Arc<T>>(key).map(|boxed| (*boxed).clone())
    }

    /// Builds the injectable `T`, registering its recipe on first use.
    fn resolve<T: Injectable>(&self) -> DiResult<Arc<T>> {
        let key = Key::of::<T>();
        if !self.container().has_recipe(&key) {
            self.container().register::<T>();
        }
        self.make_as::<T>(key)
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}

impl ResolverCore for Container {
    fn resolve_any(&self, key: &Key, params: Parameters) -> DiResult<Instance> {
        self.make_with(key, params)
    }

    fn container(&self) -> &Container {
        self
    }
}
