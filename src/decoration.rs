//! Extenders: transforms applied to an instance before it is cached.
//!
//! Unlike resolving callbacks, an extender's output replaces the instance,
//! so it is the place for decorators (wrapping a service in metrics, caching
//! or logging layers).

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::container::Container;
use crate::error::DiResult;
use crate::key::Key;
use crate::parameters::{downcast, Instance};

/// A decorator for values of type `T`.
///
/// # Examples
///
/// ```
/// use ferrous_container::{Concrete, Container, DiResult, Extender, Resolver, ServiceDecorator};
/// use std::sync::Arc;
///
/// struct Greeting(String);
///
/// struct Exclaim;
///
/// impl ServiceDecorator<Greeting> for Exclaim {
///     fn decorate(&self, original: Arc<Greeting>, _container: &Container) -> DiResult<Arc<Greeting>> {
///         Ok(Arc::new(Greeting(format!("{}!", original.0))))
///     }
/// }
///
/// let container = Container::new();
/// container.bind("greeting", Concrete::factory(|_, _| Ok(Greeting("hello".into()))));
/// container.extend("greeting", Extender::decorator(Exclaim)).unwrap();
///
/// assert_eq!(container.make_as::<Greeting>("greeting").unwrap().0, "hello!");
/// ```
pub trait ServiceDecorator<T: Send + Sync + 'static>: Send + Sync {
    /// Wraps, modifies or replaces the original value.
    fn decorate(&self, original: Arc<T>, container: &Container) -> DiResult<Arc<T>>;
}

type SyncFn = Arc<dyn Fn(&Key, Instance, &Container) -> DiResult<Instance> + Send + Sync>;
type AsyncFn =
    Arc<dyn Fn(Instance, Container) -> BoxFuture<'static, DiResult<Instance>> + Send + Sync>;

#[derive(Clone)]
enum ExtenderKind {
    Sync(SyncFn),
    Async(AsyncFn),
}

/// Transform registered with [`Container::extend`](crate::Container::extend).
#[derive(Clone)]
pub struct Extender(ExtenderKind);

impl Extender {
    /// Extender over the type-erased instance.
    pub fn new<F>(extender: F) -> Self
    where
        F: Fn(Instance, &Container) -> DiResult<Instance> + Send + Sync + 'static,
    {
        Extender(ExtenderKind::Sync(Arc::new(move |_, instance, container| {
            extender(instance, container)
        })))
    }

    /// Extender over `Arc<T>`. Extending a key whose value is not a `T`
    /// fails with [`DiError::TypeMismatch`](crate::DiError::TypeMismatch).
    pub fn typed<T, F>(extender: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(Arc<T>, &Container) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        Extender(ExtenderKind::Sync(Arc::new(move |key, instance, container| {
            let typed = downcast::<T>(key, instance)?;
            extender(typed, container).map(|v| v as Instance)
        })))
    }

    /// Extender over a trait object stored by `Concrete::trait_object` or an
    /// upcasting binding.
    pub fn trait_object<T, F>(extender: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>, &Container) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        Extender(ExtenderKind::Sync(Arc::new(move |key, instance, container| {
            let typed = downcast::<Arc<T>>(key, instance)?;
            let extended = extender((*typed).clone(), container)?;
            Ok(Arc::new(extended) as Instance)
        })))
    }

    /// Extender from a [`ServiceDecorator`].
    pub fn decorator<T, D>(decorator: D) -> Self
    where
        T: Any + Send + Sync,
        D: ServiceDecorator<T> + 'static,
    {
        Self::typed::<T, _>(move |original, container| decorator.decorate(original, container))
    }

    /// Extender with a suspend-capable body.
    pub fn future<F, Fut>(extender: F) -> Self
    where
        F: Fn(Instance, Container) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<Instance>> + Send + 'static,
    {
        Extender(ExtenderKind::Async(Arc::new(move |instance, container| {
            extender(instance, container).boxed()
        })))
    }

    pub(crate) async fn apply(
        &self,
        key: &Key,
        instance: Instance,
        container: &Container,
    ) -> DiResult<Instance> {
        match &self.0 {
            ExtenderKind::Sync(extender) => extender(key, instance, container),
            ExtenderKind::Async(extender) => extender(instance, container.clone()).await,
        }
    }
}

impl std::fmt::Debug for Extender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            ExtenderKind::Sync(_) => f.write_str("Extender::Sync"),
            ExtenderKind::Async(_) => f.write_str("Extender::Async"),
        }
    }
}
