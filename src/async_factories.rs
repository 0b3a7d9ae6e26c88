//! Async factory support for dependency injection.
//!
//! Factories that need asynchronous initialization (network handshakes,
//! connection pools, warm-up) implement [`AsyncFactory`] and are bound with
//! [`Concrete::asynchronous`](crate::Concrete::asynchronous). The container
//! awaits them in place; callbacks keep their order around the await.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};

use crate::container::ResolverContext;
use crate::error::DiResult;
use crate::parameters::{Instance, Parameters};

/// Trait for factories that create values asynchronously.
///
/// # Examples
///
/// ```
/// use ferrous_container::{AsyncFactory, Concrete, Container, DiResult, Parameters, ResolverContext};
/// use async_trait::async_trait;
///
/// struct DatabasePool {
///     url: String,
/// }
///
/// struct PoolFactory {
///     url: String,
/// }
///
/// #[async_trait]
/// impl AsyncFactory<DatabasePool> for PoolFactory {
///     async fn create(&self, _ctx: ResolverContext, _params: Parameters) -> DiResult<DatabasePool> {
///         tokio::task::yield_now().await;
///         Ok(DatabasePool { url: self.url.clone() })
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let container = Container::new();
/// container.singleton("db", Concrete::asynchronous(PoolFactory { url: "postgres://localhost".into() }));
///
/// let pool = container.make_async("db", Parameters::new()).await.unwrap();
/// assert_eq!(pool.downcast_ref::<DatabasePool>().unwrap().url, "postgres://localhost");
/// # }
/// ```
#[async_trait]
pub trait AsyncFactory<T: Send + Sync + 'static>: Send + Sync {
    /// Creates a new value.
    ///
    /// The context resolves the value's own dependencies on the same
    /// resolution path, so cycles through async factories are detected too.
    async fn create(&self, ctx: ResolverContext, params: Parameters) -> DiResult<T>;
}

/// Closures returning futures are async factories.
#[async_trait]
impl<T, F, Fut> AsyncFactory<T> for F
where
    T: Send + Sync + 'static,
    F: Fn(ResolverContext, Parameters) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = DiResult<T>> + Send,
{
    async fn create(&self, ctx: ResolverContext, params: Parameters) -> DiResult<T> {
        self(ctx, params).await
    }
}

pub(crate) type AsyncFactoryFn =
    Arc<dyn Fn(ResolverContext, Parameters) -> BoxFuture<'static, DiResult<Instance>> + Send + Sync>;

/// Erases an [`AsyncFactory`] into the stored factory form.
pub(crate) fn erase<T, A>(factory: A) -> AsyncFactoryFn
where
    T: Send + Sync + 'static,
    A: AsyncFactory<T> + 'static,
{
    let factory = Arc::new(factory);
    Arc::new(move |ctx, params| {
        let factory = factory.clone();
        async move {
            let value = factory.create(ctx, params).await?;
            Ok(Arc::new(value) as Instance)
        }
        .boxed()
    })
}

/// Macro for creating async factories from async blocks.
///
/// # Examples
///
/// ```
/// use ferrous_container::{async_factory, Concrete, Container};
///
/// let container = Container::new();
/// container.bind("greeting", Concrete::asynchronous(async_factory!(|_ctx, _params| async {
///     Ok("hello".to_string())
/// })));
/// ```
#[macro_export]
macro_rules! async_factory {
    (|$ctx:ident, $params:ident| async $body:block) => {
        move |$ctx: $crate::ResolverContext, $params: $crate::Parameters| async move {
            let created: $crate::DiResult<_> = $body;
            created
        }
    };
}
