//! Calling arbitrary callables with resolved arguments.
//!
//! A [`Callable`] declares its parameters the same way a recipe does. The
//! container resolves them with the same rules (name override, contextual
//! binding, recursive resolution, optional fallback, default) and then
//! invokes the body.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::container::Container;
use crate::error::DiResult;
use crate::internal::{drive, ResolutionStack};
use crate::key::Key;
use crate::parameters::{Arguments, Param, Parameters};

/// Argument slot holding the receiver of a method-style callable.
const METHOD_TARGET: &str = "@target";

type SyncBody<R> = Arc<dyn Fn(Arguments) -> DiResult<R> + Send + Sync>;
type AsyncBody<R> = Arc<dyn Fn(Arguments) -> BoxFuture<'static, DiResult<R>> + Send + Sync>;

enum Body<R> {
    Sync(SyncBody<R>),
    Async(AsyncBody<R>),
}

impl<R> Clone for Body<R> {
    fn clone(&self) -> Self {
        match self {
            Body::Sync(body) => Body::Sync(body.clone()),
            Body::Async(body) => Body::Async(body.clone()),
        }
    }
}

/// A function with declared parameters, invoked through [`Container::call`].
///
/// # Examples
///
/// A console command handler returning an exit status:
///
/// ```rust
/// use ferrous_container::{Callable, Concrete, Container, Param, Parameters};
///
/// struct Mailer {
///     from: String,
/// }
///
/// let container = Container::new();
/// container.singleton(
///     ferrous_container::Key::of::<Mailer>(),
///     Concrete::factory(|_, _| Ok(Mailer { from: "ops@example.com".into() })),
/// );
///
/// let handler = Callable::new(|args| {
///     let mailer = args.get::<Mailer>("mailer")?;
///     let user = args.value::<String>("user")?;
///     Ok(if mailer.from.is_empty() || user.is_empty() { 1 } else { 0 })
/// })
/// .param(Param::of::<Mailer>("mailer"))
/// .param(Param::untyped("user"));
///
/// let status = container
///     .call(&handler, Parameters::new().with("user", "taylor".to_string()))
///     .unwrap();
/// assert_eq!(status, 0);
/// ```
pub struct Callable<R> {
    params: Vec<Param>,
    context: Option<Key>,
    body: Body<R>,
}

impl<R> Clone for Callable<R> {
    fn clone(&self) -> Self {
        Self {
            params: self.params.clone(),
            context: self.context.clone(),
            body: self.body.clone(),
        }
    }
}

impl<R: Send + 'static> Callable<R> {
    /// Callable with a synchronous body.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(Arguments) -> DiResult<R> + Send + Sync + 'static,
    {
        Self {
            params: Vec::new(),
            context: None,
            body: Body::Sync(Arc::new(body)),
        }
    }

    /// Callable with a suspend-capable body.
    pub fn new_async<F, Fut>(body: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<R>> + Send + 'static,
    {
        Self {
            params: Vec::new(),
            context: None,
            body: Body::Async(Arc::new(move |args| body(args).boxed())),
        }
    }

    /// Method-style callable on the service bound under `Key::of::<T>()`.
    ///
    /// The service is resolved first, then `body` runs with it and the
    /// remaining declared arguments.
    ///
    /// ```rust
    /// use ferrous_container::{Callable, Container, Param, Parameters};
    ///
    /// struct Greeter {
    ///     greeting: &'static str,
    /// }
    ///
    /// let container = Container::new();
    /// container.singleton_factory(|_, _| Ok(Greeter { greeting: "hello" }));
    ///
    /// let greet = Callable::method(|greeter: std::sync::Arc<Greeter>, args| {
    ///     let name = args.value::<String>("name")?;
    ///     Ok(format!("{} {}", greeter.greeting, name))
    /// })
    /// .param(Param::untyped("name"));
    ///
    /// let greeting = container
    ///     .call(&greet, Parameters::new().with("name", "world".to_string()))
    ///     .unwrap();
    /// assert_eq!(greeting, "hello world");
    /// ```
    pub fn method<T, F>(body: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(Arc<T>, Arguments) -> DiResult<R> + Send + Sync + 'static,
    {
        Self::method_on(Key::of::<T>(), body)
    }

    /// Method-style callable on the service resolved through `key`.
    pub fn method_on<T, F>(key: impl Into<Key>, body: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(Arc<T>, Arguments) -> DiResult<R> + Send + Sync + 'static,
    {
        Self::new(move |args| {
            let target = args.get::<T>(METHOD_TARGET)?;
            body(target, args)
        })
        .param(Param::key(METHOD_TARGET, key))
    }

    /// Appends a declared parameter.
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Appends several declared parameters.
    pub fn params(mut self, params: impl IntoIterator<Item = Param>) -> Self {
        self.params.extend(params);
        self
    }

    /// Resolves parameters as if building `consumer`, so contextual
    /// bindings registered for it apply.
    pub fn in_context(mut self, consumer: impl Into<Key>) -> Self {
        self.context = Some(consumer.into());
        self
    }

    pub fn parameters(&self) -> &[Param] {
        &self.params
    }

    async fn invoke(&self, args: Arguments) -> DiResult<R> {
        match &self.body {
            Body::Sync(body) => body(args),
            Body::Async(body) => body(args).await,
        }
    }
}

impl<R> std::fmt::Debug for Callable<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callable")
            .field("params", &self.params)
            .field("context", &self.context)
            .finish()
    }
}

impl Container {
    /// Resolves the callable's parameters and invokes it.
    pub fn call<R: Send + 'static>(&self, callable: &Callable<R>, params: Parameters) -> DiResult<R> {
        drive(self.call_async(callable, params))
    }

    /// Awaitable form of [`call`](Self::call).
    pub fn call_async<R: Send + 'static>(
        &self,
        callable: &Callable<R>,
        params: Parameters,
    ) -> BoxFuture<'static, DiResult<R>> {
        self.call_in(ResolutionStack::new(), callable, params)
    }

    pub(crate) fn call_in<R: Send + 'static>(
        &self,
        stack: ResolutionStack,
        callable: &Callable<R>,
        params: Parameters,
    ) -> BoxFuture<'static, DiResult<R>> {
        let container = self.clone();
        let callable = callable.clone();
        async move {
            let (frame, owner) = match &callable.context {
                Some(consumer) => {
                    let consumer = container.canonical(consumer);
                    (stack.push(&consumer)?, consumer)
                }
                None => (stack, Key::named("{callable}")),
            };
            let args = container
                .resolve_arguments(&frame, &owner, &callable.params, &params)
                .await?;
            callable.invoke(args).await
        }
        .boxed()
    }

    /// Returns a closure that performs the call later, with `params`.
    pub fn wrap<R: Send + 'static>(
        &self,
        callable: &Callable<R>,
        params: Parameters,
    ) -> impl Fn() -> DiResult<R> + Send + Sync + 'static {
        let container = self.clone();
        let callable = callable.clone();
        move || container.call(&callable, params.clone())
    }
}
