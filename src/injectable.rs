//! Self-constructible types: declared constructor signatures ("recipes").

use std::any::Any;
use std::sync::Arc;

use crate::error::DiResult;
use crate::key::Key;
use crate::parameters::{Arguments, Instance, Param};

/// A type the container can build without an explicit binding.
///
/// `parameters` declares the constructor signature in order; `construct`
/// receives the resolved arguments. Types that implement this trait are
/// registered with [`Container::register`](crate::Container::register) or
/// resolved directly through [`Resolver::resolve`](crate::Resolver::resolve).
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Arguments, Container, DiResult, Injectable, Param, Resolver};
/// use std::sync::Arc;
///
/// struct Spark;
///
/// impl Injectable for Spark {
///     fn construct(_: Arguments) -> DiResult<Self> {
///         Ok(Spark)
///     }
/// }
///
/// struct Engine {
///     spark: Arc<Spark>,
///     cylinders: u32,
/// }
///
/// impl Injectable for Engine {
///     fn parameters() -> Vec<Param> {
///         vec![
///             Param::of::<Spark>("spark"),
///             Param::untyped("cylinders").default_value(4u32),
///         ]
///     }
///
///     fn construct(args: Arguments) -> DiResult<Self> {
///         Ok(Engine {
///             spark: args.get("spark")?,
///             cylinders: args.value("cylinders")?,
///         })
///     }
/// }
///
/// let container = Container::new();
/// container.register::<Spark>();
/// let engine = container.resolve::<Engine>().unwrap();
/// assert_eq!(engine.cylinders, 4);
/// ```
pub trait Injectable: Any + Send + Sync + Sized {
    /// Declared constructor parameters, in order.
    fn parameters() -> Vec<Param> {
        Vec::new()
    }

    /// Builds the value from resolved arguments.
    fn construct(args: Arguments) -> DiResult<Self>;
}

pub(crate) type BuildFn = Arc<dyn Fn(Arguments) -> DiResult<Instance> + Send + Sync>;

/// Declared constructor of one key: parameters plus a build function.
///
/// Recipes are type metadata rather than bindings: they survive
/// [`Container::flush`](crate::Container::flush) and do not make
/// [`Container::bound`](crate::Container::bound) report true.
#[derive(Clone)]
pub struct Recipe {
    key: Key,
    params: Vec<Param>,
    build: BuildFn,
}

impl Recipe {
    /// Recipe from an [`Injectable`] implementation.
    pub fn of<T: Injectable>() -> Self {
        Self::new::<T, _>(T::parameters(), T::construct)
    }

    /// Recipe for a type with no dependencies, built through `Default`.
    pub fn default_of<T: Default + Any + Send + Sync>() -> Self {
        Self::new::<T, _>(Vec::new(), |_| Ok(T::default()))
    }

    /// Recipe for `T` from an explicit parameter list and constructor.
    pub fn new<T, F>(params: Vec<Param>, construct: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(Arguments) -> DiResult<T> + Send + Sync + 'static,
    {
        Self {
            key: Key::of::<T>(),
            params,
            build: Arc::new(move |args| construct(args).map(|v| Arc::new(v) as Instance)),
        }
    }

    /// Recipe registered under an arbitrary key.
    pub fn keyed<F>(key: impl Into<Key>, params: Vec<Param>, construct: F) -> Self
    where
        F: Fn(Arguments) -> DiResult<Instance> + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            params,
            build: Arc::new(construct),
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn parameters(&self) -> &[Param] {
        &self.params
    }

    pub(crate) fn build(&self, args: Arguments) -> DiResult<Instance> {
        (self.build)(args)
    }
}

impl std::fmt::Debug for Recipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recipe")
            .field("key", &self.key)
            .field("params", &self.params)
            .finish()
    }
}
