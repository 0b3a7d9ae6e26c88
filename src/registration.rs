//! Binding registration types.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::async_factories::{self, AsyncFactory, AsyncFactoryFn};
use crate::container::ResolverContext;
use crate::error::DiResult;
use crate::injectable::{Injectable, Recipe};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::parameters::{downcast, Instance, Parameters};

pub(crate) type FactoryFn =
    Arc<dyn Fn(&ResolverContext, &Parameters) -> DiResult<Instance> + Send + Sync>;
pub(crate) type UpcastFn = Arc<dyn Fn(&Key, Instance) -> DiResult<Instance> + Send + Sync>;

/// Serializes first construction of one shared binding.
pub(crate) type Gate = Arc<Mutex<()>>;

#[derive(Clone)]
pub(crate) enum Producer {
    Factory(FactoryFn),
    Async(AsyncFactoryFn),
    Value(Instance),
    Delegate {
        target: Key,
        upcast: Option<UpcastFn>,
    },
    Itself,
}

/// How a binding produces its instance.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Concrete, Container, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// #[derive(Default)]
/// struct StdoutLogger;
///
/// impl Logger for StdoutLogger {
///     fn log(&self, msg: &str) -> String {
///         format!("stdout: {}", msg)
///     }
/// }
///
/// let container = Container::new();
/// container.bind("greeting", Concrete::value("hello".to_string()));
/// container.bind("shout", Concrete::factory(|ctx, _| {
///     let greeting = ctx.make_as::<String>("greeting")?;
///     Ok(greeting.to_uppercase())
/// }));
/// container.singleton(
///     ferrous_container::Key::of::<dyn Logger>(),
///     Concrete::trait_object::<dyn Logger>(Arc::new(StdoutLogger)),
/// );
///
/// assert_eq!(*container.make_as::<String>("shout").unwrap(), "HELLO");
/// let logger = container.make_trait::<dyn Logger>().unwrap();
/// assert_eq!(logger.log("hi"), "stdout: hi");
/// ```
#[derive(Clone)]
pub struct Concrete {
    pub(crate) producer: Producer,
    /// Runtime type of the produced value, when known at bind time.
    pub(crate) produces: Option<Key>,
    /// Recipe to register alongside the binding.
    pub(crate) recipe: Option<Recipe>,
}

impl Concrete {
    fn from_producer(producer: Producer) -> Self {
        Self {
            producer,
            produces: None,
            recipe: None,
        }
    }

    /// Synchronous factory. Receives a context for resolving its own
    /// dependencies plus the caller's parameters.
    pub fn factory<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&ResolverContext, &Parameters) -> DiResult<T> + Send + Sync + 'static,
    {
        let erased: FactoryFn =
            Arc::new(move |ctx, params| factory(ctx, params).map(|v| Arc::new(v) as Instance));
        Self {
            producer: Producer::Factory(erased),
            produces: Some(Key::of::<T>()),
            recipe: None,
        }
    }

    /// Factory producing an already type-erased instance.
    pub fn raw<F>(factory: F) -> Self
    where
        F: Fn(&ResolverContext, &Parameters) -> DiResult<Instance> + Send + Sync + 'static,
    {
        Self::from_producer(Producer::Factory(Arc::new(factory)))
    }

    /// Factory for a trait object; stored so that
    /// [`Resolver::make_trait`](crate::Resolver::make_trait) can recover it.
    pub fn trait_factory<T, F>(factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext, &Parameters) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        Self::raw(move |ctx, params| factory(ctx, params).map(|v| Arc::new(v) as Instance))
    }

    /// Asynchronous factory, awaited during resolution.
    pub fn asynchronous<T, A>(factory: A) -> Self
    where
        T: Send + Sync + 'static,
        A: AsyncFactory<T> + 'static,
    {
        Self {
            producer: Producer::Async(async_factories::erase(factory)),
            produces: Some(Key::of::<T>()),
            recipe: None,
        }
    }

    /// Fixed value, returned as is on every resolution.
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            producer: Producer::Value(Arc::new(value)),
            produces: Some(Key::of::<T>()),
            recipe: None,
        }
    }

    /// Fixed, already shared instance.
    pub fn instance(instance: Instance) -> Self {
        Self::from_producer(Producer::Value(instance))
    }

    /// Fixed trait object.
    pub fn trait_object<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self::from_producer(Producer::Value(Arc::new(value)))
    }

    /// Delegates to another abstract, resolved with the same parameters.
    pub fn key(target: impl Into<Key>) -> Self {
        Self::from_producer(Producer::Delegate {
            target: target.into(),
            upcast: None,
        })
    }

    /// Delegates to another abstract whose value is an `I`, then converts it.
    pub fn key_as<I, T, F>(target: impl Into<Key>, upcast: F) -> Self
    where
        I: Any + Send + Sync,
        T: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<I>) -> Arc<T> + Send + Sync + 'static,
    {
        let upcast: UpcastFn = Arc::new(move |key, instance| {
            let concrete = downcast::<I>(key, instance)?;
            Ok(Arc::new(upcast(concrete)) as Instance)
        });
        Self::from_producer(Producer::Delegate {
            target: target.into(),
            upcast: Some(upcast),
        })
    }

    /// Builds the injectable type `T` through its recipe.
    pub fn class<T: Injectable>() -> Self {
        Self {
            producer: Producer::Delegate {
                target: Key::of::<T>(),
                upcast: None,
            },
            produces: None,
            recipe: Some(Recipe::of::<T>()),
        }
    }

    /// Builds the injectable `I` and exposes it as the trait object `T`.
    ///
    /// ```rust
    /// use ferrous_container::{Arguments, Concrete, Container, DiResult, Injectable, Key, Resolver};
    /// use std::sync::Arc;
    ///
    /// trait Mailer: Send + Sync {
    ///     fn transport(&self) -> &'static str;
    /// }
    ///
    /// struct SmtpMailer;
    ///
    /// impl Mailer for SmtpMailer {
    ///     fn transport(&self) -> &'static str {
    ///         "smtp"
    ///     }
    /// }
    ///
    /// impl Injectable for SmtpMailer {
    ///     fn construct(_: Arguments) -> DiResult<Self> {
    ///         Ok(SmtpMailer)
    ///     }
    /// }
    ///
    /// let container = Container::new();
    /// container.bind(
    ///     Key::of::<dyn Mailer>(),
    ///     Concrete::implementation::<SmtpMailer, dyn Mailer, _>(|m| m as Arc<dyn Mailer>),
    /// );
    /// assert_eq!(container.make_trait::<dyn Mailer>().unwrap().transport(), "smtp");
    /// ```
    pub fn implementation<I, T, F>(upcast: F) -> Self
    where
        I: Injectable,
        T: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<I>) -> Arc<T> + Send + Sync + 'static,
    {
        let mut concrete = Self::key_as::<I, T, F>(Key::of::<I>(), upcast);
        concrete.recipe = Some(Recipe::of::<I>());
        concrete
    }

    /// The abstract builds itself through its recipe.
    pub fn itself() -> Self {
        Self::from_producer(Producer::Itself)
    }

    pub(crate) fn delegate_target(&self) -> Option<&Key> {
        match &self.producer {
            Producer::Delegate { target, .. } => Some(target),
            _ => None,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match &self.producer {
            Producer::Factory(_) => "factory",
            Producer::Async(_) => "async factory",
            Producer::Value(_) => "value",
            Producer::Delegate { .. } => "delegate",
            Producer::Itself => "self",
        }
    }
}

impl std::fmt::Debug for Concrete {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Concrete")
            .field("kind", &self.kind())
            .field("target", &self.delegate_target())
            .field("produces", &self.produces)
            .finish()
    }
}

/// Registered binding with lifetime, producer and cached instance.
pub(crate) struct Binding {
    /// `None` only for bindings created by `instance`.
    pub(crate) concrete: Option<Concrete>,
    pub(crate) lifetime: Lifetime,
    pub(crate) instance: Option<Instance>,
    pub(crate) gate: Gate,
}

impl Binding {
    pub(crate) fn new(concrete: Concrete, lifetime: Lifetime) -> Self {
        Self {
            concrete: Some(concrete),
            lifetime,
            instance: None,
            gate: Arc::new(Mutex::new(())),
        }
    }

    pub(crate) fn of_instance(instance: Instance) -> Self {
        Self {
            concrete: None,
            lifetime: Lifetime::Singleton,
            instance: Some(instance),
            gate: Arc::new(Mutex::new(())),
        }
    }
}

/// Registry holding bindings, aliases, recipes and contextual overrides.
#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) bindings: HashMap<Key, Binding>,
    pub(crate) aliases: HashMap<Key, Key>,
    pub(crate) resolved: HashSet<Key>,
    pub(crate) recipes: HashMap<Key, Recipe>,
    /// consumer -> needed abstract -> override
    pub(crate) contextual: HashMap<Key, HashMap<Key, Concrete>>,
}

impl Registry {
    /// Follows the alias chain to the key that owns the binding.
    pub(crate) fn canonical(&self, key: &Key) -> Key {
        let mut current = key;
        // Chains are acyclic: `alias` refuses links that would close a loop.
        while let Some(next) = self.aliases.get(current) {
            current = next;
        }
        current.clone()
    }

    /// Every alias whose chain ends at `key`.
    pub(crate) fn aliases_of(&self, key: &Key) -> Vec<Key> {
        self.aliases
            .keys()
            .filter(|alias| &self.canonical(alias) == key)
            .cloned()
            .collect()
    }

    pub(crate) fn is_bound(&self, key: &Key) -> bool {
        self.aliases.contains_key(key) || self.bindings.contains_key(&self.canonical(key))
    }

    /// Inserts a binding, dropping any alias of the same name. Reports
    /// whether `key` had already been resolved.
    pub(crate) fn insert_binding(&mut self, key: &Key, concrete: Concrete, lifetime: Lifetime) -> bool {
        self.aliases.remove(key);
        if let Some(recipe) = concrete.recipe.clone() {
            self.insert_recipe(recipe);
        }
        let was_resolved = self.resolved.contains(key) || self.cached(key).is_some();
        self.bindings
            .insert(key.clone(), Binding::new(concrete, lifetime));
        was_resolved
    }

    /// Override registered for `needed` while building `consumer`, checked
    /// against the abstract and every alias pointing at it.
    pub(crate) fn contextual_for(&self, consumer: &Key, needed: &Key) -> Option<Concrete> {
        let overrides = self.contextual.get(&self.canonical(consumer))?;
        if let Some(concrete) = overrides.get(needed) {
            return Some(concrete.clone());
        }
        self.aliases_of(needed)
            .iter()
            .find_map(|alias| overrides.get(alias).cloned())
    }

    pub(crate) fn cached(&self, key: &Key) -> Option<Instance> {
        self.bindings.get(key).and_then(|b| b.instance.clone())
    }

    pub(crate) fn insert_recipe(&mut self, recipe: Recipe) {
        self.recipes.insert(recipe.key().clone(), recipe);
    }

    /// Drops cached instances matching `filter`; bindings that only
    /// existed to hold an instance disappear with it.
    pub(crate) fn forget_where(&mut self, filter: impl Fn(&Key, &Binding) -> bool) {
        let doomed: Vec<Key> = self
            .bindings
            .iter()
            .filter(|(key, binding)| binding.instance.is_some() && filter(key, binding))
            .map(|(key, _)| key.clone())
            .collect();

        for key in doomed {
            let remove = match self.bindings.get_mut(&key) {
                Some(binding) => {
                    binding.instance = None;
                    binding.concrete.is_none()
                }
                None => false,
            };
            if remove {
                self.bindings.remove(&key);
            }
        }
    }

    /// Clears everything except recipes and contextual overrides.
    pub(crate) fn flush(&mut self) {
        self.bindings.clear();
        self.aliases.clear();
        self.resolved.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_chain_canonicalizes() {
        let mut registry = Registry::default();
        registry.aliases.insert(Key::named("a"), Key::named("b"));
        registry.aliases.insert(Key::named("b"), Key::named("c"));

        assert_eq!(registry.canonical(&Key::named("a")), Key::named("c"));
        let mut aliases = registry.aliases_of(&Key::named("c"));
        aliases.sort_by(|x, y| x.name().cmp(y.name()));
        assert_eq!(aliases, vec![Key::named("a"), Key::named("b")]);
    }

    #[test]
    fn test_forget_drops_instance_only_bindings() {
        let mut registry = Registry::default();
        registry
            .bindings
            .insert(Key::named("config"), Binding::of_instance(Arc::new(1u8)));
        let mut clock = Binding::new(Concrete::value(2u8), Lifetime::Singleton);
        clock.instance = Some(Arc::new(2u8));
        registry.bindings.insert(Key::named("clock"), clock);

        registry.forget_where(|_, _| true);

        assert!(!registry.bindings.contains_key(&Key::named("config")));
        assert!(registry.cached(&Key::named("clock")).is_none());
        assert!(registry.bindings.contains_key(&Key::named("clock")));
    }
}
