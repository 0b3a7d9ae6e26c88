//! The dependency injection container.
//!
//! A [`Container`] binds abstracts to [`Concrete`] producers and resolves
//! object graphs on demand. It is a cheap handle: clones share one registry.

mod context;
mod contextual;
mod resolve;

pub use context::ResolverContext;
pub use contextual::{ContextualBindingBuilder, ContextualNeeds};

use std::any::Any;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::decoration::Extender;
use crate::descriptors::BindingDescriptor;
use crate::dispatcher::{BeforeCallback, Callback, CallbackRegistry, Phase};
use crate::error::{DiError, DiResult};
use crate::injectable::{Injectable, Recipe};
use crate::internal::{drive, GateGraph};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::observer::{Observers, ResolutionObserver};
use crate::parameters::{Instance, Parameters};
use crate::registration::{Binding, Concrete, Registry};

pub(crate) struct ContainerInner {
    pub(crate) registry: RwLock<Registry>,
    pub(crate) callbacks: RwLock<CallbackRegistry>,
    pub(crate) observers: RwLock<Observers>,
    pub(crate) gates: Mutex<GateGraph>,
}

/// Runtime dependency injection container.
///
/// Registration and resolution both go through a shared `&Container`;
/// the handle is `Clone + Send + Sync` and every clone sees the same state.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Concrete, Container, Resolver};
/// use std::sync::Arc;
///
/// struct Greeter {
///     greeting: String,
/// }
///
/// let container = Container::new();
/// container.bind("greeter", Concrete::factory(|_, _| {
///     Ok(Greeter { greeting: "hello".into() })
/// }));
///
/// let a = container.make_as::<Greeter>("greeter").unwrap();
/// let b = container.make_as::<Greeter>("greeter").unwrap();
/// assert_eq!(a.greeting, "hello");
/// assert!(!Arc::ptr_eq(&a, &b));
///
/// container.flush();
/// assert!(!container.bound("greeter"));
/// ```
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ContainerInner>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                registry: RwLock::new(Registry::default()),
                callbacks: RwLock::new(CallbackRegistry::default()),
                observers: RwLock::new(Observers::new()),
                gates: Mutex::new(GateGraph::default()),
            }),
        }
    }

    // ----- Registration -----

    /// Registers a transient binding, replacing any previous one.
    pub fn bind(&self, key: impl Into<Key>, concrete: Concrete) {
        self.bind_with_lifetime(key, concrete, Lifetime::Transient);
    }

    /// Registers a binding with an explicit lifetime.
    ///
    /// Replacing a binding drops its cached instance and any alias of the
    /// same name. If the key was already resolved, rebinding callbacks fire.
    pub fn bind_with_lifetime(&self, key: impl Into<Key>, concrete: Concrete, lifetime: Lifetime) {
        let key = key.into();
        let was_resolved = self
            .inner
            .registry
            .write()
            .insert_binding(&key, concrete, lifetime);
        debug!(key = %key, ?lifetime, "bound");

        if was_resolved {
            self.rebound(&key);
        }
    }

    /// Registers a singleton binding.
    pub fn singleton(&self, key: impl Into<Key>, concrete: Concrete) {
        self.bind_with_lifetime(key, concrete, Lifetime::Singleton);
    }

    /// Registers a binding shared until [`forget_scoped_instances`](Self::forget_scoped_instances).
    pub fn scoped(&self, key: impl Into<Key>, concrete: Concrete) {
        self.bind_with_lifetime(key, concrete, Lifetime::Scoped);
    }

    /// Binds only when `key` is currently unbound; reports whether it bound.
    pub fn bind_if(&self, key: impl Into<Key>, concrete: Concrete) -> bool {
        self.bind_if_with_lifetime(key.into(), concrete, Lifetime::Transient)
    }

    /// Singleton variant of [`bind_if`](Self::bind_if).
    pub fn singleton_if(&self, key: impl Into<Key>, concrete: Concrete) -> bool {
        self.bind_if_with_lifetime(key.into(), concrete, Lifetime::Singleton)
    }

    fn bind_if_with_lifetime(&self, key: Key, concrete: Concrete, lifetime: Lifetime) -> bool {
        // Check and insert under one guard so racing callers bind once.
        let was_resolved = {
            let mut registry = self.inner.registry.write();
            if registry.is_bound(&key) {
                return false;
            }
            registry.insert_binding(&key, concrete, lifetime)
        };
        debug!(key = %key, ?lifetime, "bound");

        if was_resolved {
            self.rebound(&key);
        }
        true
    }

    /// Transient factory bound under the type it returns.
    pub fn bind_factory<T, F>(&self, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&ResolverContext, &Parameters) -> DiResult<T> + Send + Sync + 'static,
    {
        self.bind(Key::of::<T>(), Concrete::factory(factory));
    }

    /// Singleton factory bound under the type it returns.
    pub fn singleton_factory<T, F>(&self, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&ResolverContext, &Parameters) -> DiResult<T> + Send + Sync + 'static,
    {
        self.singleton(Key::of::<T>(), Concrete::factory(factory));
    }

    /// Registers an existing value as the shared instance of `key`.
    pub fn instance<T: Any + Send + Sync>(&self, key: impl Into<Key>, value: Arc<T>) -> Arc<T> {
        self.instance_any(key, value.clone());
        value
    }

    /// Type-erased form of [`instance`](Self::instance).
    pub fn instance_any(&self, key: impl Into<Key>, instance: Instance) -> Instance {
        let key = key.into();
        let was_bound = {
            let mut registry = self.inner.registry.write();
            let was_bound = registry.is_bound(&key);
            registry.aliases.remove(&key);
            match registry.bindings.get_mut(&key) {
                Some(binding) => {
                    binding.instance = Some(instance.clone());
                    if !binding.lifetime.is_shared() {
                        binding.lifetime = Lifetime::Singleton;
                    }
                    // Constructions already in flight must not overwrite this value.
                    binding.gate = Default::default();
                }
                None => {
                    registry
                        .bindings
                        .insert(key.clone(), Binding::of_instance(instance.clone()));
                }
            }
            was_bound
        };
        debug!(key = %key, "instance registered");

        if was_bound {
            self.rebound(&key);
        }
        instance
    }

    /// Removes the binding, cached instance and alias named `key`.
    pub fn unbind(&self, key: impl Into<Key>) {
        let key = key.into();
        let mut registry = self.inner.registry.write();
        registry.aliases.remove(&key);
        registry.bindings.remove(&key);
        registry.resolved.remove(&key);
        debug!(key = %key, "unbound");
    }

    /// Makes the injectable type `T` self-constructible.
    pub fn register<T: Injectable>(&self) {
        self.register_recipe(Recipe::of::<T>());
    }

    /// Registers a recipe under its key.
    pub fn register_recipe(&self, recipe: Recipe) {
        debug!(key = %recipe.key(), params = recipe.parameters().len(), "recipe registered");
        self.inner.registry.write().insert_recipe(recipe);
    }

    pub(crate) fn has_recipe(&self, key: &Key) -> bool {
        self.inner.registry.read().recipes.contains_key(key)
    }

    /// Registers `name` as a redirect to `target`. Chains are allowed.
    pub fn alias(&self, name: impl Into<Key>, target: impl Into<Key>) -> DiResult<()> {
        let name = name.into();
        let target = target.into();
        let mut registry = self.inner.registry.write();
        if name == target || registry.canonical(&target) == name {
            return Err(DiError::AliasToItself(name));
        }
        debug!(alias = %name, target = %target, "alias registered");
        registry.aliases.insert(name, target);
        Ok(())
    }

    // ----- Contextual bindings -----

    /// Registers `concrete` for `needed` while building `consumer`.
    pub fn add_contextual_binding(
        &self,
        consumer: impl Into<Key>,
        needed: impl Into<Key>,
        concrete: Concrete,
    ) {
        let consumer = consumer.into();
        let needed = needed.into();
        let mut registry = self.inner.registry.write();
        if let Some(recipe) = concrete.recipe.clone() {
            registry.insert_recipe(recipe);
        }
        let consumer = registry.canonical(&consumer);
        let needed = registry.canonical(&needed);
        debug!(consumer = %consumer, needed = %needed, "contextual binding registered");
        registry
            .contextual
            .entry(consumer)
            .or_default()
            .insert(needed, concrete);
    }

    /// Starts a fluent contextual binding for `consumer`.
    pub fn when(&self, consumer: impl Into<Key>) -> ContextualBindingBuilder<'_> {
        ContextualBindingBuilder::new(self, vec![consumer.into()])
    }

    /// Starts a fluent contextual binding shared by several consumers.
    pub fn when_any<I, K>(&self, consumers: I) -> ContextualBindingBuilder<'_>
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        ContextualBindingBuilder::new(self, consumers.into_iter().map(Into::into).collect())
    }

    // ----- Queries -----

    /// Whether `key` has a binding or is an alias.
    pub fn bound(&self, key: impl Into<Key>) -> bool {
        self.inner.registry.read().is_bound(&key.into())
    }

    /// Whether `key` resolves to a shared binding or holds an instance.
    pub fn is_shared(&self, key: impl Into<Key>) -> bool {
        let registry = self.inner.registry.read();
        let key = registry.canonical(&key.into());
        registry
            .bindings
            .get(&key)
            .map_or(false, |b| b.lifetime.is_shared() || b.instance.is_some())
    }

    /// Whether `key` has been resolved or holds an instance.
    pub fn is_resolved(&self, key: impl Into<Key>) -> bool {
        let registry = self.inner.registry.read();
        let key = registry.canonical(&key.into());
        registry.resolved.contains(&key) || registry.cached(&key).is_some()
    }

    pub fn is_alias(&self, name: impl Into<Key>) -> bool {
        self.inner.registry.read().aliases.contains_key(&name.into())
    }

    /// The key at the end of `name`'s alias chain (`name` itself if unaliased).
    pub fn get_alias(&self, name: impl Into<Key>) -> Key {
        self.canonical(&name.into())
    }

    pub(crate) fn canonical(&self, key: &Key) -> Key {
        self.inner.registry.read().canonical(key)
    }

    /// Snapshot of every binding, sorted by key name.
    pub fn descriptors(&self) -> Vec<BindingDescriptor> {
        let registry = self.inner.registry.read();
        let mut descriptors: Vec<_> = registry
            .bindings
            .iter()
            .map(|(key, binding)| BindingDescriptor::from_binding(key, binding, registry.aliases_of(key)))
            .collect();
        descriptors.sort_by(|a, b| a.key.name().cmp(b.key.name()));
        descriptors
    }

    // ----- Instance cache -----

    /// Drops the cached instance of `key`.
    pub fn forget_instance(&self, key: impl Into<Key>) {
        let mut registry = self.inner.registry.write();
        let key = registry.canonical(&key.into());
        registry.forget_where(|k, _| k == &key);
    }

    /// Drops every cached instance.
    pub fn forget_instances(&self) {
        self.inner.registry.write().forget_where(|_, _| true);
    }

    /// Drops instances of scoped bindings only.
    pub fn forget_scoped_instances(&self) {
        self.inner
            .registry
            .write()
            .forget_where(|_, binding| binding.lifetime == Lifetime::Scoped);
        debug!("scoped instances forgotten");
    }

    // ----- Callbacks -----

    /// Fires before every resolution, with the key and the caller's parameters.
    pub fn before_resolving<F>(&self, callback: F)
    where
        F: Fn(&Key, &Parameters, &Container) + Send + Sync + 'static,
    {
        let callback: BeforeCallback = Arc::new(callback);
        self.inner.callbacks.write().add_before(None, callback);
    }

    /// Fires before each resolution of `key`.
    pub fn before_resolving_for<F>(&self, key: impl Into<Key>, callback: F)
    where
        F: Fn(&Key, &Parameters, &Container) + Send + Sync + 'static,
    {
        let key = self.canonical(&key.into());
        let callback: BeforeCallback = Arc::new(callback);
        self.inner.callbacks.write().add_before(Some(key), callback);
    }

    /// Fires for every freshly built instance, before it is cached.
    pub fn resolving(&self, callback: impl Into<Callback>) {
        self.inner
            .callbacks
            .write()
            .add(Phase::Resolving, None, callback.into());
    }

    /// Fires for freshly built instances of `key`.
    pub fn resolving_for(&self, key: impl Into<Key>, callback: impl Into<Callback>) {
        let key = self.canonical(&key.into());
        self.inner
            .callbacks
            .write()
            .add(Phase::Resolving, Some(key), callback.into());
    }

    /// Fires whenever an instance is delivered, cached or not.
    pub fn after_resolving(&self, callback: impl Into<Callback>) {
        self.inner
            .callbacks
            .write()
            .add(Phase::Resolved, None, callback.into());
    }

    /// Fires whenever an instance of `key` is delivered.
    pub fn after_resolving_for(&self, key: impl Into<Key>, callback: impl Into<Callback>) {
        let key = self.canonical(&key.into());
        self.inner
            .callbacks
            .write()
            .add(Phase::Resolved, Some(key), callback.into());
    }

    /// Registers a transform applied to every new instance of `key`.
    ///
    /// An instance already cached is transformed immediately and replaced.
    pub fn extend(&self, key: impl Into<Key>, extender: Extender) -> DiResult<()> {
        let key = self.canonical(&key.into());
        let cached = self.inner.registry.read().cached(&key);

        if let Some(instance) = cached {
            let extended = drive(extender.apply(&key, instance, self))?;
            if let Some(binding) = self.inner.registry.write().bindings.get_mut(&key) {
                binding.instance = Some(extended);
            }
        }
        self.inner.callbacks.write().add_extender(key.clone(), extender);
        debug!(key = %key, "extender registered");

        if self.is_resolved(&key) {
            self.rebound(&key);
        }
        Ok(())
    }

    /// Removes every extender registered for `key`.
    pub fn forget_extenders(&self, key: impl Into<Key>) {
        let key = self.canonical(&key.into());
        self.inner.callbacks.write().forget_extenders(&key);
    }

    /// Registers a callback fired with the new instance whenever `key` is
    /// bound again after being resolved. Returns the current instance when
    /// `key` is already bound.
    pub fn rebinding(
        &self,
        key: impl Into<Key>,
        callback: impl Into<Callback>,
    ) -> DiResult<Option<Instance>> {
        let key = self.canonical(&key.into());
        self.inner
            .callbacks
            .write()
            .add_rebound(key.clone(), callback.into());

        if self.bound(&key) {
            self.make(key).map(Some)
        } else {
            Ok(None)
        }
    }

    fn rebound(&self, key: &Key) {
        let callbacks = self.inner.callbacks.read().rebound(key);
        if callbacks.is_empty() {
            return;
        }
        match self.make(key) {
            Ok(instance) => drive(async {
                for callback in &callbacks {
                    callback.invoke(&instance, self).await;
                }
            }),
            Err(error) => warn!(key = %key, %error, "rebinding resolution failed"),
        }
    }

    // ----- Diagnostics -----

    /// Adds an observer notified around every resolution that builds.
    pub fn add_observer(&self, observer: Arc<dyn ResolutionObserver>) {
        self.inner.observers.write().add(observer);
    }

    // ----- Lifecycle -----

    /// Clears bindings, instances, aliases, the resolved set and every
    /// callback registry. Recipes, contextual bindings and observers stay.
    pub fn flush(&self) {
        self.inner.registry.write().flush();
        self.inner.callbacks.write().clear();
        debug!("container flushed");
    }

    /// Flushes and releases this handle.
    pub fn dispose(self) {
        self.flush();
    }

    /// Returns a closure that resolves `key` each time it is called.
    pub fn factory(&self, key: impl Into<Key>) -> impl Fn() -> DiResult<Instance> + Send + Sync + 'static {
        let container = self.clone();
        let key = key.into();
        move || container.make(key.clone())
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.inner.registry.read();
        f.debug_struct("Container")
            .field("bindings", &registry.bindings.len())
            .field("aliases", &registry.aliases.len())
            .field("recipes", &registry.recipes.len())
            .field("resolved", &registry.resolved.len())
            .finish()
    }
}
