//! Resolution callbacks: before-resolving, resolving, resolved and rebound.
//!
//! Callbacks observe instances; only [`Extender`](crate::Extender)s may
//! replace them. Each callback is either a plain closure or a future-returning
//! one. Async callbacks are awaited in place, so mixing both kinds never
//! changes the order in which they run.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::container::Container;
use crate::decoration::Extender;
use crate::key::Key;
use crate::parameters::{Instance, Parameters};

/// Fires before a key is resolved, with the caller's parameters.
pub type BeforeCallback = Arc<dyn Fn(&Key, &Parameters, &Container) + Send + Sync>;

type SyncFn = Arc<dyn Fn(&Instance, &Container) + Send + Sync>;
type AsyncFn = Arc<dyn Fn(Instance, Container) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Clone)]
enum CallbackKind {
    Sync(SyncFn),
    Async(AsyncFn),
}

/// A resolving, resolved or rebound callback.
///
/// Plain closures convert with `into()`; use [`Callback::future`] for
/// suspend-capable bodies and [`Callback::typed`] to receive a typed value.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Callback, Concrete, Container};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// struct Clock;
///
/// let seen = Arc::new(AtomicUsize::new(0));
/// let container = Container::new();
/// container.bind("clock", Concrete::factory(|_, _| Ok(Clock)));
///
/// let counter = seen.clone();
/// container.after_resolving_for("clock", Callback::typed::<Clock, _>(move |_clock, _| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// }));
///
/// container.make("clock").unwrap();
/// container.make("clock").unwrap();
/// assert_eq!(seen.load(Ordering::SeqCst), 2);
/// ```
#[derive(Clone)]
pub struct Callback(CallbackKind);

impl Callback {
    /// Callback with a suspend-capable body.
    pub fn future<F, Fut>(callback: F) -> Self
    where
        F: Fn(Instance, Container) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Callback(CallbackKind::Async(Arc::new(move |instance, container| {
            callback(instance, container).boxed()
        })))
    }

    /// Callback receiving the instance as `Arc<T>`; instances of other types
    /// are skipped.
    pub fn typed<T, F>(callback: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Arc<T>, &Container) + Send + Sync + 'static,
    {
        Callback(CallbackKind::Sync(Arc::new(move |instance, container| {
            if let Ok(typed) = instance.clone().downcast::<T>() {
                callback(&typed, container);
            }
        })))
    }

    pub(crate) async fn invoke(&self, instance: &Instance, container: &Container) {
        match &self.0 {
            CallbackKind::Sync(callback) => callback(instance, container),
            CallbackKind::Async(callback) => callback(instance.clone(), container.clone()).await,
        }
    }
}

impl<F> From<F> for Callback
where
    F: Fn(&Instance, &Container) + Send + Sync + 'static,
{
    fn from(callback: F) -> Self {
        Callback(CallbackKind::Sync(Arc::new(callback)))
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            CallbackKind::Sync(_) => f.write_str("Callback::Sync"),
            CallbackKind::Async(_) => f.write_str("Callback::Async"),
        }
    }
}

/// Global and key-scoped callback lists, in registration order.
#[derive(Default, Clone)]
pub(crate) struct CallbackRegistry {
    before_global: Vec<BeforeCallback>,
    before_for: HashMap<Key, Vec<BeforeCallback>>,
    resolving_global: Vec<Callback>,
    resolving_for: HashMap<Key, Vec<Callback>>,
    after_global: Vec<Callback>,
    after_for: HashMap<Key, Vec<Callback>>,
    extenders: HashMap<Key, Vec<Extender>>,
    rebound: HashMap<Key, Vec<Callback>>,
}

/// Which callback phase to snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Resolving,
    Resolved,
}

impl CallbackRegistry {
    pub(crate) fn add_before(&mut self, key: Option<Key>, callback: BeforeCallback) {
        match key {
            Some(key) => self.before_for.entry(key).or_default().push(callback),
            None => self.before_global.push(callback),
        }
    }

    pub(crate) fn add(&mut self, phase: Phase, key: Option<Key>, callback: Callback) {
        let (global, scoped) = match phase {
            Phase::Resolving => (&mut self.resolving_global, &mut self.resolving_for),
            Phase::Resolved => (&mut self.after_global, &mut self.after_for),
        };
        match key {
            Some(key) => scoped.entry(key).or_default().push(callback),
            None => global.push(callback),
        }
    }

    pub(crate) fn add_extender(&mut self, key: Key, extender: Extender) {
        self.extenders.entry(key).or_default().push(extender);
    }

    pub(crate) fn add_rebound(&mut self, key: Key, callback: Callback) {
        self.rebound.entry(key).or_default().push(callback);
    }

    /// Global callbacks first, then those scoped to any of `keys`.
    pub(crate) fn before_snapshot(&self, key: &Key) -> Vec<BeforeCallback> {
        let mut callbacks = self.before_global.clone();
        if let Some(scoped) = self.before_for.get(key) {
            callbacks.extend(scoped.iter().cloned());
        }
        callbacks
    }

    pub(crate) fn snapshot(&self, phase: Phase, keys: &[Key]) -> Vec<Callback> {
        let (global, scoped) = match phase {
            Phase::Resolving => (&self.resolving_global, &self.resolving_for),
            Phase::Resolved => (&self.after_global, &self.after_for),
        };
        let mut callbacks = global.clone();
        for key in keys {
            if let Some(list) = scoped.get(key) {
                callbacks.extend(list.iter().cloned());
            }
        }
        callbacks
    }

    pub(crate) fn extenders(&self, key: &Key) -> Vec<Extender> {
        self.extenders.get(key).cloned().unwrap_or_default()
    }

    pub(crate) fn rebound(&self, key: &Key) -> Vec<Callback> {
        self.rebound.get(key).cloned().unwrap_or_default()
    }

    pub(crate) fn forget_extenders(&mut self, key: &Key) {
        self.extenders.remove(key);
    }

    pub(crate) fn clear(&mut self) {
        *self = CallbackRegistry::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_snapshot_orders_global_before_scoped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CallbackRegistry::default();

        let scoped_log = log.clone();
        registry.add(
            Phase::Resolving,
            Some(Key::named("mailer")),
            Callback::from(move |_: &Instance, _: &Container| scoped_log.lock().push("scoped")),
        );
        let global_log = log.clone();
        registry.add(
            Phase::Resolving,
            None,
            Callback::from(move |_: &Instance, _: &Container| global_log.lock().push("global")),
        );

        let container = Container::new();
        let instance: Instance = Arc::new(());
        let callbacks = registry.snapshot(Phase::Resolving, &[Key::named("mailer")]);
        crate::internal::drive(async {
            for callback in &callbacks {
                callback.invoke(&instance, &container).await;
            }
        });

        assert_eq!(*log.lock(), vec!["global", "scoped"]);
        assert!(registry.snapshot(Phase::Resolved, &[Key::named("mailer")]).is_empty());
    }

    #[test]
    fn test_typed_callback_skips_other_types() {
        let hits = Arc::new(Mutex::new(0));
        let counter = hits.clone();
        let callback = Callback::typed::<u32, _>(move |v, _| *counter.lock() += **v);
        let container = Container::new();

        crate::internal::drive(async {
            callback.invoke(&(Arc::new(5u32) as Instance), &container).await;
            callback.invoke(&(Arc::new("no") as Instance), &container).await;
        });

        assert_eq!(*hits.lock(), 5);
    }
}
