//! The resolution algorithm.
//!
//! Every entry point funnels into [`Container::resolve_in`], which returns a
//! boxed future so recursion through dependencies stays finite in size.
//! Every `FRAMES_PER_THREAD` levels the rest of the chain is relayed to a
//! fresh thread, so deep graphs reach the depth limit instead of exhausting
//! the caller's stack.
//! Registry locks are taken only inside the small synchronous helpers at the
//! bottom of this file and are never held across an await.

use std::time::Instant;

use futures::future::{BoxFuture, FutureExt};
use tracing::trace;

use crate::container::{Container, ResolverContext};
use crate::dispatcher::Phase;
use crate::error::{DiError, DiResult};
use crate::internal::{drive, enter_gate, relay, ResolutionStack, FRAMES_PER_THREAD};
use crate::key::Key;
use crate::parameters::{Arguments, Instance, Param, Parameters};
use crate::registration::{Concrete, Gate, Producer};

/// What the registry says about one key at the start of a build.
struct BuildPlan {
    concrete: Option<Concrete>,
    shared: bool,
    gate: Option<Gate>,
}

impl Container {
    /// Resolves `key`.
    ///
    /// Blocks the calling thread while asynchronous factories or callbacks
    /// are pending. Inside a single-threaded async runtime prefer
    /// [`make_async`](Self::make_async).
    pub fn make(&self, key: impl Into<Key>) -> DiResult<Instance> {
        self.make_with(key, Parameters::new())
    }

    /// Resolves `key` with name-keyed parameter overrides.
    ///
    /// Resolutions with parameters never read or write the shared instance.
    pub fn make_with(&self, key: impl Into<Key>, params: Parameters) -> DiResult<Instance> {
        drive(self.make_async(key, params))
    }

    /// Awaitable resolution.
    pub fn make_async(
        &self,
        key: impl Into<Key>,
        params: Parameters,
    ) -> BoxFuture<'static, DiResult<Instance>> {
        self.resolve_in(ResolutionStack::new(), key.into(), params)
    }

    pub(crate) fn resolve_in(
        &self,
        stack: ResolutionStack,
        key: Key,
        params: Parameters,
    ) -> BoxFuture<'static, DiResult<Instance>> {
        let container = self.clone();
        let depth = stack.keys().len();
        let resolution = async move { container.resolve_key(stack, key, params).await }.boxed();
        if depth > 0 && depth % FRAMES_PER_THREAD == 0 {
            relay(resolution).boxed()
        } else {
            resolution
        }
    }

    async fn resolve_key(
        &self,
        stack: ResolutionStack,
        requested: Key,
        params: Parameters,
    ) -> DiResult<Instance> {
        let (key, contextual) = self.lookup(&stack, &requested);
        trace!(key = %key, depth = stack.keys().len(), "resolving");
        self.fire_before(&key, &params);

        let cacheable = params.is_empty() && contextual.is_none();
        if cacheable {
            if let Some(instance) = self.cached_instance(&key) {
                trace!(key = %key, "cached instance");
                let produced = self.produced_key(&key);
                self.fire_phase(Phase::Resolved, &key, produced.as_ref(), &instance)
                    .await;
                return Ok(instance);
            }
        }

        let frame = stack.push(&key)?;
        let observers = self.inner.observers.read().clone();
        observers.resolving(&key);
        let started = Instant::now();

        let result = self.build(frame, &key, params, contextual, cacheable).await;
        match &result {
            Ok(_) => observers.resolved(&key, started.elapsed()),
            Err(error) => observers.failed(&key, error),
        }
        result
    }

    async fn build(
        &self,
        frame: ResolutionStack,
        key: &Key,
        params: Parameters,
        contextual: Option<Concrete>,
        cacheable: bool,
    ) -> DiResult<Instance> {
        let plan = match contextual {
            Some(concrete) => BuildPlan {
                concrete: Some(concrete),
                shared: false,
                gate: None,
            },
            None => self.plan(key, cacheable),
        };

        // First resolution wins: later arrivals wait here, then find the cache.
        let permit = match (&plan.gate, plan.shared) {
            (Some(gate), true) => Some(enter_gate(&self.inner.gates, gate, &frame).await?),
            _ => None,
        };
        if plan.shared {
            if let Some(instance) = self.cached_instance(key) {
                drop(permit);
                let produced = self.produced_key(key);
                self.fire_phase(Phase::Resolved, key, produced.as_ref(), &instance)
                    .await;
                return Ok(instance);
            }
        }

        let produced = plan.concrete.as_ref().and_then(|c| c.produces.clone());
        let instance = self.produce(&frame, key, plan.concrete, params).await?;

        self.fire_phase(Phase::Resolving, key, produced.as_ref(), &instance)
            .await;
        let instance = self.apply_extenders(key, instance).await?;

        if plan.shared {
            if let Some(gate) = &plan.gate {
                self.store_instance(key, gate, &instance);
            }
        }
        drop(permit);
        self.mark_resolved(key);

        self.fire_phase(Phase::Resolved, key, produced.as_ref(), &instance)
            .await;
        Ok(instance)
    }

    /// Runs a producer for `key`; `frame` already has `key` on top.
    fn produce<'a>(
        &'a self,
        frame: &'a ResolutionStack,
        key: &'a Key,
        concrete: Option<Concrete>,
        params: Parameters,
    ) -> BoxFuture<'a, DiResult<Instance>> {
        async move {
            match concrete.map(|c| c.producer) {
                None | Some(Producer::Itself) => self.build_recipe(frame, key, params).await,
                Some(Producer::Value(instance)) => Ok(instance),
                Some(Producer::Factory(factory)) => {
                    let ctx = ResolverContext::new(self.clone(), frame.clone());
                    factory(&ctx, &params)
                }
                Some(Producer::Async(factory)) => {
                    let ctx = ResolverContext::new(self.clone(), frame.clone());
                    factory(ctx, params).await
                }
                Some(Producer::Delegate { target, upcast }) => {
                    let target = self.canonical(&target);
                    let instance = if &target == key {
                        self.build_recipe(frame, key, params).await?
                    } else {
                        match self.resolve_in(frame.clone(), target.clone(), params).await {
                            Ok(instance) => instance,
                            Err(error) => return Err(not_instantiable(error, &target, frame)),
                        }
                    };
                    match upcast {
                        Some(upcast) => upcast(&target, instance),
                        None => Ok(instance),
                    }
                }
            }
        }
        .boxed()
    }

    /// Self-construction through the registered recipe.
    async fn build_recipe(
        &self,
        frame: &ResolutionStack,
        key: &Key,
        params: Parameters,
    ) -> DiResult<Instance> {
        let recipe = self.inner.registry.read().recipes.get(key).cloned();
        let recipe = match recipe {
            Some(recipe) => recipe,
            None if key.is_trait_object() => {
                return Err(DiError::UninstantiableAbstract {
                    target: key.clone(),
                    building: frame.building(),
                })
            }
            None => return Err(DiError::EntryNotFound(key.clone())),
        };

        let args = self
            .resolve_arguments(frame, key, recipe.parameters(), &params)
            .await?;
        recipe.build(args)
    }

    /// Resolves declared parameters in order for `owner`, the key on top
    /// of `frame`.
    pub(crate) async fn resolve_arguments(
        &self,
        frame: &ResolutionStack,
        owner: &Key,
        declared: &[Param],
        overrides: &Parameters,
    ) -> DiResult<Arguments> {
        let mut args = Arguments::new();
        for param in declared {
            let value = self.resolve_argument(frame, owner, param, overrides).await?;
            args.push(param.name(), value);
        }
        Ok(args)
    }

    async fn resolve_argument(
        &self,
        frame: &ResolutionStack,
        owner: &Key,
        param: &Param,
        overrides: &Parameters,
    ) -> DiResult<Option<Instance>> {
        if let Some(value) = overrides.instance(param.name()) {
            return Ok(Some(value));
        }

        let declared = match param.declared_key() {
            Some(declared) => declared.clone(),
            None => return self.resolve_primitive(frame, owner, param).await,
        };

        match self.resolve_in(frame.clone(), declared.clone(), Parameters::new()).await {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.is_fatal() => Err(error),
            Err(error) => {
                if param.is_optional() {
                    trace!(parameter = param.name(), %error, "optional dependency unavailable");
                    return Ok(None);
                }
                if let Some(default) = param.default() {
                    trace!(parameter = param.name(), %error, "falling back to default");
                    return Ok(Some(default));
                }
                if !error.is_missing(&self.canonical(&declared)) {
                    return Err(error);
                }
                Err(DiError::UnresolvableDependency {
                    parameter: param.name().to_string(),
                    owner: owner.clone(),
                    cause: Some(Box::new(error)),
                })
            }
        }
    }

    /// Untyped parameters: contextual `$name` binding, then default.
    async fn resolve_primitive(
        &self,
        frame: &ResolutionStack,
        owner: &Key,
        param: &Param,
    ) -> DiResult<Option<Instance>> {
        let target = Key::parameter(param.name());
        let contextual = self
            .inner
            .registry
            .read()
            .contextual_for(owner, &target);
        if let Some(concrete) = contextual {
            return self
                .produce(frame, &target, Some(concrete), Parameters::new())
                .await
                .map(Some);
        }

        if let Some(default) = param.default() {
            return Ok(Some(default));
        }
        if param.is_optional() {
            return Ok(None);
        }
        Err(DiError::UnresolvableDependency {
            parameter: param.name().to_string(),
            owner: owner.clone(),
            cause: None,
        })
    }

    async fn fire_phase(&self, phase: Phase, key: &Key, produced: Option<&Key>, instance: &Instance) {
        let mut keys = vec![key.clone()];
        if let Some(produced) = produced {
            if produced != key {
                keys.push(produced.clone());
            }
        }
        let callbacks = self.inner.callbacks.read().snapshot(phase, &keys);
        for callback in &callbacks {
            callback.invoke(instance, self).await;
        }
    }

    async fn apply_extenders(&self, key: &Key, instance: Instance) -> DiResult<Instance> {
        let extenders = self.inner.callbacks.read().extenders(key);
        let mut instance = instance;
        for extender in &extenders {
            instance = extender.apply(key, instance, self).await?;
        }
        Ok(instance)
    }

    // ----- Synchronous registry helpers -----

    fn lookup(&self, stack: &ResolutionStack, requested: &Key) -> (Key, Option<Concrete>) {
        let registry = self.inner.registry.read();
        let key = registry.canonical(requested);
        let contextual = stack
            .last()
            .and_then(|consumer| registry.contextual_for(consumer, &key));
        (key, contextual)
    }

    fn plan(&self, key: &Key, cacheable: bool) -> BuildPlan {
        let registry = self.inner.registry.read();
        match registry.bindings.get(key) {
            Some(binding) => BuildPlan {
                concrete: binding.concrete.clone(),
                shared: cacheable && binding.lifetime.is_shared(),
                gate: Some(binding.gate.clone()),
            },
            None => BuildPlan {
                concrete: None,
                shared: false,
                gate: None,
            },
        }
    }

    fn fire_before(&self, key: &Key, params: &Parameters) {
        let callbacks = self.inner.callbacks.read().before_snapshot(key);
        for callback in &callbacks {
            callback(key, params, self);
        }
    }

    fn cached_instance(&self, key: &Key) -> Option<Instance> {
        self.inner.registry.read().cached(key)
    }

    fn produced_key(&self, key: &Key) -> Option<Key> {
        self.inner
            .registry
            .read()
            .bindings
            .get(key)
            .and_then(|b| b.concrete.as_ref())
            .and_then(|c| c.produces.clone())
    }

    /// Caches `instance` unless the binding was replaced while it was built.
    fn store_instance(&self, key: &Key, gate: &Gate, instance: &Instance) {
        let mut registry = self.inner.registry.write();
        match registry.bindings.get_mut(key) {
            Some(binding) if std::sync::Arc::ptr_eq(&binding.gate, gate) => {
                binding.instance = Some(instance.clone());
            }
            _ => trace!(key = %key, "binding replaced during construction; not cached"),
        }
    }

    fn mark_resolved(&self, key: &Key) {
        self.inner.registry.write().resolved.insert(key.clone());
    }
}

/// A delegating binding whose target cannot be built reports the target as
/// not instantiable, with the keys that were being built.
fn not_instantiable(error: DiError, target: &Key, frame: &ResolutionStack) -> DiError {
    match error {
        DiError::EntryNotFound(missing) if &missing == target => DiError::UninstantiableAbstract {
            target: missing,
            building: frame.keys().to_vec(),
        },
        DiError::UninstantiableAbstract { target: t, building } if &t == target && building.is_empty() => {
            DiError::UninstantiableAbstract {
                target: t,
                building: frame.keys().to_vec(),
            }
        }
        other => other,
    }
}
