//! Caller-supplied parameters, declared parameters and resolved arguments.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::Key;

/// Type-erased shared instance as stored and delivered by the container.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Downcasts an [`Instance`] to `Arc<T>`, reporting `key` on mismatch.
pub(crate) fn downcast<T: Any + Send + Sync>(key: &Key, instance: Instance) -> DiResult<Arc<T>> {
    instance.downcast::<T>().map_err(|_| DiError::TypeMismatch {
        key: key.clone(),
        expected: std::any::type_name::<T>(),
    })
}

/// Name-keyed overrides passed to [`Container::make_with`](crate::Container::make_with)
/// and [`Container::call`](crate::Container::call).
///
/// Overrides win over every other source when a declared parameter of the
/// same name is resolved. Factories receive them verbatim.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::Parameters;
///
/// let params = Parameters::new()
///     .with("default", "not_the_spoon".to_string())
///     .with("retries", 3u32);
/// assert_eq!(*params.get::<u32>("retries").unwrap(), 3);
/// assert!(params.get::<String>("missing").is_none());
/// ```
#[derive(Clone, Default)]
pub struct Parameters {
    values: HashMap<String, Instance>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an owned value.
    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.values.insert(name.into(), Arc::new(value));
        self
    }

    /// Adds an already shared instance, keeping its identity.
    pub fn with_instance(mut self, name: impl Into<String>, value: Instance) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Raw instance for `name`.
    pub fn instance(&self, name: &str) -> Option<Instance> {
        self.values.get(name).cloned()
    }

    /// Typed access; `None` when absent or of another type.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.instance(name).and_then(|v| v.downcast::<T>().ok())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Parameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("Parameters").field("names", &names).finish()
    }
}

/// A declared constructor or callable parameter.
///
/// Declaration replaces runtime signature introspection: a recipe or
/// [`Callable`](crate::Callable) lists its parameters in order, each with an
/// optional declared type, an optional-ness flag and an optional default.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Key, Param};
///
/// struct Mailer;
///
/// let params = vec![
///     Param::of::<Mailer>("mailer"),
///     Param::key("cache", "cache.store").optional(),
///     Param::untyped("retries").default_value(3u32),
/// ];
/// assert_eq!(params[0].declared_key(), Some(&Key::of::<Mailer>()));
/// assert!(params[1].is_optional());
/// assert!(params[2].has_default());
/// ```
#[derive(Clone)]
pub struct Param {
    name: &'static str,
    declared: Option<Key>,
    optional: bool,
    default: Option<Instance>,
}

impl Param {
    /// Parameter whose declared type is `T`.
    pub fn of<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self::key(name, Key::of::<T>())
    }

    /// Parameter declared against an arbitrary abstract.
    pub fn key(name: &'static str, key: impl Into<Key>) -> Self {
        Self {
            name,
            declared: Some(key.into()),
            optional: false,
            default: None,
        }
    }

    /// Parameter with no declared type (a primitive); only overrides,
    /// contextual `$name` bindings and defaults can satisfy it.
    pub fn untyped(name: &'static str) -> Self {
        Self {
            name,
            declared: None,
            optional: false,
            default: None,
        }
    }

    /// Marks the parameter as `Option<T>`: resolution falls back to `None`.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Value used when nothing else satisfies the parameter.
    pub fn default_value<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.default = Some(Arc::new(value));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn declared_key(&self) -> Option<&Key> {
        self.declared.as_ref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub(crate) fn default(&self) -> Option<Instance> {
        self.default.clone()
    }
}

impl std::fmt::Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Param")
            .field("name", &self.name)
            .field("declared", &self.declared)
            .field("optional", &self.optional)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

/// Arguments assembled for a recipe constructor or callable body.
///
/// Holds one entry per declared parameter; optional parameters that could
/// not be resolved are present but empty.
#[derive(Clone, Default)]
pub struct Arguments {
    values: Vec<(&'static str, Option<Instance>)>,
}

impl Arguments {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: &'static str, value: Option<Instance>) {
        self.values.push((name, value));
    }

    fn slot(&self, name: &str) -> DiResult<&Option<Instance>> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| DiError::MissingArgument(name.to_string()))
    }

    /// Raw instance; `None` when an optional parameter resolved to nothing.
    pub fn instance(&self, name: &str) -> DiResult<Option<Instance>> {
        self.slot(name).cloned()
    }

    /// Required typed argument.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> DiResult<Arc<T>> {
        match self.slot(name)? {
            Some(value) => downcast::<T>(&Key::named(name.to_string()), value.clone()),
            None => Err(DiError::MissingArgument(name.to_string())),
        }
    }

    /// Optional typed argument.
    pub fn optional<T: Any + Send + Sync>(&self, name: &str) -> DiResult<Option<Arc<T>>> {
        match self.slot(name)? {
            Some(value) => downcast::<T>(&Key::named(name.to_string()), value.clone()).map(Some),
            None => Ok(None),
        }
    }

    /// Owned copy of a typed argument.
    pub fn value<T: Any + Send + Sync + Clone>(&self, name: &str) -> DiResult<T> {
        self.get::<T>(name).map(|v| (*v).clone())
    }

    /// Trait-object argument, stored as `Arc<dyn Trait>` inside the instance.
    pub fn trait_object<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        self.get::<Arc<T>>(name).map(|v| (*v).clone())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Debug for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_list();
        for (name, value) in &self.values {
            list.entry(&(name, value.is_some()));
        }
        list.finish()
    }
}
