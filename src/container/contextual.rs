//! Fluent registration of contextual bindings.

use std::any::Any;
use std::sync::Arc;

use crate::config::{ConfigRepository, ConfigValue};
use crate::container::Container;
use crate::key::Key;
use crate::parameters::Instance;
use crate::registration::Concrete;
use crate::traits::Resolver;

/// First step of `container.when(consumer)`: choose what is needed.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Arguments, Concrete, Container, DiResult, Injectable, Param, Resolver};
///
/// struct Photos {
///     disk: String,
///     quality: u32,
/// }
///
/// impl Injectable for Photos {
///     fn parameters() -> Vec<Param> {
///         vec![Param::key("disk", "filesystem.disk"), Param::untyped("quality")]
///     }
///
///     fn construct(args: Arguments) -> DiResult<Self> {
///         Ok(Photos {
///             disk: args.value("disk")?,
///             quality: args.value("quality")?,
///         })
///     }
/// }
///
/// let container = Container::new();
/// container.bind("filesystem.disk", Concrete::value("local".to_string()));
/// container.when(ferrous_container::Key::of::<Photos>())
///     .needs("filesystem.disk")
///     .give_value("s3".to_string());
/// container.when(ferrous_container::Key::of::<Photos>())
///     .needs_parameter("quality")
///     .give_value(90u32);
///
/// let photos = container.resolve::<Photos>().unwrap();
/// assert_eq!(photos.disk, "s3");
/// assert_eq!(photos.quality, 90);
/// assert_eq!(*container.make_as::<String>("filesystem.disk").unwrap(), "local");
/// ```
#[must_use = "a contextual binding is registered only by one of the give methods"]
pub struct ContextualBindingBuilder<'c> {
    container: &'c Container,
    consumers: Vec<Key>,
}

impl<'c> ContextualBindingBuilder<'c> {
    pub(crate) fn new(container: &'c Container, consumers: Vec<Key>) -> Self {
        Self {
            container,
            consumers,
        }
    }

    /// Targets a typed dependency (or any abstract key).
    pub fn needs(self, needed: impl Into<Key>) -> ContextualNeeds<'c> {
        ContextualNeeds {
            container: self.container,
            consumers: self.consumers,
            needed: needed.into(),
        }
    }

    /// Targets an untyped parameter by name.
    pub fn needs_parameter(self, name: &str) -> ContextualNeeds<'c> {
        self.needs(Key::parameter(name))
    }
}

/// Second step: choose what to give.
#[must_use = "a contextual binding is registered only by one of the give methods"]
pub struct ContextualNeeds<'c> {
    container: &'c Container,
    consumers: Vec<Key>,
    needed: Key,
}

impl<'c> ContextualNeeds<'c> {
    /// Gives an arbitrary producer.
    pub fn give(self, concrete: Concrete) {
        for consumer in &self.consumers {
            self.container
                .add_contextual_binding(consumer, &self.needed, concrete.clone());
        }
    }

    /// Gives a fixed value.
    pub fn give_value<T: Any + Send + Sync>(self, value: T) {
        self.give(Concrete::value(value));
    }

    /// Gives whatever another abstract resolves to.
    pub fn give_key(self, key: impl Into<Key>) {
        self.give(Concrete::key(key));
    }

    /// Gives the value at a dotted path of the bound [`ConfigRepository`],
    /// or `default` (or [`ConfigValue::Null`]) when the path is missing.
    pub fn give_config(self, path: impl Into<String>, default: Option<ConfigValue>) {
        let path = path.into();
        self.give(Concrete::raw(move |ctx, _| {
            let config = ctx.make_as::<ConfigRepository>(Key::of::<ConfigRepository>())?;
            let value = config
                .get(&path)
                .or_else(|| default.clone())
                .unwrap_or(ConfigValue::Null);
            Ok(Arc::new(value) as Instance)
        }));
    }
}
