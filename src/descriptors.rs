//! Binding descriptors for introspection and diagnostics.

use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::registration::Binding;

/// Snapshot of one binding, as returned by
/// [`Container::descriptors`](crate::Container::descriptors).
///
/// # Use Cases
///
/// - **Debugging**: inspect what is bound and with which lifetime
/// - **Health checks**: verify the container configuration at startup
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Concrete, Container, Lifetime};
/// use std::sync::Arc;
///
/// struct Database;
///
/// let container = Container::new();
/// container.singleton("db", Concrete::factory(|_, _| Ok(Database)));
/// container.alias("database", "db").unwrap();
/// container.instance("answer", Arc::new(42u32));
/// container.bind("conn", Concrete::key("db"));
///
/// let descriptors = container.descriptors();
/// let names: Vec<_> = descriptors.iter().map(|d| d.key.name()).collect();
/// assert_eq!(names, ["answer", "conn", "db"]);
///
/// let db = &descriptors[2];
/// assert_eq!(db.lifetime, Lifetime::Singleton);
/// assert_eq!(db.kind, "factory");
/// assert_eq!(db.aliases[0].name(), "database");
/// assert!(!db.has_instance);
///
/// assert!(descriptors[0].has_instance);
/// assert_eq!(descriptors[0].kind, "instance");
/// assert_eq!(descriptors[1].delegates_to.as_ref().map(|k| k.name()), Some("db"));
/// ```
#[derive(Debug, Clone)]
pub struct BindingDescriptor {
    /// The bound abstract
    pub key: Key,
    pub lifetime: Lifetime,
    /// How the binding produces values: factory, async factory, value,
    /// delegate, self or instance
    pub kind: &'static str,
    /// Target abstract of a delegating binding
    pub delegates_to: Option<Key>,
    /// Runtime type of produced values, when known
    pub produces: Option<Key>,
    pub has_instance: bool,
    /// Aliases resolving to this key
    pub aliases: Vec<Key>,
}

impl BindingDescriptor {
    pub(crate) fn from_binding(key: &Key, binding: &Binding, mut aliases: Vec<Key>) -> Self {
        aliases.sort_by(|a, b| a.name().cmp(b.name()));
        let concrete = binding.concrete.as_ref();
        Self {
            key: key.clone(),
            lifetime: binding.lifetime,
            kind: concrete.map_or("instance", |c| c.kind()),
            delegates_to: concrete.and_then(|c| c.delegate_target().cloned()),
            produces: concrete.and_then(|c| c.produces.clone()),
            has_instance: binding.instance.is_some(),
            aliases,
        }
    }

    /// Whether the binding caches its instance.
    pub fn is_shared(&self) -> bool {
        self.lifetime.is_shared() || self.has_instance
    }
}
