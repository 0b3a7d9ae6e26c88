//! Abstract identifiers used to address bindings in the container.

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Key for binding storage and lookup.
///
/// A key is the normalized form of an *abstract*: either a Rust type
/// (including trait objects such as `dyn Logger`) or a plain string name.
/// Keys compare by their canonical string form, so a type key and a named key
/// spelling the same type name address the same binding. Two type keys compare
/// by `TypeId`.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::Key;
///
/// struct Clock;
///
/// let by_type = Key::of::<Clock>();
/// let by_name = Key::named(std::any::type_name::<Clock>());
/// assert_eq!(by_type, by_name);
/// assert!(by_type.type_id().is_some());
/// assert!(by_name.type_id().is_none());
///
/// let greeter: Key = "greeter".into();
/// assert_eq!(greeter.name(), "greeter");
/// ```
#[derive(Clone)]
pub enum Key {
    /// Concrete or trait-object type with TypeId and name for diagnostics
    Type(TypeId, &'static str),
    /// Explicit string identifier
    Named(Cow<'static, str>),
}

impl Key {
    /// Key for the type `T`. Works for unsized types such as `dyn Trait`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Key::Type(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// Key for an explicit string identifier.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Key::Named(name.into())
    }

    /// Key used for contextual overrides of an untyped parameter.
    ///
    /// ```rust
    /// use ferrous_container::Key;
    /// assert_eq!(Key::parameter("username").name(), "$username");
    /// ```
    pub fn parameter(name: &str) -> Self {
        Key::Named(Cow::Owned(format!("${}", name)))
    }

    /// Canonical string form of the key.
    pub fn name(&self) -> &str {
        match self {
            Key::Type(_, name) => name,
            Key::Named(name) => name,
        }
    }

    /// The `TypeId` behind a type key, `None` for named keys.
    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            Key::Type(id, _) => Some(*id),
            Key::Named(_) => None,
        }
    }

    /// True when the key denotes a trait object, which can never be built
    /// without a binding.
    pub fn is_trait_object(&self) -> bool {
        self.name().starts_with("dyn ")
    }
}

impl PartialEq for Key {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Type(a, _), Key::Type(b, _)) => a == b,
            _ => self.name() == other.name(),
        }
    }
}

impl Eq for Key {}

// Hash by name only: equal TypeIds always carry equal names.
impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Type(_, name) => write!(f, "Type({})", name),
            Key::Named(name) => write!(f, "Named({})", name),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&'static str> for Key {
    fn from(name: &'static str) -> Self {
        Key::Named(Cow::Borrowed(name))
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Named(Cow::Owned(name))
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}
