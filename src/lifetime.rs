//! Binding lifetime definitions.

/// Binding lifetimes controlling instance caching behavior
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Concrete, Container, Lifetime};
/// use std::sync::Arc;
///
/// struct Clock;
///
/// let container = Container::new();
/// container.bind_with_lifetime("clock", Concrete::factory(|_, _| Ok(Clock)), Lifetime::Singleton);
///
/// let a = container.make("clock").unwrap();
/// let b = container.make("clock").unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert!(container.is_shared("clock"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifetime {
    /// New instance per resolution, never cached
    #[default]
    Transient,
    /// Built once, cached until rebound, forgotten or flushed
    Singleton,
    /// Built once, cached until [`Container::forget_scoped_instances`](crate::Container::forget_scoped_instances)
    Scoped,
}

impl Lifetime {
    /// Whether instances of this lifetime are cached.
    #[inline]
    pub fn is_shared(self) -> bool {
        !matches!(self, Lifetime::Transient)
    }
}
