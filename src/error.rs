//! Error types for the dependency injection container.

use thiserror::Error;

use crate::key::Key;

/// Dependency injection errors
///
/// Every failure raised while registering or resolving is reported through
/// this enum. Errors raised deep inside a recursive resolution propagate
/// unmodified to the caller of [`Container::make`](crate::Container::make).
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Container, DiError, Key};
///
/// let container = Container::new();
/// match container.make("mailer") {
///     Err(DiError::EntryNotFound(key)) => assert_eq!(key.name(), "mailer"),
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use ferrous_container::{DiError, Key};
///
/// let circular = DiError::CircularDependency(vec![
///     Key::named("engine"),
///     Key::named("spark"),
///     Key::named("engine"),
/// ]);
/// assert_eq!(circular.to_string(), "Circular dependency: engine -> spark -> engine");
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// Abstract has no binding and cannot be self-constructed
    #[error("Entry not found in container: {0}")]
    EntryNotFound(Key),
    /// Identifier re-entered on the active resolution path (includes path)
    #[error("Circular dependency: {}", join_path(.0))]
    CircularDependency(Vec<Key>),
    /// A declared parameter has no binding, no override and no default
    #[error("Unresolvable dependency resolving parameter `{parameter}` of [{owner}]{}", cause_suffix(.cause))]
    UnresolvableDependency {
        parameter: String,
        owner: Key,
        #[source]
        cause: Option<Box<DiError>>,
    },
    /// Target is abstract (a trait object) or bound to something unbuildable
    #[error("Target [{target}] is not instantiable{}", building_suffix(.building))]
    UninstantiableAbstract { target: Key, building: Vec<Key> },
    /// Typed access found a value of another type
    #[error("Type mismatch for [{key}]: expected {expected}")]
    TypeMismatch { key: Key, expected: &'static str },
    /// Maximum resolution depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// `alias(name, abstract)` where both resolve to the same key
    #[error("[{0}] is aliased to itself")]
    AliasToItself(Key),
    /// Callable or recipe asked for an argument it never declared
    #[error("Missing argument `{0}`")]
    MissingArgument(String),
    /// Failure reported by user factory code
    #[error("{0}")]
    Custom(String),
}

impl DiError {
    /// Builds a [`DiError::Custom`] from any message.
    pub fn custom(message: impl Into<String>) -> Self {
        DiError::Custom(message.into())
    }

    /// True when the error says `key` itself cannot be produced, as opposed to
    /// a failure somewhere further down its own dependency graph.
    pub(crate) fn is_missing(&self, key: &Key) -> bool {
        match self {
            DiError::EntryNotFound(k) => k == key,
            DiError::UninstantiableAbstract { target, .. } => target == key,
            DiError::UnresolvableDependency { owner, .. } => owner == key,
            _ => false,
        }
    }

    /// Cycles and runaway depth are never recovered from by optional or
    /// defaulted parameters.
    pub(crate) fn is_fatal(&self) -> bool {
        match self {
            DiError::CircularDependency(_) | DiError::DepthExceeded(_) => true,
            DiError::UnresolvableDependency { cause: Some(cause), .. } => cause.is_fatal(),
            _ => false,
        }
    }
}

fn join_path(path: &[Key]) -> String {
    path.iter().map(Key::name).collect::<Vec<_>>().join(" -> ")
}

fn cause_suffix(cause: &Option<Box<DiError>>) -> String {
    match cause {
        Some(cause) => format!(": {}", cause),
        None => String::new(),
    }
}

fn building_suffix(building: &[Key]) -> String {
    if building.is_empty() {
        String::new()
    } else {
        format!(" while building [{}]", join_path(building))
    }
}

/// Result type for DI operations
///
/// A convenience alias for `Result<T, DiError>` used throughout the crate.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{DiError, DiResult};
///
/// fn open_pool() -> DiResult<u32> {
///     Err(DiError::custom("pool exhausted"))
/// }
///
/// assert!(open_pool().is_err());
/// ```
pub type DiResult<T> = Result<T, DiError>;
