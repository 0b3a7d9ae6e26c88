//! # ferrous-container
//!
//! Runtime dependency injection container: bind abstract keys to concrete
//! producers, then resolve whole object graphs on demand.
//!
//! ## Features
//!
//! - **Bindings**: transient, singleton and scoped, keyed by type or by name
//! - **Self-constructible types**: declare a constructor signature with
//!   [`Injectable`] and the container fills it in recursively
//! - **Contextual bindings**: give one consumer a different implementation
//! - **Aliases**: chains of names resolving to one binding
//! - **Callbacks and extenders**: hooks before, during and after resolution,
//!   plus transforms that replace the built instance
//! - **Circular dependency detection**: errors carry the full path
//! - **Async factories**: producers that await, resolved with [`Container::make_async`]
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_container::{Arguments, Concrete, Container, DiResult, Injectable, Param, Resolver};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! impl Injectable for UserService {
//!     fn parameters() -> Vec<Param> {
//!         vec![Param::of::<Database>("db")]
//!     }
//!
//!     fn construct(args: Arguments) -> DiResult<Self> {
//!         Ok(UserService { db: args.get("db")? })
//!     }
//! }
//!
//! let container = Container::new();
//! container.singleton_factory(|_, _| Ok(Database { url: "postgres://localhost".into() }));
//!
//! let users = container.resolve::<UserService>().unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//!
//! // Singletons are shared
//! let again = container.resolve::<UserService>().unwrap();
//! assert!(Arc::ptr_eq(&users.db, &again.db));
//! ```
//!
//! ## Lifetimes
//!
//! - **Transient**: built fresh on every resolution
//! - **Singleton**: built once, cached until forgotten or rebound
//! - **Scoped**: cached like a singleton, dropped by
//!   [`Container::forget_scoped_instances`]
//!
//! ## Trait Objects
//!
//! ```rust
//! use ferrous_container::{Concrete, Container, Resolver};
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, message: &str) -> String;
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, message: &str) -> String {
//!         format!("[LOG] {}", message)
//!     }
//! }
//!
//! let container = Container::new();
//! container.singleton(
//!     ferrous_container::Key::of::<dyn Logger>(),
//!     Concrete::trait_object::<dyn Logger>(Arc::new(ConsoleLogger)),
//! );
//!
//! let logger = container.make_trait::<dyn Logger>().unwrap();
//! assert_eq!(logger.log("hello"), "[LOG] hello");
//! ```
//!
//! ## Contextual Bindings
//!
//! ```rust
//! use ferrous_container::{Concrete, Container, Resolver};
//!
//! let container = Container::new();
//! container.bind("disk", Concrete::value("local".to_string()));
//! container.when("photos").needs("disk").give_value("s3".to_string());
//! container.bind("photos", Concrete::factory(|ctx, _| {
//!     ctx.make_as::<String>("disk").map(|disk| format!("photos on {}", disk))
//! }));
//!
//! assert_eq!(*container.make_as::<String>("photos").unwrap(), "photos on s3");
//! assert_eq!(*container.make_as::<String>("disk").unwrap(), "local");
//! ```

pub mod async_factories;
pub mod config;
pub mod container;
pub mod decoration;
pub mod descriptors;
pub mod dispatcher;
pub mod error;
pub mod injectable;
pub mod invoker;
pub mod key;
pub mod lifetime;
pub mod observer;
pub mod parameters;
pub mod traits;

// Internal modules
mod internal;
mod registration;

// Re-export core types
pub use async_factories::AsyncFactory;
pub use config::{
    ConfigRepository, ConfigSource, ConfigValue, EnvironmentConfigSource, MemoryConfigSource,
};
pub use container::{Container, ContextualBindingBuilder, ContextualNeeds, ResolverContext};
pub use decoration::{Extender, ServiceDecorator};
pub use descriptors::BindingDescriptor;
pub use dispatcher::{BeforeCallback, Callback};
pub use error::{DiError, DiResult};
pub use injectable::{Injectable, Recipe};
pub use invoker::Callable;
pub use key::Key;
pub use lifetime::Lifetime;
pub use observer::{MetricsObserver, ResolutionObserver, TracingObserver};
pub use parameters::{Arguments, Instance, Param, Parameters};
pub use registration::Concrete;
pub use traits::{Resolver, ResolverCore};
