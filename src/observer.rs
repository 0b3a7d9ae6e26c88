//! Diagnostic observers for resolution traceability.
//!
//! Observers are told when a resolution that builds something starts,
//! completes or fails. Cached deliveries are not reported. Keep
//! implementations lightweight: they run inline on the resolving task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::DiError;
use crate::key::Key;

/// Observer trait for resolution events.
///
/// # Examples
///
/// ```
/// use ferrous_container::{Concrete, Container, DiError, Key, ResolutionObserver};
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Recorder {
///     events: Mutex<Vec<String>>,
/// }
///
/// impl ResolutionObserver for Recorder {
///     fn resolving(&self, key: &Key) {
///         self.events.lock().unwrap().push(format!("start {}", key));
///     }
///
///     fn resolved(&self, key: &Key, _duration: Duration) {
///         self.events.lock().unwrap().push(format!("done {}", key));
///     }
///
///     fn failed(&self, key: &Key, _error: &DiError) {
///         self.events.lock().unwrap().push(format!("fail {}", key));
///     }
/// }
///
/// let recorder = Arc::new(Recorder::default());
/// let container = Container::new();
/// container.add_observer(recorder.clone());
/// container.bind("clock", Concrete::factory(|_, _| Ok(1u64)));
///
/// container.make("clock").unwrap();
/// assert!(container.make("missing").is_err());
///
/// assert_eq!(
///     *recorder.events.lock().unwrap(),
///     vec!["start clock", "done clock", "start missing", "fail missing"]
/// );
/// ```
pub trait ResolutionObserver: Send + Sync {
    /// A build of `key` is starting.
    fn resolving(&self, key: &Key);

    /// `key` was built, callbacks included, in `duration`.
    fn resolved(&self, key: &Key, duration: Duration);

    /// Building `key` failed. Fired at every level the error passes through.
    fn failed(&self, key: &Key, error: &DiError) {
        let _ = (key, error);
    }
}

/// Registered observers, snapshotted per resolution.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn ResolutionObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn ResolutionObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn resolving(&self, key: &Key) {
        for observer in &self.observers {
            observer.resolving(key);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, key: &Key, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(key, duration);
        }
    }

    #[inline]
    pub(crate) fn failed(&self, key: &Key, error: &DiError) {
        for observer in &self.observers {
            observer.failed(key, error);
        }
    }
}

/// Emits `tracing` events for every observed resolution.
///
/// ```
/// use ferrous_container::{Container, TracingObserver};
/// use std::sync::Arc;
///
/// let container = Container::new();
/// container.add_observer(Arc::new(TracingObserver::with_target("app-boot")));
/// ```
pub struct TracingObserver {
    label: String,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self {
            label: "ferrous-container".to_string(),
        }
    }

    /// Observer whose events carry `label` as a field.
    pub fn with_target(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionObserver for TracingObserver {
    fn resolving(&self, key: &Key) {
        tracing::debug!(label = %self.label, key = %key, "resolving");
    }

    fn resolved(&self, key: &Key, duration: Duration) {
        tracing::debug!(label = %self.label, key = %key, ?duration, "resolved");
    }

    fn failed(&self, key: &Key, error: &DiError) {
        tracing::warn!(label = %self.label, key = %key, %error, "resolution failed");
    }
}

/// Counts resolutions and accumulates their timings.
#[derive(Default)]
pub struct MetricsObserver {
    resolution_count: AtomicU64,
    failure_count: AtomicU64,
    total_resolution_nanos: AtomicU64,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolution_count(&self) -> u64 {
        self.resolution_count.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn total_resolution_time(&self) -> Duration {
        Duration::from_nanos(self.total_resolution_nanos.load(Ordering::Relaxed))
    }

    pub fn average_resolution_time(&self) -> Option<Duration> {
        let count = self.resolution_count();
        if count == 0 {
            return None;
        }
        Some(Duration::from_nanos(
            self.total_resolution_nanos.load(Ordering::Relaxed) / count,
        ))
    }

    pub fn reset(&self) {
        self.resolution_count.store(0, Ordering::Relaxed);
        self.failure_count.store(0, Ordering::Relaxed);
        self.total_resolution_nanos.store(0, Ordering::Relaxed);
    }
}

impl ResolutionObserver for MetricsObserver {
    fn resolving(&self, _key: &Key) {}

    fn resolved(&self, _key: &Key, duration: Duration) {
        self.resolution_count.fetch_add(1, Ordering::Relaxed);
        self.total_resolution_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    fn failed(&self, _key: &Key, _error: &DiError) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }
}
