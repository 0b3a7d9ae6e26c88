/// Concurrent access integration tests
///
/// These tests verify that the container behaves correctly when shared
/// across threads: singleton consistency, registration during resolution
/// and independent resolution stacks.

use ferrous_container::{Concrete, Container, DiError, Key, Resolver};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

// ===== Test Services =====

#[derive(Debug)]
pub struct CounterService {
    count: AtomicU32,
    created_by: String,
}

impl CounterService {
    pub fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
            created_by: format!("{:?}", thread::current().id()),
        }
    }

    pub fn increment(&self) -> u32 {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get_count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }
}

// ===== Tests =====

#[test]
fn test_concurrent_first_resolution_builds_singleton_once() {
    const THREADS: usize = 12;
    let built = Arc::new(AtomicUsize::new(0));
    let container = Container::new();

    let counter = built.clone();
    container.singleton(
        "counter",
        Concrete::factory(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            // Widen the race window
            thread::sleep(Duration::from_millis(30));
            Ok(CounterService::new())
        }),
    );

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let container = container.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let service = container.make_as::<CounterService>("counter").unwrap();
                service.increment();
                service
            })
        })
        .collect();

    let services: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert!(services.iter().all(|s| Arc::ptr_eq(s, &services[0])));
    assert_eq!(services[0].get_count(), THREADS as u32);
    assert!(!services[0].created_by.is_empty());
}

#[test]
fn test_concurrent_transients_are_independent() {
    let container = Container::new();
    container.bind_factory(|_, _| Ok(CounterService::new()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let container = container.clone();
            thread::spawn(move || {
                let service = container.get::<CounterService>().unwrap();
                for _ in 0..10 {
                    service.increment();
                }
                service.get_count()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 10);
    }
}

#[test]
fn test_concurrent_dependency_graphs() {
    let container = Container::new();
    container.singleton_factory(|_, _| Ok(CounterService::new()));
    for level in 0..4u32 {
        container.bind(
            format!("level-{}", level),
            Concrete::factory(move |ctx, _| {
                let shared = ctx.get::<CounterService>()?;
                shared.increment();
                if level == 0 {
                    Ok(1u32)
                } else {
                    let below = ctx.make_as::<u32>(format!("level-{}", level - 1))?;
                    Ok(*below + 1)
                }
            }),
        );
    }

    let barrier = Arc::new(Barrier::new(6));
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let container = container.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                *container.make_as::<u32>("level-3").unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 4);
    }
    // Four levels touched the shared counter on each of six threads
    assert_eq!(container.get::<CounterService>().unwrap().get_count(), 24);
}

#[test]
fn test_registration_while_resolving() {
    let container = Container::new();
    container.singleton("base", Concrete::value(1u32));

    let writer = {
        let container = container.clone();
        thread::spawn(move || {
            for i in 0..200u32 {
                container.bind(format!("dynamic-{}", i), Concrete::value(i));
            }
        })
    };
    let reader = {
        let container = container.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                assert_eq!(*container.make_as::<u32>("base").unwrap(), 1);
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();

    assert!(container.bound("dynamic-199"));
    assert_eq!(*container.make_as::<u32>(Key::named("dynamic-42")).unwrap(), 42);
}

#[test]
fn test_rebind_during_construction_is_not_cached() {
    let container = Container::new();
    let started = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));

    let (start, finish) = (started.clone(), release.clone());
    container.singleton(
        "config",
        Concrete::factory(move |_, _| {
            start.wait();
            finish.wait();
            Ok("stale".to_string())
        }),
    );

    let resolver = {
        let container = container.clone();
        thread::spawn(move || container.make_as::<String>("config").unwrap())
    };

    started.wait();
    container.instance("config", Arc::new("fresh".to_string()));
    release.wait();

    assert_eq!(*resolver.join().unwrap(), "stale");
    assert_eq!(*container.make_as::<String>("config").unwrap(), "fresh");
}

#[test]
fn test_concurrent_bind_if_binds_once() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 500;

    let container = Container::new();
    let barrier = Arc::new(Barrier::new(THREADS));
    let winners: Arc<Vec<AtomicUsize>> =
        Arc::new((0..ROUNDS).map(|_| AtomicUsize::new(0)).collect());

    let handles: Vec<_> = (0..THREADS)
        .map(|thread_id| {
            let container = container.clone();
            let barrier = barrier.clone();
            let winners = winners.clone();
            thread::spawn(move || {
                for round in 0..ROUNDS {
                    barrier.wait();
                    if container.bind_if(format!("slot-{}", round), Concrete::value(thread_id)) {
                        winners[round].fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for (round, count) in winners.iter().enumerate() {
        assert_eq!(count.load(Ordering::SeqCst), 1, "round {} bound more than once", round);
        assert!(container.bound(format!("slot-{}", round)));
    }
}

#[test]
fn test_cross_thread_singleton_cycle_is_reported() {
    let container = Container::new();
    for (name, other) in [("left", "right"), ("right", "left")] {
        container.singleton(
            name,
            Concrete::factory(move |ctx, _| {
                // Give the other thread time to take its own gate
                thread::sleep(Duration::from_millis(50));
                ctx.make(other)?;
                Ok(())
            }),
        );
    }

    let (tx, rx) = std::sync::mpsc::channel();
    for name in ["left", "right"] {
        let container = container.clone();
        let tx = tx.clone();
        thread::spawn(move || {
            let _ = tx.send(container.make(name).map(|_| ()));
        });
    }

    for _ in 0..2 {
        let result = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("mutually dependent singletons must not hang");
        match result {
            Err(DiError::CircularDependency(path)) => {
                assert!(path.len() >= 3);
                assert_eq!(path.first(), path.last());
            }
            other => panic!("expected circular dependency, got {:?}", other),
        }
    }
    assert!(!container.is_resolved("left"));
    assert!(!container.is_resolved("right"));
}
