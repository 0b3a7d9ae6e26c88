/// Property-based tests for resolution
///
/// These tests verify that resolution behavior follows expected patterns
/// regardless of the specific keys, values or chain lengths used.

use ferrous_container::{Concrete, Container, DiError, Key, Parameters, Resolver};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct ServiceA {
    value: String,
}

// Property: shared bindings always resolve to the same instance
proptest! {
    #[test]
    fn singleton_resolution_consistency(value in "\\PC{0,50}", resolutions in 2usize..10) {
        let container = Container::new();
        let stored = value.clone();
        container.singleton("a", Concrete::factory(move |_, _| Ok(ServiceA { value: stored.clone() })));

        let first = container.make_as::<ServiceA>("a").unwrap();
        for _ in 1..resolutions {
            let next = container.make_as::<ServiceA>("a").unwrap();
            prop_assert!(Arc::ptr_eq(&first, &next));
        }
        prop_assert_eq!(&first.value, &value);
    }
}

// Property: transient factories run once per resolution
proptest! {
    #[test]
    fn transient_resolution_builds_every_time(resolutions in 1usize..20) {
        let built = Arc::new(AtomicUsize::new(0));
        let container = Container::new();
        let counter = built.clone();
        container.bind("a", Concrete::factory(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(ServiceA { value: String::new() })
        }));

        let mut seen: Vec<Arc<ServiceA>> = Vec::new();
        for _ in 0..resolutions {
            let next = container.make_as::<ServiceA>("a").unwrap();
            prop_assert!(seen.iter().all(|s| !Arc::ptr_eq(s, &next)));
            seen.push(next);
        }
        prop_assert_eq!(built.load(Ordering::SeqCst), resolutions);
    }
}

// Property: alias chains of any length resolve to their target
proptest! {
    #[test]
    fn alias_chain_resolves_to_target(length in 1usize..25, target in 0u64..1000) {
        let container = Container::new();
        container.singleton("target", Concrete::value(target));

        let mut previous = Key::named("target");
        for link in 0..length {
            let name = Key::named(format!("alias-{}", link));
            container.alias(name.clone(), previous).unwrap();
            previous = name;
        }

        prop_assert_eq!(container.get_alias(previous.clone()), Key::named("target"));
        prop_assert_eq!(*container.make_as::<u64>(previous).unwrap(), target);
    }
}

// Property: closing an alias chain into a loop is always refused
proptest! {
    #[test]
    fn alias_loops_are_rejected(length in 1usize..10) {
        let container = Container::new();
        for link in 0..length {
            container
                .alias(format!("alias-{}", link), format!("alias-{}", link + 1))
                .unwrap();
        }

        let closing = container.alias(format!("alias-{}", length), "alias-0");
        prop_assert!(matches!(closing, Err(DiError::AliasToItself(_))));
    }
}

// Property: conditional binding never replaces an existing binding
proptest! {
    #[test]
    fn bind_if_never_overrides(first in any::<u32>(), second in any::<u32>()) {
        let container = Container::new();
        prop_assert!(container.bind_if("n", Concrete::value(first)));
        prop_assert!(!container.bind_if("n", Concrete::value(second)));
        prop_assert_eq!(*container.make_as::<u32>("n").unwrap(), first);
    }
}

// Property: resolution with parameters never touches the singleton cache
proptest! {
    #[test]
    fn parameters_bypass_cache(values in proptest::collection::vec(any::<u32>(), 1..8)) {
        let container = Container::new();
        container.singleton("echo", Concrete::factory(|_, params| {
            Ok(params.get::<u32>("value").map_or(0, |v| *v))
        }));

        for value in &values {
            let echoed = container
                .make_as_with::<u32>("echo", Parameters::new().with("value", *value))
                .unwrap();
            prop_assert_eq!(*echoed, *value);
        }
        prop_assert_eq!(*container.make_as::<u32>("echo").unwrap(), 0);
    }
}

// Property: cycles of any length fail with the full path
proptest! {
    #[test]
    fn cycles_report_full_path(length in 1usize..12) {
        let container = Container::new();
        for node in 0..length {
            let next = format!("node-{}", (node + 1) % length);
            container.bind(format!("node-{}", node), Concrete::factory(move |ctx, _| {
                ctx.make(next.clone())?;
                Ok(())
            }));
        }

        match container.make("node-0") {
            Err(DiError::CircularDependency(path)) => {
                prop_assert_eq!(path.len(), length + 1);
                prop_assert_eq!(path.first(), path.last());
            }
            other => prop_assert!(false, "expected circular dependency, got {:?}", other.map(|_| ())),
        }
    }
}
