use ferrous_container::{
    Callback, Concrete, Container, DiError, Extender, Instance, Key, Parameters, Resolver,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct Clock {
    serial: u32,
}

#[derive(Debug)]
struct Counter {
    ticks: AtomicUsize,
}

type Events = Arc<Mutex<Vec<String>>>;

fn recorder(events: &Events, label: &'static str) -> impl Fn(&Instance, &Container) + Send + Sync {
    let events = events.clone();
    move |_, _| events.lock().unwrap().push(label.to_string())
}

fn taken(events: &Events) -> Vec<String> {
    std::mem::take(&mut *events.lock().unwrap())
}

#[test]
fn test_global_resolving_fires_for_every_make() {
    let seen = Arc::new(AtomicUsize::new(0));
    let container = Container::new();
    container.bind("a", Concrete::value(1u8));
    container.bind("b", Concrete::value(2u8));

    let counter = seen.clone();
    container.resolving(move |_: &Instance, _: &Container| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    container.make("a").unwrap();
    container.make("b").unwrap();
    container.make("a").unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[test]
fn test_scoped_callback_fires_only_for_its_key() {
    let events: Events = Arc::default();
    let container = Container::new();
    container.bind("a", Concrete::value(1u8));
    container.bind("b", Concrete::value(2u8));
    container.resolving_for("a", recorder(&events, "a"));
    container.after_resolving_for("b", recorder(&events, "b"));

    container.make("a").unwrap();
    container.make("a").unwrap();
    container.make("b").unwrap();

    assert_eq!(taken(&events), ["a", "a", "b"]);
}

#[test]
fn test_phase_order_for_fresh_and_cached_builds() {
    let events: Events = Arc::default();
    let container = Container::new();
    container.singleton("clock", Concrete::factory(|_, _| Ok(Clock { serial: 1 })));

    let before = events.clone();
    container.before_resolving(move |key, _, _| {
        before.lock().unwrap().push(format!("before {}", key));
    });
    let before_for = events.clone();
    container.before_resolving_for("clock", move |_, _, _| {
        before_for.lock().unwrap().push("before scoped".to_string());
    });
    container.after_resolving_for("clock", recorder(&events, "after clock"));
    container.after_resolving(recorder(&events, "after"));
    container.resolving_for("clock", recorder(&events, "resolving clock"));
    container.resolving(recorder(&events, "resolving"));
    let extended = events.clone();
    container
        .extend(
            "clock",
            Extender::new(move |instance, _| {
                extended.lock().unwrap().push("extend".to_string());
                Ok(instance)
            }),
        )
        .unwrap();

    container.make("clock").unwrap();
    assert_eq!(
        taken(&events),
        [
            "before clock",
            "before scoped",
            "resolving",
            "resolving clock",
            "extend",
            "after",
            "after clock"
        ]
    );

    container.make("clock").unwrap();
    assert_eq!(
        taken(&events),
        ["before clock", "before scoped", "after", "after clock"]
    );
}

#[test]
fn test_callbacks_match_runtime_type_of_named_binding() {
    let events: Events = Arc::default();
    let container = Container::new();
    container.bind("primary", Concrete::factory(|_, _| Ok(Clock { serial: 1 })));
    container.bind("count", Concrete::value(3u32));
    container.resolving_for(Key::of::<Clock>(), recorder(&events, "clock built"));

    container.make("primary").unwrap();
    container.make("count").unwrap();

    assert_eq!(taken(&events), ["clock built"]);
}

#[test]
fn test_typed_callback_skips_other_types() {
    let total = Arc::new(AtomicUsize::new(0));
    let container = Container::new();
    container.bind("clock", Concrete::factory(|_, _| Ok(Clock { serial: 4 })));
    container.bind("name", Concrete::value("clock".to_string()));

    let sum = total.clone();
    container.after_resolving(Callback::typed::<Clock, _>(move |clock, _| {
        sum.fetch_add(clock.serial as usize, Ordering::SeqCst);
    }));

    container.make("clock").unwrap();
    container.make("name").unwrap();
    container.make("clock").unwrap();

    assert_eq!(total.load(Ordering::SeqCst), 8);
}

#[test]
fn test_resolving_callback_mutates_through_interior_mutability() {
    let container = Container::new();
    container.singleton("counter", Concrete::factory(|_, _| Ok(Counter { ticks: AtomicUsize::new(0) })));
    container.resolving_for(
        "counter",
        Callback::typed::<Counter, _>(|counter, _| {
            counter.ticks.fetch_add(10, Ordering::SeqCst);
        }),
    );

    let counter = container.make_as::<Counter>("counter").unwrap();
    container.make("counter").unwrap();

    assert_eq!(counter.ticks.load(Ordering::SeqCst), 10);
}

#[test]
fn test_before_resolving_sees_parameters() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let container = Container::new();
    container.bind("report", Concrete::factory(|_, params| {
        Ok(params.get::<u32>("id").map_or(0, |id| *id))
    }));

    let names = seen.clone();
    container.before_resolving_for("report", move |key, params, _| {
        let listed: Vec<&str> = params.names().collect();
        names.lock().unwrap().push(format!("{} {:?}", key, listed));
    });

    let report = container
        .make_as_with::<u32>("report", Parameters::new().with("id", 7u32))
        .unwrap();

    assert_eq!(*report, 7);
    assert_eq!(*seen.lock().unwrap(), ["report [\"id\"]"]);
}

#[test]
fn test_before_resolving_fires_for_missing_keys() {
    let events: Events = Arc::default();
    let container = Container::new();
    let before = events.clone();
    container.before_resolving(move |key, _, _| {
        before.lock().unwrap().push(key.to_string());
    });

    assert!(container.make("ghost").is_err());
    assert_eq!(taken(&events), ["ghost"]);
}

#[test]
fn test_instance_fires_only_resolved_phase() {
    let events: Events = Arc::default();
    let container = Container::new();
    container.instance("clock", Arc::new(Clock { serial: 1 }));
    container.resolving(recorder(&events, "resolving"));
    container.after_resolving(recorder(&events, "after"));

    container.make("clock").unwrap();

    assert_eq!(taken(&events), ["after"]);
}

#[test]
fn test_extend_replaces_instance() {
    let container = Container::new();
    container.bind("greeting", Concrete::value("hello".to_string()));
    container
        .extend(
            "greeting",
            Extender::typed::<String, _>(|greeting, _| Ok(Arc::new(format!("{}!", greeting)))),
        )
        .unwrap();
    container
        .extend(
            "greeting",
            Extender::typed::<String, _>(|greeting, _| Ok(Arc::new(greeting.to_uppercase()))),
        )
        .unwrap();

    assert_eq!(*container.make_as::<String>("greeting").unwrap(), "HELLO!");

    container.forget_extenders("greeting");
    assert_eq!(*container.make_as::<String>("greeting").unwrap(), "hello");
}

#[test]
fn test_extend_applies_to_cached_instance_immediately() {
    let built = Arc::new(AtomicUsize::new(0));
    let container = Container::new();
    let counter = built.clone();
    container.singleton(
        "greeting",
        Concrete::factory(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok("hello".to_string())
        }),
    );
    container.make("greeting").unwrap();

    container
        .extend(
            "greeting",
            Extender::typed::<String, _>(|greeting, _| Ok(Arc::new(format!("{} world", greeting)))),
        )
        .unwrap();

    assert_eq!(*container.make_as::<String>("greeting").unwrap(), "hello world");
    assert_eq!(built.load(Ordering::SeqCst), 1);

    // Later builds are extended too
    container.forget_instance("greeting");
    assert_eq!(*container.make_as::<String>("greeting").unwrap(), "hello world");
    assert_eq!(built.load(Ordering::SeqCst), 2);
}

#[test]
fn test_extender_type_mismatch_fails_resolution() {
    let container = Container::new();
    container.bind("answer", Concrete::value(42u32));
    container
        .extend("answer", Extender::typed::<String, _>(|value, _| Ok(value)))
        .unwrap();

    assert!(matches!(
        container.make("answer"),
        Err(DiError::TypeMismatch { key, .. }) if key == Key::named("answer")
    ));
}

#[test]
fn test_rebinding_fires_with_new_instance() {
    let serials: Arc<Mutex<Vec<u32>>> = Arc::default();
    let container = Container::new();
    container.singleton("clock", Concrete::value(Clock { serial: 1 }));

    let seen = serials.clone();
    let current = container
        .rebinding(
            "clock",
            Callback::typed::<Clock, _>(move |clock, _| seen.lock().unwrap().push(clock.serial)),
        )
        .unwrap();
    assert_eq!(current.unwrap().downcast_ref::<Clock>().unwrap().serial, 1);

    container.singleton("clock", Concrete::value(Clock { serial: 2 }));
    container.instance("clock", Arc::new(Clock { serial: 3 }));

    assert_eq!(*serials.lock().unwrap(), [2, 3]);
}

#[test]
fn test_rebinding_unbound_key_waits_for_resolution() {
    let fired = Arc::new(AtomicUsize::new(0));
    let container = Container::new();

    let counter = fired.clone();
    let current = container
        .rebinding("mailer", move |_: &Instance, _: &Container| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    assert!(current.is_none());

    // First binding of a never-resolved key is not a rebind
    container.bind("mailer", Concrete::value(1u8));
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    container.make("mailer").unwrap();
    container.bind("mailer", Concrete::value(2u8));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_flush_clears_callbacks() {
    let events: Events = Arc::default();
    let container = Container::new();
    container.resolving(recorder(&events, "resolving"));

    container.flush();
    container.bind("clock", Concrete::value(Clock { serial: 1 }));
    container.make("clock").unwrap();

    assert!(taken(&events).is_empty());
}

#[tokio::test]
async fn test_async_callbacks_keep_registration_order() {
    let events: Events = Arc::default();
    let container = Container::new();
    container.bind("clock", Concrete::factory(|_, _| Ok(Clock { serial: 1 })));

    let slow = events.clone();
    container.resolving(Callback::future(move |_, _| {
        let slow = slow.clone();
        async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            slow.lock().unwrap().push("slow".to_string());
        }
    }));
    container.resolving(recorder(&events, "fast"));

    let extended = events.clone();
    container
        .extend(
            "clock",
            Extender::future(move |instance, _| {
                let extended = extended.clone();
                async move {
                    tokio::task::yield_now().await;
                    extended.lock().unwrap().push("extend".to_string());
                    Ok::<_, DiError>(instance)
                }
            }),
        )
        .unwrap();

    container.make_async("clock", Parameters::new()).await.unwrap();

    assert_eq!(taken(&events), ["slow", "fast", "extend"]);
}
