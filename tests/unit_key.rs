/// Unit tests for Key identity, naming and conversions

use ferrous_container::Key;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};

trait Plugin {}

#[test]
fn test_type_key_carries_type_name() {
    let key = Key::of::<String>();
    assert_eq!(key.name(), std::any::type_name::<String>());
    assert_eq!(key.type_id(), Some(TypeId::of::<String>()));
    assert_eq!(key.to_string(), key.name());
}

#[test]
fn test_named_key() {
    let key = Key::named("mailer");
    assert_eq!(key.name(), "mailer");
    assert_eq!(key.type_id(), None);
    assert_eq!(format!("{:?}", key), "Named(mailer)");
}

#[test]
fn test_parameter_key_is_prefixed() {
    assert_eq!(Key::parameter("quality"), Key::named("$quality"));
}

#[test]
fn test_type_key_equals_its_name() {
    assert_eq!(Key::of::<u32>(), Key::named(std::any::type_name::<u32>()));
    assert_ne!(Key::of::<u32>(), Key::of::<u64>());
    assert_ne!(Key::named("u32 "), Key::of::<u32>());
}

#[test]
fn test_keys_index_hash_maps_interchangeably() {
    let mut map = HashMap::new();
    map.insert(Key::of::<String>(), 1);
    map.insert(Key::named("mailer"), 2);

    assert_eq!(map.get(&Key::named(std::any::type_name::<String>())), Some(&1));
    assert_eq!(map.get(&Key::from("mailer")), Some(&2));
    assert_eq!(map.get(&Key::from("mailer".to_string())), Some(&2));
}

#[test]
fn test_trait_object_keys() {
    let key = Key::of::<dyn Plugin>();
    assert!(key.is_trait_object());
    assert!(key.name().starts_with("dyn "));
    assert!(!Key::of::<Box<dyn Plugin>>().is_trait_object());
}

#[test]
fn test_distinct_keys_in_set() {
    let set: HashSet<Key> = [
        Key::of::<u8>(),
        Key::of::<u16>(),
        Key::named("u8"),
        Key::named("cache"),
        Key::named("cache"),
    ]
    .into_iter()
    .collect();

    // `u8` as a name equals the type key of u8
    assert_eq!(set.len(), 3);
}
