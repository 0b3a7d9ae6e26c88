/// Unit tests for DiError and DiResult types

use ferrous_container::{DiError, DiResult, Key};
use std::error::Error;

#[test]
fn test_error_display_entry_not_found() {
    let error = DiError::EntryNotFound(Key::named("mailer"));
    assert_eq!(error.to_string(), "Entry not found in container: mailer");
}

#[test]
fn test_error_display_circular() {
    let path = vec![Key::named("engine"), Key::named("spark"), Key::named("engine")];
    let error = DiError::CircularDependency(path);
    assert_eq!(error.to_string(), "Circular dependency: engine -> spark -> engine");
}

#[test]
fn test_error_display_empty_circular_path() {
    let error = DiError::CircularDependency(vec![]);
    assert_eq!(error.to_string(), "Circular dependency: ");
}

#[test]
fn test_error_display_unresolvable_with_and_without_cause() {
    let bare = DiError::UnresolvableDependency {
        parameter: "quality".into(),
        owner: Key::named("uploader"),
        cause: None,
    };
    assert_eq!(
        bare.to_string(),
        "Unresolvable dependency resolving parameter `quality` of [uploader]"
    );

    let caused = DiError::UnresolvableDependency {
        parameter: "mailer".into(),
        owner: Key::named("notifier"),
        cause: Some(Box::new(DiError::EntryNotFound(Key::named("mailer")))),
    };
    assert_eq!(
        caused.to_string(),
        "Unresolvable dependency resolving parameter `mailer` of [notifier]: \
         Entry not found in container: mailer"
    );
}

#[test]
fn test_error_display_uninstantiable() {
    let top = DiError::UninstantiableAbstract {
        target: Key::named("dyn Logger"),
        building: vec![],
    };
    assert_eq!(top.to_string(), "Target [dyn Logger] is not instantiable");

    let nested = DiError::UninstantiableAbstract {
        target: Key::named("dyn Logger"),
        building: vec![Key::named("app"), Key::named("service")],
    };
    assert_eq!(
        nested.to_string(),
        "Target [dyn Logger] is not instantiable while building [app -> service]"
    );
}

#[test]
fn test_error_display_misc_variants() {
    let mismatch = DiError::TypeMismatch {
        key: Key::named("answer"),
        expected: "alloc::string::String",
    };
    assert_eq!(
        mismatch.to_string(),
        "Type mismatch for [answer]: expected alloc::string::String"
    );
    assert_eq!(DiError::DepthExceeded(1024).to_string(), "Max depth 1024 exceeded");
    assert_eq!(
        DiError::AliasToItself(Key::named("loop")).to_string(),
        "[loop] is aliased to itself"
    );
    assert_eq!(
        DiError::MissingArgument("user".into()).to_string(),
        "Missing argument `user`"
    );
    assert_eq!(DiError::custom("pool exhausted").to_string(), "pool exhausted");
}

#[test]
fn test_error_is_std_error_without_source() {
    let error = DiError::EntryNotFound(Key::named("x"));
    let dynamic: &dyn Error = &error;
    assert!(dynamic.source().is_none());
}

#[test]
fn test_unresolvable_dependency_exposes_its_cause() {
    let error = DiError::UnresolvableDependency {
        parameter: "mailer".into(),
        owner: Key::named("notifier"),
        cause: Some(Box::new(DiError::EntryNotFound(Key::named("mailer")))),
    };
    let source = error.source().expect("cause should be the source");
    assert_eq!(source.to_string(), "Entry not found in container: mailer");

    let bare = DiError::UnresolvableDependency {
        parameter: "quality".into(),
        owner: Key::named("uploader"),
        cause: None,
    };
    assert!(bare.source().is_none());
}

#[test]
fn test_error_clone_and_debug() {
    let error = DiError::CircularDependency(vec![Key::named("a"), Key::named("a")]);
    let cloned = error.clone();
    assert_eq!(error.to_string(), cloned.to_string());
    assert!(format!("{:?}", cloned).contains("CircularDependency"));
}

#[test]
fn test_diresult_propagation() {
    fn fails() -> DiResult<u32> {
        Err(DiError::custom("boom"))
    }

    fn propagates() -> DiResult<u32> {
        let value = fails()?;
        Ok(value + 1)
    }

    assert!(matches!(propagates(), Err(DiError::Custom(message)) if message == "boom"));
}
