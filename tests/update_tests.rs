//! Integration tests for the update engine: migrating a Config bound to
//! one Mold version onto a newer Mold, with or without conflicts, driven
//! by how each keyval's current value relates to its old and new active
//! defaults.

use disir::config;
use disir::context::{Context, ContextKind, RestrictionKind};
use disir::value::{Value, ValueType};
use disir::version::Version;

fn server_mold(port_default: i64, port_max: i64) -> Context {
    let mold = Context::begin(None, ContextKind::Mold).unwrap();
    let name = Context::begin(Some(&mold), ContextKind::Keyval).unwrap();
    name.set_name(b"name").unwrap();
    name.set_value_type(ValueType::String).unwrap();
    name.add_default(Version::new(1, 0), Value::String(b"default".to_vec()))
        .unwrap();
    mold.attach_child("name", &name).unwrap();

    let port = Context::begin(Some(&mold), ContextKind::Keyval).unwrap();
    port.set_name(b"port").unwrap();
    port.set_value_type(ValueType::Integer).unwrap();
    port.add_default(Version::new(1, 0), Value::Integer(port_default))
        .unwrap();
    let restriction = port
        .add_restriction(Version::new(1, 0), RestrictionKind::ValueRange)
        .unwrap();
    restriction.set_restriction_range(0.0, port_max as f64).unwrap();
    mold.attach_child("port", &port).unwrap();

    mold.finalize().unwrap();
    mold
}

/// Scenario 1: a config left at the old default for `port` is a clean
/// upgrade — the value is overwritten with the new version's default.
#[test]
fn a_value_left_at_the_old_default_is_overwritten_with_the_new_default() {
    let v1 = server_mold(8080, 70000);
    let config = config::begin_config(&v1).unwrap();

    let name = Context::begin(Some(&config), ContextKind::Keyval).unwrap();
    name.set_name(b"name").unwrap();
    config.attach_child("name", &name).unwrap();
    name.set_value_string(b"old_config").unwrap();

    let port = Context::begin(Some(&config), ContextKind::Keyval).unwrap();
    port.set_name(b"port").unwrap();
    config.attach_child("port", &port).unwrap();
    port.set_value_int(8080).unwrap();
    config.finalize().unwrap();

    let v2 = server_mold(9090, 70000);
    let mut update = config.begin_update(&v2).unwrap();
    assert!(update.is_clean());
    update.continue_update().unwrap();
    assert!(update.finished());

    assert_eq!(name.value().unwrap().unwrap().get_string().unwrap(), b"old_config");
    assert_eq!(port.value().unwrap().unwrap().get_int().unwrap(), 9090);
    assert!(config.config_mold().unwrap().is_same(&v2));
}

/// Scenario 2: a user override (12345) that matches neither the old
/// default (8080) nor the new one (9090) pauses for resolution, and
/// `conflict_info` exposes the path, current value, old default, and
/// new default.
#[test]
fn a_user_override_matching_neither_default_pauses_with_full_conflict_info() {
    let v1 = server_mold(8080, 70000);
    let config = config::begin_config(&v1).unwrap();
    let port = Context::begin(Some(&config), ContextKind::Keyval).unwrap();
    port.set_name(b"port").unwrap();
    config.attach_child("port", &port).unwrap();
    port.set_value_int(12345).unwrap();
    config.finalize().unwrap();

    let v2 = server_mold(9090, 70000);
    let mut update = config.begin_update(&v2).unwrap();
    assert!(!update.is_clean());
    assert!(update.continue_update().is_err());

    let conflict = update.conflict_info().unwrap();
    assert_eq!(conflict.path, "port");
    assert_eq!(conflict.current_value.clone().unwrap().get_int().unwrap(), 12345);
    assert_eq!(conflict.old_default.clone().unwrap().get_int().unwrap(), 8080);
    assert_eq!(conflict.new_default.clone().unwrap().get_int().unwrap(), 9090);

    update.resolve(Value::Integer(9090)).unwrap();
    assert!(update.is_clean());
    update.continue_update().unwrap();
    assert!(update.finished());
    assert_eq!(port.value().unwrap().unwrap().get_int().unwrap(), 9090);
}

#[test]
fn repeated_update_to_the_same_version_is_a_no_op_clean_upgrade() {
    let v1 = server_mold(8080, 70000);
    let config = config::begin_config(&v1).unwrap();
    let port = Context::begin(Some(&config), ContextKind::Keyval).unwrap();
    port.set_name(b"port").unwrap();
    config.attach_child("port", &port).unwrap();
    port.set_value_int(75).unwrap();
    config.finalize().unwrap();

    let same_version_mold = server_mold(8080, 70000);
    let mut update = config.begin_update(&same_version_mold).unwrap();
    // 75 matches neither default, so this isn't silently clean, but it
    // is deterministic: resolving to the unchanged value settles it.
    if !update.is_clean() {
        update.resolve(Value::Integer(75)).unwrap();
    }
    update.continue_update().unwrap();
    assert_eq!(port.value().unwrap().unwrap().get_int().unwrap(), 75);
}

#[test]
fn a_value_the_target_mold_still_rejects_re_enters_conflict_on_resolve() {
    let v1 = server_mold(8080, 70000);
    let config = config::begin_config(&v1).unwrap();
    let port = Context::begin(Some(&config), ContextKind::Keyval).unwrap();
    port.set_name(b"port").unwrap();
    config.attach_child("port", &port).unwrap();
    port.set_value_int(12345).unwrap();
    config.finalize().unwrap();

    let v2 = server_mold(9090, 1024);
    let mut update = config.begin_update(&v2).unwrap();
    assert!(!update.is_clean());

    assert!(update.resolve(Value::Integer(65000)).is_err());
    assert!(!update.is_clean());

    update.resolve(Value::Integer(443)).unwrap();
    assert!(update.is_clean());
    update.continue_update().unwrap();
    assert_eq!(port.value().unwrap().unwrap().get_int().unwrap(), 443);
}

#[test]
fn discarding_a_paused_update_leaves_the_config_bound_to_its_original_mold() {
    let v1 = server_mold(8080, 70000);
    let config = config::begin_config(&v1).unwrap();
    let port = Context::begin(Some(&config), ContextKind::Keyval).unwrap();
    port.set_name(b"port").unwrap();
    config.attach_child("port", &port).unwrap();
    port.set_value_int(12345).unwrap();
    config.finalize().unwrap();

    let v2 = server_mold(9090, 70000);
    let update = config.begin_update(&v2).unwrap();
    update.discard();

    assert!(config.config_mold().unwrap().is_same(&v1));
    assert_eq!(port.value().unwrap().unwrap().get_int().unwrap(), 12345);
}
