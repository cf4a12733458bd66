use std::collections::HashMap;

use disir::archive::{ArchiveExport, EntryStatus, Import, ImportAction, Resolution};
use disir::context::{Context, ContextKind, RestrictionKind};
use disir::value::{Value, ValueType};
use disir::version::Version;

fn temp_config_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("failed to create temp directory")
}

fn enum_mold() -> Context {
    let mold = Context::begin(None, ContextKind::Mold).unwrap();
    let level = Context::begin(Some(&mold), ContextKind::Keyval).unwrap();
    level.set_name(b"log_level").unwrap();
    level.set_value_type(ValueType::Enum).unwrap();
    let restriction = level
        .add_restriction(Version::new(1, 0), RestrictionKind::ValueEnum)
        .unwrap();
    restriction.set_restriction_enum("info").unwrap();
    let restriction2 = level
        .add_restriction(Version::new(1, 0), RestrictionKind::ValueEnum)
        .unwrap();
    restriction2.set_restriction_enum("debug").unwrap();
    mold.attach_child("log_level", &level).unwrap();
    mold.finalize().unwrap();
    mold
}

#[test]
fn enum_restriction_admits_any_active_listed_value() {
    let mold = enum_mold();
    let config = disir::config::begin_config(&mold).unwrap();
    let keyval = Context::begin(Some(&config), ContextKind::Keyval).unwrap();
    keyval.set_name(b"log_level").unwrap();
    config.attach_child("log_level", &keyval).unwrap();

    assert!(keyval.set_value_enum("info").is_ok());
    assert!(keyval.set_value_enum("debug").is_ok());
    assert!(keyval.set_value_enum("trace").is_err());
}

#[test]
fn documentation_resolves_to_the_active_version() {
    let mold = Context::begin(None, ContextKind::Mold).unwrap();
    mold.add_documentation(Version::new(1, 0), "initial release")
        .unwrap();
    mold.add_documentation(Version::new(2, 0), "adds TLS support")
        .unwrap();

    assert_eq!(
        mold.get_documentation(&Version::new(1, 5)).unwrap(),
        Some("initial release".to_string())
    );
    assert_eq!(
        mold.get_documentation(&Version::new(2, 0)).unwrap(),
        Some("adds TLS support".to_string())
    );
}

#[test]
fn mold_version_tracks_the_deepest_introduced_entry() {
    let mold = enum_mold();
    assert_eq!(mold.mold_version().unwrap(), Version::new(1, 0));

    let keyval = mold.find_element("log_level").unwrap().unwrap();
    keyval
        .add_default(Version::new(3, 1), Value::Enum("info".to_string()))
        .unwrap();
    assert_eq!(mold.mold_version().unwrap(), Version::new(3, 1));
}

#[test]
fn config_version_cannot_exceed_its_mold() {
    let mold = enum_mold();
    let config = disir::config::begin_config(&mold).unwrap();
    assert!(config.set_config_version(Version::new(9, 9)).is_err());
    assert!(config.set_config_version(Version::new(1, 0)).is_ok());
}

#[test]
fn archive_export_then_import_round_trips_a_config() {
    let mold = enum_mold();
    let config = disir::config::begin_config(&mold).unwrap();
    let keyval = Context::begin(Some(&config), ContextKind::Keyval).unwrap();
    keyval.set_name(b"log_level").unwrap();
    config.attach_child("log_level", &keyval).unwrap();
    keyval.set_value_enum("debug").unwrap();
    config.finalize().unwrap();

    let mut configs = HashMap::new();
    configs.insert("primary".to_string(), config);

    let mut export = ArchiveExport::begin();
    export.append_group("app", &configs).unwrap();

    let dir = temp_config_dir();
    let path = dir.path().join("bundle.disar");
    export.finalize(&path).unwrap();

    let existing: HashMap<(String, String), Context> = HashMap::new();
    let mut molds = HashMap::new();
    molds.insert("app".to_string(), mold.clone());
    let (mut import, pending) = Import::begin(&path, &existing, &molds).unwrap();
    assert_eq!(pending, 0);
    let info = import.entry_status(0).unwrap();
    assert_eq!(info.entry_id, "primary");
    assert_eq!(info.group_id, "app");
    assert_eq!(info.status, EntryStatus::Ok);

    import.resolve_entry(0, Resolution::Do).unwrap();

    let report = import.finalize(ImportAction::Do, &molds).unwrap();
    assert_eq!(report.imported, vec![("app".to_string(), "primary".to_string())]);
}

#[test]
fn archive_import_rejects_resolution_outside_the_validity_matrix() {
    let mold = enum_mold();
    let config = disir::config::begin_config(&mold).unwrap();
    let keyval = Context::begin(Some(&config), ContextKind::Keyval).unwrap();
    keyval.set_name(b"log_level").unwrap();
    config.attach_child("log_level", &keyval).unwrap();
    keyval.set_value_enum("info").unwrap();
    config.finalize().unwrap();

    let mut export = ArchiveExport::begin();
    export.append_entry("app", "primary", &config).unwrap();
    let dir = temp_config_dir();
    let path = dir.path().join("bundle.disar");
    export.finalize(&path).unwrap();

    let existing: HashMap<(String, String), Context> = HashMap::new();
    let mut molds = HashMap::new();
    molds.insert("app".to_string(), mold);
    let (mut import, _) = Import::begin(&path, &existing, &molds).unwrap();
    // An `ok` entry cannot be `update`'d: there is nothing to reconcile.
    assert!(import.resolve_entry(0, Resolution::Update).is_err());
}

#[test]
fn archive_import_reports_conflicting_semver_against_an_upgraded_mold() {
    let mold_v1 = enum_mold();
    let config = disir::config::begin_config(&mold_v1).unwrap();
    let keyval = Context::begin(Some(&config), ContextKind::Keyval).unwrap();
    keyval.set_name(b"log_level").unwrap();
    config.attach_child("log_level", &keyval).unwrap();
    keyval.set_value_enum("info").unwrap();
    config.finalize().unwrap();

    let mut export = ArchiveExport::begin();
    export.append_entry("prod", "db", &config).unwrap();
    let dir = temp_config_dir();
    let path = dir.path().join("bundle.disar");
    export.finalize(&path).unwrap();

    let installed_mold = enum_mold();
    let level = installed_mold.find_element("log_level").unwrap().unwrap();
    level
        .add_default(Version::new(1, 1), Value::Enum("info".to_string()))
        .unwrap();

    let existing: HashMap<(String, String), Context> = HashMap::new();
    let mut molds = HashMap::new();
    molds.insert("prod".to_string(), installed_mold);
    let (mut import, pending) = Import::begin(&path, &existing, &molds).unwrap();
    assert_eq!(pending, 1);

    let info = import.entry_status(0).unwrap();
    assert_eq!(info.status, EntryStatus::ConflictingSemver);

    assert!(import.resolve_entry(0, Resolution::Do).is_err());
    import.resolve_entry(0, Resolution::Update).unwrap();
}
