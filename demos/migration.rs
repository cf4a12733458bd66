use disir::config;
use disir::context::{Context, ContextKind};
use disir::value::{Value, ValueType};
use disir::version::Version;

fn server_mold_v1() -> Context {
    let mold = Context::begin(None, ContextKind::Mold).unwrap();
    let host = Context::begin(Some(&mold), ContextKind::Keyval).unwrap();
    host.set_name(b"host").unwrap();
    host.set_value_type(ValueType::String).unwrap();
    host.add_default(Version::new(1, 0), Value::String(b"localhost".to_vec()))
        .unwrap();
    mold.attach_child("host", &host).unwrap();

    let port = Context::begin(Some(&mold), ContextKind::Keyval).unwrap();
    port.set_name(b"port").unwrap();
    port.set_value_type(ValueType::Integer).unwrap();
    port.add_default(Version::new(1, 0), Value::Integer(8080))
        .unwrap();
    mold.attach_child("port", &port).unwrap();

    mold.finalize().unwrap();
    mold
}

/// v2 adds `use_tls`, defaulted from version 2 onward.
fn server_mold_v2() -> Context {
    let mold = Context::begin(None, ContextKind::Mold).unwrap();
    let host = Context::begin(Some(&mold), ContextKind::Keyval).unwrap();
    host.set_name(b"host").unwrap();
    host.set_value_type(ValueType::String).unwrap();
    host.add_default(Version::new(1, 0), Value::String(b"localhost".to_vec()))
        .unwrap();
    mold.attach_child("host", &host).unwrap();

    let port = Context::begin(Some(&mold), ContextKind::Keyval).unwrap();
    port.set_name(b"port").unwrap();
    port.set_value_type(ValueType::Integer).unwrap();
    port.add_default(Version::new(1, 0), Value::Integer(8080))
        .unwrap();
    mold.attach_child("port", &port).unwrap();

    let use_tls = Context::begin(Some(&mold), ContextKind::Keyval).unwrap();
    use_tls.set_name(b"use_tls").unwrap();
    use_tls.set_value_type(ValueType::Boolean).unwrap();
    use_tls
        .add_default(Version::new(2, 0), Value::Boolean(true))
        .unwrap();
    mold.attach_child("use_tls", &use_tls).unwrap();

    mold.finalize().unwrap();
    mold
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    disir::logging::init_tracing();

    let v1 = server_mold_v1();
    let config = config::begin_config(&v1)?;

    let host = Context::begin(Some(&config), ContextKind::Keyval)?;
    host.set_name(b"host")?;
    config.attach_child("host", &host)?;
    host.set_value_string(b"production.example.com")?;

    let port = Context::begin(Some(&config), ContextKind::Keyval)?;
    port.set_name(b"port")?;
    config.attach_child("port", &port)?;
    port.set_value_int(443)?;
    config.finalize()?;

    println!("before update: config version {}", config.config_version()?);

    let v2 = server_mold_v2();
    let mut update = config.begin_update(&v2)?;
    if update.is_clean() {
        update.continue_update()?;
    } else {
        while let Some(conflict) = update.conflict_info() {
            println!("conflict at {}: keeping default", conflict.path);
            let resolved = conflict.new_default.clone().unwrap_or(Value::Boolean(false));
            update.resolve(resolved)?;
        }
        update.continue_update()?;
    }

    println!("after update: config version {}", config.config_version()?);
    println!("config is now bound to the v2 mold; new keyvals like use_tls");
    println!("still need to be added to the config tree explicitly");

    Ok(())
}
