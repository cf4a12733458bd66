use disir::config;
use disir::context::{Context, ContextKind};
use disir::serialize::{Serializer, TomlAdapter};
use disir::value::{Value, ValueType};
use disir::version::Version;

/// Builds the mold for a small application config: a `server` section
/// with a port and a debug flag.
fn app_mold() -> Context {
    let mold = Context::begin(None, ContextKind::Mold).unwrap();
    mold.add_documentation(Version::new(1, 0), "example application configuration")
        .unwrap();

    let server = Context::begin(Some(&mold), ContextKind::Section).unwrap();
    server.set_name(b"server").unwrap();
    mold.attach_child("server", &server).unwrap();

    let port = Context::begin(Some(&server), ContextKind::Keyval).unwrap();
    port.set_name(b"port").unwrap();
    port.set_value_type(ValueType::Integer).unwrap();
    port.add_default(Version::new(1, 0), Value::Integer(8080))
        .unwrap();
    server.attach_child("port", &port).unwrap();

    let debug = Context::begin(Some(&server), ContextKind::Keyval).unwrap();
    debug.set_name(b"debug").unwrap();
    debug.set_value_type(ValueType::Boolean).unwrap();
    debug
        .add_default(Version::new(1, 0), Value::Boolean(false))
        .unwrap();
    server.attach_child("debug", &debug).unwrap();

    mold.finalize().unwrap();
    mold
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    disir::logging::init_tracing();

    let mold = app_mold();
    println!("mold version: {}", mold.mold_version()?);

    let config = config::begin_config(&mold)?;
    let server = Context::begin(Some(&config), ContextKind::Section)?;
    server.set_name(b"server")?;
    config.attach_child("server", &server)?;

    let port = Context::begin(Some(&server), ContextKind::Keyval)?;
    port.set_name(b"port")?;
    server.attach_child("port", &port)?;
    port.set_value_int(9090)?;

    let debug = Context::begin(Some(&server), ContextKind::Keyval)?;
    debug.set_name(b"debug")?;
    server.attach_child("debug", &debug)?;
    debug.set_value_bool(true)?;

    config.finalize()?;

    let resolved = config.resolve("server.port")?;
    println!("server.port = {}", resolved.value()?.unwrap().get_int()?);

    let toml = TomlAdapter.serialize(&config)?;
    println!("serialized:\n{toml}");

    Ok(())
}
