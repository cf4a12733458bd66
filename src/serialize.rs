//! Serialiser contract (§6): a Config tree converts to and from an
//! external representation through a narrow two-trait seam so the core
//! never depends on a concrete wire format. [`TomlAdapter`] is the one
//! reference implementation shipped here; it must not influence core
//! semantics (no context operation assumes TOML).

use crate::context::{Context, ContextKind};
use crate::error::{DisirError, DisirResult};
use crate::value::{Value, ValueType};

pub trait Serializer {
    fn serialize(&self, config: &Context) -> DisirResult<String>;
}

pub trait Unserializer {
    fn unserialize(&self, mold: &Context, input: &str) -> DisirResult<Context>;
}

/// The reference TOML adapter.
pub struct TomlAdapter;

impl Serializer for TomlAdapter {
    fn serialize(&self, config: &Context) -> DisirResult<String> {
        config.guard_kind(&[ContextKind::Config])?;
        let value = context_to_toml(config)?;
        toml::to_string_pretty(&value).map_err(DisirError::from)
    }
}

impl Unserializer for TomlAdapter {
    fn unserialize(&self, mold: &Context, input: &str) -> DisirResult<Context> {
        mold.guard_kind(&[ContextKind::Mold])?;
        let parsed: toml::Value = toml::from_str(input)?;
        let config = crate::config::begin_config(mold)?;
        populate(&config, mold, &parsed)?;
        config.finalize()?;
        Ok(config)
    }
}

fn context_to_toml(node: &Context) -> DisirResult<toml::Value> {
    match node.context_type() {
        ContextKind::Config | ContextKind::Section => {
            let mut table = toml::value::Table::new();
            for child in node.get_elements()? {
                let name = child.name()?;
                table.insert(name, context_to_toml(&child)?);
            }
            Ok(toml::Value::Table(table))
        }
        ContextKind::Keyval => {
            let value = node.value()?.unwrap_or_else(|| Value::String(Vec::new()));
            Ok(value_to_toml(&value))
        }
        other => Err(DisirError::WrongContext(format!(
            "{other} cannot be serialized directly"
        ))),
    }
}

fn value_to_toml(value: &Value) -> toml::Value {
    match value {
        Value::String(bytes) => toml::Value::String(String::from_utf8_lossy(bytes).into_owned()),
        Value::Integer(v) => toml::Value::Integer(*v),
        Value::Float(v) => toml::Value::Float(*v),
        Value::Boolean(v) => toml::Value::Boolean(*v),
        Value::Enum(v) => toml::Value::String(v.clone()),
    }
}

fn populate(parent: &Context, mold_scope: &Context, value: &toml::Value) -> DisirResult<()> {
    let table = value
        .as_table()
        .ok_or_else(|| DisirError::ConfigInvalid("expected a table".to_string()))?;

    for (name, entry) in table {
        let mold_child = mold_scope.find_first_element(name).ok_or_else(|| {
            DisirError::NotExist(format!("'{name}' has no mold equivalent"))
        })?;

        match mold_child.context_type() {
            ContextKind::Section => {
                let section = Context::begin(Some(parent), ContextKind::Section)?;
                section.set_name(name.as_bytes())?;
                parent.attach_child(name, &section)?;
                populate(&section, &mold_child, entry)?;
                section.finalize()?;
            }
            ContextKind::Keyval => {
                let keyval = Context::begin(Some(parent), ContextKind::Keyval)?;
                keyval.set_name(name.as_bytes())?;
                parent.attach_child(name, &keyval)?;
                let declared = mold_child.value_type()?.unwrap_or(ValueType::String);
                keyval.set_value(toml_to_value(entry, declared)?)?;
                keyval.finalize()?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn toml_to_value(entry: &toml::Value, declared: ValueType) -> DisirResult<Value> {
    match (declared, entry) {
        (ValueType::String, toml::Value::String(s)) => Ok(Value::String(s.as_bytes().to_vec())),
        (ValueType::Integer, toml::Value::Integer(v)) => Ok(Value::Integer(*v)),
        (ValueType::Float, toml::Value::Float(v)) => Ok(Value::Float(*v)),
        (ValueType::Boolean, toml::Value::Boolean(v)) => Ok(Value::Boolean(*v)),
        (ValueType::Enum, toml::Value::String(s)) => Ok(Value::Enum(s.clone())),
        _ => Err(DisirError::WrongValueType(format!(
            "declared {declared:?}, found {entry:?}"
        ))),
    }
}
