//! Keyval value operations: the Mold side declares a type, the Config
//! side holds a current value of that type (§4.1, §4.8).

use crate::context::{Context, ContextKind, RootKind, Variant};
use crate::error::{DisirError, DisirResult};
use crate::restriction;
use crate::value::{Value, ValueType};
use crate::version::Version;

impl Context {
    /// Fixes this Mold Keyval's declared value type. Must be called
    /// before any default or restriction is attached.
    pub fn set_value_type(&self, value_type: ValueType) -> DisirResult<()> {
        self.guard_kind(&[ContextKind::Keyval])?;
        if self.root_kind() != Some(RootKind::Mold) {
            return Err(DisirError::WrongContext(
                "value type may only be set on a MOLD keyval".to_string(),
            ));
        }
        let mut inner = self.0.borrow_mut();
        match &mut inner.variant {
            Variant::Keyval(k) => {
                if !k.defaults.is_empty() || !k.restrictions.is_empty() {
                    return Err(DisirError::ContextInWrongState(
                        "value type cannot change after defaults/restrictions were added"
                            .to_string(),
                    ));
                }
                k.value_type = Some(value_type);
                Ok(())
            }
            _ => unreachable!("guarded above"),
        }
    }

    /// The declared value type: set directly on a Mold keyval, or
    /// inherited from the bound mold-equivalent on a Config keyval.
    pub fn value_type(&self) -> DisirResult<Option<ValueType>> {
        self.guard_kind(&[ContextKind::Keyval])?;
        let inner = self.0.borrow();
        match &inner.variant {
            Variant::Keyval(k) => {
                if k.value_type.is_some() {
                    return Ok(k.value_type);
                }
                drop(inner);
                Ok(self.mold_equivalent().and_then(|e| e.value_type().ok().flatten()))
            }
            _ => unreachable!("guarded above"),
        }
    }

    /// The current value, for a Config keyval, or `None` if never set.
    pub fn value(&self) -> DisirResult<Option<Value>> {
        self.guard_kind(&[ContextKind::Keyval])?;
        if self.root_kind() != Some(RootKind::Config) {
            return Err(DisirError::WrongContext(
                "only a CONFIG keyval holds a current value".to_string(),
            ));
        }
        let inner = self.0.borrow();
        match &inner.variant {
            Variant::Keyval(k) => Ok(k.value.clone()),
            _ => unreachable!("guarded above"),
        }
    }

    pub fn set_value_string(&self, bytes: &[u8]) -> DisirResult<()> {
        self.set_value(Value::String(bytes.to_vec()))
    }

    pub fn set_value_int(&self, value: i64) -> DisirResult<()> {
        self.set_value(Value::Integer(value))
    }

    pub fn set_value_float(&self, value: f64) -> DisirResult<()> {
        self.set_value(Value::Float(value))
    }

    pub fn set_value_bool(&self, value: bool) -> DisirResult<()> {
        self.set_value(Value::Boolean(value))
    }

    pub fn set_value_enum(&self, value: &str) -> DisirResult<()> {
        self.set_value(Value::Enum(value.to_string()))
    }

    /// Proposes a new value for a Config keyval. Checks the declared type
    /// and, once a mold-equivalent is bound, the exclusive-value
    /// restrictions active at the config's version. A finalized node
    /// that fails this check keeps its old value and reports
    /// `restriction_violated`; a constructing node is marked invalid and
    /// the value is still stored so the caller can inspect/correct it.
    pub fn set_value(&self, value: Value) -> DisirResult<()> {
        self.guard_kind(&[ContextKind::Keyval])?;
        if self.root_kind() != Some(RootKind::Config) {
            return Err(DisirError::WrongContext(
                "only a CONFIG keyval accepts set_value".to_string(),
            ));
        }

        if let Some(equiv) = self.mold_equivalent() {
            if let Some(declared) = equiv.value_type()? {
                if value.type_of() != declared {
                    return Err(DisirError::WrongValueType(format!(
                        "expected {:?}, got {:?}",
                        declared,
                        value.type_of()
                    )));
                }
            }

            let version = self.root().config_version()?;
            if restriction::violates_exclusive(&equiv, &value, &version) {
                let message = "value rejected by active restrictions".to_string();
                if self.is_finalized() {
                    return Err(DisirError::RestrictionViolated(message));
                }
                self.mark_invalid(message);
            }
        }

        let mut inner = self.0.borrow_mut();
        match &mut inner.variant {
            Variant::Keyval(k) => k.value = Some(value),
            _ => unreachable!("guarded above"),
        }
        Ok(())
    }

    /// Stores `value` without running the mold-type or restriction checks
    /// `set_value` performs. Used by the update engine to apply a
    /// planned default overwrite or a resolved conflict value against a
    /// mold the Config isn't rebound to yet.
    pub(crate) fn set_value_unchecked(&self, value: Value) {
        let mut inner = self.0.borrow_mut();
        if let Variant::Keyval(k) = &mut inner.variant {
            k.value = Some(value);
        }
    }

    /// This node's "effective version" for restriction/default
    /// resolution: the owning Config's version, or the default version
    /// for a Mold-side node.
    pub(crate) fn effective_version(&self) -> Version {
        match self.root_kind() {
            Some(RootKind::Config) => self.root().config_version().unwrap_or_default(),
            _ => Version::default(),
        }
    }
}
