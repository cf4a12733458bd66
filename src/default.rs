//! Versioned default values on Mold Keyval nodes (§4.7).

use crate::context::{Context, ContextInner, ContextKind, ContextState, DefaultData, Variant};
use crate::error::{DisirError, DisirResult};
use crate::value::Value;
use crate::version::Version;

impl Context {
    /// Adds a default value introduced at `version`. The Keyval's
    /// declared type must already be set (via `set_value_type`), and
    /// `value` must match it. Two defaults at the same `introduced`
    /// version is `exists` (invariant P4).
    pub fn add_default(&self, introduced: Version, value: Value) -> DisirResult<Context> {
        self.guard_kind(&[ContextKind::Keyval])?;
        if self.root_kind() != Some(crate::context::RootKind::Mold) {
            return Err(DisirError::WrongContext(
                "defaults may only be added to a MOLD keyval".to_string(),
            ));
        }

        let declared = self.value_type()?.ok_or_else(|| {
            DisirError::InvalidArgument(
                "keyval's value type must be set before adding a default".to_string(),
            )
        })?;
        if value.type_of() != declared {
            return Err(DisirError::WrongValueType(format!(
                "default is {:?}, keyval declared {:?}",
                value.type_of(),
                declared
            )));
        }

        if self.default_entries().iter().any(|d| d.introduced == introduced) {
            return Err(DisirError::Exists(format!(
                "default already introduced at {introduced}"
            )));
        }

        let def = Context::from_inner(ContextInner {
            kind: ContextKind::Default,
            state: ContextState::Constructing,
            invalid: false,
            fatal: false,
            attached_to_parent: true,
            parent: Some(self.clone()),
            root_kind: None,
            error: None,
            variant: Variant::Default(DefaultData { introduced, value }),
        });
        def.finalize()?;

        let mut inner = self.0.borrow_mut();
        match &mut inner.variant {
            Variant::Keyval(k) => k.defaults.push(def.clone()),
            _ => unreachable!("guarded above"),
        }
        Ok(def)
    }

    /// The default value active at `version` (greatest `introduced <=
    /// version`, else overall-greatest).
    pub fn active_default(&self, version: &Version) -> DisirResult<Option<Value>> {
        self.guard_kind(&[ContextKind::Keyval])?;
        let entries = self.default_entries();
        Ok(crate::version::active_at(&entries, version, |d| d.introduced).map(|d| d.value.clone()))
    }

    pub(crate) fn default_entries(&self) -> Vec<DefaultData> {
        let inner = self.0.borrow();
        let defaults = match &inner.variant {
            Variant::Keyval(k) => &k.defaults,
            _ => return Vec::new(),
        };
        defaults
            .iter()
            .map(|d| {
                let data = d.0.borrow();
                match &data.variant {
                    Variant::Default(data) => DefaultData {
                        introduced: data.introduced,
                        value: data.value.clone(),
                    },
                    _ => unreachable!("defaults list holds only Default nodes"),
                }
            })
            .collect()
    }
}
