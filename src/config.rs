//! Config root operations: binding to a finalized Mold, tracking the
//! config's own version (§4.10).

use crate::context::{Context, ContextInner, ContextKind, ContextState, RootKind, Variant};
use crate::error::{DisirError, DisirResult};
use crate::version::Version;

/// Begins a Config rooted on `mold`, which must already be finalized.
/// The new Config holds a strong reference to `mold` for its whole
/// lifetime; individual Section/Keyval mold-equivalents are resolved
/// against it lazily and held only weakly.
pub fn begin_config(mold: &Context) -> DisirResult<Context> {
    mold.guard_kind(&[ContextKind::Mold])?;
    if !mold.is_finalized() {
        return Err(DisirError::ContextInWrongState(
            "a CONFIG can only be bound to a finalized MOLD".to_string(),
        ));
    }

    Ok(Context::from_inner(ContextInner {
        kind: ContextKind::Config,
        state: ContextState::Constructing,
        invalid: false,
        fatal: false,
        attached_to_parent: false,
        parent: None,
        root_kind: Some(RootKind::Config),
        error: None,
        variant: Variant::Config(crate::context::ConfigData {
            mold: Some(mold.clone()),
            elements: crate::element_storage::ElementStorage::new(),
            version: mold.mold_version().unwrap_or_default(),
        }),
    }))
}

impl Context {
    /// The Mold this Config is bound to.
    pub fn config_mold(&self) -> Option<Context> {
        let inner = self.0.borrow();
        match &inner.variant {
            Variant::Config(c) => c.mold.clone(),
            _ => None,
        }
    }

    /// This Config's declared version. Determines which defaults,
    /// restrictions and documentation entries are active.
    pub fn config_version(&self) -> DisirResult<Version> {
        self.guard_kind(&[ContextKind::Config])?;
        let inner = self.0.borrow();
        match &inner.variant {
            Variant::Config(c) => Ok(c.version),
            _ => unreachable!("guarded above"),
        }
    }

    /// Sets this Config's version. Rejected if it would exceed the
    /// bound Mold's own version (a Config cannot claim to speak a
    /// schema version its Mold never reached).
    pub fn set_config_version(&self, version: Version) -> DisirResult<()> {
        self.guard_kind(&[ContextKind::Config])?;
        let mold_version = self
            .config_mold()
            .ok_or(DisirError::MoldMissing("config has no bound mold".to_string()))?
            .mold_version()?;
        if version > mold_version {
            return Err(DisirError::ConflictingSemver(format!(
                "config version {version} exceeds mold version {mold_version}"
            )));
        }

        let mut inner = self.0.borrow_mut();
        match &mut inner.variant {
            Variant::Config(c) => {
                c.version = version;
                Ok(())
            }
            _ => unreachable!("guarded above"),
        }
    }
}
