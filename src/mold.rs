//! Mold-root operations: the schema's own version, computed as the
//! monotone maximum `introduced` version found anywhere in its subtree
//! (documentation, defaults and restrictions all carry one).
//!
//! Open question resolved: the version is computed lazily by walking the
//! tree rather than cached and invalidated on every mutation — simpler,
//! and mold trees are built once then finalized, so the walk is cheap
//! relative to how rarely it runs.

use crate::context::{Context, ContextKind};
use crate::error::DisirResult;
use crate::version::Version;

impl Context {
    /// This Mold's version: the greatest `introduced` version found on
    /// any documentation, default or restriction entry in the subtree.
    /// `(1, 0)` if the mold carries none.
    pub fn mold_version(&self) -> DisirResult<Version> {
        self.guard_kind(&[ContextKind::Mold])?;
        Ok(walk_max_version(self))
    }
}

fn walk_max_version(ctx: &Context) -> Version {
    let mut max = Version::default();

    for doc in ctx.documentation_entries() {
        max = max.max(doc.introduced);
    }
    if ctx.context_type() == ContextKind::Keyval {
        for def in ctx.default_entries() {
            max = max.max(def.introduced);
        }
    }
    if matches!(ctx.context_type(), ContextKind::Section | ContextKind::Keyval) {
        for restriction in ctx.restriction_entries() {
            max = max.max(restriction.introduced);
            if let Some(deprecated) = restriction.deprecated {
                max = max.max(deprecated);
            }
        }
    }

    if let Ok(children) = ctx.get_elements() {
        for child in children {
            max = max.max(walk_max_version(&child));
        }
    }

    max
}
