//! Recursive invariant checker shared by `Context::finalize` and the
//! broader whole-tree checks used by the update and archive engines.
//!
//! Status precedence, most severe first, matches §7 of the design:
//! `mold_missing > wrong_value_type > restriction_violated >
//! invalid_context > elements_invalid > ok`.

use crate::context::{Context, ContextKind, RootKind};
use crate::error::DisirError;
use crate::restriction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationStatus {
    Ok = 0,
    ElementsInvalid = 1,
    InvalidContext = 2,
    RestrictionViolated = 3,
    WrongValueType = 4,
    MoldMissing = 5,
}

impl ValidationStatus {
    pub fn into_error(self, message: Option<String>) -> DisirError {
        let msg = message.unwrap_or_default();
        match self {
            ValidationStatus::Ok => unreachable!("Ok has no error"),
            ValidationStatus::MoldMissing => DisirError::MoldMissing(msg),
            ValidationStatus::WrongValueType => DisirError::WrongValueType(msg),
            ValidationStatus::RestrictionViolated => DisirError::RestrictionViolated(msg),
            ValidationStatus::InvalidContext => DisirError::InvalidContext(msg),
            ValidationStatus::ElementsInvalid => DisirError::ElementsInvalid,
        }
    }

    fn worse(self, other: ValidationStatus) -> ValidationStatus {
        if other > self {
            other
        } else {
            self
        }
    }
}

/// Validates a single node in isolation: its own required fields and (for
/// a Config-rooted Keyval) its current value against its mold-equivalent.
/// Does not look at descendants — see [`validate_tree`] for that.
pub fn validate(ctx: &Context) -> ValidationStatus {
    match ctx.context_type() {
        ContextKind::Config => {
            if ctx.config_mold().is_none() {
                ValidationStatus::MoldMissing
            } else {
                ValidationStatus::Ok
            }
        }
        ContextKind::Mold => ValidationStatus::Ok,
        ContextKind::Section => {
            if ctx.name().map(|n| n.is_empty()).unwrap_or(true) {
                return ValidationStatus::InvalidContext;
            }
            if ctx.root_kind() == Some(RootKind::Config) && ctx.mold_equivalent().is_none() {
                return ValidationStatus::InvalidContext;
            }
            ValidationStatus::Ok
        }
        ContextKind::Keyval => validate_keyval(ctx),
        ContextKind::Documentation => ValidationStatus::Ok,
        ContextKind::Default => ValidationStatus::Ok,
        ContextKind::Restriction => {
            if restriction::kind_of(ctx).is_none() {
                ValidationStatus::InvalidContext
            } else {
                ValidationStatus::Ok
            }
        }
    }
}

fn validate_keyval(ctx: &Context) -> ValidationStatus {
    if ctx.name().map(|n| n.is_empty()).unwrap_or(true) {
        return ValidationStatus::InvalidContext;
    }

    if ctx.root_kind() == Some(RootKind::Mold) {
        return if ctx.value_type().ok().flatten().is_none() {
            ValidationStatus::InvalidContext
        } else {
            ValidationStatus::Ok
        };
    }

    // Config-rooted.
    let equiv = match ctx.mold_equivalent() {
        Some(equiv) => equiv,
        None => return ValidationStatus::InvalidContext,
    };

    if let Ok(Some(value)) = ctx.value() {
        if let Ok(Some(declared)) = equiv.value_type() {
            if value.type_of() != declared {
                return ValidationStatus::WrongValueType;
            }
        }
        if restriction::violates_exclusive(&equiv, &value, &ctx.effective_version()) {
            return ValidationStatus::RestrictionViolated;
        }
    }

    ValidationStatus::Ok
}

/// Recursively validates `ctx` and every descendant, returning the worst
/// status found anywhere in the subtree. A node whose own fields are fine
/// but which contains an invalid descendant reports `elements_invalid`.
pub fn validate_tree(ctx: &Context) -> ValidationStatus {
    let own = validate(ctx);
    if own != ValidationStatus::Ok {
        return own;
    }

    let children = match ctx.context_type() {
        ContextKind::Config | ContextKind::Mold | ContextKind::Section => {
            ctx.get_elements().unwrap_or_default()
        }
        _ => Vec::new(),
    };

    let mut worst = ValidationStatus::Ok;
    for child in &children {
        if validate_tree(child) != ValidationStatus::Ok {
            worst = worst.worse(ValidationStatus::ElementsInvalid);
        }
    }
    worst
}
