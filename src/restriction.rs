//! Restrictions: cardinality bounds on how many siblings of a name may
//! exist, and exclusive value constraints on a Keyval's permitted values
//! (§4.8). A node's own restriction list lives beside it (Section and
//! Keyval both carry one), not on its parent composite.

use crate::context::{
    Context, ContextInner, ContextKind, ContextState, RestrictionData, RestrictionKind,
    RestrictionPayload, Variant,
};
use crate::error::{DisirError, DisirResult};
use crate::value::{Value, ValueType};
use crate::version::Version;

impl Context {
    /// Begins a restriction of `kind`, introduced at `version`, attached
    /// to this Section or Keyval. Returns `conflict` if this node already
    /// carries an exclusive-value restriction of a different kind.
    pub fn add_restriction(&self, introduced: Version, kind: RestrictionKind) -> DisirResult<Context> {
        self.guard_kind(&[ContextKind::Section, ContextKind::Keyval])?;
        permissible(self, kind)?;

        if kind.is_exclusive() {
            if let Some(existing) = self.restriction_kind_in_use() {
                if existing != kind {
                    return Err(DisirError::Conflict(format!(
                        "keyval already restricted by {existing:?}, cannot also add {kind:?}"
                    )));
                }
            }
        }

        let restriction = Context::from_inner(ContextInner {
            kind: ContextKind::Restriction,
            state: ContextState::Constructing,
            invalid: false,
            fatal: false,
            attached_to_parent: true,
            parent: Some(self.clone()),
            root_kind: None,
            error: None,
            variant: Variant::Restriction(RestrictionData {
                introduced,
                deprecated: None,
                kind: Some(kind),
                payload: RestrictionPayload::Unset,
                documentation: Vec::new(),
            }),
        });

        let mut inner = self.0.borrow_mut();
        match &mut inner.variant {
            Variant::Section(s) => s.restrictions.push(restriction.clone()),
            Variant::Keyval(k) => k.restrictions.push(restriction.clone()),
            _ => unreachable!("guarded above"),
        }
        Ok(restriction)
    }

    pub fn set_restriction_entry_min(&self, min: i64) -> DisirResult<()> {
        self.guard_kind(&[ContextKind::Restriction])?;
        set_payload(self, RestrictionKind::EntryMin, RestrictionPayload::EntryMin(min))?;
        // A min above the implicit upper bound of one pulls max up with it.
        if min > 1 {
            if let Some(parent) = self.parent() {
                if parent.restriction_entry_max()?.is_none() {
                    parent.set_entry_max_via_sibling(min)?;
                }
            }
        }
        Ok(())
    }

    pub fn set_restriction_entry_max(&self, max: i64) -> DisirResult<()> {
        self.guard_kind(&[ContextKind::Restriction])?;
        set_payload(self, RestrictionKind::EntryMax, RestrictionPayload::EntryMax(max))
    }

    pub fn set_restriction_numeric(&self, value: f64) -> DisirResult<()> {
        self.guard_kind(&[ContextKind::Restriction])?;
        set_payload(
            self,
            RestrictionKind::ValueNumeric,
            RestrictionPayload::ValueNumericFloat(value),
        )
    }

    pub fn set_restriction_range(&self, min: f64, max: f64) -> DisirResult<()> {
        self.guard_kind(&[ContextKind::Restriction])?;
        if min > max {
            return Err(DisirError::InvalidArgument(format!(
                "range min {min} exceeds max {max}"
            )));
        }
        set_payload(
            self,
            RestrictionKind::ValueRange,
            RestrictionPayload::ValueRangeFloat(min, max),
        )
    }

    pub fn set_restriction_enum(&self, value: &str) -> DisirResult<()> {
        self.guard_kind(&[ContextKind::Restriction])?;
        set_payload(
            self,
            RestrictionKind::ValueEnum,
            RestrictionPayload::ValueEnum(value.to_string()),
        )
    }

    /// Cardinality bound active at `version` for a name within a
    /// composite: `(min, max)`, defaulting to `(0, 1)` when unrestricted.
    pub fn cardinality_at(&self, version: &Version) -> DisirResult<(i64, i64)> {
        self.guard_kind(&[ContextKind::Section, ContextKind::Keyval])?;
        let entries = self.restriction_entries();
        let min = entries
            .iter()
            .filter(|r| r.kind == Some(RestrictionKind::EntryMin) && r.introduced <= *version)
            .max_by_key(|r| r.introduced)
            .and_then(|r| match r.payload {
                RestrictionPayload::EntryMin(v) => Some(v),
                _ => None,
            })
            .unwrap_or(0);
        let max = entries
            .iter()
            .filter(|r| r.kind == Some(RestrictionKind::EntryMax) && r.introduced <= *version)
            .max_by_key(|r| r.introduced)
            .and_then(|r| match r.payload {
                RestrictionPayload::EntryMax(v) => Some(v),
                _ => None,
            })
            .unwrap_or(1);
        Ok((min, max))
    }

    fn restriction_entry_max(&self) -> DisirResult<Option<i64>> {
        Ok(self
            .restriction_entries()
            .iter()
            .find(|r| r.kind == Some(RestrictionKind::EntryMax))
            .and_then(|r| match r.payload {
                RestrictionPayload::EntryMax(v) => Some(v),
                _ => None,
            }))
    }

    fn set_entry_max_via_sibling(&self, max: i64) -> DisirResult<()> {
        let restriction = self.add_restriction(Version::default(), RestrictionKind::EntryMax)?;
        restriction.set_restriction_entry_max(max)
    }

    fn restriction_kind_in_use(&self) -> Option<RestrictionKind> {
        self.restriction_entries()
            .iter()
            .find(|r| r.kind.map(|k| k.is_exclusive()).unwrap_or(false))
            .and_then(|r| r.kind)
    }

    pub(crate) fn restriction_entries(&self) -> Vec<RestrictionData> {
        let inner = self.0.borrow();
        let list: &[Context] = match &inner.variant {
            Variant::Section(s) => &s.restrictions,
            Variant::Keyval(k) => &k.restrictions,
            _ => return Vec::new(),
        };
        list.iter()
            .map(|r| {
                let data = r.0.borrow();
                match &data.variant {
                    Variant::Restriction(d) => RestrictionData {
                        introduced: d.introduced,
                        deprecated: d.deprecated,
                        kind: d.kind,
                        payload: d.payload.clone(),
                        documentation: Vec::new(),
                    },
                    _ => unreachable!("restriction list holds only Restriction nodes"),
                }
            })
            .collect()
    }
}

fn permissible(node: &Context, kind: RestrictionKind) -> DisirResult<()> {
    match (node.context_type(), kind) {
        (ContextKind::Section, RestrictionKind::EntryMin | RestrictionKind::EntryMax) => Ok(()),
        (ContextKind::Keyval, RestrictionKind::EntryMin | RestrictionKind::EntryMax) => Ok(()),
        (ContextKind::Keyval, RestrictionKind::ValueNumeric | RestrictionKind::ValueRange) => {
            match node.value_type()? {
                Some(ValueType::Integer) | Some(ValueType::Float) => Ok(()),
                _ => Err(DisirError::NotSupported(
                    "numeric/range restrictions require an INTEGER or FLOAT keyval".to_string(),
                )),
            }
        }
        (ContextKind::Keyval, RestrictionKind::ValueEnum) => match node.value_type()? {
            Some(ValueType::Enum) => Ok(()),
            _ => Err(DisirError::NotSupported(
                "enum restriction requires an ENUM keyval".to_string(),
            )),
        },
        _ => Err(DisirError::NotSupported(format!(
            "{kind:?} is not permissible on {}",
            node.context_type()
        ))),
    }
}

fn set_payload(restriction: &Context, expected: RestrictionKind, payload: RestrictionPayload) -> DisirResult<()> {
    let mut inner = restriction.0.borrow_mut();
    match &mut inner.variant {
        Variant::Restriction(data) => {
            if data.kind != Some(expected) {
                return Err(DisirError::WrongContext(format!(
                    "restriction is {:?}, not {:?}",
                    data.kind, expected
                )));
            }
            data.payload = payload;
            Ok(())
        }
        _ => unreachable!("guarded by caller"),
    }
}

pub(crate) fn kind_of(ctx: &Context) -> Option<RestrictionKind> {
    let inner = ctx.0.borrow();
    match &inner.variant {
        Variant::Restriction(d) => d.kind,
        _ => None,
    }
}

/// The exclusive-value restriction entries on `node` active at `version`,
/// shared by `violates_exclusive` and the update engine's re-check step
/// so the version-filtering logic doesn't get duplicated between them.
pub(crate) fn active_exclusive_entries(node: &Context, version: &Version) -> Vec<RestrictionData> {
    node.restriction_entries()
        .into_iter()
        .filter(|r| r.kind.map(|k| k.is_exclusive()).unwrap_or(false))
        .filter(|r| r.introduced <= *version)
        .collect()
}

/// Whether `value` fails every active-at-`version` exclusive-value
/// restriction on `mold_keyval` (admit-if-any: a value is accepted as
/// soon as it satisfies one active entry of the restriction kind in use).
pub(crate) fn violates_exclusive(mold_keyval: &Context, value: &Value, version: &Version) -> bool {
    let active = active_exclusive_entries(mold_keyval, version);
    if active.is_empty() {
        return false;
    }

    !active.iter().any(|r| admits(r, value))
}

fn admits(restriction: &RestrictionData, value: &Value) -> bool {
    match (&restriction.payload, value) {
        (RestrictionPayload::ValueNumericInt(n), Value::Integer(v)) => n == v,
        (RestrictionPayload::ValueNumericFloat(n), Value::Float(v)) => (n - v).abs() < f64::EPSILON,
        (RestrictionPayload::ValueNumericFloat(n), Value::Integer(v)) => {
            (*n - *v as f64).abs() < f64::EPSILON
        }
        (RestrictionPayload::ValueRangeInt(min, max), Value::Integer(v)) => v >= min && v <= max,
        (RestrictionPayload::ValueRangeFloat(min, max), Value::Float(v)) => v >= min && v <= max,
        (RestrictionPayload::ValueRangeFloat(min, max), Value::Integer(v)) => {
            let v = *v as f64;
            v >= *min && v <= *max
        }
        (RestrictionPayload::ValueEnum(allowed), Value::Enum(v)) => allowed == v,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric_keyval() -> Context {
        let mold = Context::begin(None, ContextKind::Mold).unwrap();
        let keyval = Context::begin(Some(&mold), ContextKind::Keyval).unwrap();
        keyval.set_name(b"retries").unwrap();
        keyval.set_value_type(ValueType::Integer).unwrap();
        keyval
    }

    #[test]
    fn range_restriction_rejects_out_of_bounds_value() {
        let keyval = numeric_keyval();
        let restriction = keyval
            .add_restriction(Version::new(1, 0), RestrictionKind::ValueRange)
            .unwrap();
        restriction.set_restriction_range(0.0, 10.0).unwrap();

        assert!(!violates_exclusive(&keyval, &Value::Integer(5), &Version::new(1, 0)));
        assert!(violates_exclusive(&keyval, &Value::Integer(99), &Version::new(1, 0)));
    }

    #[test]
    fn conflicting_exclusive_kinds_rejected() {
        let keyval = numeric_keyval();
        keyval
            .add_restriction(Version::new(1, 0), RestrictionKind::ValueRange)
            .unwrap();
        let err = keyval.add_restriction(Version::new(1, 0), RestrictionKind::ValueNumeric);
        assert!(matches!(err, Err(DisirError::Conflict(_))));
    }

    #[test]
    fn enum_restriction_requires_enum_keyval() {
        let keyval = numeric_keyval();
        let err = keyval.add_restriction(Version::new(1, 0), RestrictionKind::ValueEnum);
        assert!(matches!(err, Err(DisirError::NotSupported(_))));
    }

    #[test]
    fn cardinality_defaults_to_zero_one() {
        let mold = Context::begin(None, ContextKind::Mold).unwrap();
        let section = Context::begin(Some(&mold), ContextKind::Section).unwrap();
        section.set_name(b"listener").unwrap();
        assert_eq!(section.cardinality_at(&Version::new(1, 0)).unwrap(), (0, 1));
    }

    #[test]
    fn min_above_one_pulls_max_up() {
        let mold = Context::begin(None, ContextKind::Mold).unwrap();
        let section = Context::begin(Some(&mold), ContextKind::Section).unwrap();
        section.set_name(b"listener").unwrap();
        let min_restriction = section
            .add_restriction(Version::new(1, 0), RestrictionKind::EntryMin)
            .unwrap();
        min_restriction.set_restriction_entry_min(3).unwrap();
        assert_eq!(section.cardinality_at(&Version::new(1, 0)).unwrap(), (3, 3));
    }
}
