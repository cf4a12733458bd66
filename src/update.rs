//! The update engine: migrates a Config from its current Mold binding to
//! a newer one, one step at a time, pausing on conflicts instead of
//! silently overwriting a user's existing value (§4.14).
//!
//! Walks the Config's element storage in insertion order. A Keyval whose
//! value still equals the active default at the Config's *old* version is
//! a clean upgrade: it's overwritten with the active default at the
//! *target* version. A Keyval whose value was overridden by the user is
//! left alone if it still matches the new active default, and flagged as
//! a conflict otherwise. The engine never silently overwrites a user
//! override.

use crate::context::{Context, ContextKind};
use crate::error::{DisirError, DisirResult};
use crate::value::Value;
use crate::version::Version;

/// A single keyval whose existing value needs a decision: it no longer
/// matches either the old or the new active default.
#[derive(Debug, Clone)]
pub struct Conflict {
    pub path: String,
    pub current_value: Option<Value>,
    pub old_default: Option<Value>,
    pub new_default: Option<Value>,
}

#[derive(Debug, Clone)]
struct Overwrite {
    path: String,
    new_value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpdateState {
    Running,
    Paused,
    Finished,
}

/// Drives a Config from its current Mold to `target_mold`. Construct via
/// [`Context::begin_update`].
pub struct Update {
    config: Context,
    target_mold: Context,
    conflicts: Vec<Conflict>,
    overwrites: Vec<Overwrite>,
    cursor: usize,
    state: UpdateState,
}

impl Context {
    /// Begins an update of this Config toward `target_mold`. Detects all
    /// conflicts and clean-upgrade overwrites up front; an update with no
    /// conflicts is a "clean upgrade" and `is_clean()` returns `true`
    /// immediately.
    pub fn begin_update(&self, target_mold: &Context) -> DisirResult<Update> {
        self.guard_kind(&[ContextKind::Config])?;
        target_mold.guard_kind(&[ContextKind::Mold])?;
        if !target_mold.is_finalized() {
            return Err(DisirError::ContextInWrongState(
                "update target MOLD must be finalized".to_string(),
            ));
        }

        let old_mold = self
            .config_mold()
            .ok_or_else(|| DisirError::MoldMissing("config has no bound mold".to_string()))?;
        let old_version = self.config_version()?;
        let target_version = target_mold.mold_version()?;

        let mut conflicts = Vec::new();
        let mut overwrites = Vec::new();
        walk_conflicts(
            self,
            &old_mold,
            target_mold,
            &old_version,
            &target_version,
            String::new(),
            &mut conflicts,
            &mut overwrites,
        );
        tracing::debug!(
            target_version = %target_version,
            conflicts = conflicts.len(),
            overwrites = overwrites.len(),
            "update begun"
        );

        let state = if conflicts.is_empty() {
            UpdateState::Running
        } else {
            UpdateState::Paused
        };

        Ok(Update {
            config: self.clone(),
            target_mold: target_mold.clone(),
            conflicts,
            overwrites,
            cursor: 0,
            state,
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn walk_conflicts(
    node: &Context,
    old_mold_scope: &Context,
    target_mold_scope: &Context,
    old_version: &Version,
    target_version: &Version,
    prefix: String,
    conflicts: &mut Vec<Conflict>,
    overwrites: &mut Vec<Overwrite>,
) {
    let children = match node.get_elements() {
        Ok(c) => c,
        Err(_) => return,
    };

    for child in children {
        let name = child.name().unwrap_or_default();
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };

        let old_mold_child = old_mold_scope.find_first_element(&name);
        let target_mold_child = match target_mold_scope.find_first_element(&name) {
            Some(m) => m,
            None => continue, // entry removed entirely from the new mold: nothing to reconcile
        };

        match child.context_type() {
            ContextKind::Section => {
                if let Some(old_scope) = &old_mold_child {
                    walk_conflicts(
                        &child,
                        old_scope,
                        &target_mold_child,
                        old_version,
                        target_version,
                        path,
                        conflicts,
                        overwrites,
                    );
                }
            }
            ContextKind::Keyval => {
                let current = match child.value() {
                    Ok(Some(v)) => v,
                    _ => continue,
                };
                let old_default = old_mold_child
                    .as_ref()
                    .and_then(|m| m.active_default(old_version).ok().flatten());
                let new_default = target_mold_child.active_default(target_version).ok().flatten();

                if old_default.as_ref() == Some(&current) {
                    if let Some(new_value) = new_default {
                        overwrites.push(Overwrite { path, new_value });
                    }
                } else if new_default.as_ref() == Some(&current) {
                    // user override happens to already match the new default: no-op
                } else {
                    conflicts.push(Conflict {
                        path,
                        current_value: Some(current),
                        old_default,
                        new_default,
                    });
                }
            }
            _ => {}
        }
    }
}

impl Update {
    /// `true` if no conflicts were found (or all have been resolved).
    pub fn is_clean(&self) -> bool {
        self.cursor >= self.conflicts.len()
    }

    /// The conflict currently awaiting resolution, if any.
    pub fn conflict_info(&self) -> Option<&Conflict> {
        self.conflicts.get(self.cursor)
    }

    /// Resolves the current conflict by adopting `value` for it. Does
    /// not advance the update; call [`Update::continue_update`] next.
    /// If a restriction introduced or tightened at the target version
    /// still rejects `value`, the engine re-enters conflict on this same
    /// keyval instead of advancing.
    pub fn resolve(&mut self, value: Value) -> DisirResult<()> {
        let conflict = self
            .conflicts
            .get(self.cursor)
            .ok_or(DisirError::NoCanDo("no conflict pending resolution".to_string()))?
            .clone();

        if let Ok(target_child) = self.target_mold.resolve(&conflict.path) {
            let target_version = self.target_mold.mold_version()?;
            if crate::restriction::violates_exclusive(&target_child, &value, &target_version) {
                return Err(DisirError::RestrictionViolated(format!(
                    "{} still violates a restriction on the target mold",
                    conflict.path
                )));
            }
        }

        let target = self.config.resolve(&conflict.path)?;
        target.set_value_unchecked(value);
        self.cursor += 1;
        if self.cursor >= self.conflicts.len() {
            self.state = UpdateState::Running;
        }
        Ok(())
    }

    /// Advances the update. Returns an error if a conflict is still
    /// pending resolution; on success, applies all planned clean-upgrade
    /// overwrites, then rebinds the Config to the target Mold and bumps
    /// its version.
    pub fn continue_update(&mut self) -> DisirResult<()> {
        if !self.is_clean() {
            return Err(DisirError::Conflict(format!(
                "{} conflict(s) still awaiting resolution",
                self.conflicts.len() - self.cursor
            )));
        }
        for overwrite in &self.overwrites {
            let target = self.config.resolve(&overwrite.path)?;
            target.set_value_unchecked(overwrite.new_value.clone());
        }
        rebind(&self.config, &self.target_mold)?;
        self.state = UpdateState::Finished;
        Ok(())
    }

    pub fn finished(&self) -> bool {
        self.state == UpdateState::Finished
    }

    /// Abandons the update, leaving the Config exactly as it was.
    pub fn discard(self) {
        drop(self);
    }
}

fn rebind(config: &Context, target_mold: &Context) -> DisirResult<()> {
    use crate::context::Variant;
    let mut inner = config.0.borrow_mut();
    match &mut inner.variant {
        Variant::Config(c) => {
            c.mold = Some(target_mold.clone());
            c.version = target_mold.mold_version()?;
            Ok(())
        }
        _ => unreachable!("begin_update guarded Config"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RestrictionKind;
    use crate::value::ValueType;

    fn mold_with_port(default: i64, max: i64) -> Context {
        let mold = Context::begin(None, ContextKind::Mold).unwrap();
        let keyval = Context::begin(Some(&mold), ContextKind::Keyval).unwrap();
        keyval.set_name(b"port").unwrap();
        keyval.set_value_type(ValueType::Integer).unwrap();
        keyval
            .add_default(Version::new(1, 0), Value::Integer(default))
            .unwrap();
        let restriction = keyval
            .add_restriction(Version::new(1, 0), RestrictionKind::ValueRange)
            .unwrap();
        restriction.set_restriction_range(0.0, max as f64).unwrap();
        mold.attach_child("port", &keyval).unwrap();
        mold.finalize().unwrap();
        mold
    }

    #[test]
    fn value_matching_the_old_default_is_overwritten_with_the_new_default() {
        let mold_v1 = mold_with_port(8080, 70000);
        let config = crate::config::begin_config(&mold_v1).unwrap();
        let keyval = Context::begin(Some(&config), ContextKind::Keyval).unwrap();
        keyval.set_name(b"port").unwrap();
        config.attach_child("port", &keyval).unwrap();
        keyval.set_value_int(8080).unwrap();
        config.finalize().unwrap();

        let mold_v2 = mold_with_port(9090, 70000);
        let mut update = config.begin_update(&mold_v2).unwrap();
        assert!(update.is_clean());
        update.continue_update().unwrap();
        assert!(update.finished());
        assert_eq!(keyval.value().unwrap().unwrap().get_int().unwrap(), 9090);
    }

    #[test]
    fn user_override_differing_from_both_defaults_pauses_for_resolution() {
        let mold_v1 = mold_with_port(8080, 70000);
        let config = crate::config::begin_config(&mold_v1).unwrap();
        let keyval = Context::begin(Some(&config), ContextKind::Keyval).unwrap();
        keyval.set_name(b"port").unwrap();
        config.attach_child("port", &keyval).unwrap();
        keyval.set_value_int(12345).unwrap();
        config.finalize().unwrap();

        let mold_v2 = mold_with_port(9090, 70000);
        let mut update = config.begin_update(&mold_v2).unwrap();
        assert!(!update.is_clean());
        assert!(update.continue_update().is_err());

        let conflict = update.conflict_info().unwrap();
        assert_eq!(conflict.path, "port");
        assert_eq!(conflict.current_value.clone().unwrap().get_int().unwrap(), 12345);
        assert_eq!(conflict.old_default.clone().unwrap().get_int().unwrap(), 8080);
        assert_eq!(conflict.new_default.clone().unwrap().get_int().unwrap(), 9090);

        update.resolve(Value::Integer(9090)).unwrap();
        assert!(update.is_clean());
        update.continue_update().unwrap();
        assert_eq!(keyval.value().unwrap().unwrap().get_int().unwrap(), 9090);
    }

    #[test]
    fn user_override_already_matching_the_new_default_is_left_alone() {
        let mold_v1 = mold_with_port(8080, 70000);
        let config = crate::config::begin_config(&mold_v1).unwrap();
        let keyval = Context::begin(Some(&config), ContextKind::Keyval).unwrap();
        keyval.set_name(b"port").unwrap();
        config.attach_child("port", &keyval).unwrap();
        keyval.set_value_int(9090).unwrap();
        config.finalize().unwrap();

        let mold_v2 = mold_with_port(9090, 70000);
        let mut update = config.begin_update(&mold_v2).unwrap();
        assert!(update.is_clean());
        update.continue_update().unwrap();
        assert_eq!(keyval.value().unwrap().unwrap().get_int().unwrap(), 9090);
    }

    #[test]
    fn resolving_with_a_value_the_target_still_rejects_re_enters_conflict() {
        let mold_v1 = mold_with_port(8080, 70000);
        let config = crate::config::begin_config(&mold_v1).unwrap();
        let keyval = Context::begin(Some(&config), ContextKind::Keyval).unwrap();
        keyval.set_name(b"port").unwrap();
        config.attach_child("port", &keyval).unwrap();
        keyval.set_value_int(12345).unwrap();
        config.finalize().unwrap();

        let mold_v2 = mold_with_port(9090, 1024);
        let mut update = config.begin_update(&mold_v2).unwrap();
        assert!(!update.is_clean());

        assert!(update.resolve(Value::Integer(65000)).is_err());
        assert!(!update.is_clean());

        update.resolve(Value::Integer(443)).unwrap();
        assert!(update.is_clean());
        update.continue_update().unwrap();
    }

    #[test]
    fn discarding_a_paused_update_leaves_the_config_untouched() {
        let mold_v1 = mold_with_port(8080, 70000);
        let config = crate::config::begin_config(&mold_v1).unwrap();
        let keyval = Context::begin(Some(&config), ContextKind::Keyval).unwrap();
        keyval.set_name(b"port").unwrap();
        config.attach_child("port", &keyval).unwrap();
        keyval.set_value_int(12345).unwrap();
        config.finalize().unwrap();

        let mold_v2 = mold_with_port(9090, 70000);
        let update = config.begin_update(&mold_v2).unwrap();
        update.discard();

        assert!(config.config_mold().unwrap().is_same(&mold_v1));
        assert_eq!(keyval.value().unwrap().unwrap().get_int().unwrap(), 12345);
    }
}
