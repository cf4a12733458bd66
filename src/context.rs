//! The context node: a single polymorphic type tagged by kind, carrying a
//! variant payload selected by that kind, plus shared state-machine and
//! refcount plumbing.
//!
//! Polymorphism without inheritance: rather than a class hierarchy, every
//! node in the schema (mold) and instance (config) trees is the same
//! [`Context`] handle wrapping a tagged [`Variant`]. Operations dispatch on
//! the tag; a mismatch is a clean `wrong_context`, never a cast failure.
//!
//! Cyclic references are deliberately present (a parent's element storage
//! holds its children; each child holds a strong handle back to its
//! parent so the parent can never be freed out from under a live child)
//! and deliberately broken only by an explicit [`Context::destroy`], which
//! walks down clearing both directions. This mirrors the manual
//! incref/decref discipline of the system this crate's design is drawn
//! from, rather than leaning on `Drop` to do the right thing by itself.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::element_storage::ElementStorage;
use crate::error::{DisirError, DisirResult};
use crate::value::{Value, ValueType};
use crate::version::Version;

/// The closed set of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    Config,
    Mold,
    Section,
    Keyval,
    Documentation,
    Default,
    Restriction,
}

impl ContextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextKind::Config => "CONFIG",
            ContextKind::Mold => "MOLD",
            ContextKind::Section => "SECTION",
            ContextKind::Keyval => "KEYVAL",
            ContextKind::Documentation => "DOCUMENTATION",
            ContextKind::Default => "DEFAULT",
            ContextKind::Restriction => "RESTRICTION",
        }
    }

    fn is_composite(&self) -> bool {
        matches!(self, ContextKind::Config | ContextKind::Mold | ContextKind::Section)
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root for top-level Config/Mold nodes; descendants simply walk `parent`
/// until they hit a node whose `root` is `SelfRoot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    Config,
    Mold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContextState {
    Constructing,
    Finalized,
    Destroyed,
}

pub(crate) struct ConfigData {
    pub(crate) mold: Option<Context>,
    pub(crate) elements: ElementStorage,
    pub(crate) version: Version,
}

pub(crate) struct MoldData {
    pub(crate) elements: ElementStorage,
    pub(crate) documentation: Vec<Context>,
}

pub(crate) struct SectionData {
    pub(crate) name: String,
    pub(crate) elements: ElementStorage,
    pub(crate) mold_equiv: Option<Weak<RefCell<ContextInner>>>,
    pub(crate) documentation: Vec<Context>,
    pub(crate) restrictions: Vec<Context>,
}

pub(crate) struct KeyvalData {
    pub(crate) name: String,
    pub(crate) value: Option<Value>,
    pub(crate) value_type: Option<ValueType>,
    pub(crate) mold_equiv: Option<Weak<RefCell<ContextInner>>>,
    pub(crate) documentation: Vec<Context>,
    pub(crate) defaults: Vec<Context>,
    pub(crate) restrictions: Vec<Context>,
}

pub(crate) struct DocumentationData {
    pub(crate) introduced: Version,
    pub(crate) text: Value,
}

pub(crate) struct DefaultData {
    pub(crate) introduced: Version,
    pub(crate) value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictionKind {
    EntryMin,
    EntryMax,
    ValueNumeric,
    ValueRange,
    ValueEnum,
}

impl RestrictionKind {
    pub fn is_inclusive(&self) -> bool {
        matches!(self, RestrictionKind::EntryMin | RestrictionKind::EntryMax)
    }

    pub fn is_exclusive(&self) -> bool {
        !self.is_inclusive()
    }
}

#[derive(Debug, Clone)]
pub(crate) enum RestrictionPayload {
    EntryMin(i64),
    EntryMax(i64),
    ValueNumericInt(i64),
    ValueNumericFloat(f64),
    ValueRangeInt(i64, i64),
    ValueRangeFloat(f64, f64),
    ValueEnum(String),
    Unset,
}

pub(crate) struct RestrictionData {
    pub(crate) introduced: Version,
    pub(crate) deprecated: Option<Version>,
    pub(crate) kind: Option<RestrictionKind>,
    pub(crate) payload: RestrictionPayload,
    pub(crate) documentation: Vec<Context>,
}

pub(crate) enum Variant {
    Config(ConfigData),
    Mold(MoldData),
    Section(SectionData),
    Keyval(KeyvalData),
    Documentation(DocumentationData),
    Default(DefaultData),
    Restriction(RestrictionData),
}

pub(crate) struct ContextInner {
    pub(crate) kind: ContextKind,
    pub(crate) state: ContextState,
    pub(crate) invalid: bool,
    pub(crate) fatal: bool,
    pub(crate) attached_to_parent: bool,
    pub(crate) parent: Option<Context>,
    pub(crate) root_kind: Option<RootKind>,
    pub(crate) error: Option<String>,
    pub(crate) variant: Variant,
}

/// A handle to a context node. Cheaply `Clone`-able (an `Rc` clone); kept
/// deliberately `!Send`/`!Sync` since the whole tree is single-threaded
/// (see §5 of the design).
#[derive(Clone)]
pub struct Context(pub(crate) Rc<RefCell<ContextInner>>);

impl Context {
    pub(crate) fn from_inner(inner: ContextInner) -> Context {
        Context(Rc::new(RefCell::new(inner)))
    }

    pub(crate) fn weak(&self) -> Weak<RefCell<ContextInner>> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn from_weak(weak: &Weak<RefCell<ContextInner>>) -> Option<Context> {
        weak.upgrade().map(Context)
    }

    /// Identity comparison (not structural): are these two handles the
    /// same underlying node?
    pub fn is_same(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Current strong-reference count. The node is live for as long as
    /// this is greater than zero; it is created at one.
    pub fn refcount(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub fn context_type(&self) -> ContextKind {
        self.0.borrow().kind
    }

    pub fn is_constructing(&self) -> bool {
        matches!(self.0.borrow().state, ContextState::Constructing)
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.0.borrow().state, ContextState::Finalized)
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self.0.borrow().state, ContextState::Destroyed)
    }

    pub fn is_invalid(&self) -> bool {
        self.0.borrow().invalid
    }

    pub fn is_fatal(&self) -> bool {
        self.0.borrow().fatal
    }

    /// Sets the permanent, sticky `fatal` bit. Forces a subsequent
    /// `finalize` to fail with `context_in_wrong_state`. Not clearable.
    pub fn set_fatal(&self, message: impl Into<String>) {
        let mut inner = self.0.borrow_mut();
        inner.fatal = true;
        inner.error = Some(message.into());
    }

    /// The diagnostic string attached to this node, if any.
    pub fn context_error(&self) -> Option<String> {
        self.0.borrow().error.clone()
    }

    pub(crate) fn set_error(&self, message: impl Into<String>) {
        self.0.borrow_mut().error = Some(message.into());
    }

    pub(crate) fn mark_invalid(&self, message: impl Into<String>) {
        let mut inner = self.0.borrow_mut();
        inner.invalid = true;
        inner.error = Some(message.into());
    }

    pub fn parent(&self) -> Option<Context> {
        self.0.borrow().parent.clone()
    }

    /// Walks up `parent` links to the nearest Config/Mold ancestor
    /// (self, if this node is already a root).
    pub fn root(&self) -> Context {
        let mut current = self.clone();
        loop {
            let parent = current.0.borrow().parent.clone();
            match parent {
                Some(p) => current = p,
                None => return current,
            }
        }
    }

    pub fn root_kind(&self) -> Option<RootKind> {
        self.root().0.borrow().root_kind
    }

    /// Guard used by every kind-specific operation: fails with
    /// `wrong_context` if this node's kind is not one of `allowed`, and
    /// with `destroyed_context` if the node has been destroyed.
    pub(crate) fn guard_kind(&self, allowed: &[ContextKind]) -> DisirResult<()> {
        if self.is_destroyed() {
            return Err(DisirError::DestroyedContext);
        }
        let kind = self.context_type();
        if !allowed.contains(&kind) {
            let expected: Vec<&str> = allowed.iter().map(|k| k.as_str()).collect();
            return Err(DisirError::WrongContext(format!(
                "expected one of {:?}, got {}",
                expected, kind
            )));
        }
        Ok(())
    }

    /// Begins a new node. Roots (`Config`/`Mold`) take `parent = None`.
    pub fn begin(parent: Option<&Context>, kind: ContextKind) -> DisirResult<Context> {
        let is_root = matches!(kind, ContextKind::Config | ContextKind::Mold);
        if is_root && parent.is_some() {
            return Err(DisirError::InvalidArgument(
                "root contexts (CONFIG/MOLD) may not have a parent".to_string(),
            ));
        }
        if !is_root && parent.is_none() {
            return Err(DisirError::InvalidArgument(format!(
                "{} requires a parent context",
                kind
            )));
        }
        if let Some(p) = parent {
            if p.is_destroyed() {
                return Err(DisirError::DestroyedContext);
            }
        }

        let variant = match kind {
            ContextKind::Config => Variant::Config(ConfigData {
                mold: None,
                elements: ElementStorage::new(),
                version: Version::default(),
            }),
            ContextKind::Mold => Variant::Mold(MoldData {
                elements: ElementStorage::new(),
                documentation: Vec::new(),
            }),
            ContextKind::Section => Variant::Section(SectionData {
                name: String::new(),
                elements: ElementStorage::new(),
                mold_equiv: None,
                documentation: Vec::new(),
                restrictions: Vec::new(),
            }),
            ContextKind::Keyval => Variant::Keyval(KeyvalData {
                name: String::new(),
                value: None,
                value_type: None,
                mold_equiv: None,
                documentation: Vec::new(),
                defaults: Vec::new(),
                restrictions: Vec::new(),
            }),
            ContextKind::Documentation => Variant::Documentation(DocumentationData {
                introduced: Version::default(),
                text: Value::String(Vec::new()),
            }),
            ContextKind::Default => Variant::Default(DefaultData {
                introduced: Version::default(),
                value: Value::String(Vec::new()),
            }),
            ContextKind::Restriction => Variant::Restriction(RestrictionData {
                introduced: Version::default(),
                deprecated: None,
                kind: None,
                payload: RestrictionPayload::Unset,
                documentation: Vec::new(),
            }),
        };

        let root_kind = match kind {
            ContextKind::Config => Some(RootKind::Config),
            ContextKind::Mold => Some(RootKind::Mold),
            _ => None,
        };

        let ctx = Context::from_inner(ContextInner {
            kind,
            state: ContextState::Constructing,
            invalid: false,
            fatal: false,
            attached_to_parent: false,
            parent: parent.cloned(),
            root_kind,
            error: None,
            variant,
        });

        Ok(ctx)
    }

    /// Transitions the node to `finalized`, running validation (§4.13).
    /// Returns `invalid_context` if validation found a failure, but the
    /// node is still stored/usable (editor-friendly partial construction).
    pub fn finalize(&self) -> DisirResult<()> {
        if self.is_destroyed() {
            return Err(DisirError::DestroyedContext);
        }
        if self.is_fatal() {
            return Err(DisirError::ContextInWrongState(
                "node has a fatal error and cannot be finalized".to_string(),
            ));
        }
        // Idempotent: finalizing twice is a no-op after the first success (R2).
        if self.is_finalized() {
            return if self.is_invalid() {
                Err(DisirError::InvalidContext(
                    self.context_error().unwrap_or_default(),
                ))
            } else {
                Ok(())
            };
        }

        let status = crate::validator::validate(self);
        self.0.borrow_mut().state = ContextState::Finalized;
        match status {
            crate::validator::ValidationStatus::Ok => {
                self.0.borrow_mut().invalid = false;
                Ok(())
            }
            other => {
                self.0.borrow_mut().invalid = true;
                tracing::debug!(kind = %self.context_type(), ?other, "context finalized invalid");
                Err(other.into_error(self.context_error()))
            }
        }
    }

    /// Forcibly destroys this node, recursively releasing children's
    /// parent-holds and this node's own back-reference to its parent.
    pub fn destroy(&self) -> DisirResult<()> {
        self.destroy_internal();
        Ok(())
    }

    fn destroy_internal(&self) {
        let (children, subs, extra) = {
            let mut inner = self.0.borrow_mut();
            if matches!(inner.state, ContextState::Destroyed) {
                return;
            }
            inner.state = ContextState::Destroyed;
            take_descendants(&mut inner.variant)
        };
        for child in children.iter().chain(subs.iter()).chain(extra.iter()) {
            child.destroy_internal();
        }
        self.0.borrow_mut().parent = None;
    }

    /// Decrements this handle's hold by dropping it. Provided for
    /// parity with the source API's explicit `put`; in Rust this is
    /// just `drop(context)`, but spelled out for callers translating
    /// from the C-style `begin`/`put` pairing.
    pub fn put(self) {
        drop(self);
    }

    pub fn name(&self) -> DisirResult<String> {
        let inner = self.0.borrow();
        match &inner.variant {
            Variant::Section(s) => Ok(s.name.clone()),
            Variant::Keyval(k) => Ok(k.name.clone()),
            _ => Err(DisirError::WrongContext(format!(
                "{} has no name",
                inner.kind
            ))),
        }
    }

    /// Sets this node's name. Under a Config root, also attempts to bind
    /// the mold-equivalent back-reference; failure leaves the node
    /// invalid but keeps the provided name (so introspection still
    /// reports it) and returns `not_exist`.
    pub fn set_name(&self, bytes: &[u8]) -> DisirResult<()> {
        self.guard_kind(&[ContextKind::Section, ContextKind::Keyval])?;
        let name = String::from_utf8_lossy(bytes).into_owned();
        {
            let mut inner = self.0.borrow_mut();
            match &mut inner.variant {
                Variant::Section(s) => s.name = name.clone(),
                Variant::Keyval(k) => k.name = name.clone(),
                _ => unreachable!("guarded above"),
            }
        }

        if self.root_kind() == Some(RootKind::Config) {
            self.bind_mold_equivalent()?;
        }
        Ok(())
    }

    /// Resolves and records this node's mold-equivalent. Looks up the
    /// name within the mold-side element storage of the structurally
    /// corresponding parent.
    pub(crate) fn bind_mold_equivalent(&self) -> DisirResult<()> {
        let name = self.name()?;
        let mold_scope = self.parent_mold_scope()?;

        match mold_scope.and_then(|scope| scope.find_first_element(&name)) {
            Some(equiv) => {
                let weak = equiv.weak();
                let mut inner = self.0.borrow_mut();
                match &mut inner.variant {
                    Variant::Section(s) => s.mold_equiv = Some(weak),
                    Variant::Keyval(k) => k.mold_equiv = Some(weak),
                    _ => {}
                }
                drop(inner);
                self.0.borrow_mut().invalid = false;
                Ok(())
            }
            None => {
                self.mark_invalid(format!("'{name}' has no mold equivalent"));
                Err(DisirError::NotExist(format!(
                    "'{name}' not found in mold"
                )))
            }
        }
    }

    /// The element storage of the mold-side node structurally
    /// corresponding to this node's parent, used to resolve
    /// mold-equivalents.
    fn parent_mold_scope(&self) -> DisirResult<Option<Context>> {
        let parent = match self.parent() {
            Some(p) => p,
            None => return Ok(None),
        };
        match parent.context_type() {
            ContextKind::Config => {
                let mold = parent.0.borrow().variant_config_mold();
                Ok(mold)
            }
            ContextKind::Section => Ok(parent.mold_equivalent()),
            _ => Ok(None),
        }
    }

    /// The bound mold-equivalent node for a Config Section/Keyval, if any.
    pub fn mold_equivalent(&self) -> Option<Context> {
        let inner = self.0.borrow();
        match &inner.variant {
            Variant::Section(s) => s.mold_equiv.as_ref().and_then(Context::from_weak),
            Variant::Keyval(k) => k.mold_equiv.as_ref().and_then(Context::from_weak),
            _ => None,
        }
    }

    /// Finds the first direct child named `name` within this composite's
    /// element storage (Config/Mold/Section only).
    pub(crate) fn find_first_element(&self, name: &str) -> Option<Context> {
        let inner = self.0.borrow();
        inner.variant.elements().and_then(|e| e.get_first(name))
    }

    pub(crate) fn elements_mut<F, R>(&self, f: F) -> DisirResult<R>
    where
        F: FnOnce(&mut ElementStorage) -> R,
    {
        self.guard_kind(&[ContextKind::Config, ContextKind::Mold, ContextKind::Section])?;
        let mut inner = self.0.borrow_mut();
        let storage = inner
            .variant
            .elements_mut()
            .ok_or_else(|| DisirError::WrongContext("not a composite context".to_string()))?;
        Ok(f(storage))
    }

    pub(crate) fn elements_ref<F, R>(&self, f: F) -> DisirResult<R>
    where
        F: FnOnce(&ElementStorage) -> R,
    {
        self.guard_kind(&[ContextKind::Config, ContextKind::Mold, ContextKind::Section])?;
        let inner = self.0.borrow();
        let storage = inner
            .variant
            .elements()
            .ok_or_else(|| DisirError::WrongContext("not a composite context".to_string()))?;
        Ok(f(storage))
    }

    /// Attaches `child` to this composite under `name`, marking `child` as
    /// parent-attached.
    pub(crate) fn attach_child(&self, name: &str, child: &Context) -> DisirResult<()> {
        self.elements_mut(|storage| storage.add(name, child.clone()))??;
        child.0.borrow_mut().attached_to_parent = true;
        Ok(())
    }

    /// All direct children, in insertion order. Config/Mold/Section only.
    pub fn get_elements(&self) -> DisirResult<Vec<Context>> {
        self.elements_ref(|storage| storage.get_all())
    }

    /// All direct children named `name`.
    pub fn find_elements(&self, name: &str) -> DisirResult<Vec<Context>> {
        self.elements_ref(|storage| storage.get(name))
    }

    /// The first direct child named `name`.
    pub fn find_element(&self, name: &str) -> DisirResult<Option<Context>> {
        self.elements_ref(|storage| storage.get_first(name))
    }

    /// Resolves a dotted path with optional `[n]` positional selectors,
    /// e.g. `"server.listeners[1].port"`, rooted at this node.
    pub fn resolve(&self, path: &str) -> DisirResult<Context> {
        crate::query::resolve(self, path)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("Context")
            .field("kind", &inner.kind)
            .field("state", &inner.state)
            .field("invalid", &inner.invalid)
            .field("fatal", &inner.fatal)
            .finish()
    }
}

impl ContextInner {
    fn variant_config_mold(&self) -> Option<Context> {
        match &self.variant {
            Variant::Config(c) => c.mold.clone(),
            _ => None,
        }
    }
}

impl Variant {
    pub(crate) fn elements(&self) -> Option<&ElementStorage> {
        match self {
            Variant::Config(c) => Some(&c.elements),
            Variant::Mold(m) => Some(&m.elements),
            Variant::Section(s) => Some(&s.elements),
            _ => None,
        }
    }

    pub(crate) fn elements_mut(&mut self) -> Option<&mut ElementStorage> {
        match self {
            Variant::Config(c) => Some(&mut c.elements),
            Variant::Mold(m) => Some(&mut m.elements),
            Variant::Section(s) => Some(&mut s.elements),
            _ => None,
        }
    }
}

/// Drains every strong reference this node's variant holds to other
/// context nodes: element-storage children, documentation/default/
/// restriction sub-nodes, and (for Config) the bound mold.
fn take_descendants(variant: &mut Variant) -> (Vec<Context>, Vec<Context>, Vec<Context>) {
    match variant {
        Variant::Config(c) => {
            let children = c.elements.destroy_all();
            let extra = c.mold.take().into_iter().collect();
            (children, Vec::new(), extra)
        }
        Variant::Mold(m) => {
            let children = m.elements.destroy_all();
            let subs = std::mem::take(&mut m.documentation);
            (children, subs, Vec::new())
        }
        Variant::Section(s) => {
            let children = s.elements.destroy_all();
            let mut subs = std::mem::take(&mut s.documentation);
            subs.extend(std::mem::take(&mut s.restrictions));
            (children, subs, Vec::new())
        }
        Variant::Keyval(k) => {
            let mut subs = std::mem::take(&mut k.documentation);
            subs.extend(std::mem::take(&mut k.defaults));
            subs.extend(std::mem::take(&mut k.restrictions));
            (Vec::new(), subs, Vec::new())
        }
        Variant::Restriction(r) => {
            let subs = std::mem::take(&mut r.documentation);
            (Vec::new(), subs, Vec::new())
        }
        Variant::Documentation(_) | Variant::Default(_) => (Vec::new(), Vec::new(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_root_rejects_parent() {
        let mold = Context::begin(None, ContextKind::Mold).unwrap();
        assert!(Context::begin(Some(&mold), ContextKind::Mold).is_err());
    }

    #[test]
    fn begin_non_root_requires_parent() {
        assert!(Context::begin(None, ContextKind::Keyval).is_err());
    }

    #[test]
    fn refcount_starts_at_one_and_tracks_clones() {
        let ctx = Context::begin(None, ContextKind::Mold).unwrap();
        assert_eq!(ctx.refcount(), 1);
        let clone = ctx.clone();
        assert_eq!(ctx.refcount(), 2);
        drop(clone);
        assert_eq!(ctx.refcount(), 1);
    }

    #[test]
    fn finalize_twice_is_a_no_op() {
        let mold = Context::begin(None, ContextKind::Mold).unwrap();
        mold.finalize().unwrap();
        assert!(mold.is_finalized());
        mold.finalize().unwrap();
    }

    #[test]
    fn destroyed_node_rejects_further_operations() {
        let mold = Context::begin(None, ContextKind::Mold).unwrap();
        mold.destroy().unwrap();
        assert!(mold.is_destroyed());
        assert!(matches!(
            Context::begin(Some(&mold), ContextKind::Section),
            Err(DisirError::DestroyedContext)
        ));
    }

    #[test]
    fn set_name_unknown_in_mold_marks_invalid_but_keeps_name() {
        let mold = Context::begin(None, ContextKind::Mold).unwrap();
        mold.finalize().unwrap();
        let config = crate::config::begin_config(&mold).unwrap();

        let keyval = Context::begin(Some(&config), ContextKind::Keyval).unwrap();
        let result = keyval.set_name(b"unknown");
        assert!(matches!(result, Err(DisirError::NotExist(_))));
        assert_eq!(keyval.name().unwrap(), "unknown");
        assert!(keyval.is_invalid());
    }
}
