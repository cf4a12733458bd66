//! Per-parent child container: insertion-ordered list + multimap by name.

use std::collections::HashMap;

use crate::context::Context;
use crate::error::{DisirError, DisirResult};

/// Holds the named children of a Config/Mold/Section node.
///
/// Two access orders are maintained over the same set of nodes: an
/// insertion-ordered list (serialisation, iteration) and a by-name
/// multimap (cardinality, lookup). `add` is idempotent-free: re-adding the
/// same node returns `exists`.
#[derive(Debug, Default)]
pub struct ElementStorage {
    order: Vec<Context>,
    by_name: HashMap<String, Vec<Context>>,
}

impl ElementStorage {
    pub fn new() -> Self {
        ElementStorage {
            order: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Adds `node` under `name`. Returns `exists` if this exact node
    /// (by identity) is already present.
    pub fn add(&mut self, name: &str, node: Context) -> DisirResult<()> {
        if self.order.iter().any(|n| n.is_same(&node)) {
            return Err(DisirError::Exists(format!(
                "node already present in element storage: {name}"
            )));
        }
        self.order.push(node.clone());
        self.by_name.entry(name.to_string()).or_default().push(node);
        Ok(())
    }

    /// Removes `node` (by identity) from both access orders, if present.
    pub fn remove(&mut self, node: &Context) {
        self.order.retain(|n| !n.is_same(node));
        self.by_name.retain(|_, v| {
            v.retain(|n| !n.is_same(node));
            !v.is_empty()
        });
    }

    /// All children in insertion order.
    pub fn get_all(&self) -> Vec<Context> {
        self.order.clone()
    }

    /// All children named `name`, in insertion order.
    pub fn get(&self, name: &str) -> Vec<Context> {
        self.by_name.get(name).cloned().unwrap_or_default()
    }

    /// The `index`-th child named `name`, or `None`.
    pub fn get_first(&self, name: &str) -> Option<Context> {
        self.by_name.get(name).and_then(|v| v.first().cloned())
    }

    /// The `index`-th child named `name`, or `None`.
    pub fn get_nth(&self, name: &str, index: usize) -> Option<Context> {
        self.by_name.get(name).and_then(|v| v.get(index).cloned())
    }

    pub fn count(&self, name: &str) -> usize {
        self.by_name.get(name).map(|v| v.len()).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drops all contained nodes, releasing storage's strong references to
    /// them. Does not recurse into the nodes themselves — callers
    /// (`Context::destroy`) are responsible for breaking the children's
    /// own back-references.
    pub fn destroy_all(&mut self) -> Vec<Context> {
        self.by_name.clear();
        std::mem::take(&mut self.order)
    }
}
