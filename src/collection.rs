//! Iterable, coalesce-on-read snapshot of contexts with refcount management.

use crate::context::Context;

/// A snapshotted, iterable sequence of node references.
///
/// Before any `size`/`next`, the collection is *coalesced*: destroyed
/// entries are dropped and the cursor is adjusted so no unseen entry is
/// skipped and the cursor never precedes zero. This is cheaper than
/// registering the collection with every node it was built from.
#[derive(Debug, Default)]
pub struct Collection {
    entries: Vec<Context>,
    cursor: usize,
}

impl Collection {
    pub fn new() -> Self {
        Collection {
            entries: Vec::new(),
            cursor: 0,
        }
    }

    pub fn from_iter(nodes: impl IntoIterator<Item = Context>) -> Self {
        let mut collection = Collection::new();
        for node in nodes {
            collection.push(node);
        }
        collection
    }

    /// Appends `node`, holding a clone (incref) of it for the collection's
    /// own lifetime.
    pub fn push(&mut self, node: Context) {
        self.entries.push(node);
    }

    fn coalesce(&mut self) {
        let mut seen_before_cursor = 0;
        let mut kept = Vec::with_capacity(self.entries.len());
        for (i, entry) in self.entries.drain(..).enumerate() {
            if entry.is_destroyed() {
                if i < self.cursor {
                    seen_before_cursor += 1;
                }
                continue;
            }
            kept.push(entry);
        }
        self.entries = kept;
        self.cursor = self.cursor.saturating_sub(seen_before_cursor);
    }

    /// Returns the next live node, or `None` if exhausted.
    pub fn next(&mut self) -> Option<Context> {
        self.coalesce();
        if self.cursor >= self.entries.len() {
            return None;
        }
        let node = self.entries[self.cursor].clone();
        self.cursor += 1;
        Some(node)
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn size(&mut self) -> usize {
        self.coalesce();
        self.entries.len()
    }

    /// Drops every remaining (including unseen) entry, releasing the
    /// collection's holds.
    pub fn finished(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextKind;

    fn keyval(name: &str) -> Context {
        let ctx = Context::begin(None, ContextKind::Keyval).unwrap();
        ctx.set_name(name.as_bytes()).unwrap();
        ctx
    }

    #[test]
    fn destroyed_while_iterating_is_skipped_and_size_adjusts() {
        let x = keyval("x");
        let y = keyval("y");
        let z = keyval("z");
        let mut collection = Collection::new();
        collection.push(x.clone());
        collection.push(y.clone());
        collection.push(z.clone());

        y.destroy().unwrap();

        assert_eq!(collection.next().unwrap().name().unwrap(), "x");
        assert_eq!(collection.next().unwrap().name().unwrap(), "z");
        assert!(collection.next().is_none());
        assert_eq!(collection.size(), 2);
    }

    #[test]
    fn finished_drops_all_remaining() {
        let mut collection = Collection::new();
        collection.push(keyval("a"));
        collection.push(keyval("b"));
        collection.finished();
        assert_eq!(collection.size(), 0);
    }
}
