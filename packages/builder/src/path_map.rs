// Many-to-many path map
//
// A bidirectional multimap between file identities, maintained so the two
// directions never disagree.

use indexmap::{IndexMap, IndexSet};
use ts::CanonicalPath;

/// A mutable many-to-many relation between paths: `forward` maps a file to
/// the set of files it references, `reverse` maps a file to the set of
/// files referencing it.
///
/// Invariant: `k ∈ reverse[v]` exactly when `v ∈ forward[k]`. Every
/// mutation updates both sides; empty reverse sets are pruned so
/// `get_keys` returns `None` rather than an empty set.
///
/// Deleted keys are tombstoned: `delete_key` removes the forward entry and
/// records the key, and a later `set` on the same key un-deletes it. A key
/// set to an empty value set is still enumerable through `keys()`; a
/// deleted key is not.
#[derive(Debug, Default)]
pub struct ManyToManyPathMap {
    forward: IndexMap<CanonicalPath, IndexSet<CanonicalPath>>,
    reverse: IndexMap<CanonicalPath, IndexSet<CanonicalPath>>,
    deleted: IndexSet<CanonicalPath>,
}

impl ManyToManyPathMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files referencing `value`.
    pub fn get_keys(&self, value: &CanonicalPath) -> Option<&IndexSet<CanonicalPath>> {
        self.reverse.get(value)
    }

    /// Files referenced by `key`.
    pub fn get_values(&self, key: &CanonicalPath) -> Option<&IndexSet<CanonicalPath>> {
        self.forward.get(key)
    }

    /// Every key with a forward entry, deleted keys excluded.
    pub fn keys(&self) -> impl Iterator<Item = &CanonicalPath> {
        self.forward.keys()
    }

    pub fn size(&self) -> usize {
        self.forward.len()
    }

    pub fn has_deleted(&self, key: &CanonicalPath) -> bool {
        self.deleted.contains(key)
    }

    /// Replace `key`'s outgoing edges with `values`, diffing against the
    /// old set so only the reverse entries of added and removed targets are
    /// touched. Un-marks `key` as deleted.
    pub fn set(&mut self, key: CanonicalPath, values: IndexSet<CanonicalPath>) {
        self.deleted.swap_remove(&key);

        if let Some(existing) = self.forward.get(&key) {
            let removed: Vec<CanonicalPath> = existing
                .iter()
                .filter(|value| !values.contains(*value))
                .cloned()
                .collect();
            for value in removed {
                self.delete_from_reverse(&key, &value);
            }
        }
        for value in &values {
            let already = self
                .forward
                .get(&key)
                .is_some_and(|existing| existing.contains(value));
            if !already {
                self.reverse.entry(value.clone()).or_default().insert(key.clone());
            }
        }

        self.forward.insert(key, values);
    }

    /// Tombstone `key`: drop its forward entry and its membership in every
    /// reverse set. Reverse entries pointing *to* `key` are left for
    /// whoever removes the edges that produced them. Returns whether a
    /// forward entry existed.
    pub fn delete_key(&mut self, key: &CanonicalPath) -> bool {
        self.deleted.insert(key.clone());
        let Some(values) = self.forward.swap_remove(key) else {
            return false;
        };
        for value in &values {
            self.delete_from_reverse(key, value);
        }
        true
    }

    fn delete_from_reverse(&mut self, key: &CanonicalPath, value: &CanonicalPath) {
        if let Some(keys) = self.reverse.get_mut(value) {
            keys.swap_remove(key);
            if keys.is_empty() {
                self.reverse.swap_remove(value);
            }
        }
    }
}
