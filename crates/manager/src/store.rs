//! Namespace-to-tree store owned by a manager

use properties::{PropertyTree, SharedTree};

/// Ordered mapping from namespace name to its tree, plus an optional
/// store-wide global tree and the provenance text of the whole store.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    entries: Vec<(String, PropertyTree)>,
    global: Option<SharedTree>,
    source: Option<String>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }

    pub fn get(&self, name: &str) -> Option<&PropertyTree> {
        self.position(name).map(|idx| &self.entries[idx].1)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut PropertyTree> {
        let idx = self.position(name)?;
        Some(&mut self.entries[idx].1)
    }

    /// Add or overwrite a namespace; an existing name keeps its position
    pub fn insert(&mut self, name: impl Into<String>, tree: PropertyTree) -> Option<PropertyTree> {
        let name = name.into();
        match self.position(&name) {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx].1, tree)),
            None => {
                self.entries.push((name, tree));
                None
            }
        }
    }

    /// Overwrite an existing namespace only. Returns whether it was present.
    pub fn replace(&mut self, name: &str, tree: PropertyTree) -> bool {
        match self.get_mut(name) {
            Some(slot) => {
                *slot = tree;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<PropertyTree> {
        self.position(name).map(|idx| self.entries.remove(idx).1)
    }

    /// Drop every namespace and the store-wide global tree
    pub fn clear(&mut self) {
        self.entries.clear();
        self.global = None;
        self.source = None;
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyTree)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn global(&self) -> Option<&SharedTree> {
        self.global.as_ref()
    }

    pub fn set_global(&mut self, global: Option<SharedTree>) {
        self.global = global;
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn set_source(&mut self, source: Option<String>) {
        self.source = source;
    }

    /// Replace this store's content with a deep copy of `other`.
    ///
    /// Every namespace keeps its provenance text. Trees that shared one
    /// global tree in `other` share one (newly allocated) global tree here,
    /// so later edits on either side do not leak across.
    pub fn import_from(&mut self, other: &ConfigStore) {
        let mut relinked: Vec<(SharedTree, SharedTree)> = Vec::new();
        let mut relink = |global: Option<&SharedTree>| -> Option<SharedTree> {
            let original = global?;
            if let Some((_, copy)) = relinked.iter().find(|(from, _)| from.ptr_eq(original)) {
                return Some(copy.clone());
            }
            let copy = SharedTree::new(original.snapshot());
            relinked.push((original.clone(), copy.clone()));
            Some(copy)
        };

        self.entries.clear();
        for (name, tree) in other.iter() {
            let global = relink(tree.global());
            let mut copy = PropertyTree::from_map_with_global(tree.get_map(), global);
            copy.set_source(tree.source().map(str::to_string));
            self.entries.push((name.to_string(), copy));
        }

        self.global = relink(other.global());
        self.source = other.source.clone();
    }
}
