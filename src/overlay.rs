//! The overlay store: one transparent layer of the VFS.
//!
//! Grounded on `src/vfs/mod.rs`'s plain accessor-struct style; the
//! `dirty`/`source_path` bookkeeping is new, grounded on
//! `original_source/src/VfsCore/VfsCore.h`'s `Overlay`.

use std::path::PathBuf;

use crate::node::{Node, NodeRef};

/// One layer of the VFS: a named, independently persistable root
/// directory. Overlay 0 is always present as the base layer.
pub struct Overlay {
    pub name: String,
    pub root: NodeRef,
    pub source_path: Option<PathBuf>,
    pub source_hash: Option<String>,
    pub dirty: bool,
}

impl Overlay {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), root: Node::new_dir("/"), source_path: None, source_hash: None, dirty: false }
    }
}

/// The ordered sequence of overlays. Overlay ids are stable for the life
/// of the process except where the VFS façade's `unmount` path
/// explicitly renumbers.
#[derive(Default)]
pub struct OverlayStore {
    overlays: Vec<Overlay>,
}

impl OverlayStore {
    pub fn new() -> Self {
        let mut store = Self::default();
        store.register("base", Node::new_dir("/"));
        store
    }

    /// Appends a new overlay, returning its id. Names need not be
    /// unique; `find_by_name` returns the lowest matching id.
    pub fn register(&mut self, name: impl Into<String>, root: NodeRef) -> usize {
        let id = self.overlays.len();
        self.overlays.push(Overlay { name: name.into(), root, source_path: None, source_hash: None, dirty: false });
        id
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&Overlay> {
        self.overlays.get(id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Overlay> {
        self.overlays.get_mut(id)
    }

    pub fn root(&self, id: usize) -> Option<NodeRef> {
        self.overlays.get(id).map(|o| o.root.clone())
    }

    pub fn name(&self, id: usize) -> Option<&str> {
        self.overlays.get(id).map(|o| o.name.as_str())
    }

    pub fn source(&self, id: usize) -> Option<&PathBuf> {
        self.overlays.get(id).and_then(|o| o.source_path.as_ref())
    }

    pub fn is_dirty(&self, id: usize) -> bool {
        self.overlays.get(id).map(|o| o.dirty).unwrap_or(false)
    }

    pub fn set_source(&mut self, id: usize, host_path: PathBuf) {
        if let Some(o) = self.overlays.get_mut(id) {
            o.source_path = Some(host_path);
        }
    }

    pub fn mark_dirty(&mut self, id: usize) {
        if let Some(o) = self.overlays.get_mut(id) {
            o.dirty = true;
        }
    }

    pub fn clear_dirty(&mut self, id: usize) {
        if let Some(o) = self.overlays.get_mut(id) {
            o.dirty = false;
        }
    }

    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.overlays.iter().position(|o| o.name == name)
    }

    pub fn ids(&self) -> impl Iterator<Item = usize> {
        0..self.overlays.len()
    }

    /// Removes overlay `id` from the sequence, shifting every higher id
    /// down by one. Callers (the VFS façade's `unmount`, `WorkingDirectory`)
    /// are responsible for renumbering their own id references.
    pub fn remove(&mut self, id: usize) -> Option<Overlay> {
        if id < self.overlays.len() {
            Some(self.overlays.remove(id))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_by_name_returns_lowest_id() {
        let mut store = OverlayStore::new();
        store.register("extra", Node::new_dir("/"));
        store.register("extra", Node::new_dir("/"));
        assert_eq!(store.find_by_name("extra"), Some(1));
    }

    #[test]
    fn dirty_flag_lifecycle() {
        let mut store = OverlayStore::new();
        assert!(!store.is_dirty(0));
        store.mark_dirty(0);
        assert!(store.is_dirty(0));
        store.clear_dirty(0);
        assert!(!store.is_dirty(0));
    }
}
