//! Node→TagSet mapping, keyed by node identity. Grounded on
//! `original_source`'s `TagStorage` (`src/Logic/TagSystem.h`), which
//! keys off a raw `VfsNode*`; here the key is [`crate::node::node_identity`],
//! the address behind a node's `Rc<RefCell<_>>`.

use std::collections::HashMap;

use crate::node::{node_identity, NodeRef};
use crate::tags::TagSet;

#[derive(Default)]
pub struct TagStorage {
    tags: HashMap<usize, TagSet>,
}

impl TagStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tags_for(&self, node: &NodeRef) -> TagSet {
        self.tags.get(&node_identity(node)).cloned().unwrap_or_default()
    }

    pub fn set_tags(&mut self, node: &NodeRef, tags: TagSet) {
        self.tags.insert(node_identity(node), tags);
    }

    pub fn add_tag(&mut self, node: &NodeRef, tag: crate::tags::TagId) {
        self.tags.entry(node_identity(node)).or_default().insert(tag);
    }

    pub fn remove_tag(&mut self, node: &NodeRef, tag: crate::tags::TagId) {
        if let Some(set) = self.tags.get_mut(&node_identity(node)) {
            set.erase(tag);
        }
    }

    /// Clears a removed node's tags. Must be called whenever a node
    /// leaves the VFS, or its identity slot leaks forever.
    pub fn clear_tags(&mut self, node: &NodeRef) {
        self.tags.remove(&node_identity(node));
    }

    /// All keyed nodes carrying at least one of `tags`.
    pub fn find_by_tags_any(&self, tags: &TagSet) -> Vec<usize> {
        self.tags.iter().filter(|(_, set)| !(set & tags).is_empty()).map(|(id, _)| *id).collect()
    }

    /// All keyed nodes carrying every tag in `tags`.
    pub fn find_by_tags_all(&self, tags: &TagSet) -> Vec<usize> {
        self.tags.iter().filter(|(_, set)| set.is_superset_of(tags)).map(|(id, _)| *id).collect()
    }

    pub fn find_by_tag(&self, tag: crate::tags::TagId) -> Vec<usize> {
        self.tags.iter().filter(|(_, set)| set.contains(tag)).map(|(id, _)| *id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    #[test]
    fn clear_tags_removes_entry() {
        let mut storage = TagStorage::new();
        let node = Node::new_file("a", Vec::new());
        storage.add_tag(&node, 1);
        assert_eq!(storage.tags_for(&node).size(), 1);
        storage.clear_tags(&node);
        assert_eq!(storage.tags_for(&node).size(), 0);
    }

    #[test]
    fn find_by_tags_all_requires_every_tag() {
        let mut storage = TagStorage::new();
        let a = Node::new_file("a", Vec::new());
        let b = Node::new_file("b", Vec::new());
        storage.add_tag(&a, 1);
        storage.add_tag(&a, 2);
        storage.add_tag(&b, 1);

        let mut want = TagSet::default();
        want.insert(1);
        want.insert(2);
        let hits = storage.find_by_tags_all(&want);
        assert_eq!(hits, vec![crate::node::node_identity(&a)]);
    }
}
