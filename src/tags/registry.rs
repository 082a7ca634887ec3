//! Interning registry from tag name to [`TagId`].
//!
//! Grounded on `original_source`'s `TagRegistry`
//! (`src/Logic/TagSystem.h`): a bidirectional name/id map plus a
//! monotonically increasing `next_id` starting at 1.

use std::collections::HashMap;

use super::set::TAG_INVALID;

/// A small unsigned integer identifying an interned tag. `0` is reserved.
pub type TagId = u64;

/// Interns tag names to stable, process-lifetime [`TagId`]s.
#[derive(Debug, Default)]
pub struct TagRegistry {
    name_to_id: HashMap<String, TagId>,
    id_to_name: HashMap<TagId, String>,
    next_id: TagId,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self { name_to_id: HashMap::new(), id_to_name: HashMap::new(), next_id: 1 }
    }

    /// Interns `name`, returning its existing id if already registered.
    pub fn register_tag(&mut self, name: &str) -> TagId {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.name_to_id.insert(name.to_string(), id);
        self.id_to_name.insert(id, name.to_string());
        id
    }

    /// Returns [`TAG_INVALID`] for an unknown name.
    pub fn get_tag_id(&self, name: &str) -> TagId {
        self.name_to_id.get(name).copied().unwrap_or(TAG_INVALID)
    }

    pub fn get_tag_name(&self, id: TagId) -> Option<&str> {
        self.id_to_name.get(&id).map(String::as_str)
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.name_to_id.contains_key(name)
    }

    /// Registered names, in insertion (ascending id) order.
    pub fn all_tags(&self) -> Vec<String> {
        let mut ids: Vec<&TagId> = self.id_to_name.keys().collect();
        ids.sort();
        ids.into_iter().map(|id| self.id_to_name[id].clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let mut reg = TagRegistry::new();
        let a = reg.register_tag("critical");
        let b = reg.register_tag("critical");
        assert_eq!(a, b);
        assert_ne!(a, TAG_INVALID);
    }

    #[test]
    fn unknown_name_is_invalid() {
        let reg = TagRegistry::new();
        assert_eq!(reg.get_tag_id("nope"), TAG_INVALID);
    }

    #[test]
    fn all_tags_preserves_insertion_order() {
        let mut reg = TagRegistry::new();
        reg.register_tag("b");
        reg.register_tag("a");
        reg.register_tag("c");
        assert_eq!(reg.all_tags(), vec!["b", "a", "c"]);
    }
}
