//! The `Dir` variant: a name-to-child mapping.

use std::collections::HashMap;

use super::NodeRef;

/// Backing storage for a `Dir` node. Insertion order is irrelevant; names
/// are unique within the directory.
#[derive(Default)]
pub struct DirData {
    pub children: HashMap<String, NodeRef>,
}
