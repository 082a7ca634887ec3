//! The polymorphic node model: a shared header plus a variant payload.
//!
//! Dispatching on [`NodeVariant`] replaces virtual calls; the children
//! mapping lives only in directory-like variants (`Dir` and the
//! dir-like AST containers).

pub mod ast;
pub mod dir;
pub mod file;
pub mod host_mount;
pub mod library_mount;
pub mod remote_mount;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::error::{Result, VfsError};

pub use ast::AstNode;
pub use dir::DirData;
pub use file::FileData;
pub use host_mount::HostMountData;
pub use library_mount::{LibraryMountData, LibrarySymbolData};
pub use remote_mount::RemoteMountData;

/// Shared, owning handle to a node. Identity for [`crate::tags::TagStorage`]
/// purposes is the address behind this `Rc`'s inner `RefCell`.
pub type NodeRef = Rc<RefCell<Node>>;

/// Coarse dispatch tag, orthogonal to the concrete variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Dir,
    File,
    Mount,
    Library,
    Ast,
}

/// A node's concrete state.
pub enum NodeVariant {
    Dir(DirData),
    File(FileData),
    HostMount(HostMountData),
    LibraryMount(LibraryMountData),
    LibrarySymbol(LibrarySymbolData),
    RemoteMount(RemoteMountData),
    Ast(AstNode),
}

/// A node: the shared header (`name`, `kind`, a diagnostic-only weak
/// parent back-reference) plus its variant payload.
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub parent: Weak<RefCell<Node>>,
    pub variant: NodeVariant,
}

impl Node {
    pub fn new_dir(name: impl Into<String>) -> NodeRef {
        Rc::new(RefCell::new(Node {
            name: name.into(),
            kind: NodeKind::Dir,
            parent: Weak::new(),
            variant: NodeVariant::Dir(DirData::default()),
        }))
    }

    pub fn new_file(name: impl Into<String>, bytes: Vec<u8>) -> NodeRef {
        Rc::new(RefCell::new(Node {
            name: name.into(),
            kind: NodeKind::File,
            parent: Weak::new(),
            variant: NodeVariant::File(FileData { bytes }),
        }))
    }

    pub fn new_host_mount(name: impl Into<String>, host_path: std::path::PathBuf) -> NodeRef {
        Rc::new(RefCell::new(Node {
            name: name.into(),
            kind: NodeKind::Mount,
            parent: Weak::new(),
            variant: NodeVariant::HostMount(HostMountData::new(host_path)),
        }))
    }

    pub fn new_ast(name: impl Into<String>, ast: AstNode) -> NodeRef {
        Rc::new(RefCell::new(Node {
            name: name.into(),
            kind: NodeKind::Ast,
            parent: Weak::new(),
            variant: NodeVariant::Ast(ast),
        }))
    }

    pub fn new_library_mount(name: impl Into<String>, data: LibraryMountData) -> NodeRef {
        Rc::new(RefCell::new(Node {
            name: name.into(),
            kind: NodeKind::Library,
            parent: Weak::new(),
            variant: NodeVariant::LibraryMount(data),
        }))
    }

    pub fn new_remote_mount(name: impl Into<String>, data: RemoteMountData) -> NodeRef {
        Rc::new(RefCell::new(Node {
            name: name.into(),
            kind: NodeKind::Mount,
            parent: Weak::new(),
            variant: NodeVariant::RemoteMount(data),
        }))
    }

    /// Records `parent` as this node's diagnostic-only weak back-reference.
    pub fn link_parent(child: &NodeRef, parent: &NodeRef) {
        child.borrow_mut().parent = Rc::downgrade(parent);
    }

    /// Textual projection: file content, AST `dump`, plan-node rendering,
    /// mount `cat`.
    pub fn read(&self) -> Result<String> {
        match &self.variant {
            NodeVariant::Dir(_) => Err(VfsError::NotAFile(self.name.clone())),
            NodeVariant::File(f) => Ok(String::from_utf8_lossy(&f.bytes).into_owned()),
            NodeVariant::HostMount(m) => m.read(),
            NodeVariant::LibraryMount(_) => Err(VfsError::NotAFile(self.name.clone())),
            NodeVariant::LibrarySymbol(s) => Ok(s.signature.clone()),
            NodeVariant::RemoteMount(m) => m.read(),
            NodeVariant::Ast(a) => Ok(a.dump(0)),
        }
    }

    /// Raw byte projection, used by `File`/mount nodes; AST/dir nodes fail.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        match &self.variant {
            NodeVariant::File(f) => Ok(f.bytes.clone()),
            NodeVariant::Dir(_) => Err(VfsError::NotAFile(self.name.clone())),
            _ => Ok(self.read()?.into_bytes()),
        }
    }

    pub fn write(&mut self, s: &str) -> Result<()> {
        match &mut self.variant {
            NodeVariant::File(f) => {
                f.bytes = s.as_bytes().to_vec();
                Ok(())
            }
            NodeVariant::HostMount(m) => m.write(s),
            NodeVariant::RemoteMount(m) => m.write(s),
            NodeVariant::Ast(a) => a.write(s),
            NodeVariant::Dir(_) | NodeVariant::LibraryMount(_) | NodeVariant::LibrarySymbol(_) => {
                Err(VfsError::NotAFile(self.name.clone()))
            }
        }
    }

    pub fn write_bytes(&mut self, bytes: Vec<u8>) -> Result<()> {
        match &mut self.variant {
            NodeVariant::File(f) => {
                f.bytes = bytes;
                Ok(())
            }
            _ => self.write(&String::from_utf8_lossy(&bytes)),
        }
    }

    pub fn is_dir(&self) -> bool {
        match &self.variant {
            NodeVariant::Dir(_) => true,
            NodeVariant::File(_) => false,
            NodeVariant::HostMount(m) => m.is_dir(),
            NodeVariant::LibraryMount(_) => true,
            NodeVariant::LibrarySymbol(_) => false,
            NodeVariant::RemoteMount(m) => m.is_dir(),
            NodeVariant::Ast(a) => a.is_dir(),
        }
    }

    /// Directories only: an immutable view of the children map. Fails
    /// with [`VfsError::NotADir`] for leaves.
    pub fn children(&self) -> Result<Vec<(String, NodeRef)>> {
        match &self.variant {
            NodeVariant::Dir(d) => Ok(d.children.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            NodeVariant::HostMount(m) => m.children(),
            NodeVariant::LibraryMount(l) => Ok(l.symbols.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            NodeVariant::RemoteMount(m) => m.children(),
            NodeVariant::Ast(a) => a.children(),
            NodeVariant::File(_) | NodeVariant::LibrarySymbol(_) => {
                Err(VfsError::NotADir(self.name.clone()))
            }
        }
    }

    /// Inserts or replaces `child` under `name` in a directory-like node.
    pub fn insert_child(&mut self, name: String, child: NodeRef) -> Result<()> {
        match &mut self.variant {
            NodeVariant::Dir(d) => {
                d.children.insert(name, child);
                Ok(())
            }
            NodeVariant::Ast(a) => a.insert_child(name, child),
            _ => Err(VfsError::NotADir(self.name.clone())),
        }
    }

    pub fn remove_child(&mut self, name: &str) -> Result<Option<NodeRef>> {
        match &mut self.variant {
            NodeVariant::Dir(d) => Ok(d.children.remove(name)),
            NodeVariant::Ast(a) => a.remove_child(name),
            _ => Err(VfsError::NotADir(self.name.clone())),
        }
    }

    pub fn get_child(&self, name: &str) -> Result<Option<NodeRef>> {
        Ok(self.children()?.into_iter().find(|(n, _)| n == name).map(|(_, n)| n))
    }
}

/// Stable identity of a node for [`crate::tags::TagStorage`] keys: the
/// address of the `RefCell` behind the shared handle.
pub fn node_identity(node: &NodeRef) -> usize {
    Rc::as_ptr(node) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_round_trips_children() {
        let root = Node::new_dir("/");
        let child = Node::new_file("a.txt", b"hi".to_vec());
        root.borrow_mut().insert_child("a.txt".into(), child.clone()).unwrap();
        let found = root.borrow().get_child("a.txt").unwrap().unwrap();
        assert_eq!(node_identity(&found), node_identity(&child));
    }

    #[test]
    fn file_read_write() {
        let f = Node::new_file("a", Vec::new());
        f.borrow_mut().write("hello").unwrap();
        assert_eq!(f.borrow().read().unwrap(), "hello");
    }

    #[test]
    fn leaf_children_fails() {
        let f = Node::new_file("a", Vec::new());
        assert!(f.borrow().children().is_err());
    }
}
