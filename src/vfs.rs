//! The VFS façade: resolution, multi-overlay resolution, writes, and
//! mount control. Delegates structural work to
//! [`crate::overlay::OverlayStore`] and [`crate::node::Node`].

use std::path::{Path, PathBuf};

use crate::error::{Result, VfsError};
use crate::logic::LogicEngine;
use crate::node::{LibraryMountData, Node, NodeRef, RemoteMountData};
use crate::overlay::OverlayStore;
use crate::path::{basename, dirname, split_path};
use crate::tags::{TagRegistry, TagStorage};
use crate::workdir::WorkingDirectory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountKind {
    Filesystem,
    Library,
    Remote,
}

pub struct MountInfo {
    pub vfs_path: String,
    pub host_path: String,
    pub kind: MountKind,
    pub mount_node: NodeRef,
}

pub struct Vfs {
    pub overlays: OverlayStore,
    pub mounts: Vec<MountInfo>,
    pub mount_allowed: bool,
    pub tag_registry: TagRegistry,
    pub tag_storage: TagStorage,
    pub logic_engine: LogicEngine,
    pub workdir: WorkingDirectory,
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs {
    pub fn new() -> Self {
        Self {
            overlays: OverlayStore::new(),
            mounts: Vec::new(),
            mount_allowed: true,
            tag_registry: TagRegistry::new(),
            tag_storage: TagStorage::new(),
            logic_engine: LogicEngine::new(),
            workdir: WorkingDirectory::new("/"),
        }
    }

    pub fn register_overlay(&mut self, name: impl Into<String>, root: NodeRef) -> usize {
        self.overlays.register(name, root)
    }

    /// Walks `path` component by component from `overlays[id].root`.
    pub fn resolve_for_overlay(&self, path: &str, id: usize) -> Result<NodeRef> {
        let components = split_path(path)?;
        let mut current = self.overlays.root(id).ok_or_else(|| VfsError::NotFound(path.to_string()))?;
        for component in components {
            let is_dir = current.borrow().is_dir();
            if !is_dir {
                return Err(VfsError::NotADir(path.to_string()));
            }
            let next = current.borrow().get_child(&component)?;
            current = next.ok_or_else(|| VfsError::NotFound(path.to_string()))?;
        }
        Ok(current)
    }

    /// Every overlay that hosts `path`, in ascending id order.
    pub fn resolve_multi(&self, path: &str) -> Vec<(usize, NodeRef)> {
        self.overlays
            .ids()
            .filter_map(|id| self.resolve_for_overlay(path, id).ok().map(|n| (id, n)))
            .collect()
    }

    pub fn overlays_for_path(&self, path: &str) -> Vec<usize> {
        self.resolve_multi(path).into_iter().map(|(id, _)| id).collect()
    }

    /// Resolves `path`, arbitrating between multiple hosting overlays
    /// with the current `WorkingDirectory` policy.
    pub fn resolve(&self, path: &str) -> Result<NodeRef> {
        let hosts = self.resolve_multi(path);
        match hosts.len() {
            0 => Err(VfsError::NotFound(path.to_string())),
            1 => Ok(hosts.into_iter().next().unwrap().1),
            _ => {
                let ids: Vec<usize> = hosts.iter().map(|(id, _)| *id).collect();
                let chosen = self.workdir.select_overlay(&ids)?;
                Ok(hosts.into_iter().find(|(id, _)| *id == chosen).unwrap().1)
            }
        }
    }

    /// Creates every missing directory along `path` in overlay `id`,
    /// marking it dirty. Silently succeeds if the final component is
    /// already a directory.
    pub fn mkdir(&mut self, path: &str, id: usize) -> Result<()> {
        let components = split_path(path)?;
        let mut current = self.overlays.root(id).ok_or_else(|| VfsError::NotFound(path.to_string()))?;
        for component in &components {
            let existing = current.borrow().get_child(component)?;
            current = match existing {
                Some(node) => {
                    if !node.borrow().is_dir() {
                        return Err(VfsError::ExistsAsFile(path.to_string()));
                    }
                    node
                }
                None => {
                    let dir = Node::new_dir(component.clone());
                    Node::link_parent(&dir, &current);
                    current.borrow_mut().insert_child(component.clone(), dir.clone())?;
                    dir
                }
            };
        }
        self.overlays.mark_dirty(id);
        Ok(())
    }

    /// Creates intermediate directories, then replaces or creates the
    /// final file.
    pub fn write(&mut self, path: &str, bytes: Vec<u8>, id: usize) -> Result<()> {
        let dir = dirname(path);
        self.mkdir(&dir, id)?;
        let parent = self.resolve_for_overlay(&dir, id)?;
        let name = basename(path);
        let existing = parent.borrow().get_child(&name)?;
        match existing {
            Some(node) if node.borrow().is_dir() => return Err(VfsError::ExistsAsFile(path.to_string())),
            Some(node) => node.borrow_mut().write_bytes(bytes)?,
            None => {
                let file = Node::new_file(name.clone(), bytes);
                Node::link_parent(&file, &parent);
                parent.borrow_mut().insert_child(name, file)?;
            }
        }
        self.overlays.mark_dirty(id);
        Ok(())
    }

    /// Unlinks the node at `path` from its parent in overlay `id`. On
    /// the last (highest-id) overlay hosting `path`, also clears its
    /// tag storage entry.
    pub fn rm(&mut self, path: &str, id: usize) -> Result<()> {
        let dir = dirname(path);
        let parent = self.resolve_for_overlay(&dir, id)?;
        let name = basename(path);
        let removed = parent.borrow_mut().remove_child(&name)?.ok_or_else(|| VfsError::NotFound(path.to_string()))?;
        self.overlays.mark_dirty(id);

        let hosted_elsewhere = self.overlays.ids().filter(|&other| other != id).any(|other| self.resolve_for_overlay(path, other).is_ok());
        if !hosted_elsewhere {
            self.tag_storage.clear_tags(&removed);
        }
        Ok(())
    }

    fn check_mount_preconditions(&self, vfs_path: &str) -> Result<()> {
        if !self.mount_allowed {
            return Err(VfsError::MountDenied(vfs_path.to_string()));
        }
        if self.mounts.iter().any(|m| m.vfs_path == vfs_path) {
            return Err(VfsError::MountBusy(vfs_path.to_string()));
        }
        Ok(())
    }

    fn attach_mount(&mut self, vfs_path: &str, node: NodeRef) -> Result<()> {
        let dir = dirname(vfs_path);
        self.mkdir(&dir, 0)?;
        let parent = self.resolve_for_overlay(&dir, 0)?;
        Node::link_parent(&node, &parent);
        parent.borrow_mut().insert_child(basename(vfs_path), node)?;
        Ok(())
    }

    pub fn mount_filesystem(&mut self, vfs_path: &str, host_path: impl Into<PathBuf>) -> Result<()> {
        self.check_mount_preconditions(vfs_path)?;
        let host_path = host_path.into();
        let node = Node::new_host_mount(basename(vfs_path), host_path.clone());
        self.attach_mount(vfs_path, node.clone())?;
        self.mounts.push(MountInfo {
            vfs_path: vfs_path.to_string(),
            host_path: host_path.display().to_string(),
            kind: MountKind::Filesystem,
            mount_node: node,
        });
        Ok(())
    }

    pub fn mount_library(&mut self, vfs_path: &str, lib_path: &Path) -> Result<()> {
        self.check_mount_preconditions(vfs_path)?;
        let data = LibraryMountData::open(lib_path)?;
        let node = Node::new_library_mount(basename(vfs_path), data);
        self.attach_mount(vfs_path, node.clone())?;
        self.mounts.push(MountInfo {
            vfs_path: vfs_path.to_string(),
            host_path: lib_path.display().to_string(),
            kind: MountKind::Library,
            mount_node: node,
        });
        Ok(())
    }

    pub fn mount_remote(&mut self, vfs_path: &str, host: &str, port: u16, remote_path: &str) -> Result<()> {
        self.check_mount_preconditions(vfs_path)?;
        let data = RemoteMountData::new(host, port, remote_path);
        let node = Node::new_remote_mount(basename(vfs_path), data);
        self.attach_mount(vfs_path, node.clone())?;
        self.mounts.push(MountInfo {
            vfs_path: vfs_path.to_string(),
            host_path: format!("{host}:{port}{remote_path}"),
            kind: MountKind::Remote,
            mount_node: node,
        });
        Ok(())
    }

    pub fn unmount(&mut self, vfs_path: &str) -> Result<()> {
        let pos = self.mounts.iter().position(|m| m.vfs_path == vfs_path).ok_or_else(|| VfsError::NotFound(vfs_path.to_string()))?;
        self.mounts.remove(pos);
        let dir = dirname(vfs_path);
        let parent = self.resolve_for_overlay(&dir, 0)?;
        parent.borrow_mut().remove_child(&basename(vfs_path))?;
        Ok(())
    }

    /// Longest-prefix match over filesystem mounts only; pure, no
    /// traversal side effects.
    pub fn map_to_host_path(&self, vfs_path: &str) -> Option<PathBuf> {
        self.mounts
            .iter()
            .filter(|m| m.kind == MountKind::Filesystem && vfs_path.starts_with(&m.vfs_path))
            .max_by_key(|m| m.vfs_path.len())
            .map(|m| {
                let suffix = vfs_path.strip_prefix(&m.vfs_path).unwrap_or("").trim_start_matches('/');
                if suffix.is_empty() {
                    PathBuf::from(&m.host_path)
                } else {
                    Path::new(&m.host_path).join(suffix)
                }
            })
    }

    pub fn map_from_host_path(&self, host_path: &Path) -> Option<String> {
        self.mounts
            .iter()
            .filter(|m| m.kind == MountKind::Filesystem && host_path.starts_with(&m.host_path))
            .max_by_key(|m| m.host_path.len())
            .map(|m| {
                let suffix = host_path.strip_prefix(&m.host_path).unwrap_or(Path::new(""));
                if suffix.as_os_str().is_empty() {
                    m.vfs_path.clone()
                } else {
                    format!("{}/{}", m.vfs_path.trim_end_matches('/'), suffix.display())
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mkdir_then_resolve_yields_dir() {
        let mut vfs = Vfs::new();
        vfs.mkdir("/a/b", 0).unwrap();
        let node = vfs.resolve_for_overlay("/a/b", 0).unwrap();
        assert!(node.borrow().is_dir());
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut vfs = Vfs::new();
        vfs.write("/a/b.txt", b"hello".to_vec(), 0).unwrap();
        let node = vfs.resolve("/a/b.txt").unwrap();
        assert_eq!(node.borrow().read_bytes().unwrap(), b"hello");
    }

    #[test]
    fn write_over_existing_dir_fails() {
        let mut vfs = Vfs::new();
        vfs.mkdir("/a", 0).unwrap();
        assert!(vfs.write("/a", b"x".to_vec(), 0).is_err());
    }

    #[test]
    fn rm_clears_tags_when_no_other_overlay_hosts_path() {
        let mut vfs = Vfs::new();
        vfs.write("/f.txt", b"x".to_vec(), 0).unwrap();
        let node = vfs.resolve("/f.txt").unwrap();
        vfs.tag_storage.add_tag(&node, 1);
        vfs.rm("/f.txt", 0).unwrap();
        assert_eq!(vfs.tag_storage.tags_for(&node).size(), 0);
    }

    #[test]
    fn mount_denied_when_not_allowed() {
        let mut vfs = Vfs::new();
        vfs.mount_allowed = false;
        assert!(vfs.mount_filesystem("/mnt", PathBuf::from("/tmp")).is_err());
    }

    #[test]
    fn mount_busy_on_duplicate_path() {
        let mut vfs = Vfs::new();
        vfs.mount_filesystem("/mnt", PathBuf::from("/tmp")).unwrap();
        assert!(vfs.mount_filesystem("/mnt", PathBuf::from("/tmp")).is_err());
    }

    #[test]
    fn map_to_host_path_uses_longest_prefix() {
        let mut vfs = Vfs::new();
        vfs.mount_filesystem("/mnt", PathBuf::from("/host")).unwrap();
        assert_eq!(vfs.map_to_host_path("/mnt/sub/file.txt"), Some(PathBuf::from("/host/sub/file.txt")));
    }
}
