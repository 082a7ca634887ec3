//! The `HostMount` variant: a view onto a host filesystem subtree.
//!
//! Children are discovered lazily from the host filesystem; the cache is
//! non-authoritative and may be rebuilt on demand. Grounded on
//! `original_source/src/VfsCore/VfsMount.h`'s `MountNode` (`host_path` +
//! `mutable cache` + `populateCache`).

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

use super::{Node, NodeRef};
use crate::error::{Result, VfsError};

pub struct HostMountData {
    pub host_path: PathBuf,
    cache: RefCell<Option<Vec<(String, NodeRef)>>>,
}

impl HostMountData {
    pub fn new(host_path: PathBuf) -> Self {
        Self { host_path, cache: RefCell::new(None) }
    }

    pub fn is_dir(&self) -> bool {
        self.host_path.is_dir()
    }

    pub fn read(&self) -> Result<String> {
        fs::read_to_string(&self.host_path).map_err(|e| VfsError::IoError(e.to_string()))
    }

    pub fn write(&mut self, s: &str) -> Result<()> {
        fs::write(&self.host_path, s).map_err(|e| VfsError::IoError(e.to_string()))
    }

    /// Drops the cache so the next `children()` call rediscovers the host
    /// directory from scratch.
    pub fn invalidate(&self) {
        *self.cache.borrow_mut() = None;
    }

    fn populate_cache(&self) -> Result<Vec<(String, NodeRef)>> {
        let mut entries = Vec::new();
        let read_dir = fs::read_dir(&self.host_path).map_err(|e| VfsError::IoError(e.to_string()))?;
        for entry in read_dir {
            let entry = entry.map_err(|e| VfsError::IoError(e.to_string()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            let node = if path.is_dir() {
                Node::new_host_mount(name.clone(), path)
            } else {
                let bytes = fs::read(&path).map_err(|e| VfsError::IoError(e.to_string()))?;
                Node::new_file(name.clone(), bytes)
            };
            entries.push((name, node));
        }
        Ok(entries)
    }

    pub fn children(&self) -> Result<Vec<(String, NodeRef)>> {
        if let Some(cached) = self.cache.borrow().as_ref() {
            return Ok(cached.clone());
        }
        let entries = self.populate_cache()?;
        *self.cache.borrow_mut() = Some(entries.clone());
        Ok(entries)
    }
}
