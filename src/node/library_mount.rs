//! The `LibraryMount` variant: an opaque handle from the host's dynamic
//! linker, exposing discovered symbols as a directory-like listing.
//!
//! Grounded on `original_source/src/VfsCore/VfsMount.h`'s `LibraryNode`/
//! `LibrarySymbolNode`. Destruction releases the handle via the host
//! dynamic linker's close call (`libloading::Library`'s `Drop`).

use std::collections::HashMap;
use std::path::Path;

use object::{Object, ObjectSymbol};

use super::{Node, NodeKind, NodeRef, NodeVariant};
use crate::error::{Result, VfsError};

/// A single discovered symbol: its raw function-pointer value and a
/// signature string read as the node's content. Real signature recovery
/// would need debug info; lacking that, the signature is a best-effort
/// `fn <name>(...)` rendering of the exported symbol name.
pub struct LibrarySymbolData {
    pub address: usize,
    pub signature: String,
}

pub struct LibraryMountData {
    pub lib_path: std::path::PathBuf,
    // Kept alive for the node's lifetime; dropped (and the handle closed
    // by the dynamic linker) when the node is destroyed.
    _handle: libloading::Library,
    pub symbols: HashMap<String, NodeRef>,
}

impl LibraryMountData {
    /// Opens `lib_path` with the host's dynamic linker and discovers its
    /// exported symbol table (via `object`), resolving each symbol's raw
    /// address (via `libloading`).
    pub fn open(lib_path: &Path) -> Result<Self> {
        let handle = unsafe { libloading::Library::new(lib_path) }
            .map_err(|e| VfsError::DlError(e.to_string()))?;

        let file_bytes = std::fs::read(lib_path).map_err(|e| VfsError::IoError(e.to_string()))?;
        let object_file =
            object::File::parse(&*file_bytes).map_err(|e| VfsError::DlError(e.to_string()))?;

        let mut symbols = HashMap::new();
        for symbol in object_file.dynamic_symbols() {
            let Ok(name) = symbol.name() else { continue };
            if name.is_empty() || !symbol.is_global() {
                continue;
            }
            let address = unsafe {
                match handle.get::<*const ()>(name.as_bytes()) {
                    Ok(sym) => *sym as usize,
                    Err(_) => continue,
                }
            };
            let signature = format!("fn {name}(...)");
            let node = Node::new_library_symbol(name.to_string(), address, signature);
            symbols.insert(name.to_string(), node);
        }

        Ok(Self { lib_path: lib_path.to_path_buf(), _handle: handle, symbols })
    }
}

impl Node {
    pub fn new_library_symbol(name: impl Into<String>, address: usize, signature: String) -> NodeRef {
        std::rc::Rc::new(std::cell::RefCell::new(Node {
            name: name.into(),
            kind: NodeKind::File,
            parent: std::rc::Weak::new(),
            variant: NodeVariant::LibrarySymbol(LibrarySymbolData { address, signature }),
        }))
    }
}
