//! An in-memory layered virtual filesystem with tags and a forward-chaining
//! logic engine.
//!
//! The crate is organized around the VFS façade ([`vfs::Vfs`]): typed nodes
//! ([`node`]) live under stacked, independently persistable overlays
//! ([`overlay`]); a [`tags`] registry and set-algebra layer annotate any
//! node; a forward-chaining [`logic`] engine infers and checks tag
//! consistency against a small rule language; [`context`] builds
//! budget-bounded textual views over a subtree; [`snapshot`] is the on-disk
//! persistence codec; [`autosave`] periodically flushes dirty overlays and
//! writes crash-recovery snapshots; [`remote`] is the async counterpart to
//! [`node::remote_mount`]'s synchronous client, useful for tests and local
//! demos.

pub mod autosave;
pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod logic;
pub mod node;
pub mod overlay;
pub mod path;
pub mod remote;
pub mod snapshot;
pub mod tags;
pub mod vfs;
pub mod workdir;
