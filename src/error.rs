//! Crate-wide error taxonomy.

use std::fmt;
use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VfsError>;

/// Errors produced by the VFS core, its codecs, and its engines.
///
/// Each variant is its own classification, not a wrapper around a
/// single underlying type.
#[derive(Debug)]
pub enum VfsError {
    /// Path is empty, not absolute, or escapes via `..`.
    BadPath(String),
    /// A path component was missing during resolution.
    NotFound(String),
    /// A structural step expected a directory and found something else.
    NotADir(String),
    /// A structural step expected a non-directory and found a directory.
    NotAFile(String),
    /// Create was blocked by an existing entry of the same kind.
    Exists(String),
    /// Create was blocked by an existing file where a directory was needed.
    ExistsAsFile(String),
    /// Formula text, snapshot line, or plan node text failed to parse.
    ParseError(String),
    /// A binary payload was truncated, carried an unknown tag, or had
    /// trailing bytes after a composite value.
    DecodeError(String),
    /// A snapshot fixup's target path was never recorded in the snapshot.
    DanglingReference(String),
    /// `Manual` conflict policy could not arbitrate between overlays.
    Ambiguous(String),
    /// A mount was attempted while `mount_allowed == false`.
    MountDenied(String),
    /// A mount was attempted at a path that already holds one.
    MountBusy(String),
    /// Socket I/O or protocol-level failure talking to a remote mount.
    RemoteError(String),
    /// The host dynamic linker failed to open a library or resolve a symbol.
    DlError(String),
    /// A host filesystem operation failed.
    IoError(String),
    /// An invariant the core assumes was violated.
    Internal(String),
}

impl VfsError {
    pub fn bad_path(path: impl Into<String>) -> Self {
        VfsError::BadPath(path.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        VfsError::NotFound(path.into())
    }

    /// Renders the one-line diagnostic an interactive shell would print:
    /// `error: <message>` for hard failures.
    pub fn diagnostic(&self) -> String {
        format!("error: {self}")
    }

    /// Renders the one-line diagnostic for a downgraded (non-fatal) failure.
    pub fn warning(&self) -> String {
        format!("warning: {self}")
    }
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VfsError::BadPath(p) => write!(f, "bad path: {p}"),
            VfsError::NotFound(p) => write!(f, "not found: {p}"),
            VfsError::NotADir(p) => write!(f, "not a directory: {p}"),
            VfsError::NotAFile(p) => write!(f, "not a file: {p}"),
            VfsError::Exists(p) => write!(f, "already exists: {p}"),
            VfsError::ExistsAsFile(p) => write!(f, "exists as file: {p}"),
            VfsError::ParseError(m) => write!(f, "parse error: {m}"),
            VfsError::DecodeError(m) => write!(f, "decode error: {m}"),
            VfsError::DanglingReference(p) => write!(f, "dangling reference: {p}"),
            VfsError::Ambiguous(p) => write!(f, "ambiguous overlay for: {p}"),
            VfsError::MountDenied(p) => write!(f, "mount denied: {p}"),
            VfsError::MountBusy(p) => write!(f, "mount busy: {p}"),
            VfsError::RemoteError(m) => write!(f, "remote error: {m}"),
            VfsError::DlError(m) => write!(f, "dynamic linker error: {m}"),
            VfsError::IoError(m) => write!(f, "I/O error: {m}"),
            VfsError::Internal(m) => write!(f, "internal error: {m}"),
        }
    }
}

impl std::error::Error for VfsError {}

impl From<std::io::Error> for VfsError {
    fn from(e: std::io::Error) -> Self {
        VfsError::IoError(e.to_string())
    }
}

/// Helper for building a `NotADir`/`NotFound` style message with a host path attached.
pub(crate) fn with_host_path(err: VfsError, host_path: &PathBuf) -> VfsError {
    match err {
        VfsError::IoError(m) => VfsError::IoError(format!("{} ({})", m, host_path.display())),
        other => other,
    }
}
