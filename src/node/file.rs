//! The `File` variant: raw owned bytes.

/// Backing storage for a `File` node.
pub struct FileData {
    pub bytes: Vec<u8>,
}
