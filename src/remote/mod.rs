//! The server half of the remote mount protocol. This is a separate
//! collaborator process, not part of the VFS core itself — it exists so
//! [`crate::node::RemoteMountData`] has something real to talk to in
//! tests and local demos.

pub mod server;
