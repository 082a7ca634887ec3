//! Integration coverage for mkdir+write and multi-overlay arbitration
//! under every `ConflictPolicy`.

use codex_vfs::node::Node;
use codex_vfs::vfs::Vfs;
use codex_vfs::workdir::ConflictPolicy;

#[test]
fn e1_mkdir_and_write() {
    let mut vfs = Vfs::new();
    vfs.mkdir("/a/b", 0).unwrap();
    vfs.write("/a/b/c.txt", b"hello".to_vec(), 0).unwrap();

    let node = vfs.resolve_for_overlay("/a/b/c.txt", 0).unwrap();
    assert_eq!(node.borrow().read_bytes().unwrap(), b"hello");
    assert!(vfs.overlays.is_dirty(0));
    assert_eq!(vfs.overlays_for_path("/a/b"), vec![0]);
}

#[test]
fn e2_overlay_arbitration() {
    let mut vfs = Vfs::new();
    let overlay1 = vfs.register_overlay("overlay-1", Node::new_dir("/"));
    assert_eq!(overlay1, 1);

    vfs.mkdir("/x", 1).unwrap();
    vfs.mkdir("/x", 0).unwrap();
    vfs.write("/x/y", b"from0".to_vec(), 0).unwrap();
    vfs.write("/x/y", b"from1".to_vec(), 1).unwrap();

    vfs.workdir.conflict_policy = ConflictPolicy::Newest;
    let newest = vfs.resolve("/x/y").unwrap();
    assert_eq!(newest.borrow().read().unwrap(), "from1");

    vfs.workdir.conflict_policy = ConflictPolicy::Oldest;
    let oldest = vfs.resolve("/x/y").unwrap();
    assert_eq!(oldest.borrow().read().unwrap(), "from0");

    vfs.workdir.conflict_policy = ConflictPolicy::Manual;
    vfs.workdir.primary_overlay = 0;
    let manual0 = vfs.resolve("/x/y").unwrap();
    assert_eq!(manual0.borrow().read().unwrap(), "from0");

    vfs.workdir.primary_overlay = 1;
    let manual1 = vfs.resolve("/x/y").unwrap();
    assert_eq!(manual1.borrow().read().unwrap(), "from1");
}
