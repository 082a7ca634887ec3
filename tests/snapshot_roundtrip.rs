//! A TranslationUnit with one `Function` survives a save-to-host-file,
//! load-into-fresh-Vfs round trip.

use codex_vfs::node::ast::cpp::{CppAst, CppExpr, CppStmt};
use codex_vfs::node::ast::AstNode;
use codex_vfs::node::Node;
use codex_vfs::snapshot::{load_overlay, write_overlay};
use codex_vfs::vfs::Vfs;

fn build_translation_unit() -> codex_vfs::node::NodeRef {
    let body = Node::new_ast("body", AstNode::Cpp(CppAst::Compound(vec![Node::new_ast(
        "0",
        AstNode::Cpp(CppAst::Stmt(CppStmt::Return(Some(CppExpr::Int(42))))),
    )])));
    let main_fn = Node::new_ast(
        "main",
        AstNode::Cpp(CppAst::Function { ret_type: "int".to_string(), name: "main".to_string(), params: Vec::new(), body }),
    );
    Node::new_ast("tu", AstNode::Cpp(CppAst::TranslationUnit { includes: Vec::new(), funcs: vec![main_fn] }))
}

#[test]
fn e3_snapshot_round_trip_with_ast() {
    let mut vfs = Vfs::new();
    let tu = build_translation_unit();
    let root = vfs.overlays.root(0).unwrap();
    Node::link_parent(&tu, &root);
    root.borrow_mut().insert_child("tu".to_string(), tu).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snap.vfs");
    write_overlay(&vfs, 0, &path).unwrap();

    let overlay = load_overlay(&path, "base").unwrap();
    let mut fresh = Vfs::new();
    fresh.overlays.get_mut(0).unwrap().root = overlay.root;

    let tu_node = fresh.resolve_for_overlay("/tu", 0).unwrap();
    let dumped = tu_node.borrow().read().unwrap();
    assert!(dumped.contains("int main()"), "dump was:\n{dumped}");
    assert!(dumped.contains("return 42;"), "dump was:\n{dumped}");
}
