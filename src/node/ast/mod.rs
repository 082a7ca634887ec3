//! The `Ast` variant: three unrelated node families (S-AST, Cpp-AST,
//! Plan-AST) sharing one dispatch point because they're all "a node
//! whose content is a structured tree instead of raw bytes."
//!
//! Only the Cpp-AST containers (`Compound`, `TranslationUnit`,
//! `Function`, `RangeFor`) are directory-like; everything else is a leaf
//! from the VFS's point of view, navigable only through `read`/`dump`.

pub mod cpp;
pub mod plan;
pub mod sexpr;

use crate::error::{Result, VfsError};
use crate::node::{NodeRef, NodeVariant};

pub use cpp::CppAst;
pub use plan::{PlanAst, PlanJob};
pub use sexpr::SexprAst;

/// A node's AST payload: S-expression literals, a fragment of a C++
/// translation unit, or a planning-document node.
pub enum AstNode {
    Sexpr(SexprAst),
    Cpp(CppAst),
    Plan(PlanAst),
}

/// Reads another AST node's `dump` at a given indent, reaching through
/// its `Node` wrapper. Used by Cpp-AST containers to render their
/// addressable children (a `Function`'s body, a `Compound`'s statements)
/// inline, since those live behind their own `NodeRef`.
pub(crate) fn dump_child(node: &NodeRef, indent: usize) -> String {
    match &node.borrow().variant {
        NodeVariant::Ast(a) => a.dump(indent),
        _ => String::new(),
    }
}

impl AstNode {
    /// Deterministic textual rendering; for Cpp-AST this doubles as
    /// source-code regeneration.
    pub fn dump(&self, indent: usize) -> String {
        match self {
            AstNode::Sexpr(s) => s.dump(),
            AstNode::Cpp(c) => c.dump(indent),
            AstNode::Plan(p) => p.dump(),
        }
    }

    pub fn is_dir(&self) -> bool {
        match self {
            AstNode::Sexpr(_) | AstNode::Plan(_) => false,
            AstNode::Cpp(c) => c.is_dir(),
        }
    }

    pub fn children(&self) -> Result<Vec<(String, NodeRef)>> {
        match self {
            AstNode::Cpp(c) if c.is_dir() => Ok(c.children()),
            _ => Err(VfsError::NotADir("ast".into())),
        }
    }

    pub fn insert_child(&mut self, name: String, child: NodeRef) -> Result<()> {
        match self {
            AstNode::Cpp(c) if c.is_dir() => c.insert_child(name, child),
            _ => Err(VfsError::NotADir("ast".into())),
        }
    }

    pub fn remove_child(&mut self, name: &str) -> Result<Option<NodeRef>> {
        match self {
            AstNode::Cpp(c) if c.is_dir() => c.remove_child(name),
            _ => Err(VfsError::NotADir("ast".into())),
        }
    }

    /// Only `CppAst::Str` (round-tripping an escaped literal) and every
    /// `Plan` variant accept `write`; every AST directory node rejects it.
    pub fn write(&mut self, s: &str) -> Result<()> {
        match self {
            AstNode::Plan(p) => p.write(s),
            AstNode::Cpp(c) => c.write(s),
            AstNode::Sexpr(_) => Err(VfsError::NotAFile("s-ast node is read-only".into())),
        }
    }
}
