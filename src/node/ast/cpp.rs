//! Cpp-AST: a fragment of C++ source represented as a tree, grounded on
//! `original_source/src/Clang/CppAst.h`. `Compound`, `TranslationUnit`,
//! `Function` and `RangeFor` are directory-like: their
//! addressable sub-trees live behind their own [`NodeRef`] so the VFS
//! can navigate into them, while expression nodes stay plain recursive
//! data since nothing ever addresses them by path.

use crate::error::{Result, VfsError};
use crate::node::ast::{dump_child, AstNode};
use crate::node::{Node, NodeRef};

fn ind(n: usize) -> String {
    "    ".repeat(n)
}

/// A C++ expression.
pub enum CppExpr {
    Id(String),
    /// Raw bytes rather than `String`, so arbitrary (including
    /// non-UTF8-safe) byte values survive an `esc`/unescape round trip.
    Str(Vec<u8>),
    Int(i64),
    Call { func: Box<CppExpr>, args: Vec<CppExpr> },
    BinOp { op: String, a: Box<CppExpr>, b: Box<CppExpr> },
    StreamOut(Vec<CppExpr>),
    RawExpr(String),
}

impl CppExpr {
    fn dump(&self) -> String {
        match self {
            CppExpr::Id(id) => id.clone(),
            CppExpr::Str(bytes) => format!("\"{}\"", esc(bytes)),
            CppExpr::Int(v) => v.to_string(),
            CppExpr::Call { func, args } => {
                format!("{}({})", func.dump(), args.iter().map(CppExpr::dump).collect::<Vec<_>>().join(", "))
            }
            CppExpr::BinOp { op, a, b } => format!("{} {} {}", a.dump(), op, b.dump()),
            CppExpr::StreamOut(chain) => {
                format!("std::cout << {}", chain.iter().map(CppExpr::dump).collect::<Vec<_>>().join(" << "))
            }
            CppExpr::RawExpr(text) => text.clone(),
        }
    }
}

/// A C++ statement. `RangeFor` loops are a separate, dir-like [`CppAst`]
/// variant (their body is independently addressable), so they never
/// appear wrapped in `CppStmt` — a `RangeFor`'s own node sits directly
/// among a `Compound`'s statement children.
pub enum CppStmt {
    ExprStmt(CppExpr),
    Return(Option<CppExpr>),
    RawStmt(String),
    VarDecl { ty: String, name: String, init: String, has_init: bool },
}

impl CppStmt {
    fn dump(&self, indent: usize) -> String {
        let pad = ind(indent);
        match self {
            CppStmt::ExprStmt(e) => format!("{pad}{};\n", e.dump()),
            CppStmt::Return(Some(e)) => format!("{pad}return {};\n", e.dump()),
            CppStmt::Return(None) => format!("{pad}return;\n"),
            CppStmt::RawStmt(text) => format!("{pad}{text}\n"),
            CppStmt::VarDecl { ty, name, init, has_init: true } => format!("{pad}{ty} {name} = {init};\n"),
            CppStmt::VarDecl { ty, name, has_init: false, .. } => format!("{pad}{ty} {name};\n"),
        }
    }
}

/// One `#include` directive. Not addressable by path: includes carry no
/// fixup edges in the snapshot codec.
pub struct CppInclude {
    pub header: String,
    pub angled: bool,
}

impl CppInclude {
    fn dump(&self) -> String {
        let (open, close) = if self.angled { ('<', '>') } else { ('"', '"') };
        format!("#include {open}{}{close}\n", self.header)
    }
}

pub struct CppParam {
    pub ty: String,
    pub name: String,
}

/// The Cpp-AST payload carried by a `NodeVariant::Ast`.
pub enum CppAst {
    Include(CppInclude),
    Expr(CppExpr),
    Stmt(CppStmt),
    /// A block of statements; each statement is wrapped as its own
    /// `Node` (named by its position) so nested `RangeFor` loops stay
    /// addressable by path for snapshot fixups.
    Compound(Vec<NodeRef>),
    Function {
        ret_type: String,
        name: String,
        params: Vec<CppParam>,
        body: NodeRef,
    },
    /// A `for (decl : range) { ... }` loop; `body` is a `Compound`
    /// addressable under the fixed key `"body"`, same convention as
    /// `Function`.
    RangeFor {
        decl: String,
        range: String,
        body: NodeRef,
    },
    TranslationUnit {
        includes: Vec<CppInclude>,
        funcs: Vec<NodeRef>,
    },
}

impl CppAst {
    pub fn is_dir(&self) -> bool {
        matches!(self, CppAst::Compound(_) | CppAst::Function { .. } | CppAst::RangeFor { .. } | CppAst::TranslationUnit { .. })
    }

    pub fn dump(&self, indent: usize) -> String {
        match self {
            CppAst::Include(i) => i.dump(),
            CppAst::Expr(e) => e.dump(),
            CppAst::Stmt(s) => s.dump(indent),
            CppAst::Compound(stmts) => {
                let mut out = String::from("{\n");
                for stmt in stmts {
                    out.push_str(&dump_child(stmt, indent + 1));
                }
                out.push_str(&format!("{}}}\n", ind(indent)));
                out
            }
            CppAst::Function { ret_type, name, params, body } => {
                let params = params.iter().map(|p| format!("{} {}", p.ty, p.name)).collect::<Vec<_>>().join(", ");
                format!("{}{ret_type} {name}({params})\n{}", ind(indent), dump_child(body, indent))
            }
            CppAst::RangeFor { decl, range, body } => {
                format!("{}for ({decl} : {range}) {}\n", ind(indent), dump_child(body, indent))
            }
            CppAst::TranslationUnit { includes, funcs } => {
                let mut out = String::new();
                for inc in includes {
                    out.push_str(&inc.dump());
                }
                if !includes.is_empty() {
                    out.push('\n');
                }
                for (i, f) in funcs.iter().enumerate() {
                    if i > 0 {
                        out.push('\n');
                    }
                    out.push_str(&dump_child(f, 0));
                }
                out
            }
        }
    }

    pub fn children(&self) -> Vec<(String, NodeRef)> {
        match self {
            CppAst::Compound(stmts) => stmts.iter().enumerate().map(|(i, n)| (i.to_string(), n.clone())).collect(),
            CppAst::Function { body, .. } | CppAst::RangeFor { body, .. } => vec![("body".to_string(), body.clone())],
            CppAst::TranslationUnit { funcs, .. } => {
                funcs.iter().map(|f| (f.borrow().name.clone(), f.clone())).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn insert_child(&mut self, name: String, child: NodeRef) -> Result<()> {
        match self {
            CppAst::Compound(stmts) => {
                stmts.push(child);
                Ok(())
            }
            CppAst::Function { body, .. } | CppAst::RangeFor { body, .. } if name == "body" => {
                *body = child;
                Ok(())
            }
            CppAst::TranslationUnit { funcs, .. } => {
                funcs.push(child);
                Ok(())
            }
            CppAst::Function { .. } | CppAst::RangeFor { .. } => {
                Err(VfsError::BadPath(format!("only accepts a \"body\" child, got {name}")))
            }
            _ => Err(VfsError::NotADir("cpp ast leaf".into())),
        }
    }

    pub fn remove_child(&mut self, name: &str) -> Result<Option<NodeRef>> {
        match self {
            CppAst::Compound(stmts) => {
                let idx: usize = name.parse().map_err(|_| VfsError::NotFound(name.to_string()))?;
                if idx < stmts.len() {
                    Ok(Some(stmts.remove(idx)))
                } else {
                    Ok(None)
                }
            }
            CppAst::TranslationUnit { funcs, .. } => {
                if let Some(pos) = funcs.iter().position(|f| f.borrow().name == name) {
                    Ok(Some(funcs.remove(pos)))
                } else {
                    Ok(None)
                }
            }
            _ => Err(VfsError::NotADir("cpp ast leaf".into())),
        }
    }

    pub fn write(&mut self, s: &str) -> Result<()> {
        match self {
            CppAst::Expr(CppExpr::Str(bytes)) => {
                *bytes = unescape(s)?;
                Ok(())
            }
            _ => Err(VfsError::NotAFile("cpp ast node is read-only".into())),
        }
    }
}

/// Builds a `RangeFor` node whose body is an (initially empty)
/// `Compound`, wiring the node-level parent back-reference.
pub fn new_range_for(name: impl Into<String>, decl: impl Into<String>, range: impl Into<String>) -> NodeRef {
    let body = Node::new_ast("body", AstNode::Cpp(CppAst::Compound(Vec::new())));
    let node = Node::new_ast(name, AstNode::Cpp(CppAst::RangeFor { decl: decl.into(), range: range.into(), body: body.clone() }));
    Node::link_parent(&body, &node);
    node
}

/// Builds a `Function` node whose body is an (initially empty)
/// `Compound`.
pub fn new_function(name: impl Into<String>, ret_type: impl Into<String>, params: Vec<CppParam>) -> NodeRef {
    let name = name.into();
    let body = Node::new_ast("body", AstNode::Cpp(CppAst::Compound(Vec::new())));
    let node = Node::new_ast(
        name.clone(),
        AstNode::Cpp(CppAst::Function { ret_type: ret_type.into(), name, params, body: body.clone() }),
    );
    Node::link_parent(&body, &node);
    node
}

/// Named escapes for the usual control characters, `\?` only where it
/// would otherwise form a trigraph, and octal `\NNN` for any byte
/// `<0x20`, `==0x7f`, or `>=0x80`. Grounded on
/// `original_source/test_src/test_esc.cpp`'s `esc`, extended to cover
/// the `>=0x80` case beyond that mock.
pub fn esc(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    let mut escape_next_question = false;

    for (i, &b) in bytes.iter().enumerate() {
        if b == b'?' {
            let next_is_question = bytes.get(i + 1) == Some(&b'?');
            if escape_next_question || next_is_question {
                out.push_str("\\?");
                escape_next_question = next_is_question;
            } else {
                out.push('?');
                escape_next_question = false;
            }
            continue;
        }
        escape_next_question = false;

        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x08 => out.push_str("\\b"),
            0x0c => out.push_str("\\f"),
            0x0b => out.push_str("\\v"),
            0x07 => out.push_str("\\a"),
            _ if b < 0x20 || b == 0x7f || b >= 0x80 => {
                out.push('\\');
                out.push((b'0' + ((b >> 6) & 0x7)) as char);
                out.push((b'0' + ((b >> 3) & 0x7)) as char);
                out.push((b'0' + (b & 0x7)) as char);
            }
            _ => out.push(b as char),
        }
    }
    out
}

/// Inverse of [`esc`]. Rejects unescaped control bytes (`<0x20`, `==0x7f`,
/// `>=0x80`) and unrecognized escape sequences, so a malformed literal
/// is refused rather than silently round-tripped. Grounded on
/// `original_source/test_src/test_unescape.cpp`'s `unescape_meta`,
/// extended with octal-escape decoding and the rejection behavior that
/// mock (a debugging stub, not the real validator) does not implement.
pub fn unescape(s: &str) -> Result<Vec<u8>> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b < 0x20 || b == 0x7f || b >= 0x80 {
            return Err(VfsError::ParseError(format!("unescaped control byte 0x{b:02x} in literal")));
        }
        if b != b'\\' {
            out.push(b);
            i += 1;
            continue;
        }
        i += 1;
        let Some(&n) = bytes.get(i) else {
            return Err(VfsError::ParseError("trailing backslash in literal".into()));
        };
        match n {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'\\' => out.push(b'\\'),
            b'"' => out.push(b'"'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'a' => out.push(0x07),
            b'?' => out.push(b'?'),
            b'0'..=b'7' => {
                let mut digits = [0u8; 3];
                let mut n_digits = 0;
                while n_digits < 3 {
                    match bytes.get(i + n_digits) {
                        Some(&d) if (b'0'..=b'7').contains(&d) => digits[n_digits] = d - b'0',
                        _ => break,
                    }
                    n_digits += 1;
                }
                if n_digits == 0 {
                    return Err(VfsError::ParseError("empty octal escape".into()));
                }
                let mut value: u32 = 0;
                for &d in &digits[..n_digits] {
                    value = value * 8 + d as u32;
                }
                if value > 0xff {
                    return Err(VfsError::ParseError(format!("octal escape out of range: \\{value:o}")));
                }
                out.push(value as u8);
                i += n_digits - 1;
            }
            other => return Err(VfsError::ParseError(format!("unknown escape sequence: \\{}", other as char))),
        }
        i += 1;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeVariant;

    #[test]
    fn esc_escapes_named_controls_and_octal() {
        assert_eq!(esc(b"line-1\nline-2"), "line-1\\nline-2");
        assert_eq!(esc(&[0x01]), "\\001");
        assert_eq!(esc(&[0x80]), "\\200");
    }

    #[test]
    fn esc_guards_trigraph_question_marks() {
        assert_eq!(esc(b"a??/b"), "a\\?\\?/b");
        assert_eq!(esc(b"a?b"), "a?b");
    }

    #[test]
    fn unescape_is_inverse_of_esc_for_ascii() {
        let original = b"line-1\nline-2\ttab\"quote\"\\slash";
        let escaped = esc(original);
        assert_eq!(unescape(&escaped).unwrap(), original);
    }

    #[test]
    fn unescape_rejects_raw_control_byte() {
        assert!(unescape("a\nb").is_err());
    }

    #[test]
    fn unescape_rejects_unknown_escape() {
        assert!(unescape("\\z").is_err());
    }

    #[test]
    fn function_dump_regenerates_source() {
        let body = Node::new_ast(
            "body",
            AstNode::Cpp(CppAst::Compound(vec![Node::new_ast(
                "0",
                AstNode::Cpp(CppAst::Stmt(CppStmt::Return(Some(CppExpr::Int(42))))),
            )])),
        );
        let func = Node::new_ast(
            "main",
            AstNode::Cpp(CppAst::Function { ret_type: "int".into(), name: "main".into(), params: Vec::new(), body }),
        );
        let dumped = match &func.borrow().variant {
            NodeVariant::Ast(a) => a.dump(0),
            _ => unreachable!(),
        };
        assert!(dumped.contains("int main()"));
        assert!(dumped.contains("return 42;"));
    }
}
