//! Binary payloads for each AST node type. Parallels
//! `src/codec.rs`'s primitives: S-AST subtrees are self-contained and
//! encode inline as nested `(type, payload)` pairs, while Cpp-AST
//! directory-like children (a `Function`/`RangeFor` body, a
//! `TranslationUnit`'s functions, a `Compound`'s range-for statements)
//! are referenced by name and resolved as separate snapshot records via
//! the caller's fixup list.

use std::io::Cursor;

use crate::codec::{read_bytes_field, read_i64, read_str, read_u32, read_u8, write_bytes_field, write_i64, write_str, write_u32, write_u8};
use crate::error::{Result, VfsError};
use crate::node::ast::cpp::{CppAst, CppExpr, CppInclude, CppParam, CppStmt};
use crate::node::ast::plan::{PlanAst, PlanJob};
use crate::node::ast::sexpr::SexprAst;
use crate::node::ast::AstNode;
use crate::node::{NodeRef, NodeVariant};

/// An unresolved reference discovered while encoding a node's payload:
/// `name` is the child key the target must be written and later looked
/// up under, `node` is the live in-memory child.
pub struct ChildRef {
    pub name: String,
    pub node: NodeRef,
}

/// The on-disk type name for a node's own AST payload. Fails for
/// `CppAst` variants that are never snapshotted standalone (`Include`,
/// `Expr`, `Stmt` are always inlined into an enclosing `Compound`).
pub fn type_name(ast: &AstNode) -> Result<&'static str> {
    Ok(match ast {
        AstNode::Sexpr(s) => sexpr_type_name(s),
        AstNode::Plan(p) => plan_type_name(p),
        AstNode::Cpp(c) => match c {
            CppAst::TranslationUnit { .. } => "CppTranslationUnit",
            CppAst::Function { .. } => "CppFunction",
            CppAst::Compound(_) => "CppCompound",
            CppAst::RangeFor { .. } => "CppRangeFor",
            CppAst::Include(_) | CppAst::Expr(_) | CppAst::Stmt(_) => {
                return Err(VfsError::Internal("include/expr/stmt nodes are inlined, never snapshotted standalone".into()))
            }
        },
    })
}

fn sexpr_type_name(s: &SexprAst) -> &'static str {
    match s {
        SexprAst::Int(_) => "AstInt",
        SexprAst::Bool(_) => "AstBool",
        SexprAst::Str(_) => "AstStr",
        SexprAst::Sym(_) => "AstSym",
        SexprAst::If { .. } => "AstIf",
        SexprAst::Lambda { .. } => "AstLambda",
        SexprAst::Call { .. } => "AstCall",
        SexprAst::Holder(_) => "AstHolder",
    }
}

fn plan_type_name(p: &PlanAst) -> &'static str {
    match p {
        PlanAst::Jobs(_) => "PlanJobs",
        PlanAst::Goals(_) => "PlanGoals",
        PlanAst::Ideas(_) => "PlanIdeas",
        PlanAst::Deps(_) => "PlanDeps",
        PlanAst::Implemented(_) => "PlanImplemented",
        PlanAst::Research(_) => "PlanResearch",
        PlanAst::Root(_) => "PlanRoot",
        PlanAst::SubPlan(_) => "PlanSubPlan",
        PlanAst::Strategy(_) => "PlanStrategy",
        PlanAst::Notes(_) => "PlanNotes",
    }
}

/// Encodes `ast`'s own payload bytes. Any dir-like named children are
/// appended to `children` for the caller to emit as sibling records.
pub fn encode(ast: &AstNode) -> Result<(Vec<u8>, Vec<ChildRef>)> {
    let mut out = Vec::new();
    let mut children = Vec::new();
    match ast {
        AstNode::Sexpr(s) => encode_sexpr(s, &mut out)?,
        AstNode::Plan(p) => encode_plan(p, &mut out)?,
        AstNode::Cpp(c) => encode_cpp(c, &mut out, &mut children)?,
    }
    Ok((out, children))
}

/// Decodes a node's own payload given its type name. Cpp dir-like
/// variants come back with placeholder bodies (empty `Compound`s) that
/// the caller's fixup pass must overwrite with the real children looked
/// up by name.
pub fn decode(ty: &str, bytes: &[u8]) -> Result<AstNode> {
    let mut cur = Cursor::new(bytes);
    let ast = match ty {
        "AstInt" | "AstBool" | "AstStr" | "AstSym" | "AstIf" | "AstLambda" | "AstCall" | "AstHolder" => {
            AstNode::Sexpr(decode_sexpr(ty, &mut cur)?)
        }
        "PlanJobs" | "PlanGoals" | "PlanIdeas" | "PlanDeps" | "PlanImplemented" | "PlanResearch" | "PlanRoot" | "PlanSubPlan"
        | "PlanStrategy" | "PlanNotes" => AstNode::Plan(decode_plan(ty, &mut cur)?),
        "CppTranslationUnit" | "CppFunction" | "CppCompound" | "CppRangeFor" => AstNode::Cpp(decode_cpp(ty, &mut cur)?),
        other => return Err(VfsError::DecodeError(format!("unknown AST type: {other}"))),
    };
    Ok(ast)
}

// --- S-AST ---

fn encode_sexpr(s: &SexprAst, out: &mut Vec<u8>) -> Result<()> {
    match s {
        SexprAst::Int(n) => write_i64(out, *n),
        SexprAst::Bool(b) => write_u8(out, *b as u8),
        SexprAst::Str(v) => write_str(out, v),
        SexprAst::Sym(v) => write_str(out, v),
        SexprAst::If { cond, then, els } => {
            encode_nested_sexpr(cond, out)?;
            encode_nested_sexpr(then, out)?;
            encode_nested_sexpr(els, out)
        }
        SexprAst::Lambda { params, body } => {
            write_u32(out, params.len() as u32)?;
            for p in params {
                write_str(out, p)?;
            }
            encode_nested_sexpr(body, out)
        }
        SexprAst::Call { func, args } => {
            encode_nested_sexpr(func, out)?;
            write_u32(out, args.len() as u32)?;
            for a in args {
                encode_nested_sexpr(a, out)?;
            }
            Ok(())
        }
        SexprAst::Holder(inner) => encode_nested_sexpr(inner, out),
    }
}

fn encode_nested_sexpr(s: &SexprAst, out: &mut Vec<u8>) -> Result<()> {
    write_str(out, sexpr_type_name(s))?;
    let mut payload = Vec::new();
    encode_sexpr(s, &mut payload)?;
    write_bytes_field(out, &payload)
}

fn decode_nested_sexpr(src: &mut Cursor<&[u8]>) -> Result<SexprAst> {
    let ty = read_str(src)?;
    let payload = read_bytes_field(src)?;
    let mut inner = Cursor::new(payload.as_slice());
    decode_sexpr(&ty, &mut inner)
}

fn decode_sexpr(ty: &str, src: &mut Cursor<&[u8]>) -> Result<SexprAst> {
    Ok(match ty {
        "AstInt" => SexprAst::Int(read_i64(src)?),
        "AstBool" => SexprAst::Bool(read_u8(src)? != 0),
        "AstStr" => SexprAst::Str(read_str(src)?),
        "AstSym" => SexprAst::Sym(read_str(src)?),
        "AstIf" => {
            let cond = decode_nested_sexpr(src)?;
            let then = decode_nested_sexpr(src)?;
            let els = decode_nested_sexpr(src)?;
            SexprAst::If { cond: Box::new(cond), then: Box::new(then), els: Box::new(els) }
        }
        "AstLambda" => {
            let n = read_u32(src)? as usize;
            let mut params = Vec::with_capacity(n);
            for _ in 0..n {
                params.push(read_str(src)?);
            }
            let body = decode_nested_sexpr(src)?;
            SexprAst::Lambda { params, body: Box::new(body) }
        }
        "AstCall" => {
            let func = decode_nested_sexpr(src)?;
            let argc = read_u32(src)? as usize;
            let mut args = Vec::with_capacity(argc);
            for _ in 0..argc {
                args.push(decode_nested_sexpr(src)?);
            }
            SexprAst::Call { func: Box::new(func), args }
        }
        "AstHolder" => SexprAst::Holder(Box::new(decode_nested_sexpr(src)?)),
        other => return Err(VfsError::DecodeError(format!("unknown S-AST type: {other}"))),
    })
}

// --- Plan-AST ---

fn encode_plan(p: &PlanAst, out: &mut Vec<u8>) -> Result<()> {
    match p {
        PlanAst::Jobs(jobs) => {
            write_u32(out, jobs.len() as u32)?;
            for j in jobs {
                write_str(out, &j.description)?;
                write_u32(out, j.priority as u32)?;
                write_u8(out, j.completed as u8)?;
                write_str(out, &j.assignee)?;
            }
            Ok(())
        }
        PlanAst::Goals(v) | PlanAst::Ideas(v) | PlanAst::Deps(v) | PlanAst::Implemented(v) | PlanAst::Research(v) => {
            write_u32(out, v.len() as u32)?;
            for s in v {
                write_str(out, s)?;
            }
            Ok(())
        }
        PlanAst::Root(s) | PlanAst::SubPlan(s) | PlanAst::Strategy(s) | PlanAst::Notes(s) => write_str(out, s),
    }
}

fn decode_str_list(src: &mut Cursor<&[u8]>) -> Result<Vec<String>> {
    let n = read_u32(src)? as usize;
    let mut v = Vec::with_capacity(n);
    for _ in 0..n {
        v.push(read_str(src)?);
    }
    Ok(v)
}

fn decode_plan(ty: &str, src: &mut Cursor<&[u8]>) -> Result<PlanAst> {
    Ok(match ty {
        "PlanJobs" => {
            let n = read_u32(src)? as usize;
            let mut jobs = Vec::with_capacity(n);
            for _ in 0..n {
                let description = read_str(src)?;
                let priority = read_u32(src)? as i64;
                let completed = read_u8(src)? != 0;
                let assignee = read_str(src)?;
                jobs.push(PlanJob { description, priority, completed, assignee });
            }
            PlanAst::Jobs(jobs)
        }
        "PlanGoals" => PlanAst::Goals(decode_str_list(src)?),
        "PlanIdeas" => PlanAst::Ideas(decode_str_list(src)?),
        "PlanDeps" => PlanAst::Deps(decode_str_list(src)?),
        "PlanImplemented" => PlanAst::Implemented(decode_str_list(src)?),
        "PlanResearch" => PlanAst::Research(decode_str_list(src)?),
        "PlanRoot" => PlanAst::Root(read_str(src)?),
        "PlanSubPlan" => PlanAst::SubPlan(read_str(src)?),
        "PlanStrategy" => PlanAst::Strategy(read_str(src)?),
        "PlanNotes" => PlanAst::Notes(read_str(src)?),
        other => return Err(VfsError::DecodeError(format!("unknown Plan-AST type: {other}"))),
    })
}

// --- Cpp-AST ---

fn encode_cpp(c: &CppAst, out: &mut Vec<u8>, children: &mut Vec<ChildRef>) -> Result<()> {
    match c {
        CppAst::TranslationUnit { includes, funcs } => {
            write_u32(out, includes.len() as u32)?;
            for inc in includes {
                write_str(out, &inc.header)?;
                write_u8(out, inc.angled as u8)?;
            }
            write_u32(out, funcs.len() as u32)?;
            for f in funcs {
                let name = f.borrow().name.clone();
                write_str(out, &name)?;
                children.push(ChildRef { name, node: f.clone() });
            }
            Ok(())
        }
        CppAst::Function { ret_type, name, params, body } => {
            write_str(out, ret_type)?;
            write_str(out, name)?;
            write_u32(out, params.len() as u32)?;
            for p in params {
                write_str(out, &p.ty)?;
                write_str(out, &p.name)?;
            }
            write_str(out, "body")?;
            children.push(ChildRef { name: "body".to_string(), node: body.clone() });
            Ok(())
        }
        CppAst::RangeFor { decl, range, body } => {
            write_str(out, decl)?;
            write_str(out, range)?;
            write_str(out, "body")?;
            children.push(ChildRef { name: "body".to_string(), node: body.clone() });
            Ok(())
        }
        CppAst::Compound(stmts) => {
            write_u32(out, stmts.len() as u32)?;
            for (i, stmt_node) in stmts.iter().enumerate() {
                encode_stmt_entry(stmt_node, out, children, i)?;
            }
            Ok(())
        }
        CppAst::Include(_) | CppAst::Expr(_) | CppAst::Stmt(_) => {
            Err(VfsError::Internal("include/expr/stmt nodes are inlined, never snapshotted standalone".into()))
        }
    }
}

const STMT_TAG_EXPR: u8 = 0;
const STMT_TAG_RETURN: u8 = 1;
const STMT_TAG_RAW: u8 = 2;
const STMT_TAG_VARDECL: u8 = 3;
const STMT_TAG_RANGE_FOR_REF: u8 = 4;

fn encode_stmt_entry(node: &NodeRef, out: &mut Vec<u8>, children: &mut Vec<ChildRef>, index: usize) -> Result<()> {
    match &node.borrow().variant {
        NodeVariant::Ast(AstNode::Cpp(CppAst::Stmt(stmt))) => encode_stmt(stmt, out),
        NodeVariant::Ast(AstNode::Cpp(CppAst::RangeFor { .. })) => {
            write_u8(out, STMT_TAG_RANGE_FOR_REF)?;
            let name = index.to_string();
            write_str(out, &name)?;
            children.push(ChildRef { name, node: node.clone() });
            Ok(())
        }
        _ => Err(VfsError::Internal("compound statement entry must be a Stmt or RangeFor node".into())),
    }
}

fn encode_stmt(stmt: &CppStmt, out: &mut Vec<u8>) -> Result<()> {
    match stmt {
        CppStmt::ExprStmt(e) => {
            write_u8(out, STMT_TAG_EXPR)?;
            encode_expr(e, out)
        }
        CppStmt::Return(opt) => {
            write_u8(out, STMT_TAG_RETURN)?;
            write_u8(out, opt.is_some() as u8)?;
            if let Some(e) = opt {
                encode_expr(e, out)?;
            }
            Ok(())
        }
        CppStmt::RawStmt(s) => {
            write_u8(out, STMT_TAG_RAW)?;
            write_str(out, s)
        }
        CppStmt::VarDecl { ty, name, init, has_init } => {
            write_u8(out, STMT_TAG_VARDECL)?;
            write_str(out, ty)?;
            write_str(out, name)?;
            write_u8(out, *has_init as u8)?;
            write_str(out, init)
        }
    }
}

/// Decode outcome for a single `CppCompound` entry: either an immediately
/// usable statement node, or a range-for placeholder the caller must fix
/// up against the named sibling record.
pub enum CompoundEntry {
    Stmt(CppStmt),
    RangeForRef(String),
}

fn decode_stmt_entry(src: &mut Cursor<&[u8]>) -> Result<CompoundEntry> {
    let tag = read_u8(src)?;
    Ok(match tag {
        STMT_TAG_EXPR => CompoundEntry::Stmt(CppStmt::ExprStmt(decode_expr(src)?)),
        STMT_TAG_RETURN => {
            let has = read_u8(src)? != 0;
            CompoundEntry::Stmt(CppStmt::Return(if has { Some(decode_expr(src)?) } else { None }))
        }
        STMT_TAG_RAW => CompoundEntry::Stmt(CppStmt::RawStmt(read_str(src)?)),
        STMT_TAG_VARDECL => {
            let ty = read_str(src)?;
            let name = read_str(src)?;
            let has_init = read_u8(src)? != 0;
            let init = read_str(src)?;
            CompoundEntry::Stmt(CppStmt::VarDecl { ty, name, init, has_init })
        }
        STMT_TAG_RANGE_FOR_REF => CompoundEntry::RangeForRef(read_str(src)?),
        other => return Err(VfsError::DecodeError(format!("unknown compound statement tag: {other}"))),
    })
}

fn encode_expr(e: &CppExpr, out: &mut Vec<u8>) -> Result<()> {
    match e {
        CppExpr::Id(s) => {
            write_u8(out, 0)?;
            write_str(out, s)
        }
        CppExpr::Str(bytes) => {
            write_u8(out, 1)?;
            write_bytes_field(out, bytes)
        }
        CppExpr::Int(n) => {
            write_u8(out, 2)?;
            write_i64(out, *n)
        }
        CppExpr::Call { func, args } => {
            write_u8(out, 3)?;
            encode_expr(func, out)?;
            write_u32(out, args.len() as u32)?;
            for a in args {
                encode_expr(a, out)?;
            }
            Ok(())
        }
        CppExpr::BinOp { op, a, b } => {
            write_u8(out, 4)?;
            write_str(out, op)?;
            encode_expr(a, out)?;
            encode_expr(b, out)
        }
        CppExpr::StreamOut(parts) => {
            write_u8(out, 5)?;
            write_u32(out, parts.len() as u32)?;
            for p in parts {
                encode_expr(p, out)?;
            }
            Ok(())
        }
        CppExpr::RawExpr(s) => {
            write_u8(out, 6)?;
            write_str(out, s)
        }
    }
}

fn decode_expr(src: &mut Cursor<&[u8]>) -> Result<CppExpr> {
    let tag = read_u8(src)?;
    Ok(match tag {
        0 => CppExpr::Id(read_str(src)?),
        1 => CppExpr::Str(read_bytes_field(src)?),
        2 => CppExpr::Int(read_i64(src)?),
        3 => {
            let func = Box::new(decode_expr(src)?);
            let argc = read_u32(src)? as usize;
            let mut args = Vec::with_capacity(argc);
            for _ in 0..argc {
                args.push(decode_expr(src)?);
            }
            CppExpr::Call { func, args }
        }
        4 => {
            let op = read_str(src)?;
            let a = Box::new(decode_expr(src)?);
            let b = Box::new(decode_expr(src)?);
            CppExpr::BinOp { op, a, b }
        }
        5 => {
            let n = read_u32(src)? as usize;
            let mut parts = Vec::with_capacity(n);
            for _ in 0..n {
                parts.push(decode_expr(src)?);
            }
            CppExpr::StreamOut(parts)
        }
        6 => CppExpr::RawExpr(read_str(src)?),
        other => return Err(VfsError::DecodeError(format!("unknown CppExpr tag: {other}"))),
    })
}

/// Decoded Cpp payload, with dir-like children left as placeholders
/// (empty `Compound`s for `body`, empty `funcs`/`RangeForRef` markers for
/// statements) for the caller to resolve via fixups. Returns alongside
/// the names the fixup pass must resolve, in traversal order, matching
/// what [`encode_cpp`] would have recorded as [`ChildRef`]s.
pub struct CppDecode {
    pub ast: CppAst,
    pub pending_range_for_refs: Vec<(usize, String)>,
}

fn decode_cpp(ty: &str, src: &mut Cursor<&[u8]>) -> Result<CppAst> {
    Ok(match ty {
        "CppTranslationUnit" => {
            let i = read_u32(src)? as usize;
            let mut includes = Vec::with_capacity(i);
            for _ in 0..i {
                let header = read_str(src)?;
                let angled = read_u8(src)? != 0;
                includes.push(CppInclude { header, angled });
            }
            let f = read_u32(src)? as usize;
            for _ in 0..f {
                read_str(src)?; // function name, resolved by the caller's fixup pass
            }
            CppAst::TranslationUnit { includes, funcs: Vec::new() }
        }
        "CppFunction" => {
            let ret_type = read_str(src)?;
            let name = read_str(src)?;
            let p = read_u32(src)? as usize;
            let mut params = Vec::with_capacity(p);
            for _ in 0..p {
                let ty = read_str(src)?;
                let pname = read_str(src)?;
                params.push(CppParam { ty, name: pname });
            }
            read_str(src)?; // bodyName, resolved by the caller's fixup pass
            CppAst::Function { ret_type, name, params, body: placeholder_body() }
        }
        "CppRangeFor" => {
            let decl = read_str(src)?;
            let range = read_str(src)?;
            read_str(src)?; // bodyName, resolved by the caller's fixup pass
            CppAst::RangeFor { decl, range, body: placeholder_body() }
        }
        "CppCompound" => {
            let n = read_u32(src)? as usize;
            let mut stmts = Vec::with_capacity(n);
            for _ in 0..n {
                match decode_stmt_entry(src)? {
                    CompoundEntry::Stmt(stmt) => stmts.push(crate::node::Node::new_ast("stmt", AstNode::Cpp(CppAst::Stmt(stmt)))),
                    CompoundEntry::RangeForRef(_) => stmts.push(placeholder_body()),
                }
            }
            CppAst::Compound(stmts)
        }
        other => return Err(VfsError::DecodeError(format!("unknown Cpp-AST type: {other}"))),
    })
}

fn placeholder_body() -> NodeRef {
    crate::node::Node::new_ast("pending-fixup", AstNode::Cpp(CppAst::Compound(Vec::new())))
}

/// Re-decodes just enough of a `CppCompound` payload to list, by index,
/// which entries are `RangeForRef`s (and under what child name). Used by
/// the snapshot reader's fixup pass, which otherwise only sees the
/// already-built placeholder `Compound`.
pub fn compound_range_for_refs(bytes: &[u8]) -> Result<Vec<(usize, String)>> {
    let mut src = Cursor::new(bytes);
    let n = read_u32(&mut src)? as usize;
    let mut out = Vec::new();
    for i in 0..n {
        match decode_stmt_entry(&mut src)? {
            CompoundEntry::Stmt(_) => {}
            CompoundEntry::RangeForRef(name) => out.push((i, name)),
        }
    }
    Ok(out)
}
