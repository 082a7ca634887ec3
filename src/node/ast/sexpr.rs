//! S-AST: the seven-node literal tree for the embedded Lisp-ish
//! language. Grounded on `original_source/src/VfsShell/Sexp.h`'s
//! `AstInt`/`AstBool`/`AstStr`/`AstSym`/`AstIf`/`AstLambda`/`AstCall`/
//! `AstHolder` family; evaluation (`SexpValue`/`Env`) is out of scope
//! here, only the tree shape and its deterministic rendering.

/// A node of the S-AST. `Holder` is a transparent wrapper the VFS uses
/// to present a bare literal as a file without otherwise changing its
/// meaning.
pub enum SexprAst {
    Int(i64),
    Bool(bool),
    Str(String),
    Sym(String),
    If { cond: Box<SexprAst>, then: Box<SexprAst>, els: Box<SexprAst> },
    Lambda { params: Vec<String>, body: Box<SexprAst> },
    Call { func: Box<SexprAst>, args: Vec<SexprAst> },
    Holder(Box<SexprAst>),
}

impl SexprAst {
    /// Canonical s-expression text; re-parsing it would reproduce the
    /// same tree shape (though no parser for it is needed here).
    pub fn dump(&self) -> String {
        match self {
            SexprAst::Int(n) => n.to_string(),
            SexprAst::Bool(b) => b.to_string(),
            SexprAst::Str(s) => format!("{s:?}"),
            SexprAst::Sym(s) => s.clone(),
            SexprAst::If { cond, then, els } => {
                format!("(if {} {} {})", cond.dump(), then.dump(), els.dump())
            }
            SexprAst::Lambda { params, body } => {
                format!("(lambda ({}) {})", params.join(" "), body.dump())
            }
            SexprAst::Call { func, args } => {
                let args = args.iter().map(SexprAst::dump).collect::<Vec<_>>().join(" ");
                if args.is_empty() {
                    format!("({})", func.dump())
                } else {
                    format!("({} {})", func.dump(), args)
                }
            }
            SexprAst::Holder(inner) => inner.dump(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_dumps_as_parenthesized_form() {
        let expr = SexprAst::Call {
            func: Box::new(SexprAst::Sym("add".into())),
            args: vec![SexprAst::Int(1), SexprAst::Int(2)],
        };
        assert_eq!(expr.dump(), "(add 1 2)");
    }

    #[test]
    fn holder_is_transparent() {
        let expr = SexprAst::Holder(Box::new(SexprAst::Int(7)));
        assert_eq!(expr.dump(), "7");
    }

    #[test]
    fn if_and_lambda_dump() {
        let lam = SexprAst::Lambda {
            params: vec!["x".into(), "y".into()],
            body: Box::new(SexprAst::If {
                cond: Box::new(SexprAst::Sym("x".into())),
                then: Box::new(SexprAst::Sym("x".into())),
                els: Box::new(SexprAst::Sym("y".into())),
            }),
        };
        assert_eq!(lam.dump(), "(lambda (x y) (if x x y))");
    }
}
