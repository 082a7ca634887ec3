//! The formula tree, its S-expression-ish text grammar, and evaluation
//! against a `TagSet`. Grounded on
//! `original_source/src/Logic/TagSystem.h`'s `Formula` variant and its
//! `parseFormula`/`toString`/`evaluate`.

use crate::error::{Result, VfsError};
use crate::tags::{TagId, TagRegistry, TagSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    Var(TagId),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Implies(Box<Formula>, Box<Formula>),
}

impl Formula {
    pub fn evaluate(&self, tags: &TagSet) -> bool {
        match self {
            Formula::Var(id) => tags.contains(*id),
            Formula::Not(f) => !f.evaluate(tags),
            Formula::And(fs) => fs.iter().all(|f| f.evaluate(tags)),
            Formula::Or(fs) => fs.iter().any(|f| f.evaluate(tags)),
            Formula::Implies(a, b) => !a.evaluate(tags) || b.evaluate(tags),
        }
    }

    /// The canonical S-expression rendering: bare tag name, `(not f)`,
    /// `(and f...)`, `(or f...)`, `(implies l r)`.
    pub fn to_string(&self, registry: &TagRegistry) -> String {
        match self {
            Formula::Var(id) => registry.get_tag_name(*id).unwrap_or("?").to_string(),
            Formula::Not(f) => format!("(not {})", f.to_string(registry)),
            Formula::And(fs) => format!("(and {})", fs.iter().map(|f| f.to_string(registry)).collect::<Vec<_>>().join(" ")),
            Formula::Or(fs) => format!("(or {})", fs.iter().map(|f| f.to_string(registry)).collect::<Vec<_>>().join(" ")),
            Formula::Implies(a, b) => format!("(implies {} {})", a.to_string(registry), b.to_string(registry)),
        }
    }

    /// Every distinct `Var` id appearing in the tree, used by
    /// satisfiability checking.
    pub fn variables(&self) -> Vec<TagId> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort_unstable();
        vars.dedup();
        vars
    }

    fn collect_variables(&self, out: &mut Vec<TagId>) {
        match self {
            Formula::Var(id) => out.push(*id),
            Formula::Not(f) => f.collect_variables(out),
            Formula::And(fs) | Formula::Or(fs) => fs.iter().for_each(|f| f.collect_variables(out)),
            Formula::Implies(a, b) => {
                a.collect_variables(out);
                b.collect_variables(out);
            }
        }
    }
}

struct Tokenizer<'a> {
    rest: &'a str,
}

impl<'a> Tokenizer<'a> {
    fn new(src: &'a str) -> Self {
        Self { rest: src }
    }

    fn next_token(&mut self) -> Option<&'a str> {
        self.rest = self.rest.trim_start();
        if self.rest.is_empty() {
            return None;
        }
        let (tok, rest) = if self.rest.starts_with('(') || self.rest.starts_with(')') {
            self.rest.split_at(1)
        } else {
            let end = self.rest.find(|c: char| c.is_whitespace() || c == '(' || c == ')').unwrap_or(self.rest.len());
            self.rest.split_at(end)
        };
        self.rest = rest;
        Some(tok)
    }

    fn peek(&mut self) -> Option<&'a str> {
        let saved = self.rest;
        let tok = self.next_token();
        self.rest = saved;
        tok
    }
}

/// Parses a formula string, interning any bare identifier as a tag via
/// `registry`.
pub fn parse(src: &str, registry: &mut TagRegistry) -> Result<Formula> {
    let mut tok = Tokenizer::new(src);
    let formula = parse_expr(&mut tok, registry)?;
    if tok.next_token().is_some() {
        return Err(VfsError::ParseError(format!("trailing tokens after formula: {src}")));
    }
    Ok(formula)
}

fn parse_expr(tok: &mut Tokenizer, registry: &mut TagRegistry) -> Result<Formula> {
    let t = tok.next_token().ok_or_else(|| VfsError::ParseError("unexpected end of formula".into()))?;
    if t != "(" {
        return Ok(Formula::Var(registry.register_tag(t)));
    }

    let op = tok.next_token().ok_or_else(|| VfsError::ParseError("expected operator after (".into()))?;
    let mut children = Vec::new();
    while tok.peek() != Some(")") {
        if tok.peek().is_none() {
            return Err(VfsError::ParseError("unterminated formula".into()));
        }
        children.push(parse_expr(tok, registry)?);
    }
    tok.next_token();

    match op {
        "not" => {
            if children.len() != 1 {
                return Err(VfsError::ParseError("not requires exactly one child".into()));
            }
            Ok(Formula::Not(Box::new(children.remove(0))))
        }
        "implies" => {
            if children.len() != 2 {
                return Err(VfsError::ParseError("implies requires exactly two children".into()));
            }
            let rhs = children.remove(1);
            let lhs = children.remove(0);
            Ok(Formula::Implies(Box::new(lhs), Box::new(rhs)))
        }
        "and" => {
            if children.is_empty() {
                return Err(VfsError::ParseError("and requires at least one child".into()));
            }
            Ok(Formula::And(children))
        }
        "or" => {
            if children.is_empty() {
                return Err(VfsError::ParseError("or requires at least one child".into()));
            }
            Ok(Formula::Or(children))
        }
        other => Err(VfsError::ParseError(format!("unknown operator: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_roundtrip_through_to_string() {
        let mut reg = TagRegistry::new();
        let f = parse("(implies offline (not network))", &mut reg).unwrap();
        assert_eq!(f.to_string(&reg), "(implies offline (not network))");
    }

    #[test]
    fn not_requires_exactly_one_child() {
        let mut reg = TagRegistry::new();
        assert!(parse("(not a b)", &mut reg).is_err());
    }

    #[test]
    fn evaluate_implies_is_material_implication() {
        let mut reg = TagRegistry::new();
        let f = parse("(implies a b)", &mut reg).unwrap();
        let a = reg.get_tag_id("a");
        let mut tags = TagSet::new();
        assert!(f.evaluate(&tags)); // a false -> implication holds
        tags.insert(a);
        assert!(!f.evaluate(&tags)); // a true, b false -> fails
    }
}
