//! The formula/rule engine: a tree of `Formula`s, `Rule`s built from
//! them, and `LogicEngine`'s forward chaining, consistency checking,
//! satisfiability, and persistence.

pub mod engine;
pub mod formula;
pub mod rule;

pub use engine::{ConflictInfo, LogicEngine};
pub use formula::Formula;
pub use rule::{Rule, RuleSource};
