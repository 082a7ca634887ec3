//! Forward chaining + consistency, and satisfiability.

use codex_vfs::logic::{formula, LogicEngine};
use codex_vfs::tags::{TagRegistry, TagSet};

#[test]
fn e4_forward_chaining_and_consistency() {
    let mut registry = TagRegistry::new();
    let mut engine = LogicEngine::new();
    engine.add_hardcoded_rules(&mut registry);

    let fast = registry.register_tag("fast");
    let mut initial = TagSet::new();
    initial.insert(fast);

    let inferred = engine.infer_tags(&initial, 0.85);
    let cached = registry.get_tag_id("cached");
    assert!(inferred.contains(fast));
    assert!(inferred.contains(cached));
    assert_eq!(inferred.size(), 2);

    let remote = registry.register_tag("remote");
    let mut with_remote = inferred.clone();
    with_remote.insert(remote);
    let conflict = engine.check_consistency(&with_remote, &registry).expect("remote contradicts cached-not-remote");
    assert!(conflict.description.contains("cached-not-remote"));
}

#[test]
fn e5_satisfiability() {
    let mut registry = TagRegistry::new();
    let mut engine = LogicEngine::new();
    engine.add_hardcoded_rules(&mut registry);

    let unsat = formula::parse("(and a (not a))", &mut registry).unwrap();
    assert!(!engine.is_satisfiable(&unsat));

    let sat = formula::parse("(or a b)", &mut registry).unwrap();
    assert!(engine.is_satisfiable(&sat));
}
