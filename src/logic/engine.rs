//! Forward chaining, consistency checking, satisfiability, explanation,
//! and rule persistence. Grounded on
//! `original_source/src/Logic/TagSystem.h`'s `LogicEngine`.

use crate::error::{Result, VfsError};
use crate::logic::formula::Formula;
use crate::logic::rule::{Rule, RuleSource};
use crate::tags::{TagId, TagRegistry, TagSet};
use crate::vfs::Vfs;

const FORWARD_CHAIN_ITERATION_CAP: usize = 100;
const CONSISTENCY_MIN_CONFIDENCE: f64 = 0.95;
const MAX_SAT_VARIABLES: usize = 20;

pub struct ConflictInfo {
    pub description: String,
    pub conflicting_tag_names: Vec<String>,
    pub suggestion_strings: Vec<String>,
}

#[derive(Default)]
pub struct LogicEngine {
    pub rules: Vec<Rule>,
}

impl LogicEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed ruleset every fresh engine is seeded with, at the given
    /// confidences and sources.
    pub fn add_hardcoded_rules(&mut self, registry: &mut TagRegistry) {
        let mut rule = |name: &str, premise: &str, conclusion: &str, confidence: f64, source: RuleSource| {
            self.rules.push(Rule {
                name: name.to_string(),
                premise: crate::logic::formula::parse(premise, registry).expect("hardcoded rule premise parses"),
                conclusion: crate::logic::formula::parse(conclusion, registry).expect("hardcoded rule conclusion parses"),
                confidence,
                source,
            });
        };
        rule("offline-implies-not-network", "offline", "(not network)", 1.0, RuleSource::Hardcoded);
        rule("fast-implies-cached", "fast", "cached", 0.87, RuleSource::Learned);
        rule("cached-not-remote", "cached", "(not remote)", 1.0, RuleSource::Hardcoded);
        rule("no-network-implies-offline", "no-network", "offline", 1.0, RuleSource::Hardcoded);
        rule("local-only-implies-offline", "local-only", "offline", 1.0, RuleSource::Hardcoded);
        rule(
            "cache-write-through-implies-not-write-back",
            "cache-write-through",
            "(not cache-write-back)",
            1.0,
            RuleSource::Hardcoded,
        );
    }

    /// Forward chaining, capped at 100 iterations. A rule fires only when
    /// its conclusion is a bare `Var` (add) or `Not(Var)` — the latter
    /// never adds, since negative conclusions are handled by consistency
    /// checking, not by mutating the working set.
    pub fn infer_tags(&self, initial: &TagSet, min_confidence: f64) -> TagSet {
        let mut working = initial.clone();
        for _ in 0..FORWARD_CHAIN_ITERATION_CAP {
            let mut changed = false;
            for rule in &self.rules {
                if rule.confidence < min_confidence || !rule.premise.evaluate(&working) {
                    continue;
                }
                if let Formula::Var(id) = &rule.conclusion {
                    if !working.contains(*id) {
                        working.insert(*id);
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
        working
    }

    /// First violated high-confidence rule, or `None` if `tags` is
    /// consistent with every rule at confidence ≥ 0.95.
    pub fn check_consistency(&self, tags: &TagSet, registry: &TagRegistry) -> Option<ConflictInfo> {
        self.rules.iter().find_map(|rule| {
            if rule.confidence < CONSISTENCY_MIN_CONFIDENCE {
                return None;
            }
            if !rule.premise.evaluate(tags) || rule.conclusion.evaluate(tags) {
                return None;
            }
            Some(ConflictInfo {
                description: format!("rule '{}' violated: {} holds but {} does not", rule.name, rule.premise_str(registry), rule.conclusion_str(registry)),
                conflicting_tag_names: rule.conclusion.variables().iter().filter_map(|id| registry.get_tag_name(*id)).map(str::to_string).collect(),
                suggestion_strings: vec![format!("reconsider tags implied by '{}'", rule.premise_str(registry))],
            })
        })
    }

    /// Brute-force over all subsets of `f`'s distinct variables (bounded
    /// at 20); beyond that an optimistic `true` default stands in for a
    /// real SAT solver.
    pub fn is_satisfiable(&self, f: &Formula) -> bool {
        let vars = f.variables();
        if vars.len() > MAX_SAT_VARIABLES {
            return true;
        }
        let n = vars.len();
        for mask in 0u32..(1u32 << n) {
            let mut tags = TagSet::new();
            for (i, &v) in vars.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    tags.insert(v);
                }
            }
            if f.evaluate(&tags) {
                return true;
            }
        }
        n == 0 && f.evaluate(&TagSet::new())
    }

    /// One line per hardcoded/learned/etc. rule that could have produced
    /// `tag` under `initial`, or a single "was provided by user" line if
    /// `tag` was already in `initial`.
    pub fn explain_inference(&self, tag: TagId, initial: &TagSet, registry: &TagRegistry) -> Vec<String> {
        if initial.contains(tag) {
            return vec!["was provided by user".to_string()];
        }
        self.rules
            .iter()
            .filter(|rule| matches!(&rule.conclusion, Formula::Var(id) if *id == tag) && rule.premise.evaluate(initial))
            .map(|rule| {
                format!(
                    "{}: {} -> {} (confidence {}, {})",
                    rule.name,
                    rule.premise_str(registry),
                    rule.conclusion_str(registry),
                    rule.confidence,
                    rule.source.as_str()
                )
            })
            .collect()
    }

    /// Writes `<base>/<source>/rules.txt` per source (only for sources
    /// this engine actually holds rules for), then `<base>/summary.txt`.
    pub fn save_rules_to_vfs(&self, vfs: &mut Vfs, overlay_id: usize, registry: &TagRegistry, base: &str) -> Result<()> {
        for source in [RuleSource::Hardcoded, RuleSource::Learned, RuleSource::AiGenerated, RuleSource::User] {
            let rules: Vec<&Rule> = self.rules.iter().filter(|r| r.source == source).collect();
            if rules.is_empty() {
                continue;
            }
            let mut body = String::from("# auto-generated rule file, one record per line\n");
            for rule in &rules {
                body.push_str(&rule.serialize(registry)?);
                body.push('\n');
            }
            vfs.write(&format!("{base}/{}/rules.txt", source.as_str()), body.into_bytes(), overlay_id)?;
        }
        let summary = format!("{} rules across {} sources\n", self.rules.len(), {
            let mut sources: Vec<&str> = self.rules.iter().map(|r| r.source.as_str()).collect();
            sources.sort_unstable();
            sources.dedup();
            sources.len()
        });
        vfs.write(&format!("{base}/summary.txt"), summary.into_bytes(), overlay_id)?;
        Ok(())
    }

    /// Reads only the four well-known rule files; malformed lines are
    /// logged and skipped rather than failing the whole load.
    pub fn load_rules_from_vfs(&mut self, vfs: &Vfs, registry: &mut TagRegistry, base: &str) -> Result<()> {
        for source in ["hardcoded", "learned", "ai-generated", "user"] {
            let path = format!("{base}/{source}/rules.txt");
            let Ok(resolved) = vfs.resolve(&path) else { continue };
            let Ok(text) = resolved.borrow().read() else { continue };
            for line in text.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                match Rule::deserialize(line, registry) {
                    Ok(rule) => self.rules.push(rule),
                    Err(e) => tracing::warn!(%path, %line, error = %e, "skipping malformed rule line"),
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardcoded_rules_forward_chain() {
        let mut registry = TagRegistry::new();
        let mut engine = LogicEngine::new();
        engine.add_hardcoded_rules(&mut registry);

        let mut tags = TagSet::new();
        tags.insert(registry.get_tag_id("no-network"));
        let inferred = engine.infer_tags(&tags, 0.8);
        assert!(inferred.contains(registry.get_tag_id("offline")));
    }

    #[test]
    fn consistency_flags_violated_high_confidence_rule() {
        let mut registry = TagRegistry::new();
        let mut engine = LogicEngine::new();
        engine.add_hardcoded_rules(&mut registry);

        let mut tags = TagSet::new();
        tags.insert(registry.get_tag_id("offline"));
        tags.insert(registry.get_tag_id("network"));
        let conflict = engine.check_consistency(&tags, &registry);
        assert!(conflict.is_some());
    }

    #[test]
    fn satisfiable_detects_contradiction() {
        let mut registry = TagRegistry::new();
        let engine = LogicEngine::new();
        let f = crate::logic::formula::parse("(and a (not a))", &mut registry).unwrap();
        assert!(!engine.is_satisfiable(&f));
    }

    #[test]
    fn explain_inference_reports_user_provided_tag() {
        let mut registry = TagRegistry::new();
        let engine = LogicEngine::new();
        let tag = registry.register_tag("offline");
        let mut initial = TagSet::new();
        initial.insert(tag);
        assert_eq!(engine.explain_inference(tag, &initial, &registry), vec!["was provided by user".to_string()]);
    }
}
