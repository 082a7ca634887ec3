//! The context builder: composable filters over the VFS, token-budgeted
//! assembly, dedup/hierarchical/adaptive/summarization options. Grounded
//! structurally on `src/export/mod.rs`'s filter-closure style,
//! generalized to a richer `ContextFilter` algebra.

use sha2::{Digest, Sha256};

use crate::node::NodeRef;
use crate::tags::TagSet;
use crate::vfs::Vfs;

pub enum ContextFilter {
    TagAny(TagSet),
    TagAll(TagSet),
    TagNone(TagSet),
    PathPrefix(String),
    /// `*` matches any run of characters, `?` matches exactly one.
    PathPattern(String),
    ContentMatch(String),
    ContentRegex(regex::Regex),
    NodeKind(crate::node::NodeKind),
    Custom(Box<dyn Fn(&NodeRef, &str, &Vfs) -> bool>),
    And(Vec<ContextFilter>),
    Or(Vec<ContextFilter>),
    Not(Box<ContextFilter>),
}

fn glob_match(pattern: &str, text: &str) -> bool {
    fn inner(p: &[u8], t: &[u8]) -> bool {
        match (p.first(), t.first()) {
            (None, None) => true,
            (Some(b'*'), _) => inner(&p[1..], t) || (!t.is_empty() && inner(p, &t[1..])),
            (Some(b'?'), Some(_)) => inner(&p[1..], &t[1..]),
            (Some(&pc), Some(&tc)) if pc == tc => inner(&p[1..], &t[1..]),
            _ => false,
        }
    }
    inner(pattern.as_bytes(), text.as_bytes())
}

impl ContextFilter {
    pub fn matches(&self, node: &NodeRef, path: &str, vfs: &Vfs) -> bool {
        match self {
            ContextFilter::TagAny(want) => {
                let tags = vfs.tag_storage.tags_for(node);
                !(&tags & want).is_empty()
            }
            ContextFilter::TagAll(want) => vfs.tag_storage.tags_for(node).is_superset_of(want),
            ContextFilter::TagNone(forbidden) => (&vfs.tag_storage.tags_for(node) & forbidden).is_empty(),
            ContextFilter::PathPrefix(prefix) => path.starts_with(prefix.as_str()),
            ContextFilter::PathPattern(pattern) => glob_match(pattern, path),
            ContextFilter::ContentMatch(substr) => node.borrow().read().map(|c| c.contains(substr.as_str())).unwrap_or(false),
            ContextFilter::ContentRegex(re) => node.borrow().read().map(|c| re.is_match(&c)).unwrap_or(false),
            ContextFilter::NodeKind(kind) => node.borrow().kind == *kind,
            ContextFilter::Custom(f) => f(node, path, vfs),
            ContextFilter::And(fs) => fs.iter().all(|f| f.matches(node, path, vfs)),
            ContextFilter::Or(fs) => fs.iter().any(|f| f.matches(node, path, vfs)),
            ContextFilter::Not(f) => !f.matches(node, path, vfs),
        }
    }
}

#[derive(Clone)]
pub struct ContextEntry {
    pub vfs_path: String,
    pub content: String,
    pub token_estimate: usize,
    pub priority: i32,
    pub tags: TagSet,
}

fn token_estimate(content: &str) -> usize {
    content.len().div_ceil(4)
}

fn content_hash(content: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher.finalize().into()
}

/// Whether an entry costing `cost` tokens may be appended with `spent`
/// tokens already committed. The running total must stay within
/// `budget` except that the single entry which ends the build may
/// straddle the boundary by at most one token.
fn fits_budget(spent: usize, cost: usize, budget: usize) -> bool {
    spent + cost <= budget + 1
}

#[derive(Default)]
pub struct BuildOptions {
    pub deduplicate: bool,
    pub hierarchical: bool,
    pub adaptive_budget: bool,
    pub include_dependencies: bool,
    pub summary_threshold: Option<usize>,
}

pub struct ContextBuilder<'a> {
    pub vfs: &'a Vfs,
    pub filters: Vec<ContextFilter>,
    pub entries: Vec<ContextEntry>,
    pub max_tokens: usize,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(vfs: &'a Vfs, max_tokens: usize) -> Self {
        Self { vfs, filters: Vec::new(), entries: Vec::new(), max_tokens }
    }

    pub fn with_filter(mut self, filter: ContextFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Visits every overlay hosting `root`, recursively walking the
    /// directory tree and emitting an entry per matching node. An empty
    /// filter list matches everything.
    pub fn collect_from_path(&mut self, root: &str) {
        for id in self.vfs.overlays_for_path(root) {
            if let Ok(node) = self.vfs.resolve_for_overlay(root, id) {
                self.walk(&node, root);
            }
        }
    }

    fn walk(&mut self, node: &NodeRef, path: &str) {
        let matched = self.filters.is_empty() || self.filters.iter().any(|f| f.matches(node, path, self.vfs));
        if matched {
            if let Ok(content) = node.borrow().read() {
                let tags = self.vfs.tag_storage.tags_for(node);
                let priority = if tags.contains(self.vfs.tag_registry.get_tag_id("critical")) {
                    200
                } else if tags.contains(self.vfs.tag_registry.get_tag_id("important")) {
                    150
                } else {
                    100
                };
                self.entries.push(ContextEntry {
                    vfs_path: path.to_string(),
                    token_estimate: token_estimate(&content),
                    content,
                    priority,
                    tags,
                });
            }
        }
        if let Ok(children) = node.borrow().children() {
            for (name, child) in children {
                self.walk(&child, &crate::path::join_path(path, &name));
            }
        }
    }

    fn format_entry(entry: &ContextEntry, vfs: &Vfs) -> String {
        let mut names: Vec<String> = entry.tags.to_vec().into_iter().filter_map(|id| vfs.tag_registry.get_tag_name(id).map(str::to_string)).collect();
        names.sort();
        let mut out = format!("=== {} ===\n", entry.vfs_path);
        if !names.is_empty() {
            out.push_str(&format!("Tags: {}\n", names.join(", ")));
        }
        out.push_str(&entry.content);
        out.push_str("\n\n");
        out
    }

    /// Sorts by insertion order (i.e., does not reorder), concatenating
    /// while the running token sum stays within `max_tokens`.
    pub fn build(&self) -> String {
        let mut out = String::new();
        let mut spent = 0usize;
        for entry in &self.entries {
            if !fits_budget(spent, entry.token_estimate, self.max_tokens) {
                break;
            }
            out.push_str(&Self::format_entry(entry, self.vfs));
            spent += entry.token_estimate;
        }
        out
    }

    pub fn build_with_priority(&self) -> String {
        let mut sorted: Vec<&ContextEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| b.priority.cmp(&a.priority));
        let mut out = String::new();
        let mut spent = 0usize;
        for entry in sorted {
            if !fits_budget(spent, entry.token_estimate, self.max_tokens) {
                break;
            }
            out.push_str(&Self::format_entry(entry, self.vfs));
            spent += entry.token_estimate;
        }
        out
    }

    /// Hierarchical mode returns `(overview, details)` instead of a
    /// single string: overview lists path + tags only, details carries
    /// full content up to budget.
    pub fn build_with_options(&self, opts: &BuildOptions) -> (String, String) {
        let mut entries: Vec<ContextEntry> = self.entries.clone();

        if opts.deduplicate {
            let mut seen = std::collections::HashSet::new();
            entries.retain(|e| seen.insert(content_hash(&e.content)));
        }

        if let Some(threshold) = opts.summary_threshold {
            for entry in &mut entries {
                if entry.token_estimate > threshold {
                    let lines: Vec<&str> = entry.content.lines().collect();
                    if lines.len() > 20 {
                        let head = lines[..10].join("\n");
                        let tail = lines[lines.len() - 10..].join("\n");
                        entry.content = format!("{head}\n... (elided) ...\n{tail}");
                        entry.token_estimate = token_estimate(&entry.content);
                    }
                }
            }
        }

        let total_demand: usize = entries.iter().map(|e| e.token_estimate).sum();
        let budget = if opts.adaptive_budget && total_demand > 2 * self.max_tokens { 2 * self.max_tokens } else { self.max_tokens };

        let mut overview = String::new();
        let mut details = String::new();
        let mut spent = 0usize;
        for entry in &entries {
            if !fits_budget(spent, entry.token_estimate, budget) {
                break;
            }
            let mut names: Vec<String> = entry.tags.to_vec().into_iter().filter_map(|id| self.vfs.tag_registry.get_tag_name(id).map(str::to_string)).collect();
            names.sort();
            overview.push_str(&format!("{} [{}]\n", entry.vfs_path, names.join(", ")));
            details.push_str(&Self::format_entry(entry, self.vfs));
            spent += entry.token_estimate;
        }

        if opts.hierarchical {
            (overview, details)
        } else {
            (String::new(), details)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_stops_at_token_budget() {
        let mut vfs = Vfs::new();
        for name in ["a", "b", "c"] {
            vfs.write(&format!("/{name}.txt"), "x".repeat(4000).into_bytes(), 0).unwrap();
        }
        let mut builder = ContextBuilder::new(&vfs, 2500);
        builder.collect_from_path("/");
        let out = builder.build();
        assert_eq!(out.matches("=== ").count(), 2);
    }

    #[test]
    fn dedup_removes_repeated_content() {
        let mut vfs = Vfs::new();
        vfs.write("/a.txt", b"same".to_vec(), 0).unwrap();
        vfs.write("/b.txt", b"same".to_vec(), 0).unwrap();
        let mut builder = ContextBuilder::new(&vfs, 10_000);
        builder.collect_from_path("/");
        let (_, details) = builder.build_with_options(&BuildOptions { deduplicate: true, ..Default::default() });
        assert_eq!(details.matches("=== ").count(), 1);
    }

    #[test]
    fn path_pattern_glob_matches() {
        assert!(glob_match("/src/*.rs", "/src/main.rs"));
        assert!(!glob_match("/src/*.rs", "/src/main.txt"));
        assert!(glob_match("/a?c", "/abc"));
    }
}
