//! Plan-AST: planning-document nodes, each a leaf whose `read`/`write`
//! round-trip a small line-oriented text format. Grounded structurally
//! on the other Cpp/S-AST families but with no counterpart in
//! `original_source`'s headers beyond the field shapes described here
//! directly.

use crate::error::{Result, VfsError};

/// One entry of a `PlanJobs` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanJob {
    pub description: String,
    pub priority: i64,
    pub completed: bool,
    pub assignee: String,
}

pub enum PlanAst {
    Jobs(Vec<PlanJob>),
    Goals(Vec<String>),
    Ideas(Vec<String>),
    Deps(Vec<String>),
    Implemented(Vec<String>),
    Research(Vec<String>),
    Root(String),
    SubPlan(String),
    Strategy(String),
    Notes(String),
}

fn dump_list(items: &[String]) -> String {
    items.iter().map(|i| format!("- {i}\n")).collect()
}

fn parse_list(s: &str) -> Vec<String> {
    s.lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| l.strip_prefix("- ").unwrap_or(l).to_string())
        .collect()
}

fn dump_job(j: &PlanJob) -> String {
    let mark = if j.completed { 'x' } else { ' ' };
    if j.assignee.is_empty() {
        format!("[{mark}] P{} {}\n", j.priority, j.description)
    } else {
        format!("[{mark}] P{} {} (@{})\n", j.priority, j.description, j.assignee)
    }
}

fn parse_job_line(line: &str) -> Result<PlanJob> {
    let line = line.trim();
    let rest = line
        .strip_prefix("[x]")
        .map(|r| (true, r))
        .or_else(|| line.strip_prefix("[ ]").map(|r| (false, r)))
        .ok_or_else(|| VfsError::ParseError(format!("malformed job line: {line}")))?;
    let (completed, rest) = rest;
    let rest = rest.trim_start();
    let rest = rest
        .strip_prefix('P')
        .ok_or_else(|| VfsError::ParseError(format!("malformed job line: {line}")))?;
    let (priority_str, rest) = rest
        .split_once(' ')
        .ok_or_else(|| VfsError::ParseError(format!("malformed job line: {line}")))?;
    let priority: i64 = priority_str
        .parse()
        .map_err(|_| VfsError::ParseError(format!("bad priority in job line: {line}")))?;

    let rest = rest.trim();
    let (description, assignee) = match rest.rfind("(@") {
        Some(idx) if rest.ends_with(')') => {
            let desc = rest[..idx].trim_end().to_string();
            let assignee = rest[idx + 2..rest.len() - 1].to_string();
            (desc, assignee)
        }
        _ => (rest.to_string(), String::new()),
    };

    Ok(PlanJob { description, priority, completed, assignee })
}

impl PlanAst {
    pub fn dump(&self) -> String {
        match self {
            PlanAst::Jobs(jobs) => {
                let mut sorted: Vec<&PlanJob> = jobs.iter().collect();
                sorted.sort_by_key(|j| (j.completed, j.priority));
                sorted.iter().map(|j| dump_job(j)).collect()
            }
            PlanAst::Goals(v) | PlanAst::Ideas(v) | PlanAst::Deps(v) | PlanAst::Implemented(v) | PlanAst::Research(v) => {
                dump_list(v)
            }
            PlanAst::Root(s) | PlanAst::SubPlan(s) | PlanAst::Strategy(s) | PlanAst::Notes(s) => s.clone(),
        }
    }

    pub fn write(&mut self, s: &str) -> Result<()> {
        match self {
            PlanAst::Jobs(jobs) => {
                let mut parsed = Vec::new();
                for line in s.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    parsed.push(parse_job_line(line)?);
                }
                *jobs = parsed;
                Ok(())
            }
            PlanAst::Goals(v) | PlanAst::Ideas(v) | PlanAst::Deps(v) | PlanAst::Implemented(v) | PlanAst::Research(v) => {
                *v = parse_list(s);
                Ok(())
            }
            PlanAst::Root(c) | PlanAst::SubPlan(c) | PlanAst::Strategy(c) | PlanAst::Notes(c) => {
                *c = s.to_string();
                Ok(())
            }
        }
    }

    /// Appends a job in insertion order; `dump`/`read` sort a separate
    /// copy so insertion order among ties is preserved by `Vec` stability.
    pub fn add_job(&mut self, description: impl Into<String>, priority: i64, assignee: impl Into<String>) -> Result<()> {
        match self {
            PlanAst::Jobs(jobs) => {
                jobs.push(PlanJob { description: description.into(), priority, completed: false, assignee: assignee.into() });
                Ok(())
            }
            _ => Err(VfsError::NotAFile("add_job on a non-PlanJobs node".into())),
        }
    }

    pub fn complete_job(&mut self, index: usize) -> Result<()> {
        match self {
            PlanAst::Jobs(jobs) => {
                let job = jobs.get_mut(index).ok_or_else(|| VfsError::NotFound(format!("job index {index}")))?;
                job.completed = true;
                Ok(())
            }
            _ => Err(VfsError::NotAFile("complete_job on a non-PlanJobs node".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goals_round_trip_skips_blank_lines_and_dash_prefix() {
        let mut g = PlanAst::Goals(Vec::new());
        g.write("- ship the thing\n\nfix bugs\n").unwrap();
        match &g {
            PlanAst::Goals(v) => assert_eq!(v, &vec!["ship the thing".to_string(), "fix bugs".to_string()]),
            _ => unreachable!(),
        }
        assert_eq!(g.dump(), "- ship the thing\n- fix bugs\n");
    }

    #[test]
    fn jobs_sort_by_completed_then_priority_then_insertion() {
        let mut jobs = PlanAst::Jobs(Vec::new());
        jobs.add_job("low prio", 5, "").unwrap();
        jobs.add_job("high prio", 1, "alice").unwrap();
        jobs.add_job("same prio first", 1, "").unwrap();
        jobs.complete_job(0).unwrap();

        let dumped = jobs.dump();
        let lines: Vec<&str> = dumped.lines().collect();
        assert_eq!(lines[0], "[ ] P1 high prio (@alice)");
        assert_eq!(lines[1], "[ ] P1 same prio first");
        assert_eq!(lines[2], "[x] P5 low prio");
    }

    #[test]
    fn jobs_write_parses_completed_and_assignee() {
        let mut jobs = PlanAst::Jobs(Vec::new());
        jobs.write("[x] P2 review PR (@bob)\n[ ] P1 write tests\n").unwrap();
        match &jobs {
            PlanAst::Jobs(v) => {
                assert_eq!(v.len(), 2);
                assert!(v[0].completed);
                assert_eq!(v[0].assignee, "bob");
                assert!(!v[1].completed);
                assert_eq!(v[1].assignee, "");
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn notes_stores_content_verbatim() {
        let mut notes = PlanAst::Notes(String::new());
        notes.write("free-form\nmultiline text").unwrap();
        assert_eq!(notes.dump(), "free-form\nmultiline text");
    }
}
