//! Run counters and the pass/fail gate.
//!
//! A run fails when it found directives and is not silent, or when it hit
//! duplicates of closed issues and closed duplicates were made fatal. The
//! second rule applies even in silent mode.

use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::grammar::Keyword;
use crate::scan::Hit;

/// Whether a run lists hits or files them as issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Print,
    Issue,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Print => write!(f, "print"),
            Mode::Issue => write!(f, "issue"),
        }
    }
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Every target the scanner attempted
    pub files_scanned: usize,
    pub encoding_failures: usize,
    pub read_failures: usize,
    pub hits: usize,
    /// Hits mentioning `todo`
    pub todos: usize,
    /// Hits mentioning `fixme`
    pub fixmes: usize,
    pub issues_filed: usize,
    pub issue_failures: usize,
    /// Hits matching an open issue
    pub duplicates_avoided: usize,
    /// Hits matching a closed issue
    pub duplicate_closed: usize,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a hit; a line with both keywords counts toward both classes.
    pub fn record_hit(&mut self, hit: &Hit) {
        self.hits += 1;
        if hit.has_keyword(Keyword::Todo) {
            self.todos += 1;
        }
        if hit.has_keyword(Keyword::Fixme) {
            self.fixmes += 1;
        }
    }

    /// Counters as `TODOON_*` environment variables.
    pub fn env_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            ("TODOON_STATUS", "finished".to_string()),
            ("TODOON_PROGRESS", "100.0".to_string()),
            ("TODOON_FILES_SCANNED", self.files_scanned.to_string()),
            ("TODOON_TODOS_FOUND", self.todos.to_string()),
            ("TODOON_FIXMES_FOUND", self.fixmes.to_string()),
            ("TODOON_ENCODING_ERRORS", self.encoding_failures.to_string()),
            ("TODOON_ISSUES_GENERATED", self.issues_filed.to_string()),
            ("TODOON_ISSUE_FAILURES", self.issue_failures.to_string()),
            (
                "TODOON_DUPLICATE_ISSUES_AVOIDED",
                self.duplicates_avoided.to_string(),
            ),
            (
                "TODOON_DUPLICATE_CLOSED_ISSUES",
                self.duplicate_closed.to_string(),
            ),
        ]
    }

    /// Append the counters to a GitHub Actions environment file.
    pub fn write_github_env(&self, path: &Path) -> std::io::Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        for (name, value) in self.env_vars() {
            writeln!(file, "{}={}", name, value)?;
        }
        Ok(())
    }
}

/// Why a run failed the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "count", rename_all = "snake_case")]
pub enum Failure {
    HitsFound(usize),
    ClosedDuplicates(usize),
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::HitsFound(n) => write!(f, "{} TODO/FIXME directive(s) found", n),
            Failure::ClosedDuplicates(n) => {
                write!(f, "{} directive(s) match previously closed issues", n)
            }
        }
    }
}

/// Outcome of the gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub failures: Vec<Failure>,
}

impl Verdict {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Decide whether the run passes.
pub fn evaluate(stats: &RunStats, silent: bool, fail_closed_duplicates: bool) -> Verdict {
    let mut failures = Vec::new();
    if stats.hits > 0 && !silent {
        failures.push(Failure::HitsFound(stats.hits));
    }
    if stats.duplicate_closed > 0 && fail_closed_duplicates {
        failures.push(Failure::ClosedDuplicates(stats.duplicate_closed));
    }
    Verdict { failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn hit(keywords: &[Keyword]) -> Hit {
        Hit::new(
            "a.py",
            1,
            keywords.iter().copied().collect::<BTreeSet<_>>(),
            vec!["# todo fixme".to_string()],
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_record_hit_counts_both_classes() {
        let mut stats = RunStats::new();
        stats.record_hit(&hit(&[Keyword::Todo]));
        stats.record_hit(&hit(&[Keyword::Todo, Keyword::Fixme]));

        assert_eq!(stats.hits, 2);
        assert_eq!(stats.todos, 2);
        assert_eq!(stats.fixmes, 1);
    }

    #[test]
    fn test_gate() {
        let clean = RunStats::new();
        assert!(evaluate(&clean, false, true).passed());

        let found = RunStats {
            hits: 3,
            ..Default::default()
        };
        assert_eq!(
            evaluate(&found, false, false).failures,
            vec![Failure::HitsFound(3)]
        );
        assert!(evaluate(&found, true, false).passed());
    }

    #[test]
    fn test_closed_duplicates_fail_even_when_silent() {
        let stats = RunStats {
            hits: 1,
            duplicate_closed: 1,
            ..Default::default()
        };
        assert_eq!(
            evaluate(&stats, true, true).failures,
            vec![Failure::ClosedDuplicates(1)]
        );
        assert!(evaluate(&stats, true, false).passed());
    }

    #[test]
    fn test_write_github_env_appends() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("github_env");
        std::fs::write(&path, "EXISTING=1\n").unwrap();

        let stats = RunStats {
            files_scanned: 4,
            todos: 2,
            ..Default::default()
        };
        stats.write_github_env(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("EXISTING=1\n"));
        assert!(content.contains("TODOON_FILES_SCANNED=4\n"));
        assert!(content.contains("TODOON_TODOS_FOUND=2\n"));
        assert!(content.contains("TODOON_STATUS=finished\n"));
    }
}
