//! Output formatting for scan results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};

use crate::reconcile::Decision;
use crate::scan::Hit;
use crate::summary::{Mode, RunStats, Verdict};

/// Everything a report needs about a finished run.
pub struct RunReport<'a> {
    pub path: &'a str,
    pub mode: Mode,
    pub hits: &'a [Hit],
    /// Per-hit outcome in issue mode, aligned with `hits`. Shorter than
    /// `hits` when the run aborted part way.
    pub decisions: &'a [Decision],
    pub stats: &'a RunStats,
    pub verdict: &'a Verdict,
}

impl<'a> RunReport<'a> {
    fn decision(&self, index: usize) -> Option<Decision> {
        self.decisions.get(index).copied()
    }
}

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub path: String,
    pub mode: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
    pub summary: JsonSummary,
    pub hits: Vec<JsonHit>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonSummary {
    pub files_scanned: usize,
    pub encoding_failures: usize,
    pub read_failures: usize,
    pub todos: usize,
    pub fixmes: usize,
    pub issues_filed: usize,
    pub issue_failures: usize,
    pub duplicates_avoided: usize,
    pub duplicate_closed: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonHit {
    pub file: String,
    pub line: usize,
    pub keywords: Vec<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    pub fingerprint: String,
    pub context: Vec<String>,
    pub trigger_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
}

impl From<&RunStats> for JsonSummary {
    fn from(stats: &RunStats) -> Self {
        Self {
            files_scanned: stats.files_scanned,
            encoding_failures: stats.encoding_failures,
            read_failures: stats.read_failures,
            todos: stats.todos,
            fixmes: stats.fixmes,
            issues_filed: stats.issues_filed,
            issue_failures: stats.issue_failures,
            duplicates_avoided: stats.duplicates_avoided,
            duplicate_closed: stats.duplicate_closed,
        }
    }
}

fn hit_to_json(hit: &Hit, decision: Option<Decision>) -> JsonHit {
    JsonHit {
        file: hit.source_file().to_string(),
        line: hit.source_line(),
        keywords: hit
            .found_keywords()
            .iter()
            .map(|k| k.as_str().to_string())
            .collect(),
        title: hit.title(),
        body: hit.structured_body.clone(),
        labels: hit.structured_labels.iter().flatten().cloned().collect(),
        fingerprint: hit.fingerprint(),
        context: hit.context_lines().to_vec(),
        trigger_index: hit.trigger_index(),
        decision: decision.map(|d| d.as_str().to_string()),
    }
}

/// Build the JSON report structure.
pub fn build_json(report: &RunReport) -> JsonReport {
    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: report.path.to_string(),
        mode: report.mode.to_string(),
        passed: report.verdict.passed(),
        failures: report.verdict.failures.iter().map(|f| f.to_string()).collect(),
        summary: JsonSummary::from(report.stats),
        hits: report
            .hits
            .iter()
            .enumerate()
            .map(|(i, hit)| hit_to_json(hit, report.decision(i)))
            .collect(),
    }
}

/// Write results in JSON format.
pub fn write_json(report: &RunReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&build_json(report))?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write results as colored terminal output. With `summary_only` the hit
/// list is left out.
pub fn write_pretty(report: &RunReport, summary_only: bool) {
    // Header
    println!();
    print!("  ");
    print!("{}", "todoon".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Scanning: ".dimmed());
    println!("{}", report.path);
    print!("  {}", "Mode:     ".dimmed());
    println!("{}", report.mode);
    println!();

    if !summary_only && !report.hits.is_empty() {
        write_hits(report);
        println!();
    }

    write_summary(report.mode, report.stats);
    println!();

    write_final_status(report.verdict);
    println!();
}

fn write_hits(report: &RunReport) {
    println!("  {} ({}):", "Directives".bold(), report.hits.len());
    println!();

    for (i, hit) in report.hits.iter().enumerate() {
        write_keyword_tag(hit);
        print!("{}", hit.source_file().blue());
        print!("{}", format!(":{}", hit.source_line()).dimmed());
        if let Some(decision) = report.decision(i) {
            print!("  ");
            write_decision_tag(decision);
        }
        println!();

        println!("            {}", hit.title());
        if let Some(labels) = &hit.structured_labels {
            let labels: Vec<String> = labels.iter().map(|l| format!("#{}", l)).collect();
            println!("            {}", labels.join(" ").dimmed());
        }
        println!();
    }
}

fn write_keyword_tag(hit: &Hit) {
    let label = format!("{:<12}", hit.keywords_label());
    if hit.has_keyword(crate::grammar::Keyword::Fixme) {
        print!("    {}", label.red());
    } else {
        print!("    {}", label.yellow());
    }
}

fn write_decision_tag(decision: Decision) {
    match decision {
        Decision::Filed => print!("{}", "[filed]".green()),
        Decision::FilingFailed => print!("{}", "[filing failed]".red()),
        Decision::Skipped => print!("{}", "[not filed]".yellow()),
        Decision::DuplicateOpen => print!("{}", "[already open]".dimmed()),
        Decision::DuplicateClosed => print!("{}", "[previously closed]".red().bold()),
    }
}

fn write_summary(mode: Mode, stats: &RunStats) {
    println!("  {}", "Summary:".bold());
    write_count("Files scanned", stats.files_scanned);
    write_count("TODOs", stats.todos);
    write_count("FIXMEs", stats.fixmes);
    if stats.encoding_failures > 0 {
        write_count("Unsupported encoding", stats.encoding_failures);
    }
    if stats.read_failures > 0 {
        write_count("Unreadable files", stats.read_failures);
    }

    if mode == Mode::Issue {
        write_count("Issues filed", stats.issues_filed);
        if stats.issue_failures > 0 {
            write_count("Issues not filed", stats.issue_failures);
        }
        write_count("Duplicates avoided", stats.duplicates_avoided);
        if stats.duplicate_closed > 0 {
            write_count("Closed duplicates", stats.duplicate_closed);
        }
    }
}

fn write_count(label: &str, count: usize) {
    println!("    {:<22} {}", label, count);
}

fn write_final_status(verdict: &Verdict) {
    if verdict.passed() {
        println!("  {}", "✓ PASS".green());
        return;
    }
    println!("  {}", "✗ FAIL".red());
    for failure in &verdict.failures {
        println!("    {}", failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Keyword;
    use crate::summary::{evaluate, Failure};

    fn sample_hit() -> Hit {
        let mut hit = Hit::new(
            "src/app.py",
            3,
            [Keyword::Fixme].into_iter().collect(),
            vec!["x = 1".to_string(), "# FIXME leak | close it #bug".to_string()],
            1,
        )
        .unwrap();
        hit.structured_title = Some("leak".to_string());
        hit.structured_body = Some("close it #bug".to_string());
        hit.structured_labels = Some(["bug".to_string()].into_iter().collect());
        hit
    }

    #[test]
    fn test_build_json() {
        let hits = vec![sample_hit()];
        let stats = RunStats {
            files_scanned: 1,
            hits: 1,
            fixmes: 1,
            ..Default::default()
        };
        let verdict = evaluate(&stats, false, false);
        let report = RunReport {
            path: ".",
            mode: Mode::Issue,
            hits: &hits,
            decisions: &[Decision::Filed],
            stats: &stats,
            verdict: &verdict,
        };

        let json = build_json(&report);
        assert!(!json.passed);
        assert_eq!(json.mode, "issue");
        assert_eq!(json.failures, vec![Failure::HitsFound(1).to_string()]);
        assert_eq!(json.summary.fixmes, 1);

        let hit = &json.hits[0];
        assert_eq!(hit.file, "src/app.py");
        assert_eq!(hit.keywords, vec!["fixme"]);
        assert_eq!(hit.title, "leak");
        assert_eq!(hit.labels, vec!["bug"]);
        assert_eq!(hit.trigger_index, 1);
        assert_eq!(hit.decision.as_deref(), Some("filed"));
        assert_eq!(hit.fingerprint, crate::reconcile::fingerprint("leak"));
    }

    #[test]
    fn test_json_omits_missing_decisions() {
        let hits = vec![sample_hit(), sample_hit()];
        let stats = RunStats::default();
        let verdict = Verdict::default();
        let report = RunReport {
            path: ".",
            mode: Mode::Print,
            hits: &hits,
            decisions: &[],
            stats: &stats,
            verdict: &verdict,
        };

        let value = serde_json::to_value(build_json(&report)).unwrap();
        assert_eq!(value["passed"], serde_json::json!(true));
        assert!(value.get("failures").is_none());
        assert!(value["hits"][0].get("decision").is_none());
    }
}
