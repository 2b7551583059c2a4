//! Command-line interface for todoon.

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::{self, Config};
use crate::reconcile::{Decision, Inventory, ReconcileError, Reconciler};
use crate::report::{self, RunReport};
use crate::scan::{self, IgnoreRules, ScanError, Scanner};
use crate::summary::{self, Mode};
use crate::tracker::{
    token_from_env, DryRunTracker, GitHubTracker, IssueTracker, RepoIdentity,
};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Find TODO and FIXME directives and keep them tracked as issues.
///
/// todoon scans a source tree for TODO/FIXME comments. In print mode it
/// lists them and fails the build if any exist; in issue mode it files each
/// new one as a GitHub issue, skipping those already filed.
#[derive(Parser)]
#[command(name = "todoon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print the summary
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print nothing at all
    #[arg(short = 'Q', long, global = true)]
    pub very_quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// How much the CLI prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLevel {
    Full,
    SummaryOnly,
    Nothing,
}

impl Cli {
    pub fn output_level(&self) -> OutputLevel {
        if self.very_quiet {
            OutputLevel::Nothing
        } else if self.quiet {
            OutputLevel::SummaryOnly
        } else {
            OutputLevel::Full
        }
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        match self.output_level() {
            OutputLevel::Nothing => "off",
            OutputLevel::SummaryOnly => "error",
            OutputLevel::Full => match self.verbose {
                0 => "warn",
                1 => "debug",
                _ => "trace",
            },
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan for directives and report or file them
    #[command(visible_alias = "scan")]
    Check(CheckArgs),
    /// Create or extend the ignore file
    Ignore(IgnoreArgs),
}

/// Arguments for the check command.
#[derive(Parser)]
pub struct CheckArgs {
    /// Only scan these files or directories (the ignore file is not used)
    pub files: Vec<PathBuf>,

    /// Project root; paths in reports are relative to it
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// File new directives as issues instead of printing them
    #[arg(short, long)]
    pub issue: bool,

    /// Do not fail when directives are found
    #[arg(short, long)]
    pub silent: bool,

    /// Fail when a directive matches a closed issue, even with --silent
    #[arg(short = 'c', long)]
    pub closed_duplicates_fail: bool,

    /// Run without an ignore file (not recommended)
    #[arg(short, long)]
    pub force: bool,

    /// Path to config YAML file (default: auto-discover)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(long, default_value = "pretty")]
    pub format: String,

    /// Maximum new issues per run
    #[arg(long)]
    pub max_issues: Option<usize>,

    /// Lines of context to capture before and after each directive
    #[arg(long)]
    pub context_limit: Option<usize>,

    /// Show a progress bar while scanning
    #[arg(short = 'P', long)]
    pub progress_bar: bool,

    /// Append TODOON_* counters to the file named by $GITHUB_ENV
    #[arg(long)]
    pub github_env: bool,

    /// Log issue payloads instead of filing them
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the ignore command.
#[derive(Parser)]
pub struct IgnoreArgs {
    /// Entries to add, or files to copy entries from with --paths
    pub sources: Vec<String>,

    /// Treat SOURCES as files whose lines become entries (e.g. .gitignore)
    #[arg(short, long)]
    pub paths: bool,

    /// Append to an existing ignore file instead of creating a new one
    #[arg(short, long)]
    pub update: bool,

    /// Ignore file to write
    #[arg(short, long, default_value = config::DEFAULT_IGNORE_FILE)]
    pub output: PathBuf,
}

/// Load and validate the config, then apply environment and CLI overrides.
fn load_config(root: &Path, args: &CheckArgs) -> anyhow::Result<Config> {
    let mut config = Config::discover(root, args.config.as_deref())?;
    config.apply_env();

    if let Some(limit) = args.context_limit {
        config.context_limit = limit;
    }
    if let Some(max) = args.max_issues {
        config.max_issues = max;
    }
    if args.closed_duplicates_fail {
        config.fail_closed_duplicates = true;
    }
    if args.dry_run {
        config.dry_run = true;
    }

    config::validate(&config).context("invalid configuration")?;
    Ok(config)
}

/// Resolve the files to scan.
fn collect_targets(root: &Path, args: &CheckArgs, config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    if !args.files.is_empty() {
        return Ok(scan::expand_targets(root, &args.files, &config.ignore_file));
    }

    let mut patterns = config.excluded_paths.clone();
    if args.force {
        warn!("--force: running without {}", config.ignore_file);
    } else {
        let ignore_path = root.join(&config.ignore_file);
        let entries = scan::read_ignore_file(&ignore_path)?
            .ok_or(ScanError::MissingIgnoreFile(ignore_path))?;
        if entries.is_empty() {
            warn!("{} lists nothing; scanning everything", config.ignore_file);
        }
        patterns.extend(entries);
    }

    let rules = IgnoreRules::from_patterns(&config.ignore_file, &patterns)?;
    debug!(patterns = rules.pattern_count(), "compiled ignore rules");
    Ok(scan::collect_files(root, &rules))
}

/// Build the tracker for issue mode. `None` means issues cannot be filed.
fn build_tracker(config: &Config) -> Option<Box<dyn IssueTracker>> {
    let identity = RepoIdentity::from_env();

    if config.dry_run {
        let identity =
            identity.unwrap_or_else(|_| RepoIdentity::new("local", "repository", "HEAD"));
        return Some(Box::new(DryRunTracker::new(identity)));
    }

    let identity = match identity {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %e, "issues cannot be filed");
            return None;
        }
    };
    let token = token_from_env();
    if token.is_none() {
        warn!("no GITHUB_TOKEN or GH_TOKEN set; filing issues will likely fail");
    }
    match GitHubTracker::new(identity, token.as_deref(), &config.tracker) {
        Ok(tracker) => Some(Box::new(tracker)),
        Err(e) => {
            warn!(error = %e, "could not create GitHub client");
            None
        }
    }
}

/// Run the check command.
pub fn run_check(args: &CheckArgs, output: OutputLevel) -> anyhow::Result<i32> {
    // Validate format
    if args.format != "pretty" && args.format != "json" {
        anyhow::bail!("invalid format {:?}, must be 'pretty' or 'json'", args.format);
    }

    let root = args
        .root
        .canonicalize()
        .with_context(|| format!("cannot access root {}", args.root.display()))?;

    let config = load_config(&root, args)?;
    let mode = if args.issue { Mode::Issue } else { Mode::Print };
    if mode == Mode::Print && config.fail_closed_duplicates {
        warn!("closed-duplicate checks only apply in issue mode");
    }

    let files = collect_targets(&root, args, &config)?;
    if files.is_empty() {
        warn!("no files to scan");
    }

    // Scan
    let scanner = Scanner::from_config(&root, &config)
        .show_progress(args.progress_bar && output == OutputLevel::Full);
    let result = scanner.run(&files);
    let mut stats = result.stats.clone();

    // Reconcile
    let mut decisions: Vec<Decision> = Vec::new();
    let mut fatal: Option<ReconcileError> = None;
    if mode == Mode::Issue {
        let tracker = build_tracker(&config);
        let inventory = tracker
            .as_deref()
            .map(Inventory::fetch)
            .unwrap_or_default();

        let mut reconciler = Reconciler::new(tracker.as_deref(), inventory, config.max_issues);
        for hit in &result.hits {
            match reconciler.reconcile(hit, &mut stats) {
                Ok(decision) => decisions.push(decision),
                Err(e) => {
                    fatal = Some(e);
                    break;
                }
            }
        }
    }

    let verdict = summary::evaluate(&stats, args.silent, config.fail_closed_duplicates);

    if args.github_env {
        match std::env::var_os("GITHUB_ENV") {
            Some(path) => {
                if let Err(e) = stats.write_github_env(Path::new(&path)) {
                    warn!(error = %e, "could not write GITHUB_ENV");
                }
            }
            None => warn!("--github-env given but GITHUB_ENV is not set"),
        }
    }

    // Output results
    if output != OutputLevel::Nothing {
        let path_str = root.to_string_lossy().to_string();
        let report = RunReport {
            path: &path_str,
            mode,
            hits: &result.hits,
            decisions: &decisions,
            stats: &stats,
            verdict: &verdict,
        };
        match args.format.as_str() {
            "json" => report::write_json(&report)?,
            _ => report::write_pretty(&report, output == OutputLevel::SummaryOnly),
        }
    }

    if let Some(e) = fatal {
        return Err(e.into());
    }

    // Return appropriate exit code
    if verdict.passed() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the ignore command.
pub fn run_ignore(args: &IgnoreArgs, output: OutputLevel) -> anyhow::Result<i32> {
    let mut entries: Vec<String> = Vec::new();

    if args.paths {
        for source in &args.sources {
            match std::fs::read_to_string(source) {
                Ok(content) => entries.extend(
                    content
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(str::to_string),
                ),
                Err(e) => warn!(file = %source, error = %e, "skipping source"),
            }
        }
    } else {
        entries.extend(args.sources.iter().cloned());
    }

    scan::write_ignore_file(&args.output, &entries, args.update)?;

    if output != OutputLevel::Nothing {
        let verb = if args.update { "Updated" } else { "Created" };
        println!("{} {} ({} entries)", verb, args.output.display(), entries.len());
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_flags() {
        let cli = Cli::parse_from([
            "todoon", "check", "-i", "-s", "-c", "--max-issues", "3", "src", "lib.rs",
        ]);
        assert_eq!(cli.output_level(), OutputLevel::Full);
        let Commands::Check(args) = cli.command else {
            panic!("expected check");
        };
        assert!(args.issue);
        assert!(args.silent);
        assert!(args.closed_duplicates_fail);
        assert_eq!(args.max_issues, Some(3));
        assert_eq!(args.files, vec![PathBuf::from("src"), PathBuf::from("lib.rs")]);
    }

    #[test]
    fn test_scan_alias_and_quiet_levels() {
        let cli = Cli::parse_from(["todoon", "scan", "-q"]);
        assert!(matches!(cli.command, Commands::Check(_)));
        assert_eq!(cli.output_level(), OutputLevel::SummaryOnly);
        assert_eq!(cli.log_level(), "error");

        let cli = Cli::parse_from(["todoon", "-Q", "-v", "check"]);
        assert_eq!(cli.output_level(), OutputLevel::Nothing);
        assert_eq!(cli.log_level(), "off");

        let cli = Cli::parse_from(["todoon", "check", "-vv"]);
        assert_eq!(cli.log_level(), "trace");
    }

    #[test]
    fn test_parse_ignore_flags() {
        let cli = Cli::parse_from(["todoon", "ignore", "-p", "-u", ".gitignore"]);
        let Commands::Ignore(args) = cli.command else {
            panic!("expected ignore");
        };
        assert!(args.paths);
        assert!(args.update);
        assert_eq!(args.output, PathBuf::from(".todo-ignore"));
        assert_eq!(args.sources, vec![".gitignore"]);
    }
}
