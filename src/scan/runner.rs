//! Scan driver: turns a list of files into sorted hits and counters.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::Config;
use crate::grammar::GrammarCache;

use super::context::{extract_window, DEFAULT_CONTEXT_LIMIT};
use super::encoding::decode;
use super::{Hit, ScanError, ScanResult};

/// Default token that exempts a line from scanning. Prose that merely
/// mentions the tool, e.g. `// TODO: bump todoon`, is still scanned.
pub const DEFAULT_IGNORE_FLAG: &str = "# todoon";

/// Scans files for directives.
///
/// Files are processed in parallel; the grammar cache is shared between
/// threads so each language's grammar is built once per scanner.
pub struct Scanner {
    base_dir: PathBuf,
    context_limit: usize,
    /// Lowercased ignore flag; empty disables it
    ignore_flag: String,
    show_progress: bool,
    grammars: GrammarCache,
}

impl Scanner {
    /// Create a scanner that reports paths relative to `base_dir`.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            context_limit: DEFAULT_CONTEXT_LIMIT,
            ignore_flag: DEFAULT_IGNORE_FLAG.to_string(),
            show_progress: false,
            grammars: GrammarCache::new(),
        }
    }

    /// Create a scanner with the limits from a config.
    pub fn from_config<P: AsRef<Path>>(base_dir: P, config: &Config) -> Self {
        Self::new(base_dir)
            .context_limit(config.context_limit)
            .ignore_flag(&config.ignore_flag)
    }

    /// Set how many lines to look back and ahead of each trigger.
    pub fn context_limit(mut self, limit: usize) -> Self {
        self.context_limit = limit;
        self
    }

    /// Set the token that exempts a line. Matched case-insensitively.
    pub fn ignore_flag(mut self, flag: &str) -> Self {
        self.ignore_flag = flag.to_lowercase();
        self
    }

    /// Set whether to draw a progress bar on stderr.
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Scan decoded text. `relative` is the path recorded on each hit.
    pub fn scan_source(&self, relative: &str, extension: &str, text: &str) -> Vec<Hit> {
        let grammar = self.grammars.for_extension(extension);
        let lines: Vec<&str> = text.lines().collect();
        let mut hits = Vec::new();

        for (index, line) in lines.iter().enumerate() {
            if self.is_exempt(line) {
                continue;
            }
            let Some(directive) = grammar.parse_line(line) else {
                continue;
            };

            let source_line = index + 1;
            let mut hit = match Hit::from_directive(relative, source_line, directive) {
                Ok(hit) => hit,
                Err(e) => {
                    debug!(file = relative, line = source_line, error = %e, "dropping directive");
                    continue;
                }
            };
            if let Some(window) = extract_window(&lines, source_line, self.context_limit) {
                hit.attach_context(window);
            }
            hits.push(hit);
        }

        hits
    }

    /// Read, decode and scan one file.
    pub fn scan_file(&self, path: &Path) -> Result<Vec<Hit>, ScanError> {
        let bytes = std::fs::read(path).map_err(|e| ScanError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let (text, encoding) =
            decode(&bytes).ok_or_else(|| ScanError::UnsupportedEncoding(path.to_path_buf()))?;

        let relative = self.relative_path(path);
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let hits = self.scan_source(&relative, extension, &text);

        debug!(file = %relative, %encoding, hits = hits.len(), "scanned");
        Ok(hits)
    }

    /// Scan every file and collect the results.
    ///
    /// Unreadable and undecodable files are counted and skipped. Hits come
    /// back sorted by file and line regardless of scheduling.
    pub fn run(&self, files: &[PathBuf]) -> ScanResult {
        let progress = self.progress_bar(files.len());

        let outcomes: Vec<Result<Vec<Hit>, ScanError>> = files
            .par_iter()
            .map(|file| {
                let outcome = self.scan_file(file);
                progress.inc(1);
                outcome
            })
            .collect();
        progress.finish_and_clear();

        let mut result = ScanResult::new();
        result.stats.files_scanned = files.len();

        for outcome in outcomes {
            match outcome {
                Ok(hits) => {
                    for hit in hits {
                        result.stats.record_hit(&hit);
                        result.hits.push(hit);
                    }
                }
                Err(ScanError::UnsupportedEncoding(path)) => {
                    debug!(file = %path.display(), "skipping file in unsupported encoding");
                    result.stats.encoding_failures += 1;
                }
                Err(e) => {
                    warn!(error = %e, "skipping file");
                    result.stats.read_failures += 1;
                }
            }
        }

        result.hits.sort_by(|a, b| {
            a.source_file()
                .cmp(b.source_file())
                .then(a.source_line().cmp(&b.source_line()))
        });
        result
    }

    fn is_exempt(&self, line: &str) -> bool {
        !self.ignore_flag.is_empty() && line.to_lowercase().contains(&self.ignore_flag)
    }

    fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.base_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar
    }
}
