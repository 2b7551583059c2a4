//! Scan target discovery and the ignore file.
//!
//! Entries in the ignore file are paths relative to the scan root: files,
//! directories, or glob patterns. Lines that are blank or start with `#` are
//! skipped.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::ScanError;

/// Read the entries of an ignore file.
///
/// Returns `None` when the file does not exist.
pub fn read_ignore_file(path: &Path) -> Result<Option<Vec<String>>, ScanError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ScanError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };
    let (text, _) = super::encoding::decode(&bytes)
        .ok_or_else(|| ScanError::UnsupportedEncoding(path.to_path_buf()))?;
    Ok(Some(parse_ignore_entries(&text)))
}

/// Extract the entries from ignore file text.
pub fn parse_ignore_entries(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .map(|line| line.trim().to_string())
        .collect()
}

/// Render entries for an ignore file, separating runs of entries that start
/// with different characters by a blank line.
pub fn render_ignore_entries<S: AsRef<str>>(entries: &[S]) -> String {
    let mut out = String::new();
    let mut previous: Option<char> = None;

    for entry in entries {
        let entry = entry.as_ref().trim();
        let Some(first) = entry.chars().next() else {
            continue;
        };
        if previous != Some(first) {
            out.push('\n');
        }
        previous = Some(first);
        out.push_str(entry);
        out.push('\n');
    }

    out
}

/// Create an ignore file, or append to it when `update` is set.
///
/// Creating fails if the file already exists.
pub fn write_ignore_file<S: AsRef<str>>(
    path: &Path,
    entries: &[S],
    update: bool,
) -> Result<(), ScanError> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    if update {
        options.create(true).append(true);
    } else {
        options.write(true).create_new(true);
    }

    let io_error = |e: std::io::Error| ScanError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let mut file = options.open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            ScanError::IgnoreFileExists(path.to_path_buf())
        } else {
            io_error(e)
        }
    })?;
    file.write_all(render_ignore_entries(entries).as_bytes())
        .map_err(io_error)
}

/// Compiled set of paths excluded from a walk.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    globs: GlobSet,
    /// Name of the ignore file, always skipped
    ignore_file: String,
    pattern_count: usize,
}

impl IgnoreRules {
    /// Rules that only skip the ignore file itself and `.git`.
    pub fn empty(ignore_file: &str) -> Self {
        Self {
            globs: GlobSet::empty(),
            ignore_file: ignore_file.to_string(),
            pattern_count: 0,
        }
    }

    /// Compile entries into rules.
    ///
    /// Each entry matches the path itself and everything below it.
    pub fn from_patterns<S: AsRef<str>>(
        ignore_file: &str,
        patterns: &[S],
    ) -> Result<Self, ScanError> {
        let mut builder = GlobSetBuilder::new();
        let mut pattern_count = 0;

        for raw in patterns {
            let pattern = normalize_entry(raw.as_ref());
            if pattern.is_empty() {
                continue;
            }
            for candidate in [pattern.clone(), format!("{}/**", pattern)] {
                let glob = Glob::new(&candidate).map_err(|e| ScanError::Pattern {
                    pattern: raw.as_ref().to_string(),
                    source: e,
                })?;
                builder.add(glob);
            }
            pattern_count += 1;
        }

        let globs = builder.build().map_err(|e| ScanError::Pattern {
            pattern: String::new(),
            source: e,
        })?;

        Ok(Self {
            globs,
            ignore_file: ignore_file.to_string(),
            pattern_count,
        })
    }

    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    /// Check a path relative to the scan root.
    pub fn is_ignored(&self, relative: &Path) -> bool {
        let mut components = relative.components();
        if let Some(first) = components.next() {
            if first.as_os_str() == ".git" {
                return true;
            }
        }
        if relative.as_os_str() == self.ignore_file.as_str() {
            return true;
        }
        let normalized = relative.to_string_lossy().replace('\\', "/");
        self.globs.is_match(normalized.as_str())
    }
}

fn normalize_entry(entry: &str) -> String {
    let entry = entry.trim().replace('\\', "/");
    let entry = entry.trim_start_matches("./").trim_start_matches('/');
    entry.trim_end_matches('/').to_string()
}

/// Walk `root` and collect every file not excluded by `rules`.
///
/// Unreadable directory entries are logged and skipped.
pub fn collect_files(root: &Path, rules: &IgnoreRules) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| match e.path().strip_prefix(root) {
            Ok(rel) if rel.as_os_str().is_empty() => true,
            Ok(rel) => !rules.is_ignored(rel),
            Err(_) => true,
        })
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    debug!(root = %root.display(), count = files.len(), "collected scan targets");
    files
}

/// Expand explicit targets: files are kept as given, directories are walked
/// without consulting the ignore file.
pub fn expand_targets(root: &Path, targets: &[PathBuf], ignore_file: &str) -> Vec<PathBuf> {
    let rules = IgnoreRules::empty(ignore_file);
    let mut files = Vec::new();

    for target in targets {
        let path = if target.is_absolute() {
            target.clone()
        } else {
            root.join(target)
        };
        if path.is_dir() {
            files.extend(collect_files(&path, &rules));
        } else {
            files.push(path);
        }
    }

    files
}
