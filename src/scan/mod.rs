//! Finding directives in files.
//!
//! The pipeline per file is decode, resolve the language, parse each line
//! with the cached grammar, then attach a context window to every hit.

mod context;
mod encoding;
mod files;
mod hit;
mod runner;
mod types;

pub use context::{extract_window, ContextWindow, DEFAULT_CONTEXT_LIMIT};
pub use encoding::{decode, TextEncoding};
pub use files::{
    collect_files, expand_targets, parse_ignore_entries, read_ignore_file,
    render_ignore_entries, write_ignore_file, IgnoreRules,
};
pub use hit::{sanitize_mentions, Hit, InvalidHit};
pub use runner::{Scanner, DEFAULT_IGNORE_FLAG};
pub use types::{ScanError, ScanResult};
