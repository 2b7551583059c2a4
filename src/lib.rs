//! todoon - TODO/FIXME gate and issue filer.
//!
//! todoon scans source trees for directive comments (`TODO`, `FIXME`),
//! extracts structured metadata from them, and reconciles them against the
//! issues it filed before so each directive is reported once.
//!
//! # Architecture
//!
//! - `grammar`: comment syntax table and the per-language directive grammar
//! - `scan`: file discovery, decoding, context windows, and the hit model
//! - `reconcile`: fingerprinting and the open/closed duplicate protocol
//! - `tracker`: GitHub and dry-run issue trackers
//! - `config`: YAML configuration with environment overrides
//! - `summary`: run counters and the pass/fail gate
//! - `report`: Output formatting (pretty, JSON)
//!
//! # Adding a New Language
//!
//! Add a [`grammar::Language`] entry to `LANGUAGES` in
//! `src/grammar/languages.rs` and map its extensions in `EXTENSIONS`.

pub mod cli;
pub mod config;
pub mod grammar;
pub mod reconcile;
pub mod report;
pub mod scan;
pub mod summary;
pub mod tracker;

pub use config::Config;
pub use grammar::{resolve_language, Directive, Grammar, GrammarCache, Keyword, Language};
pub use reconcile::{fingerprint, Classification, Decision, Inventory, ReconcileError, Reconciler};
pub use scan::{Hit, ScanError, ScanResult, Scanner};
pub use summary::{evaluate, Mode, RunStats, Verdict};
pub use tracker::{DryRunTracker, GitHubTracker, IssueTracker, RepoIdentity, TrackerError};
