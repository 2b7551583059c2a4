//! Deduplication against previously filed issues.
//!
//! Every hit is reduced to a fingerprint of its title and looked up in the
//! inventory of issues this tool filed before:
//! - not found: new, filed while the per-run cap allows
//! - found open: already tracked, skipped
//! - found closed: a regression, skipped and counted so the gate can fail
//!
//! Filing runs sequentially, so the cap is a hard limit for the whole run.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::scan::Hit;
use crate::summary::RunStats;
use crate::tracker::{ExistingIssue, IssueState, IssueTracker};

/// Default number of issues filed per run.
pub const DEFAULT_MAX_ISSUES: usize = 8;

/// Fatal reconciliation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("maximum of {max} new issue(s) per run reached; remaining directives were not filed")]
    IssueCapExceeded { max: usize },
}

/// SHA-256 hex digest of an issue title.
pub fn fingerprint(title: &str) -> String {
    hex::encode(Sha256::digest(title.as_bytes()))
}

/// How a hit relates to the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    New,
    DuplicateOpen,
    DuplicateClosed,
}

/// Fingerprints of previously filed issues and their states.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    entries: HashMap<String, IssueState>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a tracker listing. When the same title was filed more than
    /// once, an open issue takes precedence over closed ones.
    pub fn from_issues<'a, I>(issues: I) -> Self
    where
        I: IntoIterator<Item = &'a ExistingIssue>,
    {
        let mut entries = HashMap::new();
        for issue in issues {
            entries
                .entry(fingerprint(&issue.title))
                .and_modify(|state| {
                    if issue.state == IssueState::Open {
                        *state = IssueState::Open;
                    }
                })
                .or_insert(issue.state);
        }
        Self { entries }
    }

    /// Fetch the inventory, degrading to empty if the tracker is unreachable.
    pub fn fetch(tracker: &dyn IssueTracker) -> Self {
        match tracker.list_issues() {
            Ok(issues) => {
                let inventory = Self::from_issues(&issues);
                debug!(entries = inventory.len(), "built issue inventory");
                inventory
            }
            Err(e) => {
                warn!(error = %e, "could not read existing issues; duplicates will not be detected");
                Self::new()
            }
        }
    }

    pub fn classify(&self, fingerprint: &str) -> Classification {
        match self.entries.get(fingerprint) {
            None => Classification::New,
            Some(IssueState::Open) => Classification::DuplicateOpen,
            Some(IssueState::Closed) => Classification::DuplicateClosed,
        }
    }

    pub fn state(&self, fingerprint: &str) -> Option<IssueState> {
        self.entries.get(fingerprint).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What happened to a single hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Filed,
    /// The tracker rejected the issue
    FilingFailed,
    /// No tracker (repository identity missing)
    Skipped,
    DuplicateOpen,
    DuplicateClosed,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Filed => "filed",
            Decision::FilingFailed => "filing_failed",
            Decision::Skipped => "skipped",
            Decision::DuplicateOpen => "duplicate_open",
            Decision::DuplicateClosed => "duplicate_closed",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decides, per hit, whether to file, skip, or flag.
pub struct Reconciler<'a> {
    tracker: Option<&'a dyn IssueTracker>,
    inventory: Inventory,
    max_issues: usize,
    /// Fingerprints filed during this run
    filed: HashSet<String>,
}

impl<'a> Reconciler<'a> {
    pub fn new(tracker: Option<&'a dyn IssueTracker>, inventory: Inventory, max_issues: usize) -> Self {
        Self {
            tracker,
            inventory,
            max_issues,
            filed: HashSet::new(),
        }
    }

    pub fn filed_count(&self) -> usize {
        self.filed.len()
    }

    /// Classify a hit against the inventory and issues filed this run.
    pub fn classify(&self, hit: &Hit) -> Classification {
        let fp = hit.fingerprint();
        if self.filed.contains(&fp) {
            return Classification::DuplicateOpen;
        }
        self.inventory.classify(&fp)
    }

    /// Reconcile one hit, updating `stats`.
    ///
    /// Returns `IssueCapExceeded` when the hit is new but the run has already
    /// filed `max_issues` issues. Failed filings do not use up the cap.
    pub fn reconcile(&mut self, hit: &Hit, stats: &mut RunStats) -> Result<Decision, ReconcileError> {
        match self.classify(hit) {
            Classification::DuplicateOpen => {
                info!(hit = %hit, "duplicate issue avoided");
                stats.duplicates_avoided += 1;
                Ok(Decision::DuplicateOpen)
            }
            Classification::DuplicateClosed => {
                warn!(hit = %hit, "directive matches a closed issue");
                stats.duplicate_closed += 1;
                Ok(Decision::DuplicateClosed)
            }
            Classification::New => self.file(hit, stats),
        }
    }

    /// Reconcile hits in order, stopping at the first fatal error.
    pub fn reconcile_all(
        &mut self,
        hits: &[Hit],
        stats: &mut RunStats,
    ) -> Result<Vec<Decision>, ReconcileError> {
        hits.iter().map(|hit| self.reconcile(hit, stats)).collect()
    }

    fn file(&mut self, hit: &Hit, stats: &mut RunStats) -> Result<Decision, ReconcileError> {
        if self.filed.len() >= self.max_issues {
            return Err(ReconcileError::IssueCapExceeded {
                max: self.max_issues,
            });
        }

        let Some(tracker) = self.tracker else {
            warn!(hit = %hit, "repository identity missing; issue not filed");
            stats.issue_failures += 1;
            return Ok(Decision::Skipped);
        };

        let payload = hit.issue_payload(tracker.identity());
        match tracker.create_issue(&payload) {
            Ok(()) => {
                info!(title = %payload.title, "filed issue");
                self.filed.insert(hit.fingerprint());
                stats.issues_filed += 1;
                Ok(Decision::Filed)
            }
            Err(e) => {
                warn!(title = %payload.title, error = %e, "failed to file issue");
                stats.issue_failures += 1;
                Ok(Decision::FilingFailed)
            }
        }
    }
}
