//! Tracker that files nothing.

use std::sync::Mutex;
use tracing::info;

use super::{ExistingIssue, IssuePayload, IssueTracker, RepoIdentity, TrackerError};

/// Logs each payload instead of filing it and reports an empty inventory.
///
/// Payloads are kept so callers (and tests) can inspect what would have been
/// filed.
pub struct DryRunTracker {
    identity: RepoIdentity,
    existing: Vec<ExistingIssue>,
    filed: Mutex<Vec<IssuePayload>>,
}

impl DryRunTracker {
    pub fn new(identity: RepoIdentity) -> Self {
        Self {
            identity,
            existing: Vec::new(),
            filed: Mutex::new(Vec::new()),
        }
    }

    /// Seed the inventory this tracker reports.
    pub fn with_existing(mut self, existing: Vec<ExistingIssue>) -> Self {
        self.existing = existing;
        self
    }

    /// Payloads received so far, in order.
    pub fn filed(&self) -> Vec<IssuePayload> {
        match self.filed.lock() {
            Ok(filed) => filed.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl IssueTracker for DryRunTracker {
    fn identity(&self) -> &RepoIdentity {
        &self.identity
    }

    fn list_issues(&self) -> Result<Vec<ExistingIssue>, TrackerError> {
        Ok(self.existing.clone())
    }

    fn create_issue(&self, payload: &IssuePayload) -> Result<(), TrackerError> {
        info!(
            repo = %self.identity.slug(),
            title = %payload.title,
            labels = ?payload.labels,
            "dry run: would file issue"
        );
        match self.filed.lock() {
            Ok(mut filed) => filed.push(payload.clone()),
            Err(poisoned) => poisoned.into_inner().push(payload.clone()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::IssueState;

    #[test]
    fn test_records_payloads() {
        let tracker = DryRunTracker::new(RepoIdentity::new("a", "b", "main"));
        assert!(tracker.list_issues().unwrap().is_empty());

        let payload = IssuePayload {
            title: "TODO - x".to_string(),
            body: String::new(),
            assignees: vec![],
            labels: vec![],
        };
        tracker.create_issue(&payload).unwrap();
        tracker.create_issue(&payload).unwrap();
        assert_eq!(tracker.filed().len(), 2);
    }

    #[test]
    fn test_seeded_inventory() {
        let tracker = DryRunTracker::new(RepoIdentity::new("a", "b", "main")).with_existing(vec![
            ExistingIssue {
                title: "old".to_string(),
                state: IssueState::Closed,
            },
        ]);
        assert_eq!(tracker.list_issues().unwrap().len(), 1);
    }
}
