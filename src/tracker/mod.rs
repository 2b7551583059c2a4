//! Issue tracker clients.
//!
//! The reconciler talks to a tracker through [`IssueTracker`]: one call to
//! list every issue the bot has filed (open and closed), one call per new
//! issue. Two implementations exist:
//! - GitHub REST API
//! - Dry run (logs payloads, files nothing)

mod dry_run;
mod github;

pub use dry_run::DryRunTracker;
pub use github::{token_from_env, GitHubTracker};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default server used to build reference links.
pub const DEFAULT_SERVER_URL: &str = "https://github.com";

/// Errors that can occur while talking to a tracker.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("rate limited by tracker")]
    RateLimited,
    #[error("tracker returned HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("repository identity incomplete: {0} is not set")]
    MissingIdentity(&'static str),
    #[error("token contains characters not allowed in a header")]
    InvalidToken,
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// State of an existing issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

impl std::fmt::Display for IssueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueState::Open => write!(f, "open"),
            IssueState::Closed => write!(f, "closed"),
        }
    }
}

/// A previously filed issue, as far as deduplication cares.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExistingIssue {
    pub title: String,
    pub state: IssueState,
}

/// Body of a create-issue request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuePayload {
    pub title: String,
    pub body: String,
    pub assignees: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

/// Where issues are filed and what reference links point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoIdentity {
    pub owner: String,
    pub repo: String,
    /// Branch or tag used in reference links
    pub git_ref: String,
    /// User assigned to new issues
    pub actor: Option<String>,
    pub server_url: String,
}

impl RepoIdentity {
    pub fn new(owner: &str, repo: &str, git_ref: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            git_ref: git_ref.to_string(),
            actor: None,
            server_url: DEFAULT_SERVER_URL.to_string(),
        }
    }

    pub fn with_actor(mut self, actor: &str) -> Self {
        self.actor = Some(actor.to_string());
        self
    }

    /// Read the identity from the GitHub Actions environment.
    pub fn from_env() -> Result<Self, TrackerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the identity from an arbitrary variable lookup.
    ///
    /// `GITHUB_REPOSITORY` (`owner/repo`) and `GITHUB_REF_NAME` are required;
    /// `GITHUB_TRIGGERING_ACTOR` and `GITHUB_SERVER_URL` are optional.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TrackerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let repository =
            non_empty("GITHUB_REPOSITORY").ok_or(TrackerError::MissingIdentity("GITHUB_REPOSITORY"))?;
        let (owner, repo) = repository
            .split_once('/')
            .filter(|(o, r)| !o.is_empty() && !r.is_empty())
            .ok_or(TrackerError::MissingIdentity("GITHUB_REPOSITORY"))?;
        let git_ref =
            non_empty("GITHUB_REF_NAME").ok_or(TrackerError::MissingIdentity("GITHUB_REF_NAME"))?;

        let mut identity = Self::new(owner, repo, &git_ref);
        identity.actor = non_empty("GITHUB_TRIGGERING_ACTOR");
        if let Some(server) = non_empty("GITHUB_SERVER_URL") {
            identity.server_url = server.trim_end_matches('/').to_string();
        }
        Ok(identity)
    }

    /// `owner/repo`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    pub fn repository_url(&self) -> String {
        format!("{}/{}/{}", self.server_url, self.owner, self.repo)
    }

    /// Link to a file at the identity's ref.
    pub fn blob_url(&self, file: &str) -> String {
        format!("{}/blob/{}/{}", self.repository_url(), self.git_ref, file)
    }
}

/// A remote issue tracker.
///
/// Calls are blocking; implementations own whatever runtime they need.
pub trait IssueTracker: Send + Sync {
    /// The repository issues are filed against.
    fn identity(&self) -> &RepoIdentity;

    /// Every issue previously filed by this tool, open and closed.
    fn list_issues(&self) -> Result<Vec<ExistingIssue>, TrackerError>;

    /// File a new issue.
    fn create_issue(&self, payload: &IssuePayload) -> Result<(), TrackerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_identity_from_lookup() {
        let identity = RepoIdentity::from_lookup(lookup(&[
            ("GITHUB_REPOSITORY", "acme/widgets"),
            ("GITHUB_REF_NAME", "main"),
            ("GITHUB_TRIGGERING_ACTOR", "octocat"),
        ]))
        .unwrap();

        assert_eq!(identity.slug(), "acme/widgets");
        assert_eq!(identity.actor.as_deref(), Some("octocat"));
        assert_eq!(
            identity.blob_url("src/lib.rs"),
            "https://github.com/acme/widgets/blob/main/src/lib.rs"
        );
    }

    #[test]
    fn test_identity_requires_repository_and_ref() {
        let err = RepoIdentity::from_lookup(lookup(&[("GITHUB_REF_NAME", "main")])).unwrap_err();
        assert!(matches!(err, TrackerError::MissingIdentity("GITHUB_REPOSITORY")));

        let err = RepoIdentity::from_lookup(lookup(&[
            ("GITHUB_REPOSITORY", "no-slash"),
            ("GITHUB_REF_NAME", "main"),
        ]))
        .unwrap_err();
        assert!(matches!(err, TrackerError::MissingIdentity("GITHUB_REPOSITORY")));

        let err =
            RepoIdentity::from_lookup(lookup(&[("GITHUB_REPOSITORY", "a/b")])).unwrap_err();
        assert!(matches!(err, TrackerError::MissingIdentity("GITHUB_REF_NAME")));
    }

    #[test]
    fn test_custom_server_url() {
        let identity = RepoIdentity::from_lookup(lookup(&[
            ("GITHUB_REPOSITORY", "a/b"),
            ("GITHUB_REF_NAME", "dev"),
            ("GITHUB_SERVER_URL", "https://git.example.com/"),
        ]))
        .unwrap();
        assert_eq!(identity.repository_url(), "https://git.example.com/a/b");
        assert!(identity.actor.is_none());
    }

    #[test]
    fn test_payload_omits_empty_labels() {
        let payload = IssuePayload {
            title: "t".to_string(),
            body: "b".to_string(),
            assignees: vec![],
            labels: vec![],
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("labels").is_none());
        assert_eq!(json["assignees"], serde_json::json!([]));
    }
}
