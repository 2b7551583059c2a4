//! GitHub REST API tracker.
//!
//! Lists issues via: GET {api}/repos/{owner}/{repo}/issues?state=all
//! Files issues via: POST {api}/repos/{owner}/{repo}/issues

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;

use crate::config::TrackerConfig;

use super::{ExistingIssue, IssuePayload, IssueState, IssueTracker, RepoIdentity, TrackerError};

const PER_PAGE: usize = 100;

/// Hard stop on pagination.
const MAX_PAGES: usize = 50;

const API_VERSION: &str = "2022-11-28";

/// Read a token from `GITHUB_TOKEN`, then `GH_TOKEN`.
pub fn token_from_env() -> Option<String> {
    ["GITHUB_TOKEN", "GH_TOKEN"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|token| !token.trim().is_empty())
}

/// Issue listing entry; pull requests share the endpoint and are dropped.
#[derive(Debug, Deserialize)]
struct RawIssue {
    title: String,
    state: IssueState,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

/// Blocking GitHub client.
pub struct GitHubTracker {
    http: Client,
    runtime: Runtime,
    identity: RepoIdentity,
    api_url: String,
    timeout: Duration,
    creator: Option<String>,
}

impl GitHubTracker {
    /// Create a client for `identity`. Requests are authenticated when a
    /// token is given.
    pub fn new(
        identity: RepoIdentity,
        token: Option<&str>,
        config: &TrackerConfig,
    ) -> Result<Self, TrackerError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| TrackerError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .user_agent(concat!("todoon/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(TrackerError::Runtime)?;

        Ok(Self {
            http,
            runtime,
            identity,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(config.timeout_ms),
            creator: config.creator.clone(),
        })
    }

    fn issues_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/issues",
            self.api_url, self.identity.owner, self.identity.repo
        )
    }

    async fn fetch_page(&self, page: usize) -> Result<Vec<RawIssue>, TrackerError> {
        let mut query = vec![
            ("state", "all".to_string()),
            ("per_page", PER_PAGE.to_string()),
            ("page", page.to_string()),
        ];
        if let Some(creator) = &self.creator {
            query.push(("creator", creator.clone()));
        }

        let request = self.http.get(self.issues_url()).query(&query);
        let response = send(request, self.timeout).await?;
        let issues = response.json::<Vec<RawIssue>>().await.map_err(map_transport)?;
        Ok(issues)
    }

    async fn list_all(&self) -> Result<Vec<ExistingIssue>, TrackerError> {
        let mut issues = Vec::new();

        for page in 1..=MAX_PAGES {
            let batch = self.fetch_page(page).await?;
            let count = batch.len();
            issues.extend(
                batch
                    .into_iter()
                    .filter(|raw| raw.pull_request.is_none())
                    .map(|raw| ExistingIssue {
                        title: raw.title,
                        state: raw.state,
                    }),
            );
            if count < PER_PAGE {
                break;
            }
        }

        debug!(repo = %self.identity.slug(), count = issues.len(), "fetched issue inventory");
        Ok(issues)
    }

    async fn create(&self, payload: &IssuePayload) -> Result<(), TrackerError> {
        let request = self.http.post(self.issues_url()).json(payload);
        send(request, self.timeout).await?;
        Ok(())
    }
}

impl IssueTracker for GitHubTracker {
    fn identity(&self) -> &RepoIdentity {
        &self.identity
    }

    fn list_issues(&self) -> Result<Vec<ExistingIssue>, TrackerError> {
        self.runtime.block_on(self.list_all())
    }

    fn create_issue(&self, payload: &IssuePayload) -> Result<(), TrackerError> {
        self.runtime.block_on(self.create(payload))
    }
}

async fn send(request: RequestBuilder, timeout: Duration) -> Result<Response, TrackerError> {
    let response = request.timeout(timeout).send().await.map_err(map_transport)?;
    check_status(response).await
}

fn map_transport(e: reqwest::Error) -> TrackerError {
    if e.is_timeout() {
        TrackerError::Timeout
    } else {
        TrackerError::Network(e)
    }
}

async fn check_status(response: Response) -> Result<Response, TrackerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && remaining_quota(&response) == Some(0));
    if rate_limited {
        return Err(TrackerError::RateLimited);
    }

    let message = response.text().await.unwrap_or_default();
    Err(TrackerError::Http {
        status: status.as_u16(),
        message: truncate(&message, 200),
    })
}

fn remaining_quota(response: &Response) -> Option<u64> {
    response
        .headers()
        .get("x-ratelimit-remaining")?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issues_url() {
        let config = TrackerConfig {
            api_url: "https://api.github.com/".to_string(),
            ..Default::default()
        };
        let tracker =
            GitHubTracker::new(RepoIdentity::new("acme", "widgets", "main"), None, &config)
                .unwrap();
        assert_eq!(
            tracker.issues_url(),
            "https://api.github.com/repos/acme/widgets/issues"
        );
        assert_eq!(tracker.identity().git_ref, "main");
    }

    #[test]
    fn test_raw_issue_parsing_skips_pull_requests() {
        let json = r#"[
            {"title": "a", "state": "open"},
            {"title": "b", "state": "closed", "pull_request": {"url": "x"}},
            {"title": "c", "state": "closed", "pull_request": null}
        ]"#;
        let raw: Vec<RawIssue> = serde_json::from_str(json).unwrap();
        let kept: Vec<&str> = raw
            .iter()
            .filter(|r| r.pull_request.is_none())
            .map(|r| r.title.as_str())
            .collect();
        assert_eq!(kept, vec!["a", "c"]);
        assert_eq!(raw[2].state, IssueState::Closed);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }

    #[test]
    fn test_unreachable_api_is_an_error() {
        let config = TrackerConfig {
            api_url: "http://127.0.0.1:1".to_string(),
            timeout_ms: 500,
            ..Default::default()
        };
        let tracker =
            GitHubTracker::new(RepoIdentity::new("a", "b", "main"), Some("t"), &config).unwrap();
        let err = tracker.list_issues().unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Network(_) | TrackerError::Timeout
        ));
    }
}
