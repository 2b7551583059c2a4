//! Run configuration.
//!
//! Settings come from three layers, later ones winning:
//! 1. `todoon.yaml` / `.todoon.yaml` in the scan root, or `--config`
//! 2. Environment (`PERTINENT_LINE_LIMIT`, `MAXIMUM_ISSUES_GENERATED`, `DEBUG`)
//! 3. Command-line flags
//!
//! The resulting [`Config`] is immutable for the rest of the run.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::reconcile::DEFAULT_MAX_ISSUES;
use crate::scan::{DEFAULT_CONTEXT_LIMIT, DEFAULT_IGNORE_FLAG};

/// File names probed, in order, when no config is given explicitly.
pub const CONFIG_FILE_NAMES: &[&str] = &["todoon.yaml", ".todoon.yaml"];

/// Default ignore file name.
pub const DEFAULT_IGNORE_FILE: &str = ".todo-ignore";

/// Default GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Issues created through a GitHub App show up with this creator.
pub const DEFAULT_CREATOR: &str = "app/todo-or-not";

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Lines to look back and ahead of each trigger
    pub context_limit: usize,
    /// New issues filed per run before aborting
    pub max_issues: usize,
    /// Fail when a directive matches a closed issue, even in silent mode
    pub fail_closed_duplicates: bool,
    /// Token that exempts a line from scanning
    pub ignore_flag: String,
    pub ignore_file: String,
    /// Extra glob patterns excluded from the walk
    pub excluded_paths: Vec<String>,
    /// Log payloads instead of filing issues
    pub dry_run: bool,
    pub tracker: TrackerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            context_limit: DEFAULT_CONTEXT_LIMIT,
            max_issues: DEFAULT_MAX_ISSUES,
            fail_closed_duplicates: false,
            ignore_flag: DEFAULT_IGNORE_FLAG.to_string(),
            ignore_file: DEFAULT_IGNORE_FILE.to_string(),
            excluded_paths: Vec::new(),
            dry_run: false,
            tracker: TrackerConfig::default(),
        }
    }
}

/// Issue tracker connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Only issues by this creator count as previously filed.
    ///
    /// The default matches issues filed through the todo-or-not GitHub App.
    /// Issues filed with the workflow's `GITHUB_TOKEN` are created by
    /// `github-actions[bot]` instead, so set `creator: "github-actions[bot]"`
    /// (or `null` to consider every issue) or duplicates are never found.
    #[serde(default = "default_creator")]
    pub creator: Option<String>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_creator() -> Option<String> {
    Some(DEFAULT_CREATOR.to_string())
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_ms: default_timeout_ms(),
            creator: default_creator(),
        }
    }
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse_str(&content).map_err(|e| ConfigError::Yaml {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn parse_str(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file deserializes to unit, not an empty map
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Load the explicit config, or the first one found in `root`, or defaults.
    pub fn discover(root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::parse_file(path);
        }
        match find_config_file(root) {
            Some(path) => Self::parse_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("PERTINENT_LINE_LIMIT") {
            self.context_limit = parse_count("PERTINENT_LINE_LIMIT", &raw, DEFAULT_CONTEXT_LIMIT);
        }
        if let Some(raw) = lookup("MAXIMUM_ISSUES_GENERATED") {
            self.max_issues = parse_count("MAXIMUM_ISSUES_GENERATED", &raw, DEFAULT_MAX_ISSUES);
        }
        if let Some(raw) = lookup("DEBUG") {
            self.dry_run = is_truthy(&raw);
        }
    }
}

/// Find the first config file present in `root`.
pub fn find_config_file(root: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

/// Parse a non-negative count, falling back to `default` when unparseable.
fn parse_count(name: &str, raw: &str, default: usize) -> usize {
    match raw.trim().parse::<usize>() {
        Ok(value) => value,
        Err(_) => {
            warn!(
                variable = name,
                value = raw,
                fallback = default,
                "unparseable value, using default"
            );
            default
        }
    }
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "1"
    )
}

/// Check a config for values that cannot work.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.ignore_file.trim().is_empty() {
        return Err(ConfigError::Invalid("ignore_file must not be empty".to_string()));
    }
    if config.tracker.timeout_ms == 0 {
        return Err(ConfigError::Invalid(
            "tracker.timeout_ms must be greater than zero".to_string(),
        ));
    }
    let api_url = &config.tracker.api_url;
    if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
        return Err(ConfigError::Invalid(format!(
            "tracker.api_url {:?} is not an http(s) URL",
            api_url
        )));
    }

    // Validate excluded_paths glob patterns compile
    for pattern in &config.excluded_paths {
        globset::Glob::new(pattern).map_err(|e| {
            ConfigError::Invalid(format!("invalid excluded_paths pattern {:?}: {}", pattern, e))
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
context_limit: 4
max_issues: 2
fail_closed_duplicates: true
excluded_paths:
  - "vendor/**"
tracker:
  timeout_ms: 2500
"#;
        let config = Config::parse_str(yaml).unwrap();
        assert_eq!(config.context_limit, 4);
        assert_eq!(config.max_issues, 2);
        assert!(config.fail_closed_duplicates);
        assert_eq!(config.excluded_paths, vec!["vendor/**"]);
        assert_eq!(config.tracker.timeout_ms, 2500);
        assert_eq!(config.tracker.api_url, DEFAULT_API_URL);
        assert_eq!(config.ignore_flag, "# todoon");
        assert_eq!(config.ignore_file, ".todo-ignore");
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::parse_str("").unwrap(), Config::default());
        assert_eq!(Config::parse_str("\n  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_creator_for_workflow_token() {
        assert_eq!(Config::default().tracker.creator.as_deref(), Some(DEFAULT_CREATOR));
        let config = Config::parse_str("tracker:\n  creator: \"github-actions[bot]\"\n").unwrap();
        assert_eq!(config.tracker.creator.as_deref(), Some("github-actions[bot]"));
        assert_eq!(config.tracker.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_creator_can_be_disabled() {
        let config = Config::parse_str("tracker:\n  creator: null\n").unwrap();
        assert_eq!(config.tracker.creator, None);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_from(env(&[
            ("PERTINENT_LINE_LIMIT", "3"),
            ("MAXIMUM_ISSUES_GENERATED", "many"),
            ("DEBUG", "Yes"),
        ]));
        assert_eq!(config.context_limit, 3);
        assert_eq!(config.max_issues, 8);
        assert!(config.dry_run);

        config.apply_env_from(env(&[("DEBUG", "false")]));
        assert!(!config.dry_run);
    }

    #[test]
    fn test_discover() {
        let temp = TempDir::new().unwrap();
        assert_eq!(Config::discover(temp.path(), None).unwrap(), Config::default());

        std::fs::write(temp.path().join(".todoon.yaml"), "max_issues: 1\n").unwrap();
        assert_eq!(Config::discover(temp.path(), None).unwrap().max_issues, 1);

        std::fs::write(temp.path().join("todoon.yaml"), "max_issues: 5\n").unwrap();
        assert_eq!(Config::discover(temp.path(), None).unwrap().max_issues, 5);

        let missing = temp.path().join("nope.yaml");
        assert!(matches!(
            Config::discover(temp.path(), Some(&missing)),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_invalid_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("todoon.yaml");
        std::fs::write(&path, "max_issues: [unclosed\n").unwrap();
        assert!(matches!(Config::parse_file(&path), Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn test_validate() {
        assert!(validate(&Config::default()).is_ok());

        let bad_glob = Config {
            excluded_paths: vec!["src/[oops".to_string()],
            ..Default::default()
        };
        assert!(validate(&bad_glob).is_err());

        let mut bad_timeout = Config::default();
        bad_timeout.tracker.timeout_ms = 0;
        assert!(validate(&bad_timeout).is_err());

        let mut bad_url = Config::default();
        bad_url.tracker.api_url = "api.github.com".to_string();
        assert!(validate(&bad_url).is_err());
    }
}
