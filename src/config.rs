use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_FINDING_PATTERN: &str = "Is present in AWS.*";
pub const DEFAULT_WORKFLOW_TEMPLATE: &str = "secret.yml";
pub const DEFAULT_GATE_ENVIRONMENTS: &[&str] = &["st", "pr"];

/// Attempt budget and fixed delays for locating a dispatched run.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub attempts: u32,
    /// Slept before every poll attempt.
    pub interval: Duration,
    /// Slept after approving a gated run, before polling again.
    pub approval_delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval: Duration::from_secs(10),
            approval_delay: Duration::from_secs(5),
        }
    }
}

impl PollPolicy {
    /// A policy that never sleeps; used by tests.
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            interval: Duration::ZERO,
            approval_delay: Duration::ZERO,
        }
    }
}

/// Settings for the forge REST client.
#[derive(Debug, Clone)]
pub struct GitHubClientConfig {
    pub token: String,
    pub owner: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GitHubClientConfig {
    pub fn new(token: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            owner: owner.into(),
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Everything a sweep needs, built once at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub client: GitHubClientConfig,
    /// Organisation to list repositories from; falls back to the owner's user repos.
    pub org: Option<String>,
    /// Read but not applied: the first workflow in a repository is always dispatched.
    pub workflow_pattern: Option<String>,
    /// Passed to the scan workflow as `filter_secret_pattern`.
    pub secret_pattern: String,
    pub branch: String,
    pub workflow_template: PathBuf,
    pub gate_environments: Vec<String>,
    pub finding_pattern: Regex,
    pub poll: PollPolicy,
}

impl SweepConfig {
    /// Build from the process environment. Call `dotenvy` first to pick up `.env`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup so tests never touch the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| anyhow!("{} must be set", key));

        let mut client = GitHubClientConfig::new(require("GITHUB_TOKEN")?, require("OWNER")?);
        if let Some(url) = get("GITHUB_API_URL") {
            client.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = parse_var::<u64>(&get, "HTTP_TIMEOUT_SECS")? {
            client.timeout = Duration::from_secs(secs);
        }

        let mut poll = PollPolicy::default();
        if let Some(attempts) = parse_var::<u32>(&get, "POLL_ATTEMPTS")? {
            if attempts == 0 {
                bail!("POLL_ATTEMPTS must be at least 1");
            }
            poll.attempts = attempts;
        }
        if let Some(secs) = parse_var::<u64>(&get, "POLL_INTERVAL_SECS")? {
            poll.interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&get, "APPROVAL_DELAY_SECS")? {
            poll.approval_delay = Duration::from_secs(secs);
        }

        let gate_environments = match get("GATE_ENVIRONMENTS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_GATE_ENVIRONMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        let finding_source =
            get("FINDING_PATTERN").unwrap_or_else(|| DEFAULT_FINDING_PATTERN.to_string());
        let finding_pattern = Regex::new(&finding_source)
            .with_context(|| format!("FINDING_PATTERN is not a valid regex: {}", finding_source))?;

        Ok(Self {
            client,
            org: get("ORG"),
            workflow_pattern: get("WORKFLOW_PATTERN"),
            secret_pattern: lookup("SECRET_PATTERN").unwrap_or_default(),
            branch: require("BRANCH")?,
            workflow_template: get("WORKFLOW_TEMPLATE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKFLOW_TEMPLATE)),
            gate_environments,
            finding_pattern,
            poll,
        })
    }
}

fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{} has an invalid value: {}", key, raw))
        })
        .transpose()
}

/// Minimal valid configuration with a template at `template` and no poll delays.
#[cfg(test)]
pub(crate) fn test_config(template: &std::path::Path) -> SweepConfig {
    let vars = [
        ("GITHUB_TOKEN", "ghp_test".to_string()),
        ("OWNER", "acme".to_string()),
        ("BRANCH", "key-sweep".to_string()),
        ("SECRET_PATTERN", "AKIA.*".to_string()),
        ("WORKFLOW_TEMPLATE", template.display().to_string()),
    ];
    let mut config = SweepConfig::from_lookup(|key| {
        vars.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
    })
    .unwrap();
    config.poll = PollPolicy::immediate(5);
    config
}
