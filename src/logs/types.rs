use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Log section emitted by the scan workflow, one per secret store it queries.
///
/// These are labels on log files, not the forge's deployment environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogEnvironment {
    Qa,
    St,
    Pr,
}

impl LogEnvironment {
    pub const ALL: [LogEnvironment; 3] = [LogEnvironment::Qa, LogEnvironment::St, LogEnvironment::Pr];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogEnvironment::Qa => "qa",
            LogEnvironment::St => "st",
            LogEnvironment::Pr => "pr",
        }
    }

    /// Name of this environment's log file inside the run's archive.
    pub fn member_name(&self) -> &'static str {
        match self {
            LogEnvironment::Qa => "1_get-qa-secrets.txt",
            LogEnvironment::St => "1_get-st-secrets.txt",
            LogEnvironment::Pr => "1_get-pr-secrets.txt",
        }
    }
}

impl std::fmt::Display for LogEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Findings of one run, keyed by log environment.
///
/// Every environment is always present; an environment whose log was missing
/// or clean maps to an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FindingSet(BTreeMap<LogEnvironment, Vec<String>>);

impl Default for FindingSet {
    fn default() -> Self {
        Self(
            LogEnvironment::ALL
                .iter()
                .map(|env| (*env, Vec::new()))
                .collect(),
        )
    }
}

impl FindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I, S>(entries: impl IntoIterator<Item = (LogEnvironment, I)>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        for (env, findings) in entries {
            set.0
                .insert(env, findings.into_iter().map(Into::into).collect());
        }
        set
    }

    pub(crate) fn insert(&mut self, env: LogEnvironment, findings: Vec<String>) {
        self.0.insert(env, findings);
    }

    pub fn get(&self, env: LogEnvironment) -> &[String] {
        self.0.get(&env).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (LogEnvironment, &[String])> {
        self.0.iter().map(|(env, findings)| (*env, findings.as_slice()))
    }

    pub fn total(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }
}
