use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::errors::SweepError;
use crate::logs::FindingSet;

/// What happened to one repository.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RepoOutcome {
    Verified { run_id: u64, findings: FindingSet },
    Failed { kind: String, message: String },
}

impl RepoOutcome {
    pub fn failed(error: &SweepError) -> Self {
        RepoOutcome::Failed {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepEntry {
    pub repo: String,
    #[serde(flatten)]
    pub outcome: RepoOutcome,
}

/// Per-repository outcomes in the order repositories were swept.
///
/// Failed repositories have no findings; they appear only in [`Self::failures`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    entries: Vec<SweepEntry>,
}

impl SweepReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, repo: impl Into<String>, outcome: RepoOutcome) {
        self.entries.push(SweepEntry {
            repo: repo.into(),
            outcome,
        });
    }

    pub fn entries(&self) -> &[SweepEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Findings of every verified repository.
    pub fn findings(&self) -> impl Iterator<Item = (&str, &FindingSet)> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            RepoOutcome::Verified { findings, .. } => Some((e.repo.as_str(), findings)),
            RepoOutcome::Failed { .. } => None,
        })
    }

    pub fn get(&self, repo: &str) -> Option<&FindingSet> {
        self.findings()
            .find(|(name, _)| *name == repo)
            .map(|(_, findings)| findings)
    }

    /// `(repo, kind, message)` for every failed repository.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            RepoOutcome::Failed { kind, message } => {
                Some((e.repo.as_str(), kind.as_str(), message.as_str()))
            }
            RepoOutcome::Verified { .. } => None,
        })
    }

    pub fn total_findings(&self) -> usize {
        self.findings().map(|(_, findings)| findings.total()).sum()
    }
}

#[derive(Serialize)]
struct FailureView<'a> {
    repo: &'a str,
    kind: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
struct ReportView<'a> {
    findings: BTreeMap<&'a str, &'a FindingSet>,
    failures: Vec<FailureView<'a>>,
    total_findings: usize,
}

impl Serialize for SweepReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ReportView {
            findings: self.findings().collect(),
            failures: self
                .failures()
                .map(|(repo, kind, message)| FailureView {
                    repo,
                    kind,
                    message,
                })
                .collect(),
            total_findings: self.total_findings(),
        }
        .serialize(serializer)
    }
}
