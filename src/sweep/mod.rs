//! Sweep driver: run the orchestrator over every matching repository.
//!
//! Repositories are processed one after another. A failure in one
//! repository is logged, recorded in the [`SweepReport`], and the sweep moves
//! on; only failing to list repositories at all aborts it.

mod report;

pub use report::{RepoOutcome, SweepEntry, SweepReport};

use regex::Regex;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::SweepConfig;
use crate::errors::{RemoteApiError, SweepError};
use crate::github::{ForgeApi, Repository};
use crate::logs::FindingSet;
use crate::orchestrator::RunOrchestrator;

/// Configuration and forge client shared by every repository of one sweep.
#[derive(Clone)]
pub struct SweepContext {
    pub config: SweepConfig,
    pub api: Arc<dyn ForgeApi>,
}

impl SweepContext {
    pub fn new(config: SweepConfig, api: Arc<dyn ForgeApi>) -> Self {
        Self { config, api }
    }
}

/// Repository name filter, anchored at the start of the name.
#[derive(Debug, Clone)]
pub struct RepoFilter {
    pattern: String,
    regex: Regex,
}

impl RepoFilter {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{})", pattern))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

/// Observer for per-repository progress. All methods default to no-ops.
pub trait SweepProgress: Send + Sync {
    fn repos_matched(&self, _pattern: &str, _repos: &[Repository]) {}
    fn sweep_started(&self, _total: usize) {}
    fn repo_started(&self, _repo: &str) {}
    fn repo_verified(&self, _repo: &str, _findings: &FindingSet) {}
    fn repo_failed(&self, _repo: &str, _error: &SweepError) {}
    fn sweep_finished(&self, _report: &SweepReport) {}
}

pub struct SilentProgress;

impl SweepProgress for SilentProgress {}

static SILENT: SilentProgress = SilentProgress;

pub struct SweepDriver<'a> {
    ctx: &'a SweepContext,
    progress: &'a dyn SweepProgress,
}

impl<'a> SweepDriver<'a> {
    pub fn new(ctx: &'a SweepContext) -> Self {
        Self {
            ctx,
            progress: &SILENT,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn SweepProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Repositories of the configured owner or organisation whose name matches `filter`.
    pub async fn discover(&self, filter: &RepoFilter) -> Result<Vec<Repository>, RemoteApiError> {
        let all = self
            .ctx
            .api
            .list_repositories(self.ctx.config.org.as_deref())
            .await?;
        let listed = all.len();
        let matched: Vec<Repository> = all
            .into_iter()
            .filter(|repo| filter.matches(&repo.name))
            .collect();
        info!(pattern = filter.as_str(), listed, matched = matched.len(), "repositories filtered");
        Ok(matched)
    }

    /// Orchestrate each repository exactly once, in order.
    pub async fn run(&self, repos: &[Repository], access_key: &str) -> SweepReport {
        let orchestrator = RunOrchestrator::new(self.ctx.api.as_ref(), &self.ctx.config);
        let mut report = SweepReport::new();
        self.progress.sweep_started(repos.len());

        for repo in repos {
            self.progress.repo_started(&repo.name);
            match orchestrator.orchestrate(repo, access_key).await {
                Ok(verified) => {
                    info!(
                        repo = %repo.name,
                        run_id = verified.run_id,
                        findings = verified.findings.total(),
                        "repository verified"
                    );
                    self.progress.repo_verified(&repo.name, &verified.findings);
                    report.record(
                        repo.name.clone(),
                        RepoOutcome::Verified {
                            run_id: verified.run_id,
                            findings: verified.findings,
                        },
                    );
                }
                Err(e) => {
                    error!(repo = %repo.name, kind = e.kind(), error = %e, "repository failed");
                    self.progress.repo_failed(&repo.name, &e);
                    report.record(repo.name.clone(), RepoOutcome::failed(&e));
                }
            }
        }

        self.progress.sweep_finished(&report);
        report
    }

    /// Discover the matching repositories, then run over them.
    ///
    /// Only a listing failure is returned as an error.
    pub async fn sweep(
        &self,
        filter: &RepoFilter,
        access_key: &str,
    ) -> Result<SweepReport, RemoteApiError> {
        let repos = self.discover(filter).await?;
        self.progress.repos_matched(filter.as_str(), &repos);
        Ok(self.run(&repos, access_key).await)
    }
}
