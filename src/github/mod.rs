//! Forge REST surface.
//!
//! [`ForgeApi`] is the seam every other module talks through. The production
//! implementation is [`GitHubClient`]; tests use the in-memory `FakeForge`.
//! No operation retries on its own: any non-2xx response comes back as a
//! [`RemoteApiError`] and the caller decides what to do with it.

mod client;
#[cfg(test)]
pub mod fake;
mod models;

pub use client::GitHubClient;
pub use models::{
    DeploymentBranchPolicy, DispatchInputs, Environment, Repository, RunStatus, Workflow,
    WorkflowRun,
};

use crate::errors::RemoteApiError;
use async_trait::async_trait;
use chrono::NaiveDate;

pub type ApiResult<T> = Result<T, RemoteApiError>;

#[async_trait]
pub trait ForgeApi: Send + Sync {
    /// Organisation repositories when `org` is given, otherwise the owner's.
    async fn list_repositories(&self, org: Option<&str>) -> ApiResult<Vec<Repository>>;

    async fn get_branch_sha(&self, repo: &str, branch: &str) -> ApiResult<String>;

    async fn create_branch(&self, repo: &str, branch: &str, sha: &str) -> ApiResult<()>;

    async fn delete_branch(&self, repo: &str, branch: &str) -> ApiResult<()>;

    /// Blob SHA of a file, or `None` when it does not exist at `git_ref`.
    async fn get_file_sha(&self, repo: &str, path: &str, git_ref: &str)
    -> ApiResult<Option<String>>;

    /// Create or overwrite a file on `branch`. `sha` is required when overwriting.
    async fn put_file(
        &self,
        repo: &str,
        path: &str,
        branch: &str,
        content: &[u8],
        sha: Option<&str>,
        message: &str,
    ) -> ApiResult<()>;

    async fn list_workflows(&self, repo: &str) -> ApiResult<Vec<Workflow>>;

    /// Trigger a run. The forge does not answer with the run id.
    async fn dispatch_workflow(
        &self,
        repo: &str,
        workflow_id: u64,
        branch: &str,
        inputs: &DispatchInputs,
    ) -> ApiResult<()>;

    /// Most recent run of `workflow` in `status` created on `created`.
    async fn list_runs(
        &self,
        repo: &str,
        workflow: &str,
        status: RunStatus,
        created: NaiveDate,
    ) -> ApiResult<Vec<WorkflowRun>>;

    /// Waiting runs first; completed runs when nothing is waiting.
    async fn get_run_status(
        &self,
        repo: &str,
        workflow: &str,
        as_of: NaiveDate,
    ) -> ApiResult<Vec<WorkflowRun>> {
        let waiting = self
            .list_runs(repo, workflow, RunStatus::Waiting, as_of)
            .await?;
        if !waiting.is_empty() {
            return Ok(waiting);
        }
        self.list_runs(repo, workflow, RunStatus::Completed, as_of)
            .await
    }

    async fn list_environments(&self, repo: &str) -> ApiResult<Vec<Environment>>;

    async fn update_environment(
        &self,
        repo: &str,
        environment: &str,
        policy: DeploymentBranchPolicy,
    ) -> ApiResult<()>;

    async fn create_deployment_branch_policy(
        &self,
        repo: &str,
        environment: &str,
        name_pattern: &str,
    ) -> ApiResult<()>;

    async fn approve_pending_deployments(
        &self,
        repo: &str,
        run_id: u64,
        environment_ids: &[u64],
    ) -> ApiResult<()>;

    /// Zip archive of the first attempt's logs.
    async fn download_run_logs(&self, repo: &str, run_id: u64) -> ApiResult<Vec<u8>>;

    async fn delete_run(&self, repo: &str, run_id: u64) -> ApiResult<()>;
}
