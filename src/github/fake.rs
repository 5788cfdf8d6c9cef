//! In-memory `ForgeApi` for tests.
//!
//! Every call is recorded as `"<operation>:<repo>"` so tests can assert how
//! often, and in which order, the orchestrator touched the forge. Run lookups
//! are recorded per status as `list_waiting_runs` and `list_completed_runs`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{Cursor, Write};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;

use super::{
    ApiResult, DeploymentBranchPolicy, DispatchInputs, Environment, ForgeApi, Repository,
    RunStatus, Workflow, WorkflowRun,
};
use crate::errors::RemoteApiError;

/// What the forge shows on one poll: the runs visible at that moment, or a failure.
#[derive(Debug, Clone)]
pub enum PollAnswer {
    Runs(Vec<WorkflowRun>),
    Error(u16),
}

#[derive(Default)]
pub struct FakeForge {
    repos: Vec<Repository>,
    workflows: HashMap<String, Vec<Workflow>>,
    environments: Vec<Environment>,
    failures: HashSet<(String, String)>,
    failing_environments: HashSet<(String, String)>,
    existing_branches: HashSet<String>,
    polls: Mutex<HashMap<String, VecDeque<PollAnswer>>>,
    visible: Mutex<HashMap<String, Vec<WorkflowRun>>>,
    logs: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
    dispatched: Mutex<Vec<(String, DispatchInputs)>>,
    approvals: Mutex<Vec<(String, u64, Vec<u64>)>>,
    uploads: Mutex<Vec<(String, String, String, Vec<u8>)>>,
    policies: Mutex<Vec<(String, String, DeploymentBranchPolicy)>>,
}

pub fn run(id: u64, status: RunStatus) -> WorkflowRun {
    WorkflowRun {
        id,
        status,
        conclusion: (status == RunStatus::Completed).then(|| "success".to_string()),
    }
}

/// Build a zip archive in memory from `(member name, contents)` pairs.
pub fn log_archive(members: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for (name, contents) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

impl FakeForge {
    pub fn new() -> Self {
        Self {
            environments: vec![
                environment(1, "qa"),
                environment(2, "st"),
                environment(3, "pr"),
            ],
            ..Default::default()
        }
    }

    /// Repositories with one `secret.yml` workflow each.
    pub fn with_repos(mut self, names: &[&str]) -> Self {
        for (idx, name) in names.iter().enumerate() {
            let id = idx as u64 + 1;
            self.repos.push(Repository {
                id,
                name: name.to_string(),
                default_branch: "main".to_string(),
            });
            self.workflows.insert(
                name.to_string(),
                vec![Workflow {
                    id: 100 + id,
                    name: "Secret scan".to_string(),
                    path: ".github/workflows/secret.yml".to_string(),
                }],
            );
        }
        self
    }

    pub fn with_workflows(mut self, repo: &str, workflows: Vec<Workflow>) -> Self {
        self.workflows.insert(repo.to_string(), workflows);
        self
    }

    pub fn with_environments(mut self, environments: Vec<Environment>) -> Self {
        self.environments = environments;
        self
    }

    /// Make `operation` fail with HTTP 500 for `repo`.
    pub fn failing(mut self, operation: &str, repo: &str) -> Self {
        self.failures
            .insert((operation.to_string(), repo.to_string()));
        self
    }

    /// Make `update_environment` fail with HTTP 500 for one environment of `repo`.
    pub fn failing_environment(mut self, repo: &str, environment: &str) -> Self {
        self.failing_environments
            .insert((repo.to_string(), environment.to_string()));
        self
    }

    /// The sweep branch already exists in `repo`; creating it answers 422.
    pub fn with_existing_branch(mut self, repo: &str) -> Self {
        self.existing_branches.insert(repo.to_string());
        self
    }

    /// Queue answers for successive polls; exhausted queues yield no runs.
    ///
    /// Each waiting-run lookup starts a new poll. The completed-run lookup that
    /// may follow it sees the same answer.
    pub fn with_polls(self, repo: &str, answers: Vec<PollAnswer>) -> Self {
        self.polls
            .lock()
            .unwrap()
            .insert(repo.to_string(), answers.into());
        self
    }

    pub fn with_logs(mut self, repo: &str, archive: Vec<u8>) -> Self {
        self.logs.insert(repo.to_string(), archive);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str, repo: &str) -> usize {
        let key = format!("{}:{}", operation, repo);
        self.calls().iter().filter(|c| **c == key).count()
    }

    /// Position of the first matching call, for ordering assertions.
    pub fn position(&self, operation: &str, repo: &str) -> Option<usize> {
        let key = format!("{}:{}", operation, repo);
        self.calls().iter().position(|c| *c == key)
    }

    pub fn dispatched(&self) -> Vec<(String, DispatchInputs)> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn approvals(&self) -> Vec<(String, u64, Vec<u64>)> {
        self.approvals.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<(String, String, String, Vec<u8>)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn policies(&self) -> Vec<(String, String, DeploymentBranchPolicy)> {
        self.policies.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str, repo: &str) -> ApiResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:{}", operation, repo));
        if self
            .failures
            .contains(&(operation.to_string(), repo.to_string()))
        {
            return Err(server_error(operation, 500));
        }
        Ok(())
    }
}

fn environment(id: u64, name: &str) -> Environment {
    Environment {
        id,
        name: name.to_string(),
        deployment_branch_policy: Some(DeploymentBranchPolicy::protected()),
    }
}

fn server_error(operation: &'static str, code: u16) -> RemoteApiError {
    RemoteApiError::Status {
        operation,
        status: StatusCode::from_u16(code).unwrap(),
        body: "{\"message\":\"fake failure\"}".to_string(),
    }
}

#[async_trait]
impl ForgeApi for FakeForge {
    async fn list_repositories(&self, _org: Option<&str>) -> ApiResult<Vec<Repository>> {
        self.record("list_repositories", "*")?;
        Ok(self.repos.clone())
    }

    async fn get_branch_sha(&self, repo: &str, _branch: &str) -> ApiResult<String> {
        self.record("get_branch", repo)?;
        Ok("abc123".to_string())
    }

    async fn create_branch(&self, repo: &str, _branch: &str, _sha: &str) -> ApiResult<()> {
        self.record("create_branch", repo)?;
        if self.existing_branches.contains(repo) {
            return Err(RemoteApiError::Status {
                operation: "create_branch",
                status: StatusCode::UNPROCESSABLE_ENTITY,
                body: "{\"message\":\"Reference already exists\"}".to_string(),
            });
        }
        Ok(())
    }

    async fn delete_branch(&self, repo: &str, _branch: &str) -> ApiResult<()> {
        self.record("delete_branch", repo)
    }

    async fn get_file_sha(
        &self,
        repo: &str,
        _path: &str,
        _git_ref: &str,
    ) -> ApiResult<Option<String>> {
        self.record("get_contents", repo)?;
        Ok(Some("filesha".to_string()))
    }

    async fn put_file(
        &self,
        repo: &str,
        path: &str,
        branch: &str,
        content: &[u8],
        _sha: Option<&str>,
        _message: &str,
    ) -> ApiResult<()> {
        self.record("update_contents", repo)?;
        self.uploads.lock().unwrap().push((
            repo.to_string(),
            path.to_string(),
            branch.to_string(),
            content.to_vec(),
        ));
        Ok(())
    }

    async fn list_workflows(&self, repo: &str) -> ApiResult<Vec<Workflow>> {
        self.record("list_workflows", repo)?;
        Ok(self.workflows.get(repo).cloned().unwrap_or_default())
    }

    async fn dispatch_workflow(
        &self,
        repo: &str,
        _workflow_id: u64,
        _branch: &str,
        inputs: &DispatchInputs,
    ) -> ApiResult<()> {
        self.record("dispatch_workflow", repo)?;
        self.dispatched
            .lock()
            .unwrap()
            .push((repo.to_string(), inputs.clone()));
        Ok(())
    }

    async fn list_runs(
        &self,
        repo: &str,
        _workflow: &str,
        status: RunStatus,
        _created: NaiveDate,
    ) -> ApiResult<Vec<WorkflowRun>> {
        let runs = match status {
            RunStatus::Waiting => {
                self.record("list_waiting_runs", repo)?;
                let answer = self
                    .polls
                    .lock()
                    .unwrap()
                    .get_mut(repo)
                    .and_then(|queue| queue.pop_front());
                let runs = match answer {
                    Some(PollAnswer::Runs(runs)) => runs,
                    Some(PollAnswer::Error(code)) => {
                        self.visible.lock().unwrap().remove(repo);
                        return Err(server_error("list_runs", code));
                    }
                    None => Vec::new(),
                };
                self.visible
                    .lock()
                    .unwrap()
                    .insert(repo.to_string(), runs.clone());
                runs
            }
            RunStatus::Completed => {
                self.record("list_completed_runs", repo)?;
                self.visible
                    .lock()
                    .unwrap()
                    .get(repo)
                    .cloned()
                    .unwrap_or_default()
            }
            _ => {
                self.record("list_runs", repo)?;
                Vec::new()
            }
        };
        Ok(runs.into_iter().filter(|r| r.status == status).collect())
    }

    async fn list_environments(&self, repo: &str) -> ApiResult<Vec<Environment>> {
        self.record("list_environments", repo)?;
        Ok(self.environments.clone())
    }

    async fn update_environment(
        &self,
        repo: &str,
        environment: &str,
        policy: DeploymentBranchPolicy,
    ) -> ApiResult<()> {
        self.record("update_environment", repo)?;
        if self
            .failing_environments
            .contains(&(repo.to_string(), environment.to_string()))
        {
            return Err(server_error("update_environment", 500));
        }
        self.policies
            .lock()
            .unwrap()
            .push((repo.to_string(), environment.to_string(), policy));
        Ok(())
    }

    async fn create_deployment_branch_policy(
        &self,
        repo: &str,
        _environment: &str,
        _name_pattern: &str,
    ) -> ApiResult<()> {
        self.record("create_deployment_branch_policy", repo)
    }

    async fn approve_pending_deployments(
        &self,
        repo: &str,
        run_id: u64,
        environment_ids: &[u64],
    ) -> ApiResult<()> {
        self.record("approve_pending_deployments", repo)?;
        self.approvals
            .lock()
            .unwrap()
            .push((repo.to_string(), run_id, environment_ids.to_vec()));
        Ok(())
    }

    async fn download_run_logs(&self, repo: &str, _run_id: u64) -> ApiResult<Vec<u8>> {
        self.record("download_run_logs", repo)?;
        Ok(self
            .logs
            .get(repo)
            .cloned()
            .unwrap_or_else(|| log_archive(&[])))
    }

    async fn delete_run(&self, repo: &str, _run_id: u64) -> ApiResult<()> {
        self.record("delete_run", repo)
    }
}
