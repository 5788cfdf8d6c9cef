use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use super::models::{
    BranchInfo, ContentInfo, DeploymentBranchPolicy, DispatchInputs, Environment, EnvironmentList,
    Repository, RunStatus, Workflow, WorkflowList, WorkflowRun, WorkflowRunList,
};
use super::{ApiResult, ForgeApi};
use crate::config::GitHubClientConfig;
use crate::errors::RemoteApiError;

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("keysweep/", env!("CARGO_PKG_VERSION"));
const REPOS_PER_PAGE: usize = 100;

/// Authenticated client for the GitHub REST API.
///
/// Every request carries the same header set (accept type, bearer token, API
/// version). One logical operation is one HTTP call.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_url: String,
    owner: String,
}

impl GitHubClient {
    pub fn new(config: &GitHubClientConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", config.token))
            .context("GITHUB_TOKEN contains characters not allowed in a header")?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            "x-github-api-version",
            header::HeaderValue::from_static(API_VERSION),
        );

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
        })
    }

    fn repo_url(&self, repo: &str, rest: &str) -> String {
        format!("{}/repos/{}/{}{}", self.base_url, self.owner, repo, rest)
    }

    /// Send the request and turn any non-2xx answer into a `Status` error.
    async fn send(&self, operation: &'static str, request: RequestBuilder) -> ApiResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|source| RemoteApiError::Transport { operation, source })?;

        let status = response.status();
        debug!(operation, %status, "forge response");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteApiError::Status {
                operation,
                status,
                body,
            });
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> ApiResult<T> {
        self.send(operation, request)
            .await?
            .json::<T>()
            .await
            .map_err(|source| RemoteApiError::Decode { operation, source })
    }

    async fn list_repository_pages(&self, url: &str) -> ApiResult<Vec<Repository>> {
        let mut repositories = Vec::new();
        let mut page = 1u32;

        loop {
            let batch: Vec<Repository> = self
                .send_json(
                    "list_repositories",
                    self.http.get(url).query(&[
                        ("per_page", REPOS_PER_PAGE.to_string()),
                        ("page", page.to_string()),
                    ]),
                )
                .await?;

            let count = batch.len();
            repositories.extend(batch);
            if count < REPOS_PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(repositories)
    }
}

#[async_trait]
impl ForgeApi for GitHubClient {
    async fn list_repositories(&self, org: Option<&str>) -> ApiResult<Vec<Repository>> {
        let url = match org {
            Some(org) => format!("{}/orgs/{}/repos", self.base_url, org),
            None => format!("{}/users/{}/repos", self.base_url, self.owner),
        };
        self.list_repository_pages(&url).await
    }

    async fn get_branch_sha(&self, repo: &str, branch: &str) -> ApiResult<String> {
        let info: BranchInfo = self
            .send_json(
                "get_branch",
                self.http
                    .get(self.repo_url(repo, &format!("/branches/{}", branch))),
            )
            .await?;
        Ok(info.commit.sha)
    }

    async fn create_branch(&self, repo: &str, branch: &str, sha: &str) -> ApiResult<()> {
        let body = json!({
            "ref": format!("refs/heads/{}", branch),
            "sha": sha,
        });
        self.send(
            "create_branch",
            self.http.post(self.repo_url(repo, "/git/refs")).json(&body),
        )
        .await?;
        Ok(())
    }

    async fn delete_branch(&self, repo: &str, branch: &str) -> ApiResult<()> {
        self.send(
            "delete_branch",
            self.http
                .delete(self.repo_url(repo, &format!("/git/refs/heads/{}", branch))),
        )
        .await?;
        Ok(())
    }

    async fn get_file_sha(
        &self,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> ApiResult<Option<String>> {
        let request = self
            .http
            .get(self.repo_url(repo, &format!("/contents/{}", path)))
            .query(&[("ref", git_ref)]);
        match self.send_json::<ContentInfo>("get_contents", request).await {
            Ok(info) => Ok(Some(info.sha)),
            Err(RemoteApiError::Status { status, .. }) if status == StatusCode::NOT_FOUND => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn put_file(
        &self,
        repo: &str,
        path: &str,
        branch: &str,
        content: &[u8],
        sha: Option<&str>,
        message: &str,
    ) -> ApiResult<()> {
        let mut body = json!({
            "message": message,
            "content": BASE64.encode(content),
            "branch": branch,
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }
        self.send(
            "update_contents",
            self.http
                .put(self.repo_url(repo, &format!("/contents/{}", path)))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn list_workflows(&self, repo: &str) -> ApiResult<Vec<Workflow>> {
        let list: WorkflowList = self
            .send_json(
                "list_workflows",
                self.http.get(self.repo_url(repo, "/actions/workflows")),
            )
            .await?;
        Ok(list.workflows)
    }

    async fn dispatch_workflow(
        &self,
        repo: &str,
        workflow_id: u64,
        branch: &str,
        inputs: &DispatchInputs,
    ) -> ApiResult<()> {
        let body = json!({
            "ref": branch,
            "inputs": inputs,
        });
        self.send(
            "dispatch_workflow",
            self.http
                .post(self.repo_url(
                    repo,
                    &format!("/actions/workflows/{}/dispatches", workflow_id),
                ))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn list_runs(
        &self,
        repo: &str,
        workflow: &str,
        status: RunStatus,
        created: NaiveDate,
    ) -> ApiResult<Vec<WorkflowRun>> {
        let request = self
            .http
            .get(self.repo_url(repo, &format!("/actions/workflows/{}/runs", workflow)))
            .query(&[
                ("status", status.as_str().to_string()),
                ("created", created.format("%Y-%m-%d").to_string()),
                ("per_page", "1".to_string()),
            ]);
        let list: WorkflowRunList = self.send_json("get_run_status", request).await?;
        Ok(list.workflow_runs)
    }

    async fn list_environments(&self, repo: &str) -> ApiResult<Vec<Environment>> {
        let list: EnvironmentList = self
            .send_json(
                "list_environments",
                self.http.get(self.repo_url(repo, "/environments")),
            )
            .await?;
        Ok(list.environments)
    }

    async fn update_environment(
        &self,
        repo: &str,
        environment: &str,
        policy: DeploymentBranchPolicy,
    ) -> ApiResult<()> {
        let body = json!({
            "wait_timer": 0,
            "deployment_branch_policy": policy,
        });
        self.send(
            "update_environment",
            self.http
                .put(self.repo_url(repo, &format!("/environments/{}", environment)))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn create_deployment_branch_policy(
        &self,
        repo: &str,
        environment: &str,
        name_pattern: &str,
    ) -> ApiResult<()> {
        self.send(
            "create_deployment_branch_policy",
            self.http
                .post(self.repo_url(
                    repo,
                    &format!(
                        "/environments/{}/deployment-branch-policies",
                        environment
                    ),
                ))
                .json(&json!({ "name": name_pattern })),
        )
        .await?;
        Ok(())
    }

    async fn approve_pending_deployments(
        &self,
        repo: &str,
        run_id: u64,
        environment_ids: &[u64],
    ) -> ApiResult<()> {
        let body = json!({
            "environment_ids": environment_ids,
            "state": "approved",
            "comment": "Deployments approved...",
        });
        self.send(
            "approve_pending_deployments",
            self.http
                .post(self.repo_url(
                    repo,
                    &format!("/actions/runs/{}/pending_deployments", run_id),
                ))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn download_run_logs(&self, repo: &str, run_id: u64) -> ApiResult<Vec<u8>> {
        let operation = "download_run_logs";
        let response = self
            .send(
                operation,
                self.http.get(self.repo_url(
                    repo,
                    &format!("/actions/runs/{}/attempts/1/logs", run_id),
                )),
            )
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| RemoteApiError::Decode { operation, source })?;
        Ok(bytes.to_vec())
    }

    async fn delete_run(&self, repo: &str, run_id: u64) -> ApiResult<()> {
        self.send(
            "delete_run",
            self.http
                .delete(self.repo_url(repo, &format!("/actions/runs/{}", run_id))),
        )
        .await?;
        Ok(())
    }
}
