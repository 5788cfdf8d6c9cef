//! Ephemeral per-repository setup and teardown.
//!
//! Before a scan can be dispatched the repository needs the sweep branch, gate
//! environments that accept deployments from that branch, and the scan
//! workflow definition on the branch. Provisioning failures fail the
//! repository; teardown and restore failures are only logged.
//!
//! Provisioning records what it changed in a [`Provisioned`], and cleanup only
//! undoes what that record holds.

use tracing::{info, warn};

use crate::config::SweepConfig;
use crate::errors::{CleanupError, SweepError};
use crate::github::{DeploymentBranchPolicy, ForgeApi, Repository, Workflow};

const WORKFLOWS_DIR: &str = ".github/workflows";
const COMMIT_MESSAGE: &str = "Updated workflow";

/// Remote changes made so far for one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provisioned {
    /// The sweep branch exists, created now or left by an earlier sweep.
    pub branch_created: bool,
    /// Gate environments switched to the custom branch policy.
    pub opened_environments: Vec<String>,
}

impl Provisioned {
    pub fn is_empty(&self) -> bool {
        !self.branch_created && self.opened_environments.is_empty()
    }
}

pub struct Provisioner<'a> {
    api: &'a dyn ForgeApi,
    config: &'a SweepConfig,
}

impl<'a> Provisioner<'a> {
    pub fn new(api: &'a dyn ForgeApi, config: &'a SweepConfig) -> Self {
        Self { api, config }
    }

    /// The first workflow the repository lists.
    ///
    /// `WORKFLOW_PATTERN` is deliberately not applied here.
    pub async fn resolve_workflow(&self, repo: &Repository) -> Result<Workflow, SweepError> {
        self.api
            .list_workflows(&repo.name)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SweepError::NoWorkflow {
                repo: repo.name.clone(),
            })
    }

    /// Create the branch, open the gates to it, and push the scan workflow.
    ///
    /// `done` is updated after every step that succeeds, so it is accurate
    /// when this returns early with an error.
    pub async fn provision(
        &self,
        repo: &Repository,
        workflow: &Workflow,
        done: &mut Provisioned,
    ) -> Result<(), SweepError> {
        let branch = &self.config.branch;
        let template = tokio::fs::read(&self.config.workflow_template)
            .await
            .map_err(|source| SweepError::Template {
                path: self.config.workflow_template.clone(),
                source,
            })?;

        let sha = self
            .api
            .get_branch_sha(&repo.name, &repo.default_branch)
            .await?;
        match self.api.create_branch(&repo.name, branch, &sha).await {
            Ok(()) => {
                info!(repo = %repo.name, %branch, from = %repo.default_branch, "branch created")
            }
            Err(e) if e.is_already_exists() => {
                warn!(repo = %repo.name, %branch, "branch left by an earlier sweep, reusing it")
            }
            Err(e) => return Err(e.into()),
        }
        done.branch_created = true;

        let policy_name = format!("*{}*", branch);
        for env in &self.config.gate_environments {
            self.api
                .update_environment(&repo.name, env, DeploymentBranchPolicy::custom())
                .await?;
            done.opened_environments.push(env.clone());
            // Fails when the policy survived an earlier sweep; the gate is open either way.
            if let Err(e) = self
                .api
                .create_deployment_branch_policy(&repo.name, env, &policy_name)
                .await
            {
                warn!(repo = %repo.name, environment = %env, error = %e, "deployment branch policy not created");
            }
        }

        let remote_path = format!("{}/{}", WORKFLOWS_DIR, workflow.file_name());
        let existing = self.api.get_file_sha(&repo.name, &remote_path, branch).await?;
        self.api
            .put_file(
                &repo.name,
                &remote_path,
                branch,
                &template,
                existing.as_deref(),
                COMMIT_MESSAGE,
            )
            .await?;
        info!(repo = %repo.name, path = %remote_path, "workflow uploaded");

        Ok(())
    }

    /// Delete the sweep branch if provisioning got that far, then the run when one is given.
    pub async fn teardown(
        &self,
        repo: &Repository,
        done: &Provisioned,
        run_id: Option<u64>,
    ) -> Vec<CleanupError> {
        let mut errors = Vec::new();

        let branch = &self.config.branch;
        if done.branch_created {
            match self.api.delete_branch(&repo.name, branch).await {
                Ok(()) => info!(repo = %repo.name, %branch, "branch deleted"),
                Err(source) => errors.push(CleanupError::BranchDeletion {
                    branch: branch.clone(),
                    source,
                }),
            }
        }

        if let Some(run_id) = run_id {
            match self.api.delete_run(&repo.name, run_id).await {
                Ok(()) => info!(repo = %repo.name, run_id, "run deleted"),
                Err(source) => errors.push(CleanupError::RunDeletion { run_id, source }),
            }
        }

        log_cleanup_errors(repo, &errors);
        errors
    }

    /// Put the environments provisioning opened back to protected-branches-only.
    pub async fn restore_environments(
        &self,
        repo: &Repository,
        done: &Provisioned,
    ) -> Vec<CleanupError> {
        let mut errors = Vec::new();
        for env in &done.opened_environments {
            if let Err(source) = self
                .api
                .update_environment(&repo.name, env, DeploymentBranchPolicy::protected())
                .await
            {
                errors.push(CleanupError::EnvironmentRestore {
                    environment: env.clone(),
                    source,
                });
            }
        }
        log_cleanup_errors(repo, &errors);
        errors
    }
}

fn log_cleanup_errors(repo: &Repository, errors: &[CleanupError]) {
    for err in errors {
        warn!(repo = %repo.name, error = %err, "cleanup step failed");
    }
}
