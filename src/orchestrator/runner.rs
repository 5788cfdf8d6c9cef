use tracing::{debug, info, warn};

use super::poll::poll_for_run;
use super::state::{RunPhase, RunTimeline};
use crate::config::SweepConfig;
use crate::errors::{ApprovalError, SweepError};
use crate::github::{DispatchInputs, ForgeApi, Repository, RunStatus, Workflow, WorkflowRun};
use crate::logs::{FindingSet, LogBundleParser};
use crate::provision::{Provisioned, Provisioner};

/// Outcome of one repository's successful orchestration.
#[derive(Debug, Clone)]
pub struct VerifiedRun {
    pub run_id: u64,
    /// Status of the run when its logs were fetched. Usually `Completed`.
    pub final_status: RunStatus,
    /// Whether an approval gate was met and approved.
    pub gate_resolved: bool,
    pub findings: FindingSet,
    pub timeline: RunTimeline,
}

/// Drives one repository from dispatch to parsed findings.
///
/// Every remote call goes through the [`ForgeApi`] it is built with, so the
/// same orchestrator runs against the real forge and the in-memory fake.
pub struct RunOrchestrator<'a> {
    api: &'a dyn ForgeApi,
    config: &'a SweepConfig,
    parser: LogBundleParser,
}

impl<'a> RunOrchestrator<'a> {
    pub fn new(api: &'a dyn ForgeApi, config: &'a SweepConfig) -> Self {
        Self {
            api,
            config,
            parser: LogBundleParser::new(config.finding_pattern.clone()),
        }
    }

    /// Provision, dispatch, wait, approve once if gated, fetch and parse logs.
    ///
    /// Whatever provisioning changed is undone on every path: the branch is
    /// deleted if it was created and each opened gate environment is restored.
    /// The run itself is deleted only once its logs were retrieved.
    pub async fn orchestrate(
        &self,
        repo: &Repository,
        access_key: &str,
    ) -> Result<VerifiedRun, SweepError> {
        let provisioner = Provisioner::new(self.api, self.config);
        let workflow = provisioner.resolve_workflow(repo).await?;
        info!(repo = %repo.name, workflow = %workflow.path, "workflow resolved");

        let mut done = Provisioned::default();
        let result = self
            .drive(&provisioner, &mut done, repo, &workflow, access_key)
            .await;

        let run_id = result.as_ref().ok().map(|verified| verified.run_id);
        provisioner.teardown(repo, &done, run_id).await;
        provisioner.restore_environments(repo, &done).await;

        result
    }

    async fn drive(
        &self,
        provisioner: &Provisioner<'_>,
        done: &mut Provisioned,
        repo: &Repository,
        workflow: &Workflow,
        access_key: &str,
    ) -> Result<VerifiedRun, SweepError> {
        provisioner.provision(repo, workflow, done).await?;

        let inputs = DispatchInputs {
            access_key_id: access_key.to_string(),
            filter_secret_pattern: self.config.secret_pattern.clone(),
        };
        self.api
            .dispatch_workflow(&repo.name, workflow.id, &self.config.branch, &inputs)
            .await?;
        info!(repo = %repo.name, branch = %self.config.branch, "workflow dispatched");

        let mut timeline = RunTimeline::new();
        timeline.advance(RunPhase::Dispatched);

        let result = self.follow(repo, workflow, &mut timeline).await;
        if result.is_err() && !timeline.is_finished() {
            timeline.advance(RunPhase::Failed);
        }
        debug!(repo = %repo.name, phases = ?timeline.phases(), "run finished");

        let (run, gate_resolved, findings) = result?;
        Ok(VerifiedRun {
            run_id: run.id,
            final_status: run.status,
            gate_resolved,
            findings,
            timeline,
        })
    }

    async fn follow(
        &self,
        repo: &Repository,
        workflow: &Workflow,
        timeline: &mut RunTimeline,
    ) -> Result<(WorkflowRun, bool, FindingSet), SweepError> {
        let policy = &self.config.poll;
        let workflow_file = workflow.file_name();

        timeline.advance(RunPhase::Polling);
        let Some(mut run) = poll_for_run(self.api, &repo.name, workflow_file, policy).await else {
            timeline.advance(RunPhase::TimedOut);
            return Err(SweepError::RunNotFound {
                workflow: workflow_file.to_string(),
                attempts: policy.attempts,
            });
        };
        info!(repo = %repo.name, run_id = run.id, status = %run.status, "run located");

        let mut gate_resolved = false;
        if run.is_waiting() {
            timeline.advance(RunPhase::Waiting);
            timeline.advance(RunPhase::Approving);
            match self.approve_gate(repo, run.id).await {
                Ok(ids) => {
                    info!(repo = %repo.name, run_id = run.id, environments = ?ids, "gate approved");
                    gate_resolved = true;
                }
                Err(e) => warn!(repo = %repo.name, run_id = run.id, error = %e, "gate approval failed"),
            }

            tokio::time::sleep(policy.approval_delay).await;

            timeline.advance(RunPhase::Polling);
            match poll_for_run(self.api, &repo.name, workflow_file, policy).await {
                Some(refreshed) => run = refreshed,
                None => warn!(repo = %repo.name, run_id = run.id, "run not visible after approval, keeping last known state"),
            }
        }

        if run.is_completed() {
            timeline.advance(RunPhase::Completed);
        } else {
            if run.is_waiting() {
                timeline.advance(RunPhase::Waiting);
            }
            warn!(repo = %repo.name, run_id = run.id, status = %run.status, "fetching logs of a run that has not completed");
        }

        let archive = self.api.download_run_logs(&repo.name, run.id).await?;
        let findings = self.parser.parse(&archive)?;
        info!(repo = %repo.name, run_id = run.id, findings = findings.total(), "logs parsed");

        Ok((run, gate_resolved, findings))
    }

    /// Approve the configured gate environments for `run_id`; returns their ids.
    async fn approve_gate(&self, repo: &Repository, run_id: u64) -> Result<Vec<u64>, ApprovalError> {
        let gates = &self.config.gate_environments;
        let ids: Vec<u64> = self
            .api
            .list_environments(&repo.name)
            .await?
            .into_iter()
            .filter(|env| gates.contains(&env.name))
            .map(|env| env.id)
            .collect();
        if ids.is_empty() {
            return Err(ApprovalError::NoGateEnvironments(gates.clone()));
        }
        self.api
            .approve_pending_deployments(&repo.name, run_id, &ids)
            .await?;
        Ok(ids)
    }
}
