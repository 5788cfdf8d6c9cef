use serde::{Deserialize, Serialize};

/// A repository (subset of fields we care about).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    #[serde(default = "default_branch_name")]
    pub default_branch: String,
}

fn default_branch_name() -> String {
    "master".to_string()
}

/// A CI workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: u64,
    pub name: String,
    /// Repository-relative path, e.g. `.github/workflows/secret.yml`.
    pub path: String,
}

impl Workflow {
    /// File name of the definition with the workflows directory stripped.
    ///
    /// The runs endpoint accepts this in place of the numeric id.
    pub fn file_name(&self) -> &str {
        self.path
            .strip_prefix(".github/workflows/")
            .unwrap_or(&self.path)
    }
}

/// Run status as reported by the forge. Anything unrecognised maps to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Waiting,
    Completed,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::Waiting => "waiting",
            RunStatus::Completed => "completed",
            RunStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution of a dispatched workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub status: RunStatus,
    #[serde(default)]
    pub conclusion: Option<String>,
}

impl WorkflowRun {
    pub fn is_waiting(&self) -> bool {
        self.status == RunStatus::Waiting
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// Branch policy attached to a deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentBranchPolicy {
    pub protected_branches: bool,
    pub custom_branch_policies: bool,
}

impl DeploymentBranchPolicy {
    /// Only protected branches may deploy; the default for gate environments.
    pub fn protected() -> Self {
        Self {
            protected_branches: true,
            custom_branch_policies: false,
        }
    }

    /// Deploys allowed from branches matching custom name patterns.
    pub fn custom() -> Self {
        Self {
            protected_branches: false,
            custom_branch_policies: true,
        }
    }
}

/// A named deployment gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub deployment_branch_policy: Option<DeploymentBranchPolicy>,
}

impl Environment {
    pub fn protected_branches(&self) -> bool {
        self.deployment_branch_policy
            .is_some_and(|policy| policy.protected_branches)
    }
}

/// Inputs passed to the scan workflow on dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchInputs {
    pub access_key_id: String,
    pub filter_secret_pattern: String,
}

// Response envelopes

#[derive(Debug, Deserialize)]
pub(crate) struct WorkflowList {
    pub workflows: Vec<Workflow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkflowRunList {
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnvironmentList {
    #[serde(default)]
    pub environments: Vec<Environment>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BranchInfo {
    pub commit: CommitRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitRef {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentInfo {
    pub sha: String,
}
