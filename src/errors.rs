//! Typed error hierarchy for the sweep.
//!
//! - `RemoteApiError`: a single forge REST call failed
//! - `LogBundleError`: the downloaded log archive could not be read
//! - `SweepError`: a repository's pipeline failed; caught at the sweep boundary
//! - `ApprovalError` / `CleanupError`: logged by the orchestrator, never propagated

use reqwest::StatusCode;
use thiserror::Error;

/// A failed call against the forge REST API.
#[derive(Debug, Error)]
pub enum RemoteApiError {
    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("{operation} request failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} returned an unreadable body: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl RemoteApiError {
    /// Name of the logical operation that failed (e.g. `dispatch_workflow`).
    pub fn operation(&self) -> &'static str {
        match self {
            RemoteApiError::Status { operation, .. }
            | RemoteApiError::Transport { operation, .. }
            | RemoteApiError::Decode { operation, .. } => operation,
        }
    }

    /// HTTP status, when the forge answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RemoteApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The forge rejected a create because the object is already there (422).
    pub fn is_already_exists(&self) -> bool {
        match self {
            RemoteApiError::Status { status, body, .. } => {
                *status == StatusCode::UNPROCESSABLE_ENTITY && body.contains("already exists")
            }
            _ => false,
        }
    }
}

/// The log archive could not be opened or extracted.
#[derive(Debug, Error)]
pub enum LogBundleError {
    #[error("log archive is not a valid zip container: {0}")]
    Corrupt(#[from] zip::result::ZipError),

    #[error("failed to stage log archive: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of one repository's end-to-end pipeline.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    RemoteApi(#[from] RemoteApiError),

    #[error("repository {repo} has no workflows")]
    NoWorkflow { repo: String },

    #[error("no run found for {workflow} after {attempts} attempts")]
    RunNotFound { workflow: String, attempts: u32 },

    #[error(transparent)]
    LogBundleCorrupt(#[from] LogBundleError),

    #[error("failed to read workflow template at {path}: {source}")]
    Template {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SweepError {
    /// Stable label recorded in the sweep report.
    pub fn kind(&self) -> &'static str {
        match self {
            SweepError::RemoteApi(_) => "remote_api",
            SweepError::NoWorkflow { .. } => "no_workflow",
            SweepError::RunNotFound { .. } => "run_not_found",
            SweepError::LogBundleCorrupt(_) => "log_bundle_corrupt",
            SweepError::Template { .. } => "template",
            SweepError::Other(_) => "other",
        }
    }
}

/// Gate approval did not go through. Orchestration continues regardless.
#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("none of the gate environments {0:?} exist")]
    NoGateEnvironments(Vec<String>),

    #[error("approval request failed: {0}")]
    Remote(#[from] RemoteApiError),
}

/// A teardown step failed. Only ever logged.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("failed to delete branch {branch}: {source}")]
    BranchDeletion {
        branch: String,
        #[source]
        source: RemoteApiError,
    },

    #[error("failed to delete run {run_id}: {source}")]
    RunDeletion {
        run_id: u64,
        #[source]
        source: RemoteApiError,
    },

    #[error("failed to restore environment {environment}: {source}")]
    EnvironmentRestore {
        environment: String,
        #[source]
        source: RemoteApiError,
    },
}
