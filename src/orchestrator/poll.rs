use chrono::Utc;
use tracing::{debug, warn};

use crate::config::PollPolicy;
use crate::github::{ForgeApi, WorkflowRun};

/// Look for the run a dispatch created.
///
/// Sleeps `policy.interval` before each of at most `policy.attempts` attempts
/// and returns the first run found. An attempt that errors or finds nothing
/// is logged and does not end the loop. `None` means the budget ran out.
pub async fn poll_for_run(
    api: &dyn ForgeApi,
    repo: &str,
    workflow: &str,
    policy: &PollPolicy,
) -> Option<WorkflowRun> {
    for attempt in 1..=policy.attempts {
        tokio::time::sleep(policy.interval).await;

        let today = Utc::now().date_naive();
        match api.get_run_status(repo, workflow, today).await {
            Ok(runs) => match runs.into_iter().next() {
                Some(run) => {
                    debug!(repo, run_id = run.id, status = %run.status, attempt, "run found");
                    return Some(run);
                }
                None => warn!(repo, attempt, max = policy.attempts, "no run visible yet"),
            },
            Err(e) => warn!(repo, attempt, max = policy.attempts, error = %e, "run lookup failed"),
        }
    }
    None
}
