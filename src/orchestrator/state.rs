use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Where one repository's run currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Dispatched,
    Polling,
    Waiting,
    Approving,
    Completed,
    TimedOut,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunPhase::Completed | RunPhase::TimedOut | RunPhase::Failed
        )
    }

    /// Whether `next` may follow `self`.
    ///
    /// `Failed` is reachable from every non-terminal phase.
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        use RunPhase::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Dispatched, Polling) => true,
            (Polling, Waiting | Completed | TimedOut) => true,
            (Waiting, Approving) => true,
            (Approving, Polling) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Dispatched => "dispatched",
            RunPhase::Polling => "polling",
            RunPhase::Waiting => "waiting",
            RunPhase::Approving => "approving",
            RunPhase::Completed => "completed",
            RunPhase::TimedOut => "timed_out",
            RunPhase::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseEntry {
    pub phase: RunPhase,
    pub timestamp: DateTime<Utc>,
}

/// Ordered record of the phases one orchestration passed through.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunTimeline {
    entries: Vec<PhaseEntry>,
}

impl RunTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<RunPhase> {
        self.entries.last().map(|e| e.phase)
    }

    /// Append `next`. The first entry must be `Dispatched`.
    ///
    /// An illegal transition is recorded anyway and logged, so the timeline
    /// always reflects what actually happened.
    pub fn advance(&mut self, next: RunPhase) {
        let legal = match self.current() {
            Some(from) => from.can_transition_to(next),
            None => next == RunPhase::Dispatched,
        };
        if legal {
            debug!(phase = %next, "run phase");
        } else {
            warn!(from = ?self.current(), to = %next, "unexpected run phase transition");
        }
        self.entries.push(PhaseEntry {
            phase: next,
            timestamp: Utc::now(),
        });
    }

    pub fn phases(&self) -> Vec<RunPhase> {
        self.entries.iter().map(|e| e.phase).collect()
    }

    pub fn entries(&self) -> &[PhaseEntry] {
        &self.entries
    }

    /// How many times the run entered `phase`.
    pub fn count(&self, phase: RunPhase) -> usize {
        self.entries.iter().filter(|e| e.phase == phase).count()
    }

    pub fn is_finished(&self) -> bool {
        self.current().is_some_and(|p| p.is_terminal())
    }
}
