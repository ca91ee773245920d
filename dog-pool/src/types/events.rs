use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RunId;

/// Lifecycle events emitted while a pool runs.
///
/// Events carry item indices only, never handler results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PoolEvent {
    RunStarted {
        run_id: RunId,
        total: usize,
        concurrency: usize,
        at: DateTime<Utc>,
    },

    /// Item was admitted and its handler spawned
    TaskStarted {
        run_id: RunId,
        index: usize,
        at: DateTime<Utc>,
    },

    TaskSucceeded {
        run_id: RunId,
        index: usize,
        at: DateTime<Utc>,
    },

    /// Item failed; `handled` is true when an error handler consumed the error
    TaskFailed {
        run_id: RunId,
        index: usize,
        error: String,
        handled: bool,
        at: DateTime<Utc>,
    },

    RunFinished {
        run_id: RunId,
        succeeded: usize,
        failed: usize,
        at: DateTime<Utc>,
    },
}

impl PoolEvent {
    /// Get event type name as string
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::TaskStarted { .. } => "task_started",
            Self::TaskSucceeded { .. } => "task_succeeded",
            Self::TaskFailed { .. } => "task_failed",
            Self::RunFinished { .. } => "run_finished",
        }
    }

    pub fn run_id(&self) -> &RunId {
        match self {
            Self::RunStarted { run_id, .. } => run_id,
            Self::TaskStarted { run_id, .. } => run_id,
            Self::TaskSucceeded { run_id, .. } => run_id,
            Self::TaskFailed { run_id, .. } => run_id,
            Self::RunFinished { run_id, .. } => run_id,
        }
    }

    /// Item index for task-level events
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::TaskStarted { index, .. }
            | Self::TaskSucceeded { index, .. }
            | Self::TaskFailed { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn timestamp(&self) -> &DateTime<Utc> {
        match self {
            Self::RunStarted { at, .. } => at,
            Self::TaskStarted { at, .. } => at,
            Self::TaskSucceeded { at, .. } => at,
            Self::TaskFailed { at, .. } => at,
            Self::RunFinished { at, .. } => at,
        }
    }
}
