//! Waits on enqueued index tasks and tallies their outcome.

use search_sink::{IndexWriter, TaskHandle};
use std::ops::AddAssign;
use tracing::{error, info};

use crate::error::{Result, SyncError};

/// How many awaited tasks succeeded or failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl TaskSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

impl AddAssign for TaskSummary {
    fn add_assign(&mut self, other: Self) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

/// Wait for every task in order.
///
/// A task that ends `failed` or `canceled` is logged and counted; it does
/// not stop the remaining tasks from being awaited. An error while waiting
/// aborts the whole call.
pub async fn await_all<W>(writer: &W, handles: &[TaskHandle]) -> Result<TaskSummary>
where
    W: IndexWriter + ?Sized,
{
    let mut summary = TaskSummary::default();

    for &handle in handles {
        let task = writer
            .wait_for_task(handle)
            .await
            .map_err(SyncError::Transport)?;

        let kind = task.kind.as_deref().unwrap_or("unknown");
        if task.status.is_success() {
            info!(
                "Finished task UID: {} of type: {kind} status: {}",
                task.uid, task.status
            );
            summary.succeeded += 1;
        } else {
            let detail = task
                .error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "no error detail".to_string());
            error!(
                "Task UID: {} of type: {kind} ended {}: {detail}",
                task.uid, task.status
            );
            summary.failed += 1;
        }
    }

    Ok(summary)
}
