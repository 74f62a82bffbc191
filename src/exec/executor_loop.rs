// src/exec/executor_loop.rs

//! Background loop that runs scheduled tasks.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::exec::services::TaskEnv;
use crate::exec::task_runner::run_task;

/// Spawn the background executor loop.
///
/// The returned sender is what [`RealExecutorBackend`](super::RealExecutorBackend)
/// forwards scheduled tasks to. Every task runs in its own Tokio task, so the
/// members of a parallel group interleave freely; the scheduler never hands
/// out the same task twice within a run.
pub fn spawn_executor(
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    env: TaskEnv,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        while let Some(task) = rx.recv().await {
            debug!(task = %task.name, run_id = task.run_id, "starting task");
            tokio::spawn(run_task(task, env.clone(), runtime_tx.clone()));
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}
