// src/exec/task_runner.rs

//! Runs one scheduled task and reports its outcome.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::dag::{ScheduledTask, TaskAction};
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::errors::{AssetdagError, Result};
use crate::exec::services::TaskEnv;
use crate::pipeline::PipelineRunner;
use crate::server::DevServer;
use crate::watch::{WatchSettings, build_watch_rules, spawn_watcher};

/// Run `task` and send exactly one `TaskCompleted` for it.
pub async fn run_task(task: ScheduledTask, env: TaskEnv, runtime_tx: mpsc::Sender<RuntimeEvent>) {
    let task_name = task.name.clone();
    let run_id = task.run_id;

    let outcome = match run_action(&task, &env, &runtime_tx).await {
        Ok(()) => {
            debug!(task = %task_name, run_id, "task finished");
            TaskOutcome::Success
        }
        Err(err) => {
            error!(task = %task_name, run_id, error = %err, "task failed");
            TaskOutcome::Failed(err.to_string())
        }
    };

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task_name,
            outcome,
        })
        .await
        .is_err()
    {
        debug!(run_id, "runtime channel closed before task completion was delivered");
    }
}

async fn run_action(
    task: &ScheduledTask,
    env: &TaskEnv,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> Result<()> {
    match &task.action {
        TaskAction::Noop => Ok(()),
        TaskAction::Clean => clean(env).await,
        TaskAction::Build { asset, full } => build(task, env, asset, *full).await,
        TaskAction::Serve => serve(env).await,
        TaskAction::Watch => watch(env, runtime_tx).await,
    }
}

async fn clean(env: &TaskEnv) -> Result<()> {
    let dist = env.ctx.dist_dir();
    info!(path = ?dist, "removing output directory");
    env.fs
        .remove_dir_all(dist)
        .map_err(|e| AssetdagError::Clean {
            path: dist.to_path_buf(),
            cause: format!("{e:#}"),
        })
}

async fn build(task: &ScheduledTask, env: &TaskEnv, asset: &str, full: bool) -> Result<()> {
    let set = env
        .asset_sets
        .get(asset)
        .ok_or_else(|| AssetdagError::TaskNotFound(asset.to_string()))?;

    let reload = env.services.reloader().await;
    let runner = PipelineRunner::new(env.fs.clone(), env.ctx.clone());
    let report = runner.execute(set, full, reload.as_ref()).await?;

    debug!(
        task = %task.name,
        asset = %set.name,
        written = report.files_written.len(),
        full,
        "build task done"
    );
    Ok(())
}

async fn serve(env: &TaskEnv) -> Result<()> {
    let mut slot = env.services.server.lock().await;
    if let Some(running) = slot.as_ref() {
        debug!(addr = %running.local_addr(), "dev server already running");
        return Ok(());
    }

    let server = DevServer::bind(env.ctx.dist_dir(), &env.config.server).await?;
    if let Some(lr) = server.live_reload() {
        *env.services.livereload.lock().await = Some(lr);
    }
    let handle = server.spawn();
    info!(
        root = ?env.ctx.dist_dir(),
        url = %format!("http://{}", handle.local_addr()),
        "serving output directory"
    );
    *slot = Some(handle);
    Ok(())
}

async fn watch(env: &TaskEnv, runtime_tx: &mpsc::Sender<RuntimeEvent>) -> Result<()> {
    let mut slot = env.services.watcher.lock().await;
    if slot.is_some() {
        debug!("file watcher already running");
        return Ok(());
    }

    let rules = build_watch_rules(&env.config, &env.asset_sets)?;
    let settings = WatchSettings {
        root: env.ctx.project_root().to_path_buf(),
        dist: env.config.folders.dist.clone(),
        rules,
        graph: env.graph.clone(),
        debounce: Duration::from_millis(env.config.config.debounce_ms),
    };

    *slot = Some(spawn_watcher(settings, runtime_tx.clone())?);
    Ok(())
}
