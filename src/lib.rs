// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::model::ConfigFile;
use crate::config::{RunContext, default_config_path, load_and_validate, project_root};
use crate::dag::{DagGraph, Scheduler};
use crate::engine::{
    CoreRuntime, RunReport, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason,
};
use crate::errors::AssetdagError;
use crate::exec::{RealExecutorBackend, Services, TaskEnv};
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::compile_asset_sets;

/// High-level entry point used by `main.rs`.
///
/// Loads `Assetdag.toml` (or `ASSETDAG_CONFIG`) and runs the requested
/// target against the real filesystem.
pub async fn run(args: CliArgs) -> Result<Vec<RunReport>> {
    let config_path = default_config_path();
    let cfg = load_and_validate(&config_path)?;
    let root = project_root(&config_path);
    info!(config = ?config_path, root = ?root, target = %args.target, "loaded config");

    run_target(cfg, root, &args.target, Arc::new(RealFileSystem)).await
}

/// Run `target` from a validated config.
///
/// This wires together:
/// - the immutable run context and compiled asset sets
/// - scheduler / queue / runtime
/// - executor (with the dev server and watcher started on demand)
/// - Ctrl-C handling for targets that keep services running
///
/// Returns the report of every run that finished. Targets without a `serve`
/// or `watch` task return after their single run.
pub async fn run_target(
    cfg: ConfigFile,
    project_root: impl Into<PathBuf>,
    target: &str,
    fs: Arc<dyn FileSystem>,
) -> Result<Vec<RunReport>> {
    if !cfg.has_task(target) {
        return Err(AssetdagError::TaskNotFound(target.to_string()).into());
    }

    let ctx = Arc::new(RunContext::for_target(&cfg, target, project_root));
    let asset_sets = Arc::new(compile_asset_sets(&cfg)?);
    let graph = Arc::new(DagGraph::from_config(&cfg));
    let scheduler = Scheduler::from_graph(graph.as_ref().clone())?;

    let long_lived = scheduler.plan_of(target).is_some_and(|plan| {
        plan.tasks()
            .any(|t| graph.action_of(t).is_some_and(|a| a.is_long_lived()))
    });
    debug!(target = %target, long_lived, "computed target plan");

    let behaviour = cfg.config.triggered_while_running_behaviour;
    let queue_length = cfg.config.queue_length;

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let env = TaskEnv {
        ctx,
        fs,
        config: Arc::new(cfg),
        asset_sets,
        graph,
        services: Arc::new(Services::new()),
    };
    let executor = RealExecutorBackend::new(rt_tx.clone(), env);

    // Ctrl-C → graceful shutdown.
    if long_lived {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    rt_tx
        .send(RuntimeEvent::TaskTriggered {
            task: target.to_string(),
            reason: TriggerReason::Manual,
        })
        .await?;

    let options = RuntimeOptions {
        exit_when_idle: !long_lived,
    };

    // Construct the pure core runtime (single source of truth for semantics).
    let core = CoreRuntime::new(scheduler, behaviour, queue_length, options);

    // Construct the async IO shell around the core.
    let runtime = Runtime::new(core, rt_rx, executor);
    Ok(runtime.run().await?)
}
