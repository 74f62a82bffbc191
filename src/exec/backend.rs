// src/exec/backend.rs

//! Executor seam between the runtime and whatever actually runs tasks.
//!
//! `RealExecutorBackend` forwards scheduled tasks to the
//! [`executor_loop`](super::executor_loop) and owns the long-lived services
//! those tasks start. Tests plug in a backend that completes tasks directly.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::{Error, Result};
use crate::exec::executor_loop::spawn_executor;
use crate::exec::services::{Services, TaskEnv};

pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks for execution.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Stop long-lived services before the runtime returns.
    fn shutdown(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async {})
    }
}

pub struct RealExecutorBackend {
    tx: mpsc::Sender<ScheduledTask>,
    services: Arc<Services>,
}

impl RealExecutorBackend {
    /// Spawns the background executor loop immediately.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, env: TaskEnv) -> Self {
        let services = env.services.clone();
        let tx = spawn_executor(runtime_tx, env);
        Self { tx, services }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            for task in tasks {
                tx.send(task).await.map_err(Error::from)?;
            }
            Ok(())
        })
    }

    fn shutdown(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(self.services.shutdown())
    }
}
