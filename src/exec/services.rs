// src/exec/services.rs

//! Shared environment handed to every task, plus the long-lived services
//! (dev server, watcher) started by `serve` / `watch` tasks.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::config::model::ConfigFile;
use crate::config::RunContext;
use crate::dag::DagGraph;
use crate::fs::FileSystem;
use crate::pipeline::AssetSet;
use crate::server::{DevServerHandle, LiveReload};
use crate::watch::WatcherHandle;

/// Slots for services that outlive the task that started them.
///
/// A service is started at most once per process; later runs find the slot
/// filled and succeed immediately.
#[derive(Debug, Default)]
pub struct Services {
    pub server: Mutex<Option<DevServerHandle>>,
    pub watcher: Mutex<Option<WatcherHandle>>,
    pub livereload: Mutex<Option<LiveReload>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live-reload channel of the running dev server, if any.
    pub async fn reloader(&self) -> Option<LiveReload> {
        self.livereload.lock().await.clone()
    }

    /// Stop the watcher first so no new triggers arrive, then the server.
    pub async fn shutdown(&self) {
        if self.watcher.lock().await.take().is_some() {
            info!("file watcher stopped");
        }
        self.livereload.lock().await.take();
        if let Some(server) = self.server.lock().await.take() {
            info!(addr = %server.local_addr(), "dev server stopped");
        }
    }
}

/// Everything a task runner needs, cheaply cloneable.
#[derive(Debug, Clone)]
pub struct TaskEnv {
    pub ctx: Arc<RunContext>,
    pub fs: Arc<dyn FileSystem>,
    pub config: Arc<ConfigFile>,
    pub asset_sets: Arc<BTreeMap<String, AssetSet>>,
    pub graph: Arc<DagGraph>,
    pub services: Arc<Services>,
}
