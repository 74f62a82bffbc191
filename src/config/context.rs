// src/config/context.rs

//! Immutable per-invocation run context.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, FoldersSection};
use crate::types::Environment;

/// Everything a task needs to know about the current invocation.
///
/// Built once from the config defaults plus the `[target.<name>]` overrides of
/// the selected target, then shared read-only (`Arc<RunContext>`) with every
/// task. There are no setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    target: String,
    environment: Environment,
    compress: bool,
    project_root: PathBuf,
    dist_dir: PathBuf,
    assets: String,
}

impl RunContext {
    pub fn new(
        target: impl Into<String>,
        environment: Environment,
        compress: bool,
        project_root: impl Into<PathBuf>,
        folders: &FoldersSection,
    ) -> Self {
        let project_root = project_root.into();
        let dist_dir = project_root.join(&folders.dist);
        Self {
            target: target.into(),
            environment,
            compress,
            project_root,
            dist_dir,
            assets: folders.assets.clone(),
        }
    }

    /// Context for running `target`: config defaults, then target overrides.
    pub fn for_target(cfg: &ConfigFile, target: &str, project_root: impl Into<PathBuf>) -> Self {
        let overrides = cfg.target.get(target);
        let environment = overrides
            .and_then(|t| t.environment)
            .unwrap_or(cfg.environment);
        let compress = overrides.and_then(|t| t.compress).unwrap_or(cfg.compress);

        let ctx = Self::new(target, environment, compress, project_root, &cfg.folders);
        debug!(
            target = %ctx.target,
            environment = %ctx.environment,
            compress = ctx.compress,
            dist = ?ctx.dist_dir,
            "built run context"
        );
        ctx
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn compress(&self) -> bool {
        self.compress
    }

    /// Base directory for all source patterns.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Output root; everything the pipeline writes lives below it.
    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    pub fn assets(&self) -> &str {
        &self.assets
    }

    /// Variables exported to command-based transforms.
    pub fn command_env(&self) -> Vec<(&'static str, String)> {
        vec![
            ("ASSETDAG_ENV", self.environment.to_string()),
            ("ASSETDAG_COMPRESS", self.compress.to_string()),
            ("ASSETDAG_ASSETS", self.assets.clone()),
        ]
    }
}
