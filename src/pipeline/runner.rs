// src/pipeline/runner.rs

//! Executes one asset set: resolve, filter, transform, write, reload.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, info};

use crate::config::RunContext;
use crate::errors::{AssetdagError, Result};
use crate::fs::FileSystem;
use crate::pipeline::asset_set::{AssetSet, output_path};
use crate::pipeline::resolve::{SourceFile, resolve_sources};
use crate::pipeline::transform::{AssetFile, apply_transforms, predict_output};
use crate::server::LiveReload;

/// Result of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Absolute paths written, in write order.
    pub files_written: Vec<PathBuf>,
    /// Sources skipped by incremental filtering.
    pub unchanged: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineRunner {
    fs: Arc<dyn FileSystem>,
    ctx: Arc<RunContext>,
}

impl PipelineRunner {
    pub fn new(fs: Arc<dyn FileSystem>, ctx: Arc<RunContext>) -> Self {
        Self { fs, ctx }
    }

    /// Run `set`. `full` forces every resolved source through, even when the
    /// set is incremental.
    pub async fn execute(
        &self,
        set: &AssetSet,
        full: bool,
        reload: Option<&LiveReload>,
    ) -> Result<PipelineReport> {
        let root = self.ctx.project_root();
        let sources = resolve_sources(self.fs.as_ref(), root, &set.sources).map_err(|e| {
            AssetdagError::Transform {
                asset: set.name.clone(),
                path: root.to_path_buf(),
                cause: format!("{e:#}"),
            }
        })?;

        let mut report = PipelineReport::default();
        if sources.is_empty() {
            debug!(asset = %set.name, "no sources resolved; nothing to do");
            return Ok(report);
        }

        let total = sources.len();
        let sources = if set.incremental && !full {
            self.changed_only(set, sources)?
        } else {
            sources
        };
        report.unchanged = total - sources.len();

        if sources.is_empty() {
            info!(asset = %set.name, unchanged = report.unchanged, "asset set up to date");
            return Ok(report);
        }

        let mut files = Vec::with_capacity(sources.len());
        for source in sources {
            let contents = self.fs.read(&source.path).map_err(|e| AssetdagError::Transform {
                asset: set.name.clone(),
                path: source.path.clone(),
                cause: format!("{e:#}"),
            })?;
            files.push(AssetFile {
                source: source.path,
                relative: source.relative,
                contents,
            });
        }

        let outputs = apply_transforms(&set.name, &set.transforms, &self.ctx, files).await?;

        for file in outputs {
            let target = output_path(self.ctx.dist_dir(), &set.destination, &file.relative)
                .ok_or_else(|| AssetdagError::Write {
                    asset: set.name.clone(),
                    path: file.relative.clone(),
                    cause: "output path escapes the destination directory".to_string(),
                })?;

            self.fs
                .write(&target, &file.contents)
                .map_err(|e| AssetdagError::Write {
                    asset: set.name.clone(),
                    path: target.clone(),
                    cause: format!("{e:#}"),
                })?;
            debug!(asset = %set.name, path = ?target, bytes = file.contents.len(), "wrote output");
            report.files_written.push(target);
        }

        info!(
            asset = %set.name,
            written = report.files_written.len(),
            unchanged = report.unchanged,
            "asset set built"
        );

        if set.reload {
            if let Some(reload) = reload {
                reload.reload();
            }
        }

        Ok(report)
    }

    /// Incremental filtering: keep sources newer than their predicted output.
    ///
    /// When the active transforms concatenate, every source feeds the same
    /// output, so either all sources are kept (one changed) or none.
    fn changed_only(&self, set: &AssetSet, sources: Vec<SourceFile>) -> Result<Vec<SourceFile>> {
        let mut keep = Vec::with_capacity(sources.len());
        let mut concatenated = false;

        for source in &sources {
            let (relative, concat) =
                predict_output(&set.transforms, self.ctx.compress(), &source.relative);
            concatenated |= concat;
            let is_stale = match output_path(self.ctx.dist_dir(), &set.destination, &relative) {
                Some(dest) => self.is_stale(set, source, &dest)?,
                None => true,
            };
            keep.push(is_stale);
        }

        if concatenated {
            return Ok(if keep.iter().any(|k| *k) { sources } else { Vec::new() });
        }

        Ok(sources
            .into_iter()
            .zip(keep)
            .filter_map(|(source, k)| k.then_some(source))
            .collect())
    }

    fn is_stale(&self, set: &AssetSet, source: &SourceFile, dest: &std::path::Path) -> Result<bool> {
        let mtime = |path: &std::path::Path| -> Result<Option<SystemTime>> {
            self.fs.modified(path).map_err(|e| AssetdagError::Transform {
                asset: set.name.clone(),
                path: path.to_path_buf(),
                cause: format!("{e:#}"),
            })
        };

        let stale = match (mtime(&source.path)?, mtime(dest)?) {
            (Some(src), Some(dst)) => src > dst,
            _ => true,
        };
        if !stale {
            debug!(asset = %set.name, source = %source.root_relative, "output newer than source; skipping");
        }
        Ok(stale)
    }
}
