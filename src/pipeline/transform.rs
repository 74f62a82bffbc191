// src/pipeline/transform.rs

//! Transform descriptors and their executor.
//!
//! A pipeline is an ordered list of [`TransformStep`]s. Each step is data; the
//! only control flow lives in [`apply_transforms`], which walks the list and
//! dispatches on the variant. Adding a transform means adding a variant and a
//! match arm.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::config::RunContext;
use crate::errors::{AssetdagError, Result};
use crate::pipeline::command::run_filter;
use crate::pipeline::minify::minify_bytes;
use crate::types::Condition;

/// One step of an asset pipeline, tagged by `kind` in the config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransformStep {
    /// Check each file with an external command; content is unchanged.
    Lint {
        command: String,
        #[serde(default)]
        when: Condition,
    },
    /// Pipe each file through an external command.
    Compile {
        command: String,
        /// New extension for the output, e.g. `"css"`.
        #[serde(default)]
        extension: Option<String>,
        #[serde(default)]
        when: Condition,
    },
    /// Join every file, in order, into a single output file.
    Concat {
        file: String,
        #[serde(default)]
        when: Condition,
    },
    /// Minify with an external command, or the builtin text minifier.
    Minify {
        #[serde(default)]
        command: Option<String>,
        #[serde(default)]
        when: Condition,
    },
    /// Change the output file name.
    Rename {
        #[serde(default)]
        basename: Option<String>,
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default)]
        suffix: Option<String>,
        #[serde(default)]
        extension: Option<String>,
        #[serde(default)]
        when: Condition,
    },
}

impl TransformStep {
    pub fn kind(&self) -> &'static str {
        match self {
            TransformStep::Lint { .. } => "lint",
            TransformStep::Compile { .. } => "compile",
            TransformStep::Concat { .. } => "concat",
            TransformStep::Minify { .. } => "minify",
            TransformStep::Rename { .. } => "rename",
        }
    }

    pub fn when(&self) -> Condition {
        match self {
            TransformStep::Lint { when, .. }
            | TransformStep::Compile { when, .. }
            | TransformStep::Concat { when, .. }
            | TransformStep::Minify { when, .. }
            | TransformStep::Rename { when, .. } => *when,
        }
    }

    pub fn is_active(&self, compress: bool) -> bool {
        self.when().holds(compress)
    }
}

/// In-memory representation of one file flowing through a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    /// Path reported in errors (the source file, or the concat output name).
    pub source: PathBuf,
    /// Output path relative to the destination directory.
    pub relative: PathBuf,
    pub contents: Vec<u8>,
}

/// Apply `steps` in order. The first failing step aborts with a
/// [`AssetdagError::Transform`] naming the asset set and file.
pub async fn apply_transforms(
    asset: &str,
    steps: &[TransformStep],
    ctx: &RunContext,
    mut files: Vec<AssetFile>,
) -> Result<Vec<AssetFile>> {
    for step in steps {
        if !step.is_active(ctx.compress()) {
            debug!(
                asset = %asset,
                step = step.kind(),
                compress = ctx.compress(),
                "condition not met; skipping transform"
            );
            continue;
        }
        debug!(asset = %asset, step = step.kind(), files = files.len(), "applying transform");
        files = apply_step(asset, step, ctx, files).await?;
    }
    Ok(files)
}

async fn apply_step(
    asset: &str,
    step: &TransformStep,
    ctx: &RunContext,
    mut files: Vec<AssetFile>,
) -> Result<Vec<AssetFile>> {
    match step {
        TransformStep::Lint { command, .. } => {
            for file in &files {
                run_filter(command, &file.contents, &file.source, ctx)
                    .await
                    .map_err(|e| transform_error(asset, &file.source, e))?;
            }
            Ok(files)
        }
        TransformStep::Compile {
            command, extension, ..
        } => {
            for file in files.iter_mut() {
                file.contents = run_filter(command, &file.contents, &file.source, ctx)
                    .await
                    .map_err(|e| transform_error(asset, &file.source, e))?;
                if let Some(ext) = extension {
                    file.relative.set_extension(ext.trim_start_matches('.'));
                }
            }
            Ok(files)
        }
        TransformStep::Concat { file, .. } => {
            if files.is_empty() {
                return Ok(files);
            }
            let mut contents = Vec::new();
            for (i, f) in files.iter().enumerate() {
                if i > 0 {
                    contents.push(b'\n');
                }
                contents.extend_from_slice(&f.contents);
            }
            Ok(vec![AssetFile {
                source: PathBuf::from(file),
                relative: PathBuf::from(file),
                contents,
            }])
        }
        TransformStep::Minify { command, .. } => {
            for file in files.iter_mut() {
                file.contents = match command {
                    Some(command) => run_filter(command, &file.contents, &file.source, ctx)
                        .await
                        .map_err(|e| transform_error(asset, &file.source, e))?,
                    None => minify_bytes(&file.contents),
                };
            }
            Ok(files)
        }
        TransformStep::Rename {
            basename,
            prefix,
            suffix,
            extension,
            ..
        } => {
            for file in files.iter_mut() {
                file.relative = rename_path(
                    &file.relative,
                    basename.as_deref(),
                    prefix.as_deref(),
                    suffix.as_deref(),
                    extension.as_deref(),
                );
            }
            Ok(files)
        }
    }
}

fn transform_error(asset: &str, path: &Path, err: anyhow::Error) -> AssetdagError {
    AssetdagError::Transform {
        asset: asset.to_string(),
        path: path.to_path_buf(),
        cause: format!("{err:#}"),
    }
}

/// `dir/name.ext` -> `dir/{prefix}{basename|name}{suffix}.{extension|ext}`.
pub fn rename_path(
    relative: &Path,
    basename: Option<&str>,
    prefix: Option<&str>,
    suffix: Option<&str>,
    extension: Option<&str>,
) -> PathBuf {
    let stem = basename
        .map(str::to_string)
        .or_else(|| relative.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_default();
    let ext = extension
        .map(|e| e.trim_start_matches('.').to_string())
        .or_else(|| relative.extension().map(|e| e.to_string_lossy().into_owned()));

    let mut name = format!("{}{}{}", prefix.unwrap_or(""), stem, suffix.unwrap_or(""));
    if let Some(ext) = ext.filter(|e| !e.is_empty()) {
        name.push('.');
        name.push_str(&ext);
    }

    match relative.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Where a source with destination-relative path `relative` ends up.
///
/// Returns the predicted output path and whether the pipeline concatenates
/// (in which case every source maps to the same output).
pub fn predict_output(steps: &[TransformStep], compress: bool, relative: &Path) -> (PathBuf, bool) {
    let mut out = relative.to_path_buf();
    let mut concatenated = false;

    for step in steps.iter().filter(|s| s.is_active(compress)) {
        match step {
            TransformStep::Compile {
                extension: Some(ext),
                ..
            } => {
                out.set_extension(ext.trim_start_matches('.'));
            }
            TransformStep::Concat { file, .. } => {
                out = PathBuf::from(file);
                concatenated = true;
            }
            TransformStep::Rename {
                basename,
                prefix,
                suffix,
                extension,
                ..
            } => {
                out = rename_path(
                    &out,
                    basename.as_deref(),
                    prefix.as_deref(),
                    suffix.as_deref(),
                    extension.as_deref(),
                );
            }
            _ => {}
        }
    }

    (out, concatenated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_applies_suffix_and_extension() {
        let out = rename_path(Path::new("pages/main.scss"), None, None, Some(".min"), Some(".css"));
        assert_eq!(out, PathBuf::from("pages/main.min.css"));
    }

    #[test]
    fn rename_keeps_extension_when_not_given() {
        let out = rename_path(Path::new("app.js"), Some("bundle"), Some("v1-"), None, None);
        assert_eq!(out, PathBuf::from("v1-bundle.js"));
    }

    #[test]
    fn prediction_follows_only_active_steps() {
        let steps = vec![
            TransformStep::Compile {
                command: "cat".into(),
                extension: Some("css".into()),
                when: Condition::Always,
            },
            TransformStep::Rename {
                basename: None,
                prefix: None,
                suffix: Some(".min".into()),
                extension: None,
                when: Condition::Compress,
            },
        ];

        let (dev, concat) = predict_output(&steps, false, Path::new("a/site.scss"));
        assert_eq!(dev, PathBuf::from("a/site.css"));
        assert!(!concat);

        let (dist, _) = predict_output(&steps, true, Path::new("a/site.scss"));
        assert_eq!(dist, PathBuf::from("a/site.min.css"));
    }

    #[test]
    fn transform_steps_deserialize_from_inline_tables() {
        #[derive(Deserialize)]
        struct Wrapper {
            transforms: Vec<TransformStep>,
        }

        let w: Wrapper = toml::from_str(
            r#"
transforms = [
  { kind = "compile", command = "sass --stdin", extension = "css" },
  { kind = "concat", file = "plugins.min.css", when = "compress" },
  { kind = "minify", when = "compress" },
]
"#,
        )
        .unwrap();

        assert_eq!(w.transforms.len(), 3);
        assert_eq!(w.transforms[1].when(), Condition::Compress);
        assert_eq!(
            w.transforms[2],
            TransformStep::Minify {
                command: None,
                when: Condition::Compress
            }
        );
    }
}
