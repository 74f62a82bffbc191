// src/pipeline/asset_set.rs

//! Compiled asset sets: the `[asset.<name>]` table after validation.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::model::{AssetSetConfig, ConfigFile};
use crate::errors::{AssetdagError, Result};
use crate::pipeline::resolve::SourcePattern;
use crate::pipeline::transform::TransformStep;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]*)\}").expect("placeholder regex is valid"));

/// One asset set ready to run.
#[derive(Debug, Clone)]
pub struct AssetSet {
    pub name: String,
    /// Own `sources` followed by the referenced `[plugins]` list.
    pub sources: Vec<SourcePattern>,
    /// Relative to the output root, already expanded.
    pub destination: PathBuf,
    pub transforms: Vec<TransformStep>,
    pub incremental: bool,
    pub reload: bool,
    pub watch: bool,
}

impl AssetSet {
    pub fn from_config(
        name: &str,
        cfg: &AssetSetConfig,
        plugins: &BTreeMap<String, Vec<String>>,
        assets: &str,
    ) -> Result<Self> {
        let mut raw_patterns: Vec<&str> = cfg.sources.iter().map(String::as_str).collect();
        if let Some(list) = &cfg.plugins {
            let entries = plugins.get(list).ok_or_else(|| {
                AssetdagError::ConfigError(format!(
                    "asset set '{name}' references unknown plugins list '{list}'"
                ))
            })?;
            raw_patterns.extend(entries.iter().map(String::as_str));
        }

        let mut sources = Vec::with_capacity(raw_patterns.len());
        for raw in raw_patterns {
            let pattern = SourcePattern::parse(raw).map_err(|e| {
                AssetdagError::ConfigError(format!("asset set '{name}': {e:#}"))
            })?;
            sources.push(pattern);
        }

        let destination = expand_destination(&cfg.destination, assets)
            .map_err(|msg| AssetdagError::ConfigError(format!("asset set '{name}': {msg}")))?;

        for step in &cfg.transforms {
            check_step(step)
                .map_err(|msg| AssetdagError::ConfigError(format!("asset set '{name}': {msg}")))?;
        }

        Ok(Self {
            name: name.to_string(),
            sources,
            destination,
            transforms: cfg.transforms.clone(),
            incremental: cfg.incremental,
            reload: cfg.reload,
            watch: cfg.watch,
        })
    }
}

/// Compile every `[asset.<name>]` table.
pub fn compile_asset_sets(cfg: &ConfigFile) -> Result<BTreeMap<String, AssetSet>> {
    cfg.asset
        .iter()
        .map(|(name, set)| {
            AssetSet::from_config(name, set, &cfg.plugins, &cfg.folders.assets)
                .map(|compiled| (name.clone(), compiled))
        })
        .collect()
}

/// Expand `{assets}` and check the result stays below the output root.
pub fn expand_destination(template: &str, assets: &str) -> std::result::Result<PathBuf, String> {
    let mut unknown = None;
    let expanded = PLACEHOLDER.replace_all(template, |caps: &regex::Captures<'_>| {
        match &caps[1] {
            "assets" => assets.to_string(),
            other => {
                unknown.get_or_insert_with(|| other.to_string());
                String::new()
            }
        }
    });
    if let Some(name) = unknown {
        return Err(format!("unknown placeholder '{{{name}}}' in destination '{template}'"));
    }

    let path = PathBuf::from(expanded.as_ref());
    let inside = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !inside {
        return Err(format!(
            "destination '{template}' must stay inside the output root"
        ));
    }
    Ok(path)
}

fn check_step(step: &TransformStep) -> std::result::Result<(), String> {
    match step {
        TransformStep::Concat { file, .. } => check_file_name("concat file", file),
        TransformStep::Compile {
            extension: Some(ext),
            ..
        } => check_file_name("extension", ext.trim_start_matches('.')),
        TransformStep::Rename {
            basename,
            prefix,
            suffix,
            extension,
            ..
        } => {
            if let Some(b) = basename {
                check_file_name("rename basename", b)?;
            }
            for (label, part) in [("rename prefix", prefix), ("rename suffix", suffix)] {
                if part.as_deref().is_some_and(|p| p.contains(['/', '\\'])) {
                    return Err(format!("{label} must not contain path separators"));
                }
            }
            if let Some(ext) = extension {
                check_file_name("rename extension", ext.trim_start_matches('.'))?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn check_file_name(label: &str, name: &str) -> std::result::Result<(), String> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(format!("{label} '{name}' must be a plain file name"));
    }
    Ok(())
}

/// `dest` joined under `dist`, refusing anything that climbs out.
pub fn output_path(dist: &Path, destination: &Path, relative: &Path) -> Option<PathBuf> {
    let inside = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    inside.then(|| dist.join(destination).join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Condition;

    #[test]
    fn destination_expands_assets_placeholder() {
        let dest = expand_destination("{assets}/css", "static").unwrap();
        assert_eq!(dest, PathBuf::from("static/css"));
        assert_eq!(expand_destination("", "assets").unwrap(), PathBuf::new());
    }

    #[test]
    fn destination_must_stay_under_output_root() {
        assert!(expand_destination("../outside", "assets").is_err());
        assert!(expand_destination("/etc", "assets").is_err());
        assert!(expand_destination("{assets}/../../x", "assets").is_err());
    }

    #[test]
    fn unknown_placeholder_is_rejected() {
        let err = expand_destination("{asset}/js", "assets").unwrap_err();
        assert!(err.contains("{asset}"), "got: {err}");
    }

    #[test]
    fn plugins_list_is_appended_after_sources() {
        let mut plugins = BTreeMap::new();
        plugins.insert("css".to_string(), vec!["vendor/a.css".to_string()]);
        let cfg = AssetSetConfig {
            sources: vec!["src/extra.css".into()],
            plugins: Some("css".into()),
            destination: "{assets}/css".into(),
            ..Default::default()
        };

        let set = AssetSet::from_config("plugins-css", &cfg, &plugins, "assets").unwrap();
        let raws: Vec<_> = set.sources.iter().map(|p| p.raw()).collect();
        assert_eq!(raws, vec!["src/extra.css", "vendor/a.css"]);
    }

    #[test]
    fn concat_file_with_separator_is_rejected() {
        let cfg = AssetSetConfig {
            destination: "js".into(),
            transforms: vec![TransformStep::Concat {
                file: "../app.js".into(),
                when: Condition::Always,
            }],
            ..Default::default()
        };
        let err = AssetSet::from_config("js", &cfg, &BTreeMap::new(), "assets").unwrap_err();
        assert!(matches!(err, AssetdagError::ConfigError(_)));
    }

    #[test]
    fn output_path_refuses_parent_components() {
        let dist = Path::new("/site/dist");
        assert_eq!(
            output_path(dist, Path::new("assets/js"), Path::new("a/b.js")),
            Some(PathBuf::from("/site/dist/assets/js/a/b.js"))
        );
        assert_eq!(output_path(dist, Path::new("assets"), Path::new("../x.js")), None);
    }
}
