// src/config/validate.rs

use std::path::Component;

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dag::{DagGraph, ExecutionPlan};
use crate::errors::{AssetdagError, Result};
use crate::pipeline::compile_asset_sets;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::AssetdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let cfg = ConfigFile::new_unchecked(raw);
        compile_asset_sets(&cfg)?;
        validate_dag(&cfg)?;
        Ok(cfg)
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_task_names(cfg)?;
    validate_task_references(cfg)?;
    validate_watch_rules(cfg)?;
    validate_targets(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> AssetdagError {
    AssetdagError::ConfigError(msg.into())
}

fn is_task(cfg: &RawConfigFile, name: &str) -> bool {
    cfg.task.contains_key(name) || cfg.asset.contains_key(name)
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() && cfg.asset.is_empty() {
        return Err(config_error(
            "config must contain at least one [task.<name>] or [asset.<name>] section",
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.queue_length == 0 {
        return Err(config_error("[config].queue_length must be >= 1 (got 0)"));
    }

    let dist = &cfg.folders.dist;
    let unsafe_dist = dist.as_os_str().is_empty()
        || dist.is_absolute()
        || dist
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
    if unsafe_dist {
        return Err(config_error(format!(
            "[folders].dist must be a relative path below the project root (got {:?})",
            dist
        )));
    }

    if cfg.folders.assets.contains("..") {
        return Err(config_error(format!(
            "[folders].assets must not contain '..' (got '{}')",
            cfg.folders.assets
        )));
    }

    Ok(())
}

fn validate_task_names(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.task.keys() {
        if cfg.asset.contains_key(name) {
            return Err(config_error(format!(
                "'{name}' is defined both as [task.{name}] and [asset.{name}]"
            )));
        }
    }

    for (name, task) in cfg.task.iter() {
        if task.body_count() > 1 {
            return Err(config_error(format!(
                "task '{name}' declares more than one of `action`, `build`, `sequence`, `parallel`"
            )));
        }
        if task.full && task.build.is_none() {
            return Err(config_error(format!(
                "task '{name}' sets `full` without `build`"
            )));
        }
    }
    Ok(())
}

fn validate_task_references(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if !is_task(cfg, dep) {
                return Err(config_error(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(config_error(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }

        for (i, step) in task.steps().iter().enumerate() {
            if step.is_empty() {
                return Err(config_error(format!(
                    "task '{name}' has an empty group at position {i}"
                )));
            }
            for member in step {
                if !is_task(cfg, member) {
                    return Err(config_error(format!(
                        "task '{name}' references unknown task '{member}'"
                    )));
                }
                if member == name {
                    return Err(config_error(format!(
                        "task '{name}' cannot contain itself"
                    )));
                }
            }
        }

        if let Some(asset) = &task.build {
            if !cfg.asset.contains_key(asset) {
                return Err(config_error(format!(
                    "task '{name}' builds unknown asset set '{asset}'"
                )));
            }
        }
    }
    Ok(())
}

fn validate_watch_rules(cfg: &RawConfigFile) -> Result<()> {
    for rule in cfg.watch.iter() {
        Glob::new(rule.pattern.trim_start_matches("./")).map_err(|e| {
            config_error(format!("invalid watch pattern '{}': {e}", rule.pattern))
        })?;

        if rule.tasks.is_empty() {
            return Err(config_error(format!(
                "watch rule '{}' lists no tasks",
                rule.pattern
            )));
        }
        for task in rule.tasks.iter() {
            if !is_task(cfg, task) {
                return Err(config_error(format!(
                    "watch rule '{}' references unknown task '{}'",
                    rule.pattern, task
                )));
            }
        }
    }
    Ok(())
}

fn validate_targets(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.target.keys() {
        if !is_task(cfg, name) {
            return Err(config_error(format!(
                "[target.{name}] does not name a task"
            )));
        }
    }
    Ok(())
}

/// Every task's execution plan must be acyclic.
fn validate_dag(cfg: &ConfigFile) -> Result<()> {
    let graph = DagGraph::from_config(cfg);
    for name in graph.tasks() {
        ExecutionPlan::for_root(&graph, name)?;
    }
    Ok(())
}
