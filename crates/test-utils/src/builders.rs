#![allow(dead_code)]

use assetdag::config::{
    AssetSetConfig, BuiltinAction, ConfigFile, RawConfigFile, TargetConfig, TaskConfig,
    WatchRuleConfig,
};
use assetdag::errors::Result;
use assetdag::pipeline::TransformStep;
use assetdag::types::Environment;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn compress(mut self, val: bool) -> Self {
        self.config.compress = val;
        self
    }

    pub fn with_dist(mut self, dist: &str) -> Self {
        self.config.folders.dist = dist.into();
        self
    }

    pub fn with_plugins(mut self, name: &str, patterns: &[&str]) -> Self {
        self.config.plugins.insert(
            name.to_string(),
            patterns.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    pub fn with_asset(mut self, name: &str, asset: AssetSetConfig) -> Self {
        self.config.asset.insert(name.to_string(), asset);
        self
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_watch(mut self, pattern: &str, tasks: &[&str]) -> Self {
        self.config.watch.push(WatchRuleConfig {
            pattern: pattern.to_string(),
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
            use_hash: None,
        });
        self
    }

    pub fn with_target(mut self, name: &str, environment: Environment, compress: bool) -> Self {
        self.config.target.insert(
            name.to_string(),
            TargetConfig {
                environment: Some(environment),
                compress: Some(compress),
            },
        );
        self
    }

    pub fn with_queue_length(mut self, len: usize) -> Self {
        self.config.config.queue_length = len;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `AssetSetConfig`.
pub struct AssetSetBuilder {
    asset: AssetSetConfig,
}

impl AssetSetBuilder {
    pub fn new(destination: &str) -> Self {
        Self {
            asset: AssetSetConfig {
                destination: destination.to_string(),
                ..AssetSetConfig::default()
            },
        }
    }

    pub fn source(mut self, pattern: &str) -> Self {
        self.asset.sources.push(pattern.to_string());
        self
    }

    pub fn plugins(mut self, list: &str) -> Self {
        self.asset.plugins = Some(list.to_string());
        self
    }

    pub fn transform(mut self, step: TransformStep) -> Self {
        self.asset.transforms.push(step);
        self
    }

    pub fn incremental(mut self) -> Self {
        self.asset.incremental = true;
        self
    }

    pub fn reload(mut self) -> Self {
        self.asset.reload = true;
        self
    }

    pub fn watch(mut self) -> Self {
        self.asset.watch = true;
        self
    }

    pub fn build(self) -> AssetSetConfig {
        self.asset
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    /// A task with no body: a pure composite of its `after` list.
    pub fn new() -> Self {
        Self {
            task: TaskConfig::default(),
        }
    }

    pub fn action(action: BuiltinAction) -> Self {
        Self::new().with_action(action)
    }

    pub fn build_asset(asset: &str) -> Self {
        let mut b = Self::new();
        b.task.build = Some(asset.to_string());
        b
    }

    pub fn sequence(groups: &[&[&str]]) -> Self {
        let mut b = Self::new();
        b.task.sequence = Some(
            groups
                .iter()
                .map(|g| g.iter().map(|t| t.to_string()).collect())
                .collect(),
        );
        b
    }

    pub fn parallel(members: &[&str]) -> Self {
        let mut b = Self::new();
        b.task.parallel = Some(members.iter().map(|t| t.to_string()).collect());
        b
    }

    pub fn with_action(mut self, action: BuiltinAction) -> Self {
        self.task.action = Some(action);
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn full(mut self) -> Self {
        self.task.full = true;
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

impl Default for TaskConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
