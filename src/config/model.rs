// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::pipeline::transform::TransformStep;
use crate::types::{Environment, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// environment = "dev"
/// compress = false
///
/// [folders]
/// dist = "dist"
/// assets = "assets"
///
/// [plugins]
/// css = ["node_modules/bootstrap/dist/css/bootstrap.min.css"]
///
/// [asset.plugins-css]
/// plugins = "css"
/// destination = "{assets}/css"
/// transforms = [{ kind = "concat", file = "plugins.min.css", when = "compress" }]
///
/// [task.build]
/// sequence = [["clean"], ["plugins-css"]]
///
/// [task.clean]
/// action = "clean"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub compress: bool,

    #[serde(default)]
    pub folders: FoldersSection,

    /// Named vendor file lists (`js`, `jsConcat`, `css`, `fonts`, `img`, ...).
    #[serde(default)]
    pub plugins: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub server: ServerSection,

    /// Runtime behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Asset sets from `[asset.<name>]`. Each one is also a task.
    #[serde(default)]
    pub asset: BTreeMap<String, AssetSetConfig>,

    /// Tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// Watch rules from `[[watch]]`.
    #[serde(default)]
    pub watch: Vec<WatchRuleConfig>,

    /// Per-target overrides from `[target.<name>]`.
    #[serde(default)]
    pub target: BTreeMap<String, TargetConfig>,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>`, so holders can rely on
/// every reference (tasks, asset sets, plugin lists) resolving and on the task
/// graph being acyclic.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub environment: Environment,
    pub compress: bool,
    pub folders: FoldersSection,
    pub plugins: BTreeMap<String, Vec<String>>,
    pub server: ServerSection,
    pub config: ConfigSection,
    pub asset: BTreeMap<String, AssetSetConfig>,
    pub task: BTreeMap<String, TaskConfig>,
    pub watch: Vec<WatchRuleConfig>,
    pub target: BTreeMap<String, TargetConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            environment: raw.environment,
            compress: raw.compress,
            folders: raw.folders,
            plugins: raw.plugins,
            server: raw.server,
            config: raw.config,
            asset: raw.asset,
            task: raw.task,
            watch: raw.watch,
            target: raw.target,
        }
    }

    /// True if `name` is either an explicit task or an asset set.
    pub fn has_task(&self, name: &str) -> bool {
        self.task.contains_key(name) || self.asset.contains_key(name)
    }
}

/// `[folders]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct FoldersSection {
    /// Output root, relative to the project root.
    #[serde(default = "default_dist")]
    pub dist: PathBuf,

    /// Assets subfolder inside the output root; `{assets}` in destinations.
    #[serde(default = "default_assets")]
    pub assets: String,
}

fn default_dist() -> PathBuf {
    PathBuf::from("dist")
}

fn default_assets() -> String {
    "assets".to_string()
}

impl Default for FoldersSection {
    fn default() -> Self {
        Self {
            dist: default_dist(),
            assets: default_assets(),
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub livereload: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_true() -> bool {
    true
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            livereload: true,
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"queue"` (default) or `"cancel"`.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued runs to remember.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// Events arriving within this window collapse into one batch.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Default `use_hash` for watch rules that do not set it.
    #[serde(default)]
    pub use_hash: bool,
}

fn default_queue_length() -> usize {
    1
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
            debounce_ms: default_debounce_ms(),
            use_hash: false,
        }
    }
}

/// `[asset.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AssetSetConfig {
    /// Ordered glob patterns; a leading `!` subtracts from earlier matches.
    #[serde(default)]
    pub sources: Vec<String>,

    /// Name of a `[plugins]` list appended after `sources`.
    #[serde(default)]
    pub plugins: Option<String>,

    /// Destination relative to the output root. `{assets}` is expanded.
    #[serde(default)]
    pub destination: String,

    #[serde(default)]
    pub transforms: Vec<TransformStep>,

    /// Skip sources whose output is newer than the source.
    #[serde(default)]
    pub incremental: bool,

    /// Push a live-reload notification after writing.
    #[serde(default)]
    pub reload: bool,

    /// Derive a watch rule from this set's own source patterns.
    #[serde(default)]
    pub watch: bool,
}

/// Builtin task bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinAction {
    /// Remove the output root.
    Clean,
    /// Start the dev server (long-lived).
    Serve,
    /// Start the file watcher (long-lived).
    Watch,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskConfig {
    /// Dependency list: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default)]
    pub action: Option<BuiltinAction>,

    /// Run the named asset set.
    #[serde(default)]
    pub build: Option<String>,

    /// With `build`: process every source, ignoring `incremental`.
    #[serde(default)]
    pub full: bool,

    /// Groups run one after another; members of a group run in parallel.
    #[serde(default)]
    pub sequence: Option<Vec<Vec<String>>>,

    /// A single parallel group.
    #[serde(default)]
    pub parallel: Option<Vec<String>>,
}

impl TaskConfig {
    /// Composite steps in execution order (`parallel` is a one-step sequence).
    pub fn steps(&self) -> Vec<Vec<String>> {
        match (&self.sequence, &self.parallel) {
            (Some(seq), _) => seq.clone(),
            (None, Some(group)) => vec![group.clone()],
            (None, None) => Vec::new(),
        }
    }

    /// Number of bodies declared; validation requires at most one.
    pub(crate) fn body_count(&self) -> usize {
        [
            self.action.is_some(),
            self.build.is_some(),
            self.sequence.is_some(),
            self.parallel.is_some(),
        ]
        .iter()
        .filter(|b| **b)
        .count()
    }
}

/// `[[watch]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchRuleConfig {
    pub pattern: String,

    pub tasks: Vec<String>,

    /// Only trigger when the changed file's content actually changed.
    #[serde(default)]
    pub use_hash: Option<bool>,
}

/// `[target.<name>]` overrides.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TargetConfig {
    #[serde(default)]
    pub environment: Option<Environment>,

    #[serde(default)]
    pub compress: Option<bool>,
}
