// src/config/mod.rs

//! Configuration loading and validation for assetdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate references, patterns and DAG correctness (`validate.rs`).
//! - Build the immutable per-invocation [`RunContext`] (`context.rs`).

pub mod context;
pub mod loader;
pub mod model;
pub mod validate;

pub use context::RunContext;
pub use loader::{default_config_path, load_and_validate, load_from_path, load_from_str, project_root};
pub use model::{
    AssetSetConfig, BuiltinAction, ConfigFile, ConfigSection, FoldersSection, RawConfigFile,
    ServerSection, TargetConfig, TaskConfig, WatchRuleConfig,
};
