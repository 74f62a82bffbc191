// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling `[[watch]]` rules and rules derived from watched asset sets.
//! - Picking the most specific rules for a changed path.
//! - Wiring up a debounced cross-platform watcher (`notify`).
//! - Optionally skipping triggers when file content did not change.
//!
//! It only turns filesystem changes into task-level triggers; running them is
//! the engine's job.

pub mod cache;
pub mod dag_filter;
pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod rules;
pub mod watcher;

pub use event_handler::WatchFilter;
pub use rules::{WatchRule, build_watch_rules, select_rules};
pub use watcher::{WatchSettings, WatcherHandle, spawn_watcher};
