// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::DagGraph;
use crate::engine::{RuntimeEvent, TriggerReason};
use crate::fs::RealFileSystem;
use crate::pipeline::resolve_sources;
use crate::watch::event_handler::WatchFilter;
use crate::watch::rules::WatchRule;

/// Everything the watcher needs, resolved up front.
#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub root: PathBuf,
    /// Output directory relative to `root`; changes below it are ignored.
    pub dist: PathBuf,
    pub rules: Vec<WatchRule>,
    pub graph: Arc<DagGraph>,
    pub debounce: Duration,
}

/// Handle for the filesystem watcher.
///
/// Keeps the debouncer (and its notify watcher) alive. Dropping this handle
/// stops file watching.
pub struct WatcherHandle {
    _inner: Debouncer<RecommendedWatcher>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `settings.root` recursively and send one
/// [`RuntimeEvent::TaskTriggered`] per selected task for every debounced
/// batch of changes.
pub fn spawn_watcher(
    settings: WatchSettings,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    // Canonicalize once so we have a stable base path.
    let root = settings
        .root
        .canonicalize()
        .unwrap_or_else(|_| settings.root.clone());

    let dirs = watch_dirs(&root, &settings.rules);
    let mut filter = WatchFilter::new(&root, &settings.dist, settings.rules, settings.graph);
    prime_hashes(&mut filter, &root);

    // Channel from the blocking debouncer thread into the async world.
    let (batch_tx, mut batch_rx) = mpsc::unbounded_channel::<Vec<PathBuf>>();

    let mut debouncer = new_debouncer(settings.debounce, move |res: DebounceEventResult| {
        match res {
            Ok(events) => {
                let paths: Vec<PathBuf> = events.into_iter().map(|e| e.path).collect();
                if let Err(err) = batch_tx.send(paths) {
                    warn!("failed to forward debounced events: {err}");
                }
            }
            Err(err) => warn!("file watch error: {err:?}"),
        }
    })
    .context("creating file watcher")?;

    for dir in dirs.iter() {
        debouncer
            .watcher()
            .watch(dir, RecursiveMode::Recursive)
            .with_context(|| format!("watching {}", dir.display()))?;
    }

    info!(
        root = ?root,
        dirs = ?dirs,
        debounce_ms = settings.debounce.as_millis() as u64,
        "file watcher started"
    );

    tokio::spawn(async move {
        while let Some(paths) = batch_rx.recv().await {
            debug!(changed = paths.len(), "received debounced batch");

            for task in filter.handle_batch(&paths) {
                info!(task = %task, "file change -> triggering task");
                let event = RuntimeEvent::TaskTriggered {
                    task,
                    reason: TriggerReason::FileWatch,
                };
                if runtime_tx.send(event).await.is_err() {
                    debug!("runtime channel closed; stopping watcher loop");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: debouncer })
}

/// Directories to watch recursively: each rule's literal prefix, or its
/// closest existing ancestor below `root`, with nested entries folded into
/// their parents.
fn watch_dirs(root: &Path, rules: &[WatchRule]) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = rules
        .iter()
        .map(|rule| existing_ancestor(root, &root.join(rule.prefix())))
        .collect();
    dirs.sort();
    dirs.dedup();

    let mut outermost: Vec<PathBuf> = Vec::new();
    for dir in dirs {
        if !outermost.iter().any(|kept| dir.starts_with(kept)) {
            outermost.push(dir);
        }
    }
    outermost
}

fn existing_ancestor(root: &Path, dir: &Path) -> PathBuf {
    dir.ancestors()
        .take_while(|a| a.starts_with(root))
        .find(|a| a.is_dir())
        .unwrap_or(root)
        .to_path_buf()
}

/// Record current content hashes for files watched by `use_hash` rules, so
/// the first event on an untouched file does not count as a change.
fn prime_hashes(filter: &mut WatchFilter, root: &Path) {
    let patterns: Vec<_> = filter
        .rules()
        .iter()
        .filter(|r| r.use_hash())
        .map(|r| r.pattern().clone())
        .collect();
    if patterns.is_empty() {
        return;
    }

    match resolve_sources(&RealFileSystem, root, &patterns) {
        Ok(files) => {
            let paths: Vec<PathBuf> = files.into_iter().map(|f| f.path).collect();
            filter.cache_mut().prime(paths.iter().map(PathBuf::as_path));
        }
        Err(err) => warn!(error = %err, "could not list watched files for hashing"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str) -> WatchRule {
        WatchRule::new(pattern, vec!["t".to_string()], false).unwrap()
    }

    #[test]
    fn watches_rule_prefixes_not_the_whole_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        for dir in ["src/html/layout", "src/scss", "node_modules/bootstrap"] {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }

        let rules = vec![
            rule("src/html/**/*"),
            rule("src/html/layout/**/*"),
            rule("src/scss/**/*.scss"),
        ];
        assert_eq!(
            watch_dirs(root, &rules),
            vec![root.join("src/html"), root.join("src/scss")]
        );
    }

    #[test]
    fn missing_prefix_watches_its_closest_existing_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("src/img")).unwrap();

        let rules = vec![rule("src/img/**/*"), rule("src/fonts/**/*")];
        assert_eq!(watch_dirs(root, &rules), vec![root.join("src")]);
    }

    #[test]
    fn unanchored_patterns_fall_back_to_the_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("src/js")).unwrap();

        let rules = vec![rule("src/js/**/*.js"), rule("**/*.css")];
        assert_eq!(watch_dirs(root, &rules), vec![root.to_path_buf()]);
    }
}
