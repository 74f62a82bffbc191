// src/watch/event_handler.rs

//! Turns a debounced batch of changed paths into task triggers.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::DagGraph;
use crate::engine::TaskName;
use crate::watch::cache::FileCache;
use crate::watch::dag_filter::roots_only;
use crate::watch::path_utils::{is_under, relative_str};
use crate::watch::rules::{WatchRule, select_rules};

/// Stateful filter applied to every batch the watcher delivers.
///
/// For each path in the batch:
/// 1. paths outside the root or inside the output directory are ignored;
/// 2. matching rules are selected (more specific patterns win);
/// 3. `use_hash` rules are skipped when the file content is unchanged.
///
/// The union of the surviving rules' tasks is then reduced to the tasks no
/// other matched task depends on.
#[derive(Debug)]
pub struct WatchFilter {
    root: PathBuf,
    dist: PathBuf,
    rules: Vec<WatchRule>,
    graph: Arc<DagGraph>,
    cache: FileCache,
}

impl WatchFilter {
    /// `dist` is the output directory relative to `root`.
    pub fn new(
        root: impl Into<PathBuf>,
        dist: impl Into<PathBuf>,
        rules: Vec<WatchRule>,
        graph: Arc<DagGraph>,
    ) -> Self {
        Self {
            root: root.into(),
            dist: dist.into(),
            rules,
            graph,
            cache: FileCache::new(),
        }
    }

    pub fn rules(&self) -> &[WatchRule] {
        &self.rules
    }

    pub fn cache_mut(&mut self) -> &mut FileCache {
        &mut self.cache
    }

    /// Tasks to trigger for one batch, sorted and deduplicated.
    pub fn handle_batch(&mut self, paths: &[PathBuf]) -> Vec<TaskName> {
        let mut matched: BTreeSet<TaskName> = BTreeSet::new();

        for path in paths {
            let Some(rel) = relative_str(&self.root, path) else {
                warn!(?path, root = ?self.root, "could not relativize changed path");
                continue;
            };

            if is_under(&rel, &self.dist) {
                continue;
            }

            let selected = select_rules(&self.rules, &rel);
            if selected.is_empty() {
                continue;
            }

            let mut content_changed: Option<bool> = None;
            for rule in selected {
                if rule.use_hash() {
                    let changed =
                        *content_changed.get_or_insert_with(|| self.cache.has_changed(path));
                    if !changed {
                        info!(path = %rel, "content unchanged; skipping trigger");
                        continue;
                    }
                }
                debug!(path = %rel, tasks = ?rule.tasks(), "watch rule matched");
                matched.extend(rule.tasks().iter().cloned());
            }
        }

        let tasks = roots_only(&self.graph, &matched);
        if tasks.len() < matched.len() {
            debug!(?matched, ?tasks, "dropped tasks already pulled in by another match");
        }
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::TaskAction;

    fn graph() -> Arc<DagGraph> {
        let mut g = DagGraph::new();
        g.register("html", vec![], vec![], TaskAction::Noop);
        g.register("html-full", vec![], vec![], TaskAction::Noop);
        g.register("css", vec![], vec![], TaskAction::Noop);
        Arc::new(g)
    }

    fn rule(pattern: &str, task: &str) -> WatchRule {
        WatchRule::new(pattern, vec![task.to_string()], false).unwrap()
    }

    #[test]
    fn batch_collects_tasks_and_ignores_output_dir() {
        let rules = vec![
            rule("src/html/**/*", "html"),
            rule("src/html/layout/**/*", "html-full"),
            rule("**/*.css", "css"),
        ];
        let mut filter = WatchFilter::new("/site", "dist", rules, graph());

        let tasks = filter.handle_batch(&[
            PathBuf::from("/site/src/html/layout/head.html"),
            PathBuf::from("/site/dist/assets/css/site.css"),
        ]);
        assert_eq!(tasks, vec!["html-full".to_string()]);

        let tasks = filter.handle_batch(&[
            PathBuf::from("/site/src/html/a.html"),
            PathBuf::from("/site/src/css/a.css"),
        ]);
        assert_eq!(tasks, vec!["css".to_string(), "html".to_string()]);
    }

    #[test]
    fn paths_outside_root_are_ignored() {
        let mut filter = WatchFilter::new("/site", "dist", vec![rule("**/*", "html")], graph());
        assert!(filter.handle_batch(&[PathBuf::from("/elsewhere/x.html")]).is_empty());
    }

    #[test]
    fn hashed_rule_skips_unchanged_content() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        let file = root.join("src/a.html");
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, "<p>a</p>").unwrap();

        let rules = vec![WatchRule::new("src/**/*", vec!["html".into()], true).unwrap()];
        let mut filter = WatchFilter::new(&root, "dist", rules, graph());
        filter.cache_mut().prime([file.as_path()]);

        assert!(filter.handle_batch(std::slice::from_ref(&file)).is_empty());

        std::fs::write(&file, "<p>b</p>").unwrap();
        assert_eq!(filter.handle_batch(&[file]), vec!["html".to_string()]);
    }
}
