// src/watch/rules.rs

//! Watch rules: which tasks a changed path re-runs.
//!
//! Rules come from `[[watch]]` entries and from asset sets with
//! `watch = true` (one rule per positive source pattern, excluding the set's
//! own negated patterns).
//!
//! When several rules match one path, a rule whose literal directory prefix
//! is a strict ancestor of another matching rule's prefix is overridden: a
//! change to `src/html/layout/x.html` matched by both `src/html/**/*` and
//! `src/html/layout/**/*` only triggers the tasks of the latter.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::model::ConfigFile;
use crate::engine::TaskName;
use crate::errors::{AssetdagError, Result};
use crate::pipeline::{AssetSet, SourcePattern};

#[derive(Debug, Clone)]
pub struct WatchRule {
    pattern: SourcePattern,
    excludes: Vec<SourcePattern>,
    tasks: Vec<TaskName>,
    use_hash: bool,
}

impl WatchRule {
    pub fn new(pattern: &str, tasks: Vec<TaskName>, use_hash: bool) -> Result<Self> {
        let pattern = SourcePattern::parse(pattern)
            .map_err(|e| AssetdagError::ConfigError(format!("watch rule: {e:#}")))?;
        Ok(Self {
            pattern,
            excludes: Vec::new(),
            tasks,
            use_hash,
        })
    }

    pub fn with_excludes(mut self, excludes: Vec<SourcePattern>) -> Self {
        self.excludes = excludes;
        self
    }

    pub fn pattern(&self) -> &SourcePattern {
        &self.pattern
    }

    pub fn excludes(&self) -> &[SourcePattern] {
        &self.excludes
    }

    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    /// Literal directory the pattern is rooted at; deeper means more specific.
    pub fn prefix(&self) -> &Path {
        self.pattern.base()
    }

    /// Match a root-relative, forward-slash path.
    pub fn matches(&self, rel: &str) -> bool {
        self.pattern.matches(rel) && !self.excludes.iter().any(|e| e.matches(rel))
    }

    /// True if `other` is more specific than `self`.
    fn is_overridden_by(&self, other: &WatchRule) -> bool {
        other.prefix() != self.prefix() && other.prefix().starts_with(self.prefix())
    }
}

/// Explicit `[[watch]]` rules first, then rules derived from watched sets.
pub fn build_watch_rules(
    cfg: &ConfigFile,
    asset_sets: &BTreeMap<String, AssetSet>,
) -> Result<Vec<WatchRule>> {
    let mut rules = Vec::new();

    for rule in cfg.watch.iter() {
        let use_hash = rule.use_hash.unwrap_or(cfg.config.use_hash);
        rules.push(WatchRule::new(&rule.pattern, rule.tasks.clone(), use_hash)?);
    }

    for set in asset_sets.values().filter(|s| s.watch) {
        let excludes: Vec<SourcePattern> = set
            .sources
            .iter()
            .filter(|p| p.is_negated())
            .map(|p| SourcePattern::parse(p.glob_str()))
            .collect::<anyhow::Result<_>>()
            .map_err(|e| AssetdagError::ConfigError(format!("asset set '{}': {e:#}", set.name)))?;

        for pattern in set.sources.iter().filter(|p| !p.is_negated()) {
            let rule = WatchRule::new(pattern.raw(), vec![set.name.clone()], cfg.config.use_hash)?
                .with_excludes(excludes.clone());
            rules.push(rule);
        }
    }

    Ok(rules)
}

/// Rules matching `rel` after applying the specificity override.
pub fn select_rules<'a>(rules: &'a [WatchRule], rel: &str) -> Vec<&'a WatchRule> {
    let matching: Vec<&WatchRule> = rules.iter().filter(|r| r.matches(rel)).collect();

    matching
        .iter()
        .filter(|rule| !matching.iter().any(|other| rule.is_overridden_by(other)))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str, task: &str) -> WatchRule {
        WatchRule::new(pattern, vec![task.to_string()], false).unwrap()
    }

    fn selected_tasks(rules: &[WatchRule], rel: &str) -> Vec<String> {
        select_rules(rules, rel)
            .into_iter()
            .flat_map(|r| r.tasks().iter().cloned())
            .collect()
    }

    #[test]
    fn specific_pattern_overrides_general_one() {
        let rules = vec![
            rule("src/html/**/*", "html"),
            rule("src/html/layout/**/*", "html-full"),
        ];

        assert_eq!(selected_tasks(&rules, "src/html/layout/header.html"), vec!["html-full"]);
        assert_eq!(selected_tasks(&rules, "src/html/index.html"), vec!["html"]);
    }

    #[test]
    fn unrelated_rules_matching_the_same_path_both_apply() {
        let rules = vec![rule("src/js/**/*.js", "js"), rule("src/js/**/*", "lint")];
        assert_eq!(selected_tasks(&rules, "src/js/app.js"), vec!["js", "lint"]);
    }

    #[test]
    fn excludes_hide_paths_from_a_rule() {
        let exclude = SourcePattern::parse("src/html/layout/**/*").unwrap();
        let rules = vec![rule("src/html/**/*.html", "html").with_excludes(vec![exclude])];
        assert!(selected_tasks(&rules, "src/html/layout/nav.html").is_empty());
        assert_eq!(selected_tasks(&rules, "src/html/about.html"), vec!["html"]);
    }
}
