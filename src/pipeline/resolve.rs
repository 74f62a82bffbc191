// src/pipeline/resolve.rs

//! Source pattern resolution.
//!
//! Patterns are evaluated relative to the project root, in declared order.
//! A positive pattern appends its matches (sorted, deduplicated against what
//! is already there); a `!pattern` removes matches gathered so far.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::watch::path_utils::relative_str;

/// One compiled source pattern.
#[derive(Clone)]
pub struct SourcePattern {
    raw: String,
    negated: bool,
    matcher: GlobMatcher,
    /// Literal directory the glob starts from; output paths are relative to it.
    base: PathBuf,
    literal: bool,
}

impl fmt::Debug for SourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourcePattern")
            .field("raw", &self.raw)
            .field("negated", &self.negated)
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl SourcePattern {
    pub fn parse(raw: &str) -> Result<Self> {
        let (negated, pattern) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let pattern = pattern.trim_start_matches("./");

        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {raw}"))?;

        Ok(Self {
            raw: raw.to_string(),
            negated,
            matcher: glob.compile_matcher(),
            base: glob_base(pattern),
            literal: !has_glob_meta(pattern),
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Pattern text without the negation marker.
    pub fn glob_str(&self) -> &str {
        self.raw.strip_prefix('!').unwrap_or(&self.raw)
    }

    /// Match a root-relative path using forward slashes.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }
}

/// A resolved source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path on disk.
    pub path: PathBuf,
    /// Path relative to the project root, forward slashes.
    pub root_relative: String,
    /// Path relative to the base of the pattern that matched it.
    pub relative: PathBuf,
}

pub fn has_glob_meta(s: &str) -> bool {
    s.contains(['*', '?', '[', '{'])
}

/// Leading literal directory of a glob.
///
/// `src/html/**/*.html` -> `src/html`; `vendor/a/b.js` -> `vendor/a`.
pub fn glob_base(pattern: &str) -> PathBuf {
    let components: Vec<&str> = pattern.split('/').filter(|c| !c.is_empty()).collect();
    let mut base = PathBuf::new();
    for (i, comp) in components.iter().enumerate() {
        if has_glob_meta(comp) || i + 1 == components.len() {
            break;
        }
        base.push(comp);
    }
    base
}

/// Resolve ordered patterns to files.
pub fn resolve_sources(
    fs: &dyn FileSystem,
    root: &Path,
    patterns: &[SourcePattern],
) -> Result<Vec<SourceFile>> {
    let mut files: Vec<SourceFile> = Vec::new();

    for pattern in patterns {
        if pattern.negated {
            let before = files.len();
            files.retain(|f| !pattern.matches(&f.root_relative));
            debug!(
                pattern = %pattern.raw,
                removed = before - files.len(),
                "applied negated source pattern"
            );
            continue;
        }

        let matched = collect_pattern_matches(fs, root, pattern)?;
        if matched.is_empty() {
            info!(pattern = %pattern.raw, "source pattern matched no files");
        }
        for file in matched {
            if !files.iter().any(|f| f.root_relative == file.root_relative) {
                files.push(file);
            }
        }
    }

    Ok(files)
}

fn collect_pattern_matches(
    fs: &dyn FileSystem,
    root: &Path,
    pattern: &SourcePattern,
) -> Result<Vec<SourceFile>> {
    let base_dir = root.join(&pattern.base);

    if pattern.literal {
        let path = root.join(pattern.glob_str().trim_start_matches("./"));
        if !fs.is_file(&path) {
            return Ok(Vec::new());
        }
        return Ok(source_file(root, &base_dir, path).into_iter().collect());
    }

    if !fs.is_dir(&base_dir) {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let mut stack = vec![base_dir.clone()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Some(file) = source_file(root, &base_dir, path) {
                    if pattern.matches(&file.root_relative) {
                        files.push(file);
                    }
                }
            }
        }
    }

    files.sort_by(|a, b| a.root_relative.cmp(&b.root_relative));
    Ok(files)
}

fn source_file(root: &Path, base_dir: &Path, path: PathBuf) -> Option<SourceFile> {
    let root_relative = relative_str(root, &path)?;
    let relative = path.strip_prefix(base_dir).ok()?.to_path_buf();
    Some(SourceFile {
        path,
        root_relative,
        relative,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_base_stops_at_first_wildcard() {
        assert_eq!(glob_base("src/html/**/*.html"), PathBuf::from("src/html"));
        assert_eq!(glob_base("src/img/**/*"), PathBuf::from("src/img"));
        assert_eq!(glob_base("node_modules/a/dist/a.min.js"), PathBuf::from("node_modules/a/dist"));
        assert_eq!(glob_base("*.css"), PathBuf::new());
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let p = SourcePattern::parse("fonts/*").unwrap();
        assert!(p.matches("fonts/a.woff"));
        assert!(!p.matches("fonts/sub/a.woff"));
    }

    #[test]
    fn negation_marker_is_stripped() {
        let p = SourcePattern::parse("!src/html/layout/**/*").unwrap();
        assert!(p.is_negated());
        assert!(p.matches("src/html/layout/header.html"));
        assert_eq!(p.glob_str(), "src/html/layout/**/*");
    }
}
