// src/watch/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::watch::hash::compute_file_hash;

/// Last known content hash per file.
///
/// Used by `use_hash` watch rules: an event only counts as a change when the
/// file's content differs from what we saw last time.
#[derive(Debug, Default)]
pub struct FileCache {
    hashes: HashMap<PathBuf, String>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current hash of each file without reporting changes.
    pub fn prime<'a>(&mut self, paths: impl IntoIterator<Item = &'a Path>) {
        for path in paths {
            match compute_file_hash(path) {
                Ok(hash) => {
                    self.hashes.insert(path.to_path_buf(), hash);
                }
                Err(err) => debug!(?path, error = %err, "could not prime hash"),
            }
        }
        debug!(files = self.hashes.len(), "primed content hash cache");
    }

    /// Re-hash `path` and report whether its content changed.
    ///
    /// Unknown files, removed files and hashing errors all count as changes.
    pub fn has_changed(&mut self, path: &Path) -> bool {
        if !path.is_file() {
            self.hashes.remove(path);
            return true;
        }

        match compute_file_hash(path) {
            Ok(hash) => match self.hashes.insert(path.to_path_buf(), hash.clone()) {
                Some(previous) if previous == hash => false,
                _ => true,
            },
            Err(err) => {
                warn!(?path, error = %err, "failed to hash changed file; treating as changed");
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
