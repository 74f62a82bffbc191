// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub enum MockEntry {
    /// Contents plus a logical modification tick.
    File(Vec<u8>, u64),
    Dir(Vec<String>), // List of child names
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    clock: u64,
    writes: Vec<PathBuf>,
}

/// In-memory filesystem.
///
/// Every `add_file` / `write` advances a logical clock, so a file written
/// later always has a strictly newer modification time. Writes made through
/// the [`FileSystem`] trait are recorded and can be inspected with
/// [`MockFileSystem::writes`].
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut state = MockState::default();
        // Ensure root exists
        state
            .entries
            .insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create or replace a file without recording it as a write.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut state = self.lock();
        insert_file(&mut state, path.as_ref(), content.into());
    }

    /// Bump a file's modification time as if it had been saved again.
    pub fn touch(&self, path: impl AsRef<Path>) {
        let mut state = self.lock();
        state.clock += 1;
        let tick = state.clock;
        if let Some(MockEntry::File(_, modified)) = state.entries.get_mut(&key(path.as_ref())) {
            *modified = tick;
        }
    }

    /// Paths written through [`FileSystem::write`], in order.
    pub fn writes(&self) -> Vec<PathBuf> {
        self.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.lock().entries.get(&key(path.as_ref())) {
            Some(MockEntry::File(content, _)) => Some(content.clone()),
            _ => None,
        }
    }
}

/// Normalise away `.` components so `./src/a` and `src/a` are the same entry.
fn key(path: &Path) -> PathBuf {
    let normalised: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if normalised.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalised
    }
}

fn parent_key(path: &Path) -> Option<PathBuf> {
    let parent = path.parent()?;
    Some(if parent.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        parent.to_path_buf()
    })
}

fn insert_file(state: &mut MockState, path: &Path, content: Vec<u8>) {
    let path = key(path);
    state.clock += 1;
    let tick = state.clock;
    state.entries.insert(path.clone(), MockEntry::File(content, tick));

    // Ensure parent directories exist implicitly for simplicity in this mock
    if let Some(parent) = parent_key(&path) {
        ensure_dir_entry(&mut state.entries, &parent);
        link_child(&mut state.entries, &parent, &path);
    }
}

fn ensure_dir_entry(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if entries.contains_key(path) {
        return;
    }
    entries.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
    if let Some(parent) = parent_key(path) {
        if parent != path {
            // Avoid infinite loop at root
            ensure_dir_entry(entries, &parent);
            link_child(entries, &parent, path);
        }
    }
}

fn link_child(entries: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
    if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
        if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
            if !children.iter().any(|c| c == name) {
                children.push(name.to_string());
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        match self.lock().entries.get(&key(path)) {
            Some(MockEntry::File(content, _)) => Ok(content.clone()),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if matches!(state.entries.get(&key(path)), Some(MockEntry::Dir(_))) {
            return Err(anyhow!("Is a directory: {:?}", path));
        }
        insert_file(&mut state, path, contents.to_vec());
        state.writes.push(path.to_path_buf());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().entries.contains_key(&key(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(&key(path)), Some(MockEntry::File(..)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(&key(path)), Some(MockEntry::Dir(_)))
    }

    fn modified(&self, path: &Path) -> Result<Option<SystemTime>> {
        Ok(match self.lock().entries.get(&key(path)) {
            Some(MockEntry::File(_, tick)) => Some(UNIX_EPOCH + Duration::from_secs(*tick)),
            Some(MockEntry::Dir(_)) => Some(UNIX_EPOCH),
            None => None,
        })
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let path = key(path);
        let mut state = self.lock();
        state
            .entries
            .retain(|p, _| p != &path && !p.starts_with(&path));
        if let Some(parent) = parent_key(&path) {
            if let (Some(MockEntry::Dir(children)), Some(name)) =
                (state.entries.get_mut(&parent), path.file_name())
            {
                children.retain(|c| name.to_str() != Some(c.as_str()));
            }
        }
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.lock().entries.get(&key(path)) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_writes_have_newer_mtimes() {
        let fs = MockFileSystem::new();
        fs.add_file("/site/src/a.css", "a");
        fs.write(Path::new("/site/dist/a.css"), b"a").unwrap();

        let src = fs.modified(Path::new("/site/src/a.css")).unwrap().unwrap();
        let dst = fs.modified(Path::new("/site/dist/a.css")).unwrap().unwrap();
        assert!(dst > src);
        assert_eq!(fs.writes(), vec![PathBuf::from("/site/dist/a.css")]);
    }

    #[test]
    fn remove_dir_all_drops_the_subtree() {
        let fs = MockFileSystem::new();
        fs.add_file("/site/dist/assets/js/app.js", "x");
        fs.add_file("/site/src/app.js", "x");

        fs.remove_dir_all(Path::new("/site/dist")).unwrap();

        assert!(!fs.exists(Path::new("/site/dist")));
        assert!(!fs.exists(Path::new("/site/dist/assets/js/app.js")));
        assert!(fs.is_file(Path::new("/site/src/app.js")));
        let root_children = fs.read_dir(Path::new("/site")).unwrap();
        assert_eq!(root_children, vec![PathBuf::from("/site/src")]);
    }

    #[test]
    fn dot_prefixed_paths_resolve_to_the_same_entry() {
        let fs = MockFileSystem::new();
        fs.add_file("src/a.js", "x");
        assert!(fs.is_file(Path::new("./src/a.js")));
        assert!(fs.is_dir(Path::new("./src")));
    }
}
