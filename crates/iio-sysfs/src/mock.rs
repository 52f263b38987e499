use crate::{AttrStore, Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// An in-memory attribute tree. Directories exist implicitly whenever a file
/// lives below them.
#[derive(Debug, Default)]
pub struct MockStore {
    files: Mutex<BTreeMap<PathBuf, String>>,
    // attributes that silently drop writes, like a device clamping a value
    sticky: Mutex<BTreeSet<PathBuf>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for fixtures.
    pub fn with(self, path: impl AsRef<Path>, value: &str) -> Self {
        self.insert(path, value);
        self
    }

    pub fn insert(&self, path: impl AsRef<Path>, value: &str) {
        self.files().insert(path.as_ref().to_path_buf(), value.to_string());
    }

    pub fn remove(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files().remove(path.as_ref())
    }

    /// Make writes to `path` succeed without changing its content.
    pub fn make_sticky(&self, path: impl AsRef<Path>) {
        self.sticky
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.as_ref().to_path_buf());
    }

    fn files(&self) -> MutexGuard<'_, BTreeMap<PathBuf, String>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AttrStore for MockStore {
    fn read_string(&self, path: &Path) -> Result<String> {
        self.files()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::io(path, "no such attribute"))
    }

    fn write_string(&self, path: &Path, value: &str) -> Result<()> {
        let sticky = self
            .sticky
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(path);
        let mut files = self.files();
        if !files.contains_key(path) {
            // sysfs never creates attributes on write
            return Err(Error::io(path, "no such attribute"));
        }
        if !sticky {
            files.insert(path.to_path_buf(), value.to_string());
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files().keys().any(|p| p.starts_with(path))
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();
        for p in self.files().keys() {
            if let Ok(rest) = p.strip_prefix(dir) {
                if let Some(first) = rest.components().next() {
                    names.insert(first.as_os_str().to_string_lossy().into_owned());
                }
            }
        }
        if names.is_empty() {
            return Err(Error::io(dir, "no such directory"));
        }
        Ok(names.into_iter().collect())
    }
}
