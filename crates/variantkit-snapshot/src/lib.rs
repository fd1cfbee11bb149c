//! A map from absolute path to current text snapshot.
//!
//! A file is read lazily, held as an owned string behind a version counter,
//! and "touched" (invalidated) rather than eagerly re-read on every watcher
//! event. Dependency discovery itself is the bundler's job; this store just
//! holds whatever text a path currently maps to.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::RwLock;

use thiserror::Error;
use variantkit_syntax::FileId;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("path is not absolute: {0}")]
    NotAbsolute(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
}

/// A version-tagged text copy of a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub path: PathBuf,
    pub text: String,
    pub version: u64,
}

#[derive(Default)]
struct Entry {
    snapshot: Option<Snapshot>,
    version: u64,
}

/// Owns every snapshot exclusively; other components only ever see `&Snapshot`
/// borrowed for the duration of a single callback.
#[derive(Default)]
pub struct SnapshotStore {
    entries: RwLock<HashMap<FileId, Entry>>,
}

impl SnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current snapshot for `path`, loading it from disk if this
    /// is the first access or if the path was previously [`touch`](Self::touch)ed.
    pub fn get_or_touch(&self, path: &Path) -> Result<Snapshot, SnapshotError> {
        if !path.is_absolute() {
            return Err(SnapshotError::NotAbsolute(path.to_path_buf()));
        }

        let file_id = FileId::from_path(path);

        {
            let entries = self.entries.read().expect("snapshot store lock poisoned");
            if let Some(entry) = entries.get(&file_id)
                && let Some(snapshot) = &entry.snapshot
            {
                return Ok(snapshot.clone());
            }
        }

        self.load(path, file_id)
    }

    /// Returns the current snapshot if one has already been loaded, without
    /// touching the filesystem.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Snapshot> {
        let file_id = FileId::from_path(path);
        let entries = self.entries.read().expect("snapshot store lock poisoned");
        entries.get(&file_id).and_then(|entry| entry.snapshot.clone())
    }

    /// Invalidates the listed paths so the next [`get_or_touch`](Self::get_or_touch)
    /// rereads them from disk and bumps their version.
    pub fn touch<'a>(&self, paths: impl IntoIterator<Item = &'a Path>) {
        let mut entries = self.entries.write().expect("snapshot store lock poisoned");
        for path in paths {
            let file_id = FileId::from_path(path);
            let entry = entries.entry(file_id).or_default();
            entry.snapshot = None;
            tracing::debug!(path = %path.display(), "snapshot invalidated");
        }
    }

    /// Seeds a snapshot directly, bypassing disk — used by the driver's tests
    /// and by callers that already hold file contents (e.g. the bundler).
    pub fn seed(&self, path: &Path, text: impl Into<String>) {
        let file_id = FileId::from_path(path);
        let mut entries = self.entries.write().expect("snapshot store lock poisoned");
        let entry = entries.entry(file_id).or_default();
        entry.version += 1;
        entry.snapshot = Some(Snapshot { path: path.to_path_buf(), text: text.into(), version: entry.version });
    }

    fn load(&self, path: &Path, file_id: FileId) -> Result<Snapshot, SnapshotError> {
        let text =
            std::fs::read_to_string(path).map_err(|source| SnapshotError::Io { path: path.to_path_buf(), source })?;

        let mut entries = self.entries.write().expect("snapshot store lock poisoned");
        let entry = entries.entry(file_id).or_default();
        entry.version += 1;
        let snapshot = Snapshot { path: path.to_path_buf(), text, version: entry.version };
        entry.snapshot = Some(snapshot.clone());

        tracing::debug!(path = %path.display(), version = snapshot.version, "snapshot loaded");

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_touch_loads_lazily_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.ts");
        std::fs::write(&path, "const a = 1;").unwrap();

        let store = SnapshotStore::new();
        assert!(store.get(&path).is_none());

        let first = store.get_or_touch(&path).unwrap();
        assert_eq!(first.text, "const a = 1;");
        assert_eq!(first.version, 1);

        std::fs::write(&path, "const a = 2;").unwrap();
        let cached = store.get_or_touch(&path).unwrap();
        assert_eq!(cached.text, "const a = 1;");
        assert_eq!(cached.version, 1);
    }

    #[test]
    fn touch_forces_a_reread_and_bumps_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.ts");
        std::fs::write(&path, "const a = 1;").unwrap();

        let store = SnapshotStore::new();
        let _ = store.get_or_touch(&path).unwrap();

        std::fs::write(&path, "const a = 2;").unwrap();
        store.touch([path.as_path()]);

        let reloaded = store.get_or_touch(&path).unwrap();
        assert_eq!(reloaded.text, "const a = 2;");
        assert_eq!(reloaded.version, 2);
    }

    #[test]
    fn rejects_relative_paths() {
        let store = SnapshotStore::new();
        assert!(matches!(store.get_or_touch(Path::new("relative.ts")), Err(SnapshotError::NotAbsolute(_))));
    }
}
