// src/watch/hash.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// blake3 hex digest of a file's contents.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let bytes = fs.read(path)?;
    let mut hasher = Hasher::new();
    hasher.update(&bytes);
    Ok(hasher.finalize().to_hex().to_string())
}

/// Last content hash seen per watched file.
///
/// Lives for the lifetime of one watcher; nothing is persisted.
#[derive(Debug, Default)]
pub struct ContentHashes {
    seen: HashMap<PathBuf, String>,
}

impl ContentHashes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current contents of `path` and report whether they differ
    /// from the previous observation.
    ///
    /// A file that can no longer be read (deleted, renamed away) counts as
    /// changed and is forgotten.
    pub fn observe(&mut self, fs: &dyn FileSystem, path: &Path) -> bool {
        let hash = match compute_file_hash(fs, path) {
            Ok(h) => h,
            Err(err) => {
                debug!(?path, error = %err, "file not hashable; treating as changed");
                self.seen.remove(path);
                return true;
            }
        };

        match self.seen.insert(path.to_path_buf(), hash.clone()) {
            Some(old) => old != hash,
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn unchanged_contents_are_not_reported() {
        let fs = MockFileSystem::new();
        let path = Path::new("/p/src/styles/main.css");
        fs.add_file(path, "a {}");

        let mut hashes = ContentHashes::new();
        assert!(hashes.observe(&fs, path));
        assert!(!hashes.observe(&fs, path));

        fs.add_file(path, "a { color: red }");
        assert!(hashes.observe(&fs, path));
    }

    #[test]
    fn removed_file_counts_as_change() {
        let fs = MockFileSystem::new();
        let path = Path::new("/p/src/a.js");
        fs.add_file(path, "x");

        let mut hashes = ContentHashes::new();
        hashes.observe(&fs, path);
        fs.remove_file(path).unwrap();
        assert!(hashes.observe(&fs, path));
        assert!(hashes.is_empty());
    }
}
