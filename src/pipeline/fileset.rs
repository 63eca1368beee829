// src/pipeline/fileset.rs

//! In-memory file sets flowing through a leaf pipeline.
//!
//! A [`SourceSpec`] resolves glob patterns against the project root into a
//! [`FileSet`]. Each entry remembers the static base of the pattern that
//! matched it, so writing `relative` under a destination preserves the
//! directory structure below that base.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use anyhow::Result;
use globset::{GlobMatcher, GlobSet};
use tracing::trace;

use crate::errors::TransformError;
use crate::fs::FileSystem;
use crate::globs::{build_matcher, build_optional_globset, split_negations, static_base};
use crate::watch::path_utils::relative_str;

use super::sourcemap::SourceMapState;

/// One file travelling through a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute base directory the entry is relative to.
    pub base: PathBuf,
    /// Path below `base`; becomes the path below the destination on write.
    pub relative: PathBuf,
    /// Path of the file the entry was read from.
    pub origin: PathBuf,
    pub contents: Vec<u8>,
    pub source_map: Option<SourceMapState>,
}

impl FileEntry {
    pub fn new(base: impl Into<PathBuf>, relative: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        let base = base.into();
        let relative = relative.into();
        let origin = base.join(&relative);
        Self {
            base,
            relative,
            origin,
            contents: contents.into(),
            source_map: None,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.base.join(&self.relative)
    }

    /// Lowercased extension of the current relative path.
    pub fn extension(&self) -> Option<String> {
        self.relative
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }

    pub fn file_name(&self) -> String {
        self.relative
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Contents as UTF-8, or a transform error naming this file.
    pub fn text(&self, stage: &str) -> Result<&str, TransformError> {
        std::str::from_utf8(&self.contents)
            .map_err(|e| TransformError::new(stage, &self.origin, format!("file is not valid UTF-8: {e}")))
    }

    pub fn set_text(&mut self, text: String) {
        self.contents = text.into_bytes();
    }
}

/// Ordered collection of file entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    entries: Vec<FileEntry>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: FileEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, FileEntry> {
        self.entries.iter_mut()
    }

    /// Apply a fallible edit to every entry.
    pub fn try_map<F>(mut self, mut f: F) -> Result<Self, TransformError>
    where
        F: FnMut(&mut FileEntry) -> Result<(), TransformError>,
    {
        for entry in self.entries.iter_mut() {
            f(entry)?;
        }
        Ok(self)
    }
}

impl From<Vec<FileEntry>> for FileSet {
    fn from(entries: Vec<FileEntry>) -> Self {
        Self { entries }
    }
}

impl IntoIterator for FileSet {
    type Item = FileEntry;
    type IntoIter = std::vec::IntoIter<FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a FileEntry;
    type IntoIter = std::slice::Iter<'a, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[derive(Debug, Clone)]
struct IncludePattern {
    base: String,
    matcher: GlobMatcher,
}

/// Compiled source patterns of a leaf task.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    includes: Vec<IncludePattern>,
    excludes: Option<GlobSet>,
}

impl SourceSpec {
    /// Compile `src` (with optional `!` negations) plus extra exclusions.
    pub fn new(src: &[String], exclude: &[String]) -> Result<Self> {
        let (include, mut negated) = split_negations(src);
        negated.extend(exclude.iter().cloned());

        let includes = include
            .iter()
            .map(|pat| {
                Ok(IncludePattern {
                    base: static_base(pat),
                    matcher: build_matcher(pat)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            includes,
            excludes: build_optional_globset(&negated)?,
        })
    }

    /// Resolve the patterns under `root`, read every match and return the
    /// entries sorted by path. A file matched by several patterns is taken
    /// once, with the base of the first pattern that matched it.
    pub fn resolve(&self, fs: &dyn FileSystem, root: &Path) -> Result<FileSet> {
        let mut seen = BTreeSet::new();
        let mut found: Vec<(String, PathBuf, PathBuf)> = Vec::new();

        for include in &self.includes {
            let base_dir = root.join(&include.base);
            if !fs.is_dir(&base_dir) {
                trace!(base = %base_dir.display(), "pattern base does not exist");
                continue;
            }
            for path in walk_files(fs, &base_dir)? {
                let Some(rel) = relative_str(root, &path) else {
                    continue;
                };
                if !include.matcher.is_match(&rel) {
                    continue;
                }
                if self.excludes.as_ref().is_some_and(|ex| ex.is_match(&rel)) {
                    continue;
                }
                if !seen.insert(rel.clone()) {
                    continue;
                }
                found.push((rel, base_dir.clone(), path));
            }
        }

        found.sort_by(|a, b| a.0.cmp(&b.0));

        let mut set = FileSet::new();
        for (_, base, path) in found {
            let contents = fs.read(&path)?;
            let relative = path.strip_prefix(&base).map(Path::to_path_buf).unwrap_or_else(|_| {
                PathBuf::from(path.file_name().unwrap_or_default())
            });
            set.push(FileEntry {
                base,
                relative,
                origin: path,
                contents,
                source_map: None,
            });
        }
        Ok(set)
    }
}

fn walk_files(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs.read_dir(&current)? {
            if fs.is_dir(&entry) {
                stack.push(entry);
            } else if fs.is_file(&entry) {
                files.push(entry);
            }
        }
    }
    Ok(files)
}

/// Normalize a relative path, rejecting anything that climbs out of its base.
pub fn normalize_relative(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keeps_structure_below_static_base() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/img/a.png", "a");
        fs.add_file("/p/src/img/icons/b.svg", "b");
        fs.add_file("/p/src/other/c.png", "c");

        let spec = SourceSpec::new(&patterns(&["src/img/**/*.*"]), &[]).unwrap();
        let set = spec.resolve(&fs, Path::new("/p")).unwrap();

        let rel: Vec<_> = set.iter().map(|e| e.relative.clone()).collect();
        assert_eq!(rel, vec![PathBuf::from("a.png"), PathBuf::from("icons/b.svg")]);
    }

    #[test]
    fn negated_patterns_exclude_files() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/scripts/app.js", "app");
        fs.add_file("/p/src/scripts/index.js", "index");
        fs.add_file("/p/src/scripts/nested/deep.js", "deep");

        let spec = SourceSpec::new(&patterns(&["src/scripts/*.js", "!src/scripts/index.js"]), &[]).unwrap();
        let set = spec.resolve(&fs, Path::new("/p")).unwrap();

        let names: Vec<_> = set.iter().map(FileEntry::file_name).collect();
        assert_eq!(names, vec!["app.js"]);
    }

    #[test]
    fn literal_file_uses_parent_as_base() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/styles/main.css", "body{}");
        fs.add_file("/p/src/styles/_vars.css", ":root{}");

        let spec = SourceSpec::new(&patterns(&["src/styles/main.css"]), &[]).unwrap();
        let set = spec.resolve(&fs, Path::new("/p")).unwrap();

        assert_eq!(set.len(), 1);
        let entry = set.iter().next().unwrap();
        assert_eq!(entry.base, PathBuf::from("/p/src/styles"));
        assert_eq!(entry.relative, PathBuf::from("main.css"));
    }

    #[test]
    fn missing_base_resolves_to_empty_set() {
        let fs = MockFileSystem::new();
        let spec = SourceSpec::new(&patterns(&["src/fonts/**/*.*"]), &[]).unwrap();
        let set = spec.resolve(&fs, Path::new("/p")).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn normalize_rejects_escaping_paths() {
        assert_eq!(normalize_relative(Path::new("a/./b")), Some(PathBuf::from("a/b")));
        assert_eq!(normalize_relative(Path::new("a/../b")), Some(PathBuf::from("b")));
        assert_eq!(normalize_relative(Path::new("../b")), None);
    }
}
