use std::path::PathBuf;

use crate::errors::TransformError;
use crate::pipeline::fileset::{FileEntry, FileSet};
use crate::pipeline::sourcemap::SourceMapState;

use super::{SyncTransform, TransformContext};

/// Join every file of the set, in order, into a single file `name`.
#[derive(Debug, Clone)]
pub struct Concat {
    name: String,
    separator: String,
}

impl Concat {
    pub fn new(name: &str, separator: &str) -> Self {
        Self {
            name: name.to_string(),
            separator: separator.to_string(),
        }
    }
}

impl SyncTransform for Concat {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn apply_sync(&self, files: FileSet, _ctx: &TransformContext) -> Result<FileSet, TransformError> {
        let Some(first) = files.iter().next() else {
            return Ok(files);
        };
        let base = first.base.clone();

        let mut contents = Vec::new();
        let mut map: Option<SourceMapState> = None;
        for (idx, entry) in files.iter().enumerate() {
            if idx > 0 {
                contents.extend_from_slice(self.separator.as_bytes());
            }
            contents.extend_from_slice(&entry.contents);
            if let Some(entry_map) = &entry.source_map {
                map.get_or_insert_with(SourceMapState::default).merge(entry_map);
            }
        }

        let mut joined = FileEntry::new(base, PathBuf::from(&self.name), contents);
        joined.source_map = map;
        Ok(FileSet::from(vec![joined]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::pipeline::transform::test_support::{ctx, text};

    #[test]
    fn joins_in_order_with_separator() {
        let files = FileSet::from(vec![
            FileEntry::new("/p/src/assets", "a.js", "var a = 1"),
            FileEntry::new("/p/src/assets", "lib/b.js", "var b = 2"),
        ]);
        let out = Concat::new("assets.js", ";\n")
            .apply_sync(files, &ctx(MockFileSystem::new()))
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out.iter().next().unwrap().relative, PathBuf::from("assets.js"));
        assert_eq!(text(&out), vec!["var a = 1;\nvar b = 2"]);
    }

    #[test]
    fn empty_set_stays_empty() {
        let out = Concat::new("assets.css", "\n")
            .apply_sync(FileSet::new(), &ctx(MockFileSystem::new()))
            .unwrap();
        assert!(out.is_empty());
    }
}
