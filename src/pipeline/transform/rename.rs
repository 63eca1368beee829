use std::path::PathBuf;

use crate::errors::TransformError;
use crate::pipeline::fileset::FileSet;

use super::{SyncTransform, TransformContext};

/// Rewrite output paths.
///
/// `name` replaces the whole file name. Otherwise the stem gets `prefix` and
/// `suffix` and the extension is swapped for `extension` (an empty string
/// drops it). `dirname` replaces the directory below the destination.
#[derive(Debug, Clone, Default)]
pub struct Rename {
    pub name: Option<String>,
    pub extension: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub dirname: Option<String>,
}

impl Rename {
    fn file_name_for(&self, current: &std::path::Path) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        let stem = current
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = match &self.extension {
            Some(ext) => ext.trim_start_matches('.').to_string(),
            None => current
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let mut out = format!(
            "{}{}{}",
            self.prefix.as_deref().unwrap_or(""),
            stem,
            self.suffix.as_deref().unwrap_or("")
        );
        if !ext.is_empty() {
            out.push('.');
            out.push_str(&ext);
        }
        out
    }
}

impl SyncTransform for Rename {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn apply_sync(&self, files: FileSet, _ctx: &TransformContext) -> Result<FileSet, TransformError> {
        files.try_map(|entry| {
            let dir = match &self.dirname {
                Some(dir) => PathBuf::from(dir),
                None => entry
                    .relative
                    .parent()
                    .map(PathBuf::from)
                    .unwrap_or_default(),
            };
            let file_name = self.file_name_for(&entry.relative);
            entry.relative = dir.join(file_name);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::pipeline::transform::test_support::{ctx, single};

    fn renamed(rename: Rename, relative: &str) -> PathBuf {
        let out = rename
            .apply_sync(single(relative, ""), &ctx(MockFileSystem::new()))
            .unwrap();
        out.iter().next().unwrap().relative.clone()
    }

    #[test]
    fn swaps_extension_and_keeps_directory() {
        let rename = Rename {
            extension: Some("html".into()),
            ..Rename::default()
        };
        assert_eq!(renamed(rename, "blog/post.jinja"), PathBuf::from("blog/post.html"));
    }

    #[test]
    fn fixed_name_replaces_file_name() {
        let rename = Rename {
            name: Some("style.min.css".into()),
            ..Rename::default()
        };
        assert_eq!(renamed(rename, "main.css"), PathBuf::from("style.min.css"));
    }

    #[test]
    fn prefix_suffix_and_dirname() {
        let rename = Rename {
            prefix: Some("app-".into()),
            suffix: Some(".min".into()),
            dirname: Some("bundles".into()),
            ..Rename::default()
        };
        assert_eq!(renamed(rename, "lib/main.js"), PathBuf::from("bundles/app-main.min.js"));
    }
}
