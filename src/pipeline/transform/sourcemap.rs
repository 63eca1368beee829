use std::path::{Path, PathBuf};

use crate::errors::TransformError;
use crate::pipeline::fileset::{FileEntry, FileSet, normalize_relative};
use crate::pipeline::sourcemap::SourceMapState;

use super::{SyncTransform, TransformContext};

/// Start tracking sources for every file in the set.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourcemapInit;

impl SyncTransform for SourcemapInit {
    fn name(&self) -> &'static str {
        "sourcemap-init"
    }

    fn apply_sync(&self, files: FileSet, ctx: &TransformContext) -> Result<FileSet, TransformError> {
        files.try_map(|entry| {
            let content = String::from_utf8_lossy(&entry.contents).into_owned();
            entry.source_map = Some(SourceMapState::new(ctx.display_path(&entry.origin), content));
            Ok(())
        })
    }
}

/// Emit a `.map` file next to (or `dir` relative to) every tracked file and
/// append a `sourceMappingURL` comment to CSS and JS outputs.
#[derive(Debug, Clone)]
pub struct SourcemapWrite {
    dir: PathBuf,
}

impl SourcemapWrite {
    pub fn new(dir: &str) -> Self {
        Self {
            dir: PathBuf::from(dir),
        }
    }
}

fn mapping_comment(extension: Option<&str>, url: &str) -> Option<String> {
    match extension {
        Some("css") => Some(format!("\n/*# sourceMappingURL={url} */\n")),
        Some("js") => Some(format!("\n//# sourceMappingURL={url}\n")),
        _ => None,
    }
}

impl SyncTransform for SourcemapWrite {
    fn name(&self) -> &'static str {
        "sourcemap-write"
    }

    fn apply_sync(&self, files: FileSet, _ctx: &TransformContext) -> Result<FileSet, TransformError> {
        let mut out = FileSet::new();
        for mut entry in files {
            let Some(map) = entry.source_map.take() else {
                out.push(entry);
                continue;
            };

            let file_name = entry.file_name();
            let map_name = format!("{file_name}.map");
            let parent = entry.relative.parent().unwrap_or_else(|| Path::new(""));
            let map_relative = normalize_relative(&parent.join(&self.dir).join(&map_name))
                .ok_or_else(|| {
                    TransformError::new(
                        "sourcemap-write",
                        &entry.origin,
                        format!("map directory {:?} leaves the destination", self.dir),
                    )
                })?;

            let url = normalize_relative(&self.dir.join(&map_name))
                .unwrap_or_else(|| PathBuf::from(&map_name))
                .to_string_lossy()
                .replace('\\', "/");
            if let Some(comment) = mapping_comment(entry.extension().as_deref(), &url) {
                entry.contents.extend_from_slice(comment.as_bytes());
            }

            let mut map_entry = FileEntry::new(entry.base.clone(), map_relative, map.to_json(&file_name));
            map_entry.origin = entry.origin.clone();
            out.push(entry);
            out.push(map_entry);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::pipeline::transform::test_support::{ctx, text};

    #[test]
    fn writes_map_beside_css_with_comment() {
        let c = ctx(MockFileSystem::new());
        let files = FileSet::from(vec![FileEntry::new("/p/src/styles", "style.min.css", "body{}")]);
        let files = SourcemapInit.apply_sync(files, &c).unwrap();
        let out = SourcemapWrite::new(".").apply_sync(files, &c).unwrap();

        let paths: Vec<_> = out.iter().map(|e| e.relative.clone()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("style.min.css"), PathBuf::from("style.min.css.map")]
        );

        let texts = text(&out);
        assert!(texts[0].ends_with("/*# sourceMappingURL=style.min.css.map */\n"));

        let map: serde_json::Value = serde_json::from_str(&texts[1]).unwrap();
        assert_eq!(map["version"], 3);
        assert_eq!(map["file"], "style.min.css");
        assert_eq!(map["sources"][0], "src/styles/style.min.css");
        assert_eq!(map["sourcesContent"][0], "body{}");
    }

    #[test]
    fn map_dir_is_relative_to_file() {
        let c = ctx(MockFileSystem::new());
        let files = FileSet::from(vec![FileEntry::new("/p/src", "js/app.js", "x()")]);
        let files = SourcemapInit.apply_sync(files, &c).unwrap();
        let out = SourcemapWrite::new("maps").apply_sync(files, &c).unwrap();

        let paths: Vec<_> = out.iter().map(|e| e.relative.clone()).collect();
        assert_eq!(paths[1], PathBuf::from("js/maps/app.js.map"));
        assert!(text(&out)[0].ends_with("//# sourceMappingURL=maps/app.js.map\n"));
    }

    #[test]
    fn untracked_files_pass_through() {
        let c = ctx(MockFileSystem::new());
        let files = FileSet::from(vec![FileEntry::new("/p/src", "a.css", "a{}")]);
        let out = SourcemapWrite::new(".").apply_sync(files, &c).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(text(&out), vec!["a{}"]);
    }
}
