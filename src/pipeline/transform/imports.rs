//! Inline CSS `@import` statements.
//!
//! `@import "partial";` is resolved relative to the importing file, trying
//! the name as written, with the importer's extension, and as an
//! underscore-prefixed partial. Remote imports (`http:`, `https:`, `//`) are
//! left in place. A media list after the target wraps the inlined content in
//! an `@media` block.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::TransformError;
use crate::fs::FileSystem;
use crate::pipeline::fileset::FileSet;

use super::{SyncTransform, TransformContext};

const STAGE: &str = "imports";

static IMPORT_STATEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@import\b[^;]*(;|$)").expect("valid regex"));

static IMPORT_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^@import\s+(?:url\(\s*)?["']([^"']+)["']\s*\)?\s*([^;]*);$"#).expect("valid regex")
});

#[derive(Debug, Clone, Copy, Default)]
pub struct InlineImports;

impl SyncTransform for InlineImports {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn apply_sync(&self, files: FileSet, ctx: &TransformContext) -> Result<FileSet, TransformError> {
        files.try_map(|entry| {
            let mut stack = vec![entry.origin.clone()];
            let mut inlined = Vec::new();
            let source = entry.text(STAGE)?.to_string();
            let out = inline(ctx.fs.as_ref(), &entry.origin, &source, &mut stack, &mut inlined)?;
            if let Some(map) = entry.source_map.as_mut() {
                for (path, content) in inlined {
                    map.add_source(ctx.display_path(&path), content);
                }
            }
            entry.set_text(out);
            Ok(())
        })
    }
}

fn inline(
    fs: &dyn FileSystem,
    file: &Path,
    source: &str,
    stack: &mut Vec<PathBuf>,
    inlined: &mut Vec<(PathBuf, String)>,
) -> Result<String, TransformError> {
    let mut out = String::with_capacity(source.len());
    let mut last = 0;

    for statement in IMPORT_STATEMENT.find_iter(source) {
        out.push_str(&source[last..statement.start()]);
        last = statement.end();

        let text = statement.as_str();
        let Some(caps) = IMPORT_TARGET.captures(text) else {
            return Err(TransformError::new(
                STAGE,
                file,
                format!("malformed import statement `{}`", text.trim()),
            ));
        };
        let target = &caps[1];
        let media = caps[2].trim();

        if is_remote(target) {
            out.push_str(text);
            continue;
        }

        let Some(resolved) = resolve_import(fs, file, target) else {
            return Err(TransformError::new(
                STAGE,
                file,
                format!("cannot resolve import \"{target}\""),
            ));
        };
        if stack.contains(&resolved) {
            return Err(TransformError::new(
                STAGE,
                file,
                format!("circular import of \"{target}\""),
            ));
        }

        let content = fs
            .read_to_string(&resolved)
            .map_err(|e| TransformError::new(STAGE, &resolved, format!("{e:#}")))?;
        stack.push(resolved.clone());
        let expanded = inline(fs, &resolved, &content, stack, inlined)?;
        stack.pop();
        inlined.push((resolved, content));

        if media.is_empty() {
            out.push_str(&expanded);
        } else {
            out.push_str(&format!("@media {media} {{\n{expanded}\n}}"));
        }
    }

    out.push_str(&source[last..]);
    Ok(out)
}

fn is_remote(target: &str) -> bool {
    target.starts_with("http:") || target.starts_with("https:") || target.starts_with("//")
}

fn resolve_import(fs: &dyn FileSystem, importer: &Path, target: &str) -> Option<PathBuf> {
    let dir = importer.parent().unwrap_or_else(|| Path::new(""));
    let wanted = lexical_join(dir, target);
    let ext = importer.extension().map(|e| e.to_string_lossy().into_owned());

    let mut candidates = vec![wanted.clone()];
    if wanted.extension().is_none() {
        if let Some(ext) = &ext {
            candidates.push(wanted.with_extension(ext));
        }
    }
    let partials: Vec<PathBuf> = candidates
        .iter()
        .filter_map(|c| {
            let name = c.file_name()?.to_string_lossy();
            Some(c.with_file_name(format!("_{name}")))
        })
        .collect();
    candidates.extend(partials);

    candidates.into_iter().find(|c| fs.is_file(c))
}

/// Join `target` onto `dir`, folding `.` and `..` without touching the disk.
fn lexical_join(dir: &Path, target: &str) -> PathBuf {
    let mut out = dir.to_path_buf();
    for component in Path::new(target).components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}
