// src/pipeline/transform/mod.rs

//! Transform stages of a leaf pipeline.
//!
//! A transform takes the whole file set and returns a new one. Most stages
//! are synchronous and implement [`SyncTransform`]; stages that talk to
//! external processes implement [`Transform`] directly.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::TransformSpec;
use crate::errors::TransformError;
use crate::fs::FileSystem;

use super::fileset::FileSet;

mod concat;
mod css;
mod exec;
mod imports;
mod js;
mod optimize;
mod rename;
mod replace;
mod scss;
mod sourcemap;
mod template;

pub use concat::Concat;
pub use css::{MinifyCss, Prefix};
pub use exec::Exec;
pub use imports::InlineImports;
pub use js::{MinifyJs, Transpile};
pub use optimize::OptimizeImages;
pub use rename::Rename;
pub use replace::Replace;
pub use scss::CompileScss;
pub use sourcemap::{SourcemapInit, SourcemapWrite};
pub use template::RenderTemplate;

pub type TransformFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<FileSet, TransformError>> + Send + 'a>>;

/// Shared state available to every stage of one leaf run.
#[derive(Debug, Clone)]
pub struct TransformContext {
    pub task: String,
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
}

impl TransformContext {
    /// Project-relative, `/`-separated display path.
    pub fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

pub trait Transform: Send + Sync {
    /// Stage name used in error reports.
    fn name(&self) -> &'static str;

    fn apply<'a>(&'a self, files: FileSet, ctx: &'a TransformContext) -> TransformFuture<'a>;
}

/// A stage that does its work without awaiting.
pub trait SyncTransform: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply_sync(
        &self,
        files: FileSet,
        ctx: &TransformContext,
    ) -> std::result::Result<FileSet, TransformError>;
}

impl<T: SyncTransform> Transform for T {
    fn name(&self) -> &'static str {
        SyncTransform::name(self)
    }

    fn apply<'a>(&'a self, files: FileSet, ctx: &'a TransformContext) -> TransformFuture<'a> {
        Box::pin(async move { self.apply_sync(files, ctx) })
    }
}

/// Build the runtime stage for a configured transform.
///
/// Relative paths in the stage options are resolved against `root`.
pub fn build_transform(spec: &TransformSpec, root: &Path) -> Result<Box<dyn Transform>> {
    let stage: Box<dyn Transform> = match spec {
        TransformSpec::Template { root: tpl_root, data } => {
            let dir = tpl_root
                .as_deref()
                .map(|r| root.join(r))
                .unwrap_or_else(|| root.to_path_buf());
            Box::new(RenderTemplate::new(dir, data.clone()))
        }
        TransformSpec::Imports => Box::new(InlineImports),
        TransformSpec::Scss { load_paths } => Box::new(CompileScss::new(
            load_paths.iter().map(|p| root.join(p)).collect(),
        )),
        TransformSpec::Prefix { browsers } => Box::new(
            Prefix::new(browsers).with_context(|| format!("invalid browser list {browsers:?}"))?,
        ),
        TransformSpec::MinifyCss => Box::new(MinifyCss),
        TransformSpec::Transpile { targets } => Box::new(
            Transpile::new(targets).with_context(|| format!("invalid transpile targets {targets:?}"))?,
        ),
        TransformSpec::MinifyJs => Box::new(MinifyJs),
        TransformSpec::Concat { name, separator } => Box::new(Concat::new(name, separator)),
        TransformSpec::Rename {
            name,
            extension,
            prefix,
            suffix,
            dirname,
        } => Box::new(Rename {
            name: name.clone(),
            extension: extension.clone(),
            prefix: prefix.clone(),
            suffix: suffix.clone(),
            dirname: dirname.clone(),
        }),
        TransformSpec::Replace {
            pattern,
            replacement,
        } => Box::new(
            Replace::new(pattern, replacement)
                .with_context(|| format!("invalid replace pattern {pattern:?}"))?,
        ),
        TransformSpec::Exec { cmd, extension } => Box::new(Exec::new(cmd, extension.clone())),
        TransformSpec::OptimizeImages { jpeg_quality } => {
            Box::new(OptimizeImages::new(*jpeg_quality))
        }
        TransformSpec::SourcemapInit => Box::new(SourcemapInit),
        TransformSpec::SourcemapWrite { dir } => Box::new(SourcemapWrite::new(dir)),
    };
    Ok(stage)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::fs::mock::MockFileSystem;
    use crate::pipeline::fileset::{FileEntry, FileSet};

    use super::TransformContext;

    pub fn ctx(fs: MockFileSystem) -> TransformContext {
        TransformContext {
            task: "test".into(),
            root: "/p".into(),
            fs: Arc::new(fs),
        }
    }

    pub fn single(relative: &str, contents: &str) -> FileSet {
        FileSet::from(vec![FileEntry::new("/p/src", relative, contents)])
    }

    pub fn text(set: &FileSet) -> Vec<String> {
        set.iter()
            .map(|e| String::from_utf8_lossy(&e.contents).into_owned())
            .collect()
    }
}
