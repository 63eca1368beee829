// src/pipeline/leaf.rs

//! A leaf task: resolve sources, run the transform chain, write outputs.
//!
//! Outputs are only written once the whole chain succeeded, so a failing
//! stage never leaves partial results in the destination.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, trace};

use crate::config::TaskConfig;
use crate::engine::TaskName;
use crate::errors::TaskError;
use crate::fs::FileSystem;
use crate::types::ReloadMode;

use super::fileset::{FileSet, SourceSpec, normalize_relative};
use super::transform::{Transform, TransformContext, build_transform};

/// Summary of one successful leaf run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafReport {
    pub task: TaskName,
    /// Number of source files matched.
    pub inputs: usize,
    /// Absolute paths written, in write order.
    pub written: Vec<PathBuf>,
}

pub struct LeafTask {
    name: TaskName,
    sources: SourceSpec,
    dest: Option<PathBuf>,
    transforms: Vec<Box<dyn Transform>>,
    reload: ReloadMode,
}

impl fmt::Debug for LeafTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafTask")
            .field("name", &self.name)
            .field("dest", &self.dest)
            .field("stages", &self.stage_names())
            .field("reload", &self.reload)
            .finish_non_exhaustive()
    }
}

impl LeafTask {
    /// Build a leaf from its config entry. `src` must be present.
    pub fn from_config(name: &str, cfg: &TaskConfig, root: &Path) -> Result<Self> {
        let src = cfg
            .src
            .as_deref()
            .with_context(|| format!("task '{name}' has no src patterns"))?;
        let sources = SourceSpec::new(src, &cfg.exclude)
            .with_context(|| format!("compiling sources of task '{name}'"))?;
        let transforms = cfg
            .transforms
            .iter()
            .map(|spec| build_transform(spec, root))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("building transforms of task '{name}'"))?;

        Ok(Self {
            name: name.to_string(),
            sources,
            dest: cfg.dest.as_ref().map(PathBuf::from),
            transforms,
            reload: cfg.reload,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Destination directory relative to the project root.
    pub fn dest(&self) -> Option<&Path> {
        self.dest.as_deref()
    }

    pub fn reload(&self) -> ReloadMode {
        self.reload
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    pub async fn run(&self, ctx: &TransformContext) -> Result<LeafReport, TaskError> {
        let files = self.resolve(ctx).await?;
        let inputs = files.len();
        if files.is_empty() {
            debug!(task = %self.name, "no source files matched");
        }

        let mut files = files;
        for stage in &self.transforms {
            trace!(task = %self.name, stage = stage.name(), files = files.len(), "running stage");
            files = stage
                .apply(files, ctx)
                .await
                .map_err(|e| e.into_task_error(&self.name))?;
        }

        let written = match &self.dest {
            Some(dest) => self.write(ctx, ctx.root.join(dest), files).await?,
            None => Vec::new(),
        };

        Ok(LeafReport {
            task: self.name.clone(),
            inputs,
            written,
        })
    }

    async fn resolve(&self, ctx: &TransformContext) -> Result<FileSet, TaskError> {
        let sources = self.sources.clone();
        let fs = Arc::clone(&ctx.fs);
        let root = ctx.root.clone();

        tokio::task::spawn_blocking(move || sources.resolve(fs.as_ref(), &root))
            .await
            .map_err(|e| self.fs_error(&ctx.root, format!("source resolution aborted: {e}")))?
            .map_err(|e| self.fs_error(&ctx.root, format!("{e:#}")))
    }

    async fn write(
        &self,
        ctx: &TransformContext,
        dest: PathBuf,
        files: FileSet,
    ) -> Result<Vec<PathBuf>, TaskError> {
        let mut outputs = Vec::with_capacity(files.len());
        for entry in files {
            let Some(relative) = normalize_relative(&entry.relative) else {
                return Err(self.fs_error(&entry.relative, "output path leaves the destination"));
            };
            outputs.push((dest.join(relative), entry.contents));
        }

        let fs = Arc::clone(&ctx.fs);
        let task = self.name.clone();
        tokio::task::spawn_blocking(move || write_all(fs.as_ref(), &task, outputs))
            .await
            .map_err(|e| self.fs_error(&dest, format!("writing outputs aborted: {e}")))?
    }

    fn fs_error(&self, path: &Path, message: impl Into<String>) -> TaskError {
        TaskError::Filesystem {
            task: self.name.clone(),
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

fn write_all(
    fs: &dyn FileSystem,
    task: &str,
    outputs: Vec<(PathBuf, Vec<u8>)>,
) -> Result<Vec<PathBuf>, TaskError> {
    let mut written = Vec::with_capacity(outputs.len());
    for (path, contents) in outputs {
        fs.write(&path, &contents).map_err(|e| TaskError::Filesystem {
            task: task.to_string(),
            path: path.clone(),
            message: format!("{e:#}"),
        })?;
        trace!(task, path = %path.display(), "wrote output");
        written.push(path);
    }
    Ok(written)
}
