//! Sass compilation with grass.
//!
//! Imports resolve relative to the importing file and then against the
//! configured load paths, through the pipeline's [`FileSystem`]. Every
//! stylesheet pulled in by `@import`/`@use` joins the entry's source map.

use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::errors::TransformError;
use crate::fs::FileSystem;
use crate::pipeline::fileset::{FileEntry, FileSet};

use super::{SyncTransform, TransformContext};

const STAGE: &str = "scss";

#[derive(Debug, Clone, Default)]
pub struct CompileScss {
    load_paths: Vec<PathBuf>,
}

impl CompileScss {
    pub fn new(load_paths: Vec<PathBuf>) -> Self {
        Self { load_paths }
    }

    /// Compiled CSS plus every stylesheet the entry pulled in.
    fn compile(
        &self,
        entry: &FileEntry,
        ctx: &TransformContext,
    ) -> Result<(String, Vec<(PathBuf, String)>), TransformError> {
        let source = entry.text(STAGE)?;
        let fs = StageFs {
            fs: ctx.fs.as_ref(),
            entry_path: &entry.origin,
            entry_source: source,
            loaded: Mutex::new(Vec::new()),
        };

        let css = {
            let mut options = grass::Options::default()
                .style(grass::OutputStyle::Expanded)
                .quiet(true)
                .fs(&fs);
            for dir in &self.load_paths {
                options = options.load_path(dir);
            }
            grass::from_path(&entry.origin, &options)
                .map_err(|e| TransformError::new(STAGE, &entry.origin, e.to_string()))?
        };
        Ok((css, fs.loaded.into_inner()))
    }
}

impl SyncTransform for CompileScss {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn apply_sync(&self, files: FileSet, ctx: &TransformContext) -> Result<FileSet, TransformError> {
        files.try_map(|entry| {
            let (css, loaded) = self.compile(entry, ctx)?;
            if let Some(map) = entry.source_map.as_mut() {
                for (path, content) in loaded {
                    map.add_source(ctx.display_path(&path), content);
                }
            }
            entry.set_text(css);
            entry.relative.set_extension("css");
            Ok(())
        })
    }
}

/// Serves the entry being compiled from memory (earlier stages may have
/// edited it) and everything else from the pipeline filesystem.
struct StageFs<'a> {
    fs: &'a dyn FileSystem,
    entry_path: &'a Path,
    entry_source: &'a str,
    loaded: Mutex<Vec<(PathBuf, String)>>,
}

impl std::fmt::Debug for StageFs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageFs")
            .field("entry_path", &self.entry_path)
            .finish()
    }
}

impl grass::Fs for StageFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        self.fs.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path == self.entry_path || self.fs.is_file(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        Ok(path.to_path_buf())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        if path == self.entry_path {
            return Ok(self.entry_source.as_bytes().to_vec());
        }
        let bytes = self
            .fs
            .read(path)
            .map_err(|e| io::Error::new(io::ErrorKind::NotFound, format!("{e:#}")))?;
        let mut loaded = self.loaded.lock();
        if !loaded.iter().any(|(p, _)| p == path) {
            loaded.push((path.to_path_buf(), String::from_utf8_lossy(&bytes).into_owned()));
        }
        Ok(bytes)
    }
}
