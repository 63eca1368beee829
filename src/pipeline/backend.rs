// src/pipeline/backend.rs

//! Pluggable leaf execution backend.
//!
//! The runner talks to a `LeafBackend` instead of running pipelines itself.
//! Production code uses [`PipelineBackend`]; tests can provide their own
//! implementation that records calls, sleeps or fails on demand.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use crate::errors::TaskError;
use crate::fs::FileSystem;
use crate::reload::{LiveReload, ReloadScope};
use crate::types::ReloadMode;

use super::leaf::{LeafReport, LeafTask};
use super::transform::TransformContext;

pub type LeafFuture<'a> = Pin<Box<dyn Future<Output = Result<LeafReport, TaskError>> + Send + 'a>>;

/// Trait abstracting how a single leaf task is executed.
pub trait LeafBackend: Send + Sync + 'static {
    fn run_leaf<'a>(&'a self, leaf: &'a LeafTask) -> LeafFuture<'a>;
}

/// Runs leaf pipelines against a filesystem and notifies live reload
/// clients after each success.
#[derive(Debug, Clone)]
pub struct PipelineBackend {
    root: PathBuf,
    site_root: PathBuf,
    fs: Arc<dyn FileSystem>,
    reload: Option<LiveReload>,
}

impl PipelineBackend {
    /// `site_root` is the served directory, relative to `root`; written
    /// stylesheets are announced by their URL path below it.
    pub fn new(root: PathBuf, site_root: impl AsRef<Path>, fs: Arc<dyn FileSystem>) -> Self {
        let site_root = root.join(site_root);
        Self {
            root,
            site_root,
            fs,
            reload: None,
        }
    }

    pub fn with_reload(mut self, reload: LiveReload) -> Self {
        self.reload = Some(reload);
        self
    }

    fn scope_for(&self, leaf: &LeafTask, report: &LeafReport) -> Option<ReloadScope> {
        match leaf.reload() {
            ReloadMode::None => None,
            ReloadMode::Full => Some(ReloadScope::Full {
                task: Some(leaf.name().to_string()),
            }),
            ReloadMode::Css => {
                let paths: Vec<String> = report
                    .written
                    .iter()
                    .filter(|p| p.extension().is_some_and(|e| e == "css"))
                    .filter_map(|p| url_path(&self.site_root, p))
                    .collect();
                if paths.is_empty() {
                    None
                } else {
                    Some(ReloadScope::Styles(paths))
                }
            }
        }
    }
}

/// URL path of `file` below `site_root`, e.g. `/static/css/style.min.css`.
pub fn url_path(site_root: &Path, file: &Path) -> Option<String> {
    let rel = file.strip_prefix(site_root).ok()?;
    Some(format!("/{}", rel.to_string_lossy().replace('\\', "/")))
}

impl LeafBackend for PipelineBackend {
    fn run_leaf<'a>(&'a self, leaf: &'a LeafTask) -> LeafFuture<'a> {
        Box::pin(async move {
            let ctx = TransformContext {
                task: leaf.name().to_string(),
                root: self.root.clone(),
                fs: Arc::clone(&self.fs),
            };
            let report = leaf.run(&ctx).await?;

            if let Some(reload) = &self.reload {
                if let Some(scope) = self.scope_for(leaf, &report) {
                    debug!(task = leaf.name(), ?scope, "notifying reload clients");
                    reload.notify(scope);
                }
            }
            Ok(report)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_path_is_rooted_at_site() {
        assert_eq!(
            url_path(Path::new("/p/dist"), Path::new("/p/dist/static/css/style.min.css")),
            Some("/static/css/style.min.css".to_string())
        );
        assert_eq!(url_path(Path::new("/p/dist"), Path::new("/p/other/a.css")), None);
    }
}
