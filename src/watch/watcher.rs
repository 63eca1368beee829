// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::event_handler::{dispatch, tasks_for_batch};
use crate::watch::hash::ContentHashes;
use crate::watch::rules::WatchRule;

/// Handle for the filesystem watcher.
///
/// Watching stops on [`WatcherHandle::stop`] or when the handle is dropped.
pub struct WatcherHandle {
    watcher: Option<RecommendedWatcher>,
    batcher: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("active", &self.watcher.is_some())
            .finish()
    }
}

impl WatcherHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.watcher.take().is_some() {
            info!("file watcher stopped");
        }
        if let Some(batcher) = self.batcher.take() {
            batcher.abort();
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Watch `root` recursively and send `RuntimeEvent::TaskTriggered` for the
/// tasks whose rules match changed paths.
///
/// Events are gathered into batches: a batch opens with the first event and
/// closes once `debounce` has elapsed. Access-only events are ignored.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    rules: Vec<WatchRule>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    debounce: Duration,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Access(_)) {
                    return;
                }
                if event_tx.send(event).is_err() {
                    debug!("watch batcher gone; dropping notify event");
                }
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )
    .context("creating file watcher")?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("watching {root:?}"))?;

    info!(root = ?root, rules = rules.len(), "file watcher started");

    let rules = Arc::new(rules);
    let hashes = Arc::new(Mutex::new(ContentHashes::new()));
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let batcher = tokio::spawn(async move {
        while let Some(first) = event_rx.recv().await {
            let mut paths = first.paths;
            let deadline = Instant::now() + debounce;
            loop {
                match timeout_at(deadline, event_rx.recv()).await {
                    Ok(Some(event)) => paths.extend(event.paths),
                    Ok(None) | Err(_) => break,
                }
            }
            debug!(count = paths.len(), "processing watch batch");

            let root = root.clone();
            let rules = Arc::clone(&rules);
            let hashes = Arc::clone(&hashes);
            let fs = Arc::clone(&fs);
            let tasks = tokio::task::spawn_blocking(move || {
                let mut hashes = hashes.lock();
                tasks_for_batch(fs.as_ref(), &root, &rules, &mut hashes, &paths)
            })
            .await;

            let tasks = match tasks {
                Ok(t) => t,
                Err(err) => {
                    warn!(error = %err, "watch batch processing failed");
                    continue;
                }
            };

            if !dispatch(&runtime_tx, tasks).await {
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        watcher: Some(watcher),
        batcher: Some(batcher),
    })
}
