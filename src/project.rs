// src/project.rs

//! One loaded project: config, root directory and filesystem, plus the
//! operations behind each CLI command.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::{ConfigFile, load_or_default, project_root};
use crate::dag::{TaskGraph, TaskNode};
use crate::engine::{CoreRuntime, Runner, Runtime, RuntimeEvent, RuntimeOptions};
use crate::errors::{AssetflowError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::PipelineBackend;
use crate::reload::LiveReload;
use crate::report::{TaskReport, spawn_reporter};
use crate::serve::{DevServer, ServerHandle};
use crate::watch::{build_rules, spawn_watcher};

#[derive(Debug, Clone)]
pub struct Project {
    config: ConfigFile,
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl Project {
    pub fn new(config: ConfigFile, root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            config,
            root: root.into(),
            fs,
        }
    }

    /// Load `config_path` (or the built-in pipeline when it does not exist)
    /// and apply a `--port` override.
    pub fn load(config_path: &Path, port: Option<u16>) -> Result<Self> {
        let mut config = load_or_default(config_path)?;
        if let Some(port) = port {
            config.set_serve_port(port);
        }
        let root = project_root(config_path);
        info!(root = ?root, tasks = config.tasks().len(), "project loaded");
        Ok(Self::new(config, root, Arc::new(RealFileSystem)))
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute output directory.
    pub fn dest_dir(&self) -> PathBuf {
        self.root.join(&self.config.project().dest)
    }

    pub fn graph(&self) -> Result<TaskGraph> {
        TaskGraph::from_config(&self.config, &self.root)
    }

    fn backend(&self, reload: Option<LiveReload>) -> PipelineBackend {
        let backend = PipelineBackend::new(
            self.root.clone(),
            &self.config.project().dest,
            Arc::clone(&self.fs),
        );
        match reload {
            Some(reload) => backend.with_reload(reload),
            None => backend,
        }
    }

    /// Remove everything inside the output directory. A missing directory
    /// is already clean.
    pub fn clean(&self) -> Result<()> {
        let dest = self.dest_dir();
        if !self.fs.is_dir(&dest) {
            info!(dest = ?dest, "nothing to clean");
            return Ok(());
        }

        let entries = self.fs.read_dir(&dest)?;
        for entry in &entries {
            if self.fs.is_dir(entry) {
                self.fs.remove_dir_all(entry)?;
            } else {
                self.fs.remove_file(entry)?;
            }
        }
        info!(dest = ?dest, removed = entries.len(), "cleaned output directory");
        Ok(())
    }

    /// Run one task to completion, reporting each leaf outcome.
    pub async fn run_task(&self, task: &str, reload: Option<LiveReload>) -> Result<()> {
        let graph = self.graph()?;
        if !graph.contains(task) {
            return Err(AssetflowError::TaskNotFound(task.to_string()));
        }

        let (report_tx, report_rx) = mpsc::unbounded_channel::<TaskReport>();
        let reporter = spawn_reporter(report_rx, reload.clone());

        let runner = Runner::new(Arc::new(graph), self.backend(reload)).with_reports(report_tx);
        let result = runner.run(task).await;

        // Closing the report channel lets the reporter drain and finish.
        drop(runner);
        if let Err(e) = reporter.await {
            warn!(error = %e, "reporter task failed");
        }

        result.map_err(AssetflowError::from)
    }

    /// `build`: clean, then run the build task.
    pub async fn build(&self) -> Result<()> {
        self.clean()?;
        let task = self.config.project().build_task.clone();
        self.run_task(&task, None).await
    }

    /// `watch`: rebuild tasks as their sources change until Ctrl-C.
    ///
    /// Task failures are reported and watching continues.
    pub async fn watch(&self, reload: Option<LiveReload>) -> Result<()> {
        let watch_cfg = self.config.watch();
        let rules = build_rules(watch_cfg)?;

        let (report_tx, report_rx) = mpsc::unbounded_channel::<TaskReport>();
        let reporter = spawn_reporter(report_rx, reload.clone());
        let runner = Arc::new(
            Runner::new(Arc::new(self.graph()?), self.backend(reload)).with_reports(report_tx),
        );

        let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
        let watcher = spawn_watcher(
            &self.root,
            rules,
            rt_tx.clone(),
            Duration::from_millis(watch_cfg.debounce_ms),
        )?;
        spawn_ctrl_c(rt_tx.clone());

        let core = CoreRuntime::new(
            watch_cfg.on_busy,
            watch_cfg.queue_length,
            RuntimeOptions::default(),
        );
        let result = Runtime::new(core, rt_tx, rt_rx, runner).run().await;

        watcher.stop();
        reporter.abort();
        result
    }

    /// Bind the live reload hub and the dev server for the output directory.
    pub fn start_server(&self) -> Result<(LiveReload, ServerHandle)> {
        let serve = self.config.serve();
        let reload = LiveReload::bind(&serve.host, serve.reload_port)?;
        let server = DevServer::bind(&serve.host, serve.port, self.dest_dir(), reload.port())?;
        Ok((reload, server.spawn()))
    }

    /// `serve`: dev server and live reload only, until Ctrl-C.
    pub async fn serve(&self) -> Result<()> {
        let (_reload, server) = self.start_server()?;
        tokio::signal::ctrl_c().await?;
        server.stop();
        Ok(())
    }

    /// `default`: clean, dev build, then serve and watch until Ctrl-C.
    ///
    /// A failing dev build is reported and does not stop the session.
    pub async fn develop(&self) -> Result<()> {
        self.clean()?;
        let (reload, server) = self.start_server()?;

        let task = self.config.project().dev_task.clone();
        if let Err(err) = self.run_task(&task, Some(reload.clone())).await {
            warn!(task = %task, error = %err, "dev build failed; watching anyway");
        }

        let result = self.watch(Some(reload)).await;
        server.stop();
        result
    }

    /// Task graph and watch rules as printed by `--dry-run`.
    pub fn describe(&self) -> Result<String> {
        let graph = self.graph()?;
        let project = self.config.project();
        let mut out = String::new();

        let _ = writeln!(out, "assetflow dry-run");
        let _ = writeln!(out, "  root = {}", self.root.display());
        let _ = writeln!(out, "  dest = {}", project.dest);
        let _ = writeln!(out, "  build_task = {}", project.build_task);
        let _ = writeln!(out, "  dev_task = {}", project.dev_task);
        let _ = writeln!(out);

        let _ = writeln!(out, "tasks ({}):", graph.tasks().count());
        for name in graph.tasks() {
            let Some(node) = graph.get(name) else { continue };
            match node {
                TaskNode::Leaf(leaf) => {
                    let _ = writeln!(out, "  - {name} (leaf)");
                    let stages = leaf.stage_names();
                    if !stages.is_empty() {
                        let _ = writeln!(out, "      transforms: {}", stages.join(" -> "));
                    }
                    match leaf.dest() {
                        Some(dest) => {
                            let _ = writeln!(out, "      dest: {}", dest.display());
                        }
                        None => {
                            let _ = writeln!(out, "      dest: (none)");
                        }
                    }
                }
                other => {
                    let _ = writeln!(
                        out,
                        "  - {name} ({}): {}",
                        other.kind(),
                        other.children().join(", ")
                    );
                }
            }
        }

        let rules = &self.config.watch().rules;
        let _ = writeln!(out);
        let _ = writeln!(out, "watch rules ({}):", rules.len());
        for rule in rules {
            let hash = if rule.use_hash { " [hash]" } else { "" };
            let _ = writeln!(out, "  - {:?} -> {}{hash}", rule.patterns, rule.task);
        }
        Ok(out)
    }
}

fn spawn_ctrl_c(tx: mpsc::Sender<RuntimeEvent>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {e}");
            return;
        }
        let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::fs::mock::MockFileSystem;

    const CONFIG: &str = r#"
        [project]
        dest = "dist"

        [task.copy]
        src = ["src/*.txt"]
        dest = "dist"

        [task.build]
        sequence = ["copy"]

        [[watch.rules]]
        patterns = ["src/*.txt"]
        task = "copy"
    "#;

    fn project(fs: &MockFileSystem) -> Project {
        Project::new(parse_config(CONFIG).unwrap(), "/p", Arc::new(fs.clone()))
    }

    #[test]
    fn clean_empties_dest_but_keeps_sources() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/a.txt", "a");
        fs.add_file("/p/dist/old.txt", "stale");
        fs.add_file("/p/dist/static/css/x.css", "stale");

        project(&fs).clean().unwrap();
        assert_eq!(fs.paths(), vec![PathBuf::from("/p/src/a.txt")]);
    }

    #[test]
    fn clean_without_dest_is_ok() {
        let fs = MockFileSystem::new();
        project(&fs).clean().unwrap();
    }

    #[tokio::test]
    async fn build_copies_sources() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/a.txt", "a");
        fs.add_file("/p/dist/removed.txt", "stale");

        project(&fs).build().await.unwrap();
        assert_eq!(
            fs.paths(),
            vec![PathBuf::from("/p/dist/a.txt"), PathBuf::from("/p/src/a.txt")]
        );
    }

    #[tokio::test]
    async fn unknown_task_is_reported() {
        let fs = MockFileSystem::new();
        let err = project(&fs).run_task("nope", None).await.unwrap_err();
        assert!(matches!(err, AssetflowError::TaskNotFound(name) if name == "nope"));
    }

    #[test]
    fn describe_lists_tasks_and_rules() {
        let fs = MockFileSystem::new();
        let text = project(&fs).describe().unwrap();
        assert!(text.contains("- build (sequence): copy"));
        assert!(text.contains("- copy (leaf)"));
        assert!(text.contains("-> copy"));
    }
}
