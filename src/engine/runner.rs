// src/engine/runner.rs

//! Executes a named task tree.
//!
//! - Leaf: delegated to the [`LeafBackend`].
//! - Sequence: children in order; the first failure stops the sequence.
//! - Parallel: all children start together and all run to completion; the
//!   task fails if any child failed.

use std::sync::Arc;
use std::time::Instant;

use futures::future::{BoxFuture, join_all};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::{TaskGraph, TaskNode};
use crate::errors::TaskError;
use crate::pipeline::{LeafBackend, LeafTask};
use crate::report::TaskReport;

pub struct Runner<B: LeafBackend> {
    graph: Arc<TaskGraph>,
    backend: B,
    reports: Option<mpsc::UnboundedSender<TaskReport>>,
}

impl<B: LeafBackend> std::fmt::Debug for Runner<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("tasks", &self.graph.tasks().count())
            .finish_non_exhaustive()
    }
}

impl<B: LeafBackend> Runner<B> {
    pub fn new(graph: Arc<TaskGraph>, backend: B) -> Self {
        Self {
            graph,
            backend,
            reports: None,
        }
    }

    /// Send a [`TaskReport`] for every finished leaf to `tx`.
    pub fn with_reports(mut self, tx: mpsc::UnboundedSender<TaskReport>) -> Self {
        self.reports = Some(tx);
        self
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run `task` and everything below it.
    pub async fn run(&self, task: &str) -> Result<(), TaskError> {
        let started = Instant::now();
        info!(task, "starting task");

        let result = self.run_node(task).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => info!(task, elapsed_ms, "task finished"),
            Err(err) => warn!(
                task,
                elapsed_ms,
                failures = err.leaf_failures().len(),
                "task failed"
            ),
        }
        result
    }

    fn run_node<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), TaskError>> {
        Box::pin(async move {
            let node = self
                .graph
                .get(name)
                .ok_or_else(|| TaskError::UnknownTask(name.to_string()))?;

            match node {
                TaskNode::Leaf(leaf) => self.run_leaf(leaf).await,
                TaskNode::Sequence(children) => {
                    for child in children {
                        self.run_node(child).await?;
                    }
                    Ok(())
                }
                TaskNode::Parallel(children) => {
                    let results = join_all(children.iter().map(|c| self.run_node(c))).await;
                    let mut failures: Vec<TaskError> =
                        results.into_iter().filter_map(Result::err).collect();
                    match failures.len() {
                        0 => Ok(()),
                        1 => Err(failures.remove(0)),
                        _ => Err(TaskError::Aggregate {
                            task: name.to_string(),
                            failures,
                        }),
                    }
                }
            }
        })
    }

    async fn run_leaf(&self, leaf: &LeafTask) -> Result<(), TaskError> {
        let started = Instant::now();
        debug!(task = leaf.name(), "running leaf");

        let result = self.backend.run_leaf(leaf).await;

        if let Some(tx) = &self.reports {
            let _ = tx.send(TaskReport {
                task: leaf.name().to_string(),
                result: result.clone(),
                elapsed: started.elapsed(),
            });
        }
        result.map(|_| ())
    }
}
