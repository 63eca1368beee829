// src/dag/graph.rs

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;

use crate::config::ConfigFile;
use crate::engine::TaskName;
use crate::errors::{AssetflowError, Result};
use crate::pipeline::LeafTask;

/// A node of the task graph.
#[derive(Debug)]
pub enum TaskNode {
    Leaf(LeafTask),
    /// Children run one after another; the first failure stops the rest.
    Sequence(Vec<TaskName>),
    /// Children run concurrently; all of them run to completion.
    Parallel(Vec<TaskName>),
}

impl TaskNode {
    pub fn children(&self) -> &[TaskName] {
        match self {
            TaskNode::Leaf(_) => &[],
            TaskNode::Sequence(children) | TaskNode::Parallel(children) => children,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TaskNode::Leaf(_) => "leaf",
            TaskNode::Sequence(_) => "sequence",
            TaskNode::Parallel(_) => "parallel",
        }
    }
}

/// Registry of named tasks built from a validated [`ConfigFile`].
///
/// Validation already guarantees that every child reference resolves and
/// that there are no cycles; building only compiles globs and transforms.
#[derive(Debug)]
pub struct TaskGraph {
    nodes: BTreeMap<TaskName, TaskNode>,
}

impl TaskGraph {
    /// Build the graph. Relative paths in task configs resolve against `root`.
    pub fn from_config(cfg: &ConfigFile, root: &Path) -> Result<Self> {
        let mut nodes = BTreeMap::new();

        for (name, task) in cfg.tasks() {
            let node = if let Some(children) = &task.sequence {
                TaskNode::Sequence(children.clone())
            } else if let Some(children) = &task.parallel {
                TaskNode::Parallel(children.clone())
            } else {
                let leaf = LeafTask::from_config(name, task, root)
                    .with_context(|| format!("task '{name}'"))
                    .map_err(|e| AssetflowError::ConfigError(format!("{e:#}")))?;
                TaskNode::Leaf(leaf)
            };
            nodes.insert(name.clone(), node);
        }

        Ok(Self { nodes })
    }

    pub fn get(&self, name: &str) -> Option<&TaskNode> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// All task names, sorted.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    /// Leaf tasks reachable from `name`, in execution order, each once.
    pub fn leaves_of(&self, name: &str) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_leaves(name, &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, name: &str, out: &mut Vec<&'a str>) {
        let Some((key, node)) = self.nodes.get_key_value(name) else {
            return;
        };
        match node {
            TaskNode::Leaf(_) => {
                if !out.contains(&key.as_str()) {
                    out.push(key.as_str());
                }
            }
            TaskNode::Sequence(children) | TaskNode::Parallel(children) => {
                for child in children {
                    self.collect_leaves(child, out);
                }
            }
        }
    }
}
