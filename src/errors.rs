// src/errors.rs

//! Crate-wide error types.
//!
//! - [`AssetflowError`] is what invocations (`build`, `clean`, config loading,
//!   server binding) return to `main`.
//! - [`TaskError`] is the typed failure of a single task run. It is `Clone`
//!   so it can travel through the runtime channel and the reporter.

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::TaskName;

#[derive(Error, Debug)]
pub enum AssetflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    TaskCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure of a single task run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("[{task}] {stage} failed on {}: {message}", file.display())]
    Transform {
        task: TaskName,
        stage: String,
        file: PathBuf,
        message: String,
    },

    #[error("[{task}] filesystem error at {}: {message}", path.display())]
    Filesystem {
        task: TaskName,
        path: PathBuf,
        message: String,
    },

    #[error("[{task}] {} child tasks failed: {}", failures.len(), join_failures(failures))]
    Aggregate {
        task: TaskName,
        failures: Vec<TaskError>,
    },

    #[error("unknown task '{0}'")]
    UnknownTask(TaskName),
}

impl TaskError {
    /// Name of the task the error originated in.
    pub fn task(&self) -> &str {
        match self {
            TaskError::Transform { task, .. }
            | TaskError::Filesystem { task, .. }
            | TaskError::Aggregate { task, .. } => task,
            TaskError::UnknownTask(task) => task,
        }
    }

    /// File the error points at, if any.
    pub fn file(&self) -> Option<&PathBuf> {
        match self {
            TaskError::Transform { file, .. } => Some(file),
            TaskError::Filesystem { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Flatten aggregates into their leaf failures.
    pub fn leaf_failures(&self) -> Vec<&TaskError> {
        match self {
            TaskError::Aggregate { failures, .. } => {
                failures.iter().flat_map(|f| f.leaf_failures()).collect()
            }
            other => vec![other],
        }
    }
}

fn join_failures(failures: &[TaskError]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error raised inside a single transform stage.
///
/// The leaf pipeline attaches the task name and turns it into
/// [`TaskError::Transform`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{stage} failed on {}: {message}", file.display())]
pub struct TransformError {
    pub stage: String,
    pub file: PathBuf,
    pub message: String,
}

impl TransformError {
    pub fn new(
        stage: impl Into<String>,
        file: impl Into<PathBuf>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self {
            stage: stage.into(),
            file: file.into(),
            message: message.to_string(),
        }
    }

    pub fn into_task_error(self, task: &str) -> TaskError {
        TaskError::Transform {
            task: task.to_string(),
            stage: self.stage,
            file: self.file,
            message: self.message,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetflowError>;
