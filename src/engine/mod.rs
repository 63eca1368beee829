// src/engine/mod.rs

//! Orchestration engine for assetflow.
//!
//! This module ties together:
//! - the task [`runner`], which executes a named task tree (leaf, sequence
//!   or parallel) against a [`LeafBackend`](crate::pipeline::LeafBackend)
//! - the rerun queue (what happens when triggers arrive while a task runs)
//! - the watch-mode event loop that reacts to:
//!   - file-watch triggers
//!   - task completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::errors::TaskError;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Outcome of one triggered task run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(TaskError),
}

impl From<Result<(), TaskError>> for TaskOutcome {
    fn from(result: Result<(), TaskError>) -> Self {
        match result {
            Ok(()) => TaskOutcome::Success,
            Err(e) => TaskOutcome::Failed(e),
        }
    }
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Manual trigger (e.g. the initial build at startup).
    Manual,
    /// Triggered due to a filesystem event.
    FileWatch,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once nothing is running and nothing is
    /// pending.
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the watcher and task runs.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A task should be run.
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    /// A triggered task run finished.
    TaskFinished {
        task: TaskName,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runner;
pub mod runtime;

pub use self::core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::RerunQueue;
pub use runner::Runner;
pub use runtime::Runtime;
