// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::BTreeSet;

use tracing::debug;

use crate::engine::queue::RerunQueue;
use crate::engine::{RuntimeOptions, TaskName, TaskOutcome, TriggerReason};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Start a run of this task.
    StartTask(TaskName),
    /// Request that the runtime exits (used with `exit_when_idle`).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle a task trigger event.
///
/// - If the task is idle, start it.
/// - If the task is already running, record a pending rerun according to
///   the busy policy. Two instances of the same task never run at once.
pub fn handle_task_trigger(
    in_flight: &mut BTreeSet<TaskName>,
    queue: &mut RerunQueue,
    task: TaskName,
    reason: TriggerReason,
) -> CoreStep {
    if in_flight.contains(&task) {
        queue.record_trigger(&task);
        return CoreStep::continue_with(Vec::new());
    }

    debug!(task = %task, ?reason, "starting triggered task");
    in_flight.insert(task.clone());
    CoreStep::continue_with(vec![CoreCommand::StartTask(task)])
}

/// Handle a finished task run.
///
/// A pending rerun starts immediately; otherwise the task becomes idle.
pub fn handle_task_finished(
    in_flight: &mut BTreeSet<TaskName>,
    queue: &mut RerunQueue,
    options: &RuntimeOptions,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    let mut commands = Vec::new();

    if let TaskOutcome::Failed(err) = &outcome {
        debug!(task = %task, error = %err, "triggered task failed");
    }

    if queue.take(&task) {
        debug!(task = %task, "starting pending rerun");
        commands.push(CoreCommand::StartTask(task));
    } else {
        in_flight.remove(&task);
    }

    let mut keep_running = true;
    if options.exit_when_idle && in_flight.is_empty() && queue.is_empty() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}
