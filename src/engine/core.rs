// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - spawning task runs
//! - handling Ctrl+C / shutdown
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels, filesystem, or pipelines.

use std::collections::BTreeSet;

use crate::engine::event_handlers::{CoreStep, handle_task_finished, handle_task_trigger};
use crate::engine::queue::RerunQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions, TaskName};
use crate::types::BusyPolicy;

/// Pure core runtime state.
///
/// This owns:
/// - the set of tasks currently running
/// - the rerun queue
/// - runtime options (e.g. `exit_when_idle`)
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    in_flight: BTreeSet<TaskName>,
    queue: RerunQueue,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(policy: BusyPolicy, queue_length: usize, options: RuntimeOptions) -> Self {
        Self {
            in_flight: BTreeSet::new(),
            queue: RerunQueue::new(policy, queue_length),
            options,
        }
    }

    /// True when no task is running.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn is_running(&self, task: &str) -> bool {
        self.in_flight.contains(task)
    }

    /// Expose queue emptiness (for tests).
    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pending_for(&self, task: &str) -> usize {
        self.queue.pending_for(task)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { task, reason } => {
                handle_task_trigger(&mut self.in_flight, &mut self.queue, task, reason)
            }
            RuntimeEvent::TaskFinished { task, outcome } => handle_task_finished(
                &mut self.in_flight,
                &mut self.queue,
                &self.options,
                task,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CoreCommand, TaskOutcome, TriggerReason};

    fn trigger(task: &str) -> RuntimeEvent {
        RuntimeEvent::TaskTriggered {
            task: task.to_string(),
            reason: TriggerReason::FileWatch,
        }
    }

    fn finished(task: &str) -> RuntimeEvent {
        RuntimeEvent::TaskFinished {
            task: task.to_string(),
            outcome: TaskOutcome::Success,
        }
    }

    #[test]
    fn trigger_while_running_coalesces_into_one_rerun() {
        let mut core = CoreRuntime::new(BusyPolicy::Coalesce, 1, RuntimeOptions::default());

        let step = core.step(trigger("css"));
        assert_eq!(step.commands, vec![CoreCommand::StartTask("css".into())]);

        for _ in 0..3 {
            assert!(core.step(trigger("css")).commands.is_empty());
        }
        assert_eq!(core.pending_for("css"), 1);

        let step = core.step(finished("css"));
        assert_eq!(step.commands, vec![CoreCommand::StartTask("css".into())]);
        assert!(core.is_running("css"));

        let step = core.step(finished("css"));
        assert!(step.commands.is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn different_tasks_run_concurrently() {
        let mut core = CoreRuntime::new(BusyPolicy::Coalesce, 1, RuntimeOptions::default());
        core.step(trigger("css"));
        let step = core.step(trigger("js"));
        assert_eq!(step.commands, vec![CoreCommand::StartTask("js".into())]);
        assert!(core.is_running("css") && core.is_running("js"));
    }

    #[test]
    fn exits_when_idle_if_requested() {
        let mut core = CoreRuntime::new(
            BusyPolicy::Coalesce,
            1,
            RuntimeOptions {
                exit_when_idle: true,
            },
        );
        core.step(trigger("html"));
        let step = core.step(finished("html"));
        assert!(!step.keep_running);
        assert_eq!(step.commands, vec![CoreCommand::RequestExit]);
    }

    #[test]
    fn shutdown_stops_the_loop() {
        let mut core = CoreRuntime::new(BusyPolicy::Queue, 3, RuntimeOptions::default());
        assert!(!core.step(RuntimeEvent::ShutdownRequested).keep_running);
    }
}
