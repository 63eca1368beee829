// src/engine/queue.rs

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::types::BusyPolicy;

use super::TaskName;

/// Pending reruns for tasks that were triggered while already running.
///
/// Semantics:
/// - `Coalesce`: any number of triggers during a run collapse into one
///   pending rerun.
/// - `Queue`: every trigger is remembered, up to `queue_length` per task.
///   Triggers beyond that are dropped.
///
/// The runtime calls [`RerunQueue::take`] when a task finishes to decide
/// whether to start it again right away.
#[derive(Debug)]
pub struct RerunQueue {
    policy: BusyPolicy,
    max_pending: usize,
    pending: BTreeMap<TaskName, usize>,
}

impl RerunQueue {
    /// `queue_length` only matters for `Queue` and is clamped to at least 1.
    pub fn new(policy: BusyPolicy, queue_length: usize) -> Self {
        let max_pending = match policy {
            BusyPolicy::Coalesce => 1,
            BusyPolicy::Queue => queue_length.max(1),
        };
        Self {
            policy,
            max_pending,
            pending: BTreeMap::new(),
        }
    }

    pub fn policy(&self) -> BusyPolicy {
        self.policy
    }

    /// Returns true if there are no pending reruns at all.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending_for(&self, task: &str) -> usize {
        self.pending.get(task).copied().unwrap_or(0)
    }

    /// Record a trigger for a running task. Returns false if it was
    /// absorbed into an already pending rerun or dropped.
    pub fn record_trigger(&mut self, task: &str) -> bool {
        let count = self.pending.entry(task.to_string()).or_insert(0);
        if *count >= self.max_pending {
            match self.policy {
                BusyPolicy::Coalesce => {
                    debug!(task, "trigger coalesced into pending rerun");
                }
                BusyPolicy::Queue => {
                    warn!(
                        task,
                        queue_length = self.max_pending,
                        "rerun queue full; dropping trigger"
                    );
                }
            }
            return false;
        }
        *count += 1;
        debug!(task, pending = *count, "queued rerun");
        true
    }

    /// Consume one pending rerun for `task`, if any.
    pub fn take(&mut self, task: &str) -> bool {
        match self.pending.get_mut(task) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.pending.remove(task);
                true
            }
            None => false,
        }
    }
}
