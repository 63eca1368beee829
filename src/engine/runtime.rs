// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::pipeline::LeafBackend;

use super::core::CoreRuntime;
use super::runner::Runner;
use super::{CoreCommand, RuntimeEvent, TaskName, TaskOutcome};

/// Drives the core runtime in response to `RuntimeEvent`s and starts task
/// runs on a shared [`Runner`].
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// rerun semantics. Each started run is a Tokio task that reports back with
/// `TaskFinished` on the same channel.
pub struct Runtime<B: LeafBackend> {
    core: CoreRuntime,
    event_tx: mpsc::Sender<RuntimeEvent>,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    runner: Arc<Runner<B>>,
}

impl<B: LeafBackend> fmt::Debug for Runtime<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<B: LeafBackend> Runtime<B> {
    /// `event_tx` must feed `event_rx`; finished runs are reported through it.
    pub fn new(
        core: CoreRuntime,
        event_tx: mpsc::Sender<RuntimeEvent>,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        runner: Arc<Runner<B>>,
    ) -> Self {
        Self {
            core,
            event_tx,
            event_rx,
            runner,
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core.
    pub async fn run(mut self) -> Result<()> {
        info!("assetflow runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command);
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    fn execute_command(&self, command: CoreCommand) {
        match command {
            CoreCommand::StartTask(task) => self.spawn_run(task),
            CoreCommand::RequestExit => {
                debug!("core issued RequestExit command");
            }
        }
    }

    fn spawn_run(&self, task: TaskName) {
        let runner = Arc::clone(&self.runner);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let outcome = TaskOutcome::from(runner.run(&task).await);
            if tx
                .send(RuntimeEvent::TaskFinished { task, outcome })
                .await
                .is_err()
            {
                warn!("runtime stopped before task run finished");
            }
        });
    }
}
