// src/report.rs

//! Per-leaf result reporting.
//!
//! The runner sends a [`TaskReport`] for every finished leaf. The reporter
//! logs it, prints failures to stderr in a form a person can act on, and
//! mirrors the error state to live reload clients.

use std::time::Duration;

use owo_colors::{OwoColorize, Stream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::engine::TaskName;
use crate::errors::TaskError;
use crate::pipeline::LeafReport;
use crate::reload::LiveReload;

#[derive(Debug, Clone)]
pub struct TaskReport {
    pub task: TaskName,
    pub result: Result<LeafReport, TaskError>,
    pub elapsed: Duration,
}

/// Browser overlay change caused by one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayUpdate {
    Show { task: TaskName, message: String },
    Clear,
}

/// Failing leaves, in failure order, with the message shown for each.
#[derive(Debug, Default)]
struct FailureLog {
    failures: Vec<(TaskName, String)>,
}

impl FailureLog {
    fn record(&mut self, task: &str, message: String) {
        self.failures.retain(|(t, _)| t != task);
        self.failures.push((task.to_string(), message));
    }

    /// Forget `task`. Returns whether it was failing.
    fn resolve(&mut self, task: &str) -> bool {
        let before = self.failures.len();
        self.failures.retain(|(t, _)| t != task);
        self.failures.len() != before
    }

    fn latest(&self) -> Option<&(TaskName, String)> {
        self.failures.last()
    }
}

/// Consume reports until every sender is dropped.
pub fn spawn_reporter(
    mut rx: mpsc::UnboundedReceiver<TaskReport>,
    reload: Option<LiveReload>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut failing = FailureLog::default();
        while let Some(report) = rx.recv().await {
            let update = handle_report(&mut failing, report);
            if let (Some(reload), Some(update)) = (reload.as_ref(), update) {
                match update {
                    OverlayUpdate::Show { task, message } => reload.report_error(&task, &message),
                    OverlayUpdate::Clear => reload.clear_error(),
                }
            }
        }
    })
}

fn handle_report(failing: &mut FailureLog, report: TaskReport) -> Option<OverlayUpdate> {
    let elapsed_ms = report.elapsed.as_millis() as u64;
    match report.result {
        Ok(leaf) => {
            info!(
                task = %report.task,
                inputs = leaf.inputs,
                written = leaf.written.len(),
                elapsed_ms,
                "leaf finished"
            );
            if !failing.resolve(&report.task) {
                return None;
            }
            // Another leaf may still be broken; keep its error on screen.
            Some(match failing.latest() {
                Some((task, message)) => OverlayUpdate::Show {
                    task: task.clone(),
                    message: message.clone(),
                },
                None => OverlayUpdate::Clear,
            })
        }
        Err(err) => {
            error!(task = %report.task, error = %err, "leaf failed");
            eprintln!("{}", failure_line(&err));
            let message = err.to_string();
            failing.record(&report.task, message.clone());
            Some(OverlayUpdate::Show {
                task: report.task,
                message,
            })
        }
    }
}

/// One-line, colored (when stderr supports it) failure message.
pub fn failure_line(err: &TaskError) -> String {
    format!(
        "{} {}",
        "✖".if_supports_color(Stream::Stderr, |t| t.red()),
        err.if_supports_color(Stream::Stderr, |t| t.bold())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn failure_of(task: &str) -> TaskReport {
        TaskReport {
            task: task.into(),
            result: Err(TaskError::Transform {
                task: task.into(),
                stage: "scss".into(),
                file: PathBuf::from("src/scss/main.scss"),
                message: format!("{task} broke"),
            }),
            elapsed: Duration::from_millis(3),
        }
    }

    fn failure() -> TaskReport {
        failure_of("css")
    }

    fn success_of(task: &str) -> TaskReport {
        TaskReport {
            task: task.into(),
            result: Ok(LeafReport {
                task: task.into(),
                inputs: 1,
                written: vec![],
            }),
            elapsed: Duration::from_millis(3),
        }
    }

    fn shown(update: Option<OverlayUpdate>) -> String {
        match update {
            Some(OverlayUpdate::Show { task, .. }) => task,
            other => panic!("expected overlay, got {other:?}"),
        }
    }

    #[test]
    fn failing_set_tracks_recovery() {
        let mut failing = FailureLog::default();
        assert_eq!(shown(handle_report(&mut failing, failure())), "css");
        assert_eq!(
            handle_report(&mut failing, success_of("css")),
            Some(OverlayUpdate::Clear)
        );
        assert_eq!(handle_report(&mut failing, success_of("css")), None);
    }

    #[test]
    fn recovery_keeps_other_failures_on_screen() {
        let mut failing = FailureLog::default();
        handle_report(&mut failing, failure_of("js"));
        assert_eq!(shown(handle_report(&mut failing, failure_of("css"))), "css");

        let update = handle_report(&mut failing, success_of("css"));
        assert_eq!(
            update,
            Some(OverlayUpdate::Show {
                task: "js".into(),
                message: TaskError::Transform {
                    task: "js".into(),
                    stage: "scss".into(),
                    file: PathBuf::from("src/scss/main.scss"),
                    message: "js broke".into(),
                }
                .to_string(),
            })
        );
        assert_eq!(
            handle_report(&mut failing, success_of("js")),
            Some(OverlayUpdate::Clear)
        );
    }

    #[test]
    fn unrelated_success_leaves_overlay_alone() {
        let mut failing = FailureLog::default();
        handle_report(&mut failing, failure());
        assert_eq!(handle_report(&mut failing, success_of("html")), None);
    }

    #[test]
    fn failure_line_names_file_and_cause() {
        let TaskReport { result: Err(err), .. } = failure() else {
            unreachable!()
        };
        let line = failure_line(&err);
        assert!(line.contains("src/scss/main.scss"));
        assert!(line.contains("css broke"));
    }
}
