use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetflow::errors::TaskError;
use assetflow::pipeline::{LeafBackend, LeafFuture, LeafReport, LeafTask};

/// What the fake backend observed, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafEvent {
    Started(String),
    Finished(String),
}

#[derive(Debug, Default)]
struct State {
    events: Vec<LeafEvent>,
    active: BTreeMap<String, usize>,
    max_same_task: usize,
    max_total: usize,
}

/// A fake leaf backend that:
/// - records when each leaf starts and finishes
/// - optionally sleeps per leaf, so runs overlap
/// - fails the leaves named in `failing` with a transform error
///
/// Clones share state, so a test can keep a handle after moving one into a
/// `Runner`.
#[derive(Debug, Clone, Default)]
pub struct FakeLeafBackend {
    state: Arc<Mutex<State>>,
    failing: Arc<BTreeSet<String>>,
    delays: Arc<BTreeMap<String, Duration>>,
}

impl FakeLeafBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, tasks: &[&str]) -> Self {
        self.failing = Arc::new(tasks.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn delay(mut self, task: &str, delay: Duration) -> Self {
        let mut delays = (*self.delays).clone();
        delays.insert(task.to_string(), delay);
        self.delays = Arc::new(delays);
        self
    }

    pub fn events(&self) -> Vec<LeafEvent> {
        self.state.lock().unwrap().events.clone()
    }

    /// Names of leaves that started, in start order.
    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                LeafEvent::Started(name) => Some(name),
                LeafEvent::Finished(_) => None,
            })
            .collect()
    }

    pub fn start_count(&self, task: &str) -> usize {
        self.started().iter().filter(|t| *t == task).count()
    }

    /// Highest number of concurrent runs of any single leaf.
    pub fn max_same_task(&self) -> usize {
        self.state.lock().unwrap().max_same_task
    }

    /// Highest number of leaves running at once.
    pub fn max_total(&self) -> usize {
        self.state.lock().unwrap().max_total
    }

    fn begin(&self, task: &str) {
        let mut state = self.state.lock().unwrap();
        state.events.push(LeafEvent::Started(task.to_string()));
        let count = {
            let count = state.active.entry(task.to_string()).or_default();
            *count += 1;
            *count
        };
        let total: usize = state.active.values().sum();
        state.max_same_task = state.max_same_task.max(count);
        state.max_total = state.max_total.max(total);
    }

    fn end(&self, task: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(count) = state.active.get_mut(task) {
            *count -= 1;
        }
        state.events.push(LeafEvent::Finished(task.to_string()));
    }
}

impl LeafBackend for FakeLeafBackend {
    fn run_leaf<'a>(&'a self, leaf: &'a LeafTask) -> LeafFuture<'a> {
        Box::pin(async move {
            let name = leaf.name().to_string();
            self.begin(&name);

            if let Some(delay) = self.delays.get(&name) {
                tokio::time::sleep(*delay).await;
            } else {
                tokio::task::yield_now().await;
            }

            self.end(&name);

            if self.failing.contains(&name) {
                return Err(TaskError::Transform {
                    task: name.clone(),
                    stage: "fake".to_string(),
                    file: PathBuf::from(format!("src/{name}.txt")),
                    message: "injected failure".to_string(),
                });
            }
            Ok(LeafReport {
                task: name,
                inputs: 0,
                written: Vec::new(),
            })
        })
    }
}
