// src/watch/event_handler.rs

//! Turns one debounced batch of changed paths into task triggers.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TaskName, TriggerReason};
use crate::fs::FileSystem;
use crate::watch::hash::ContentHashes;
use crate::watch::path_utils::relative_str;
use crate::watch::rules::WatchRule;

/// Tasks to trigger for a batch of changed paths.
///
/// - Paths outside `root` or matching no rule are ignored.
/// - Each task appears at most once, however many of its files changed.
/// - A `use_hash` rule only counts paths whose contents actually changed.
pub fn tasks_for_batch(
    fs: &dyn FileSystem,
    root: &Path,
    rules: &[WatchRule],
    hashes: &mut ContentHashes,
    paths: &[PathBuf],
) -> Vec<TaskName> {
    let unique: BTreeSet<&PathBuf> = paths.iter().collect();

    let mut relative: BTreeMap<String, &Path> = BTreeMap::new();
    for path in unique {
        match relative_str(root, path) {
            Some(rel) if !rel.is_empty() => {
                relative.insert(rel, path.as_path());
            }
            _ => debug!(?path, "ignoring path outside project root"),
        }
    }

    // Content state is observed at most once per path per batch.
    let mut changed: BTreeMap<&str, bool> = BTreeMap::new();
    let mut tasks: Vec<TaskName> = Vec::new();

    for rule in rules {
        let matching: Vec<(&String, &&Path)> =
            relative.iter().filter(|(rel, _)| rule.matches(rel)).collect();
        if matching.is_empty() {
            continue;
        }

        // Every matching path is observed so the stored hashes stay current,
        // even when an earlier path already decided the outcome.
        let fires = if rule.use_hash() {
            let observed: Vec<bool> = matching
                .iter()
                .map(|&(rel, abs)| {
                    *changed
                        .entry(rel.as_str())
                        .or_insert_with(|| hashes.observe(fs, abs))
                })
                .collect();
            observed.into_iter().any(|c| c)
        } else {
            true
        };

        if !fires {
            info!(task = %rule.task(), "content unchanged; skipping trigger");
        } else if !tasks.iter().any(|t| t == rule.task()) {
            tasks.push(rule.task().to_string());
        }
    }

    tasks
}

/// Send a `FileWatch` trigger for each task. Returns `false` once the
/// runtime has gone away.
pub async fn dispatch(runtime_tx: &mpsc::Sender<RuntimeEvent>, tasks: Vec<TaskName>) -> bool {
    for task in tasks {
        debug!(task = %task, "watch match -> triggering task");
        if let Err(err) = runtime_tx
            .send(RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::FileWatch,
            })
            .await
        {
            warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn rule(task: &str, pattern: &str, use_hash: bool) -> WatchRule {
        WatchRule::new(task, &[pattern.to_string()], &[], use_hash).unwrap()
    }

    #[test]
    fn burst_of_saves_triggers_once() {
        let fs = MockFileSystem::new();
        let rules = vec![rule("css", "src/styles/**/*.css", false)];
        let paths = vec![
            PathBuf::from("/p/src/styles/main.css"),
            PathBuf::from("/p/src/styles/main.css"),
            PathBuf::from("/p/src/styles/_vars.css"),
        ];
        let tasks = tasks_for_batch(&fs, Path::new("/p"), &rules, &mut ContentHashes::new(), &paths);
        assert_eq!(tasks, vec!["css".to_string()]);
    }

    #[test]
    fn hashed_rule_skips_identical_rewrite() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/a.js", "let a = 1;");
        let rules = vec![rule("js", "src/*.js", true)];
        let paths = vec![PathBuf::from("/p/src/a.js")];
        let mut hashes = ContentHashes::new();

        let first = tasks_for_batch(&fs, Path::new("/p"), &rules, &mut hashes, &paths);
        assert_eq!(first, vec!["js".to_string()]);

        let second = tasks_for_batch(&fs, Path::new("/p"), &rules, &mut hashes, &paths);
        assert!(second.is_empty());

        fs.add_file("/p/src/a.js", "let a = 2;");
        let third = tasks_for_batch(&fs, Path::new("/p"), &rules, &mut hashes, &paths);
        assert_eq!(third, vec!["js".to_string()]);
    }

    #[test]
    fn hash_observed_once_for_several_hashed_rules() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/img/icons.svg", "<svg/>");
        let rules = vec![
            rule("images", "src/img/**/*.*", true),
            rule("svg-sprite", "src/img/**/icons.svg", true),
        ];
        let paths = vec![PathBuf::from("/p/src/img/icons.svg")];
        let tasks = tasks_for_batch(&fs, Path::new("/p"), &rules, &mut ContentHashes::new(), &paths);
        assert_eq!(tasks, vec!["images".to_string(), "svg-sprite".to_string()]);
    }

    #[test]
    fn every_changed_file_in_a_batch_is_remembered() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/img/a.png", "a1");
        fs.add_file("/p/src/img/b.png", "b1");
        let rules = vec![rule("images", "src/img/*.png", true)];
        let both = vec![PathBuf::from("/p/src/img/a.png"), PathBuf::from("/p/src/img/b.png")];
        let mut hashes = ContentHashes::new();

        let first = tasks_for_batch(&fs, Path::new("/p"), &rules, &mut hashes, &both);
        assert_eq!(first, vec!["images".to_string()]);
        assert_eq!(hashes.len(), 2);

        // b.png rewritten with identical bytes: nothing to do.
        let only_b = vec![PathBuf::from("/p/src/img/b.png")];
        let second = tasks_for_batch(&fs, Path::new("/p"), &rules, &mut hashes, &only_b);
        assert!(second.is_empty());
    }

    #[test]
    fn task_already_triggered_still_observes_hashed_paths() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/img/logo.png", "v1");
        let rules = vec![
            rule("images", "src/img/*.svg", false),
            rule("images", "src/img/*.png", true),
        ];
        let batch = vec![
            PathBuf::from("/p/src/img/icons.svg"),
            PathBuf::from("/p/src/img/logo.png"),
        ];
        let mut hashes = ContentHashes::new();
        let tasks = tasks_for_batch(&fs, Path::new("/p"), &rules, &mut hashes, &batch);
        assert_eq!(tasks, vec!["images".to_string()]);
        assert_eq!(hashes.len(), 1);
    }

    #[tokio::test]
    async fn dispatch_reports_closed_runtime() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        assert!(!dispatch(&tx, vec!["css".into()]).await);
    }
}
