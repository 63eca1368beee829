// tests/watch_triggers.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, TaskConfigBuilder};
use crate::common::{init_tracing, write_tree};

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use assetflow::config::default_config;
use assetflow::engine::{RuntimeEvent, TriggerReason};
use assetflow::fs::RealFileSystem;
use assetflow::watch::event_handler::tasks_for_batch;
use assetflow::watch::{ContentHashes, build_rules, spawn_watcher, tasks_for_paths};

#[test]
fn builtin_rules_route_changes_to_tasks() {
    let cfg = default_config().unwrap();
    let rules = build_rules(cfg.watch()).unwrap();

    let cases = [
        ("src/templates/index.jinja", vec!["html"]),
        ("src/templates/partials/nav.jinja", vec!["html"]),
        ("src/scss/_vars.scss", vec!["css"]),
        ("src/scss/blocks/_header.scss", vec!["css"]),
        ("src/scripts/a.js", vec!["js"]),
        ("src/react/app/App.jsx", vec!["react-watch"]),
        ("src/img/logo.png", vec!["images"]),
        ("README.md", vec![]),
        ("dist/static/css/style.min.css", vec![]),
    ];
    for (path, expected) in cases {
        let tasks = tasks_for_paths(&rules, [path]);
        assert_eq!(tasks, expected, "for {path}");
    }
}

#[test]
fn batch_with_many_files_fires_each_task_once() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let cfg = ConfigFileBuilder::new()
        .with_task("css", TaskConfigBuilder::leaf(&["src/styles/*.css"]).build())
        .with_task("js", TaskConfigBuilder::leaf(&["src/scripts/*.js"]).build())
        .watch_rule(&["src/styles/**/*.css"], "css")
        .watch_rule(&["src/scripts/*.js"], "js")
        .build();
    let rules = build_rules(cfg.watch()).unwrap();

    let paths: Vec<PathBuf> = ["src/styles/a.css", "src/styles/b.css", "src/scripts/x.js"]
        .iter()
        .map(|p| root.join(p))
        .collect();
    let tasks = tasks_for_batch(&RealFileSystem, &root, &rules, &mut ContentHashes::new(), &paths);
    assert_eq!(tasks, vec!["css".to_string(), "js".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn saving_a_watched_file_triggers_its_task() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[("src/styles/main.css", "a {}")]);

    let cfg = ConfigFileBuilder::new()
        .with_task("css", TaskConfigBuilder::leaf(&["src/styles/*.css"]).build())
        .watch_rule(&["src/styles/**/*.css"], "css")
        .build();
    let rules = build_rules(cfg.watch()).unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    let handle = spawn_watcher(dir.path(), rules, tx, Duration::from_millis(100)).unwrap();

    // Give the backend a moment to register before writing.
    tokio::time::sleep(Duration::from_millis(200)).await;
    write_tree(dir.path(), &[("src/styles/main.css", "a { color: red }")]);
    write_tree(dir.path(), &[("notes.txt", "ignored")]);

    let event = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("watch trigger within 5s")
        .expect("channel open");
    match event {
        RuntimeEvent::TaskTriggered { task, reason } => {
            assert_eq!(task, "css");
            assert_eq!(reason, TriggerReason::FileWatch);
        }
        other => panic!("unexpected event {other:?}"),
    }

    handle.stop();
}
