// tests/config_validation.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, TaskConfigBuilder};

use std::path::Path;

use assetflow::config::{TransformSpec, default_config, load_or_default, parse_config};
use assetflow::dag::{TaskGraph, TaskNode};
use assetflow::errors::AssetflowError;
use assetflow::types::{BusyPolicy, ReloadMode};

fn leaf(src: &str) -> assetflow::config::TaskConfig {
    TaskConfigBuilder::leaf(&[src]).build()
}

#[test]
fn builtin_pipeline_is_valid_and_complete() {
    let cfg = default_config().unwrap();
    let graph = TaskGraph::from_config(&cfg, Path::new("/p")).unwrap();

    let mut build_leaves = graph.leaves_of("build");
    build_leaves.sort();
    assert_eq!(
        build_leaves,
        vec![
            "assets-css",
            "assets-js",
            "assets-js-exc",
            "css",
            "fonts",
            "html",
            "js",
            "min-images",
            "svg-sprite",
        ]
    );
    assert!(graph.leaves_of("dev-build").contains(&"images"));
    assert!(matches!(graph.get("react-watch"), Some(TaskNode::Leaf(l)) if l.dest().is_none()));
    assert_eq!(cfg.project().dest, "dist");
    assert_eq!(cfg.serve().port, 3000);
    assert_eq!(cfg.watch().on_busy, BusyPolicy::Coalesce);
}

#[test]
fn missing_file_falls_back_to_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_or_default(dir.path().join("Assetflow.toml")).unwrap();
    assert!(cfg.tasks().contains_key("dev-build"));
}

#[test]
fn parses_transform_chain() {
    let cfg = parse_config(
        r#"
        [task.css]
        src = ["src/styles/main.css"]
        dest = "dist/static/css"
        reload = "css"
        transforms = [
            { kind = "imports" },
            { kind = "prefix" },
            { kind = "rename", name = "style.min.css" },
        ]
        "#,
    )
    .unwrap();

    let css = &cfg.tasks()["css"];
    assert_eq!(css.reload, ReloadMode::Css);
    assert_eq!(css.transforms[0], TransformSpec::Imports);
    assert_eq!(
        css.transforms[1],
        TransformSpec::Prefix {
            browsers: vec!["last 6 versions".into()]
        }
    );
}

#[test]
fn rejects_cycles() {
    let err = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::sequence(&["b"]).build())
        .with_task("b", TaskConfigBuilder::parallel(&["a"]).build())
        .try_build()
        .unwrap_err();
    assert!(matches!(err, AssetflowError::TaskCycle(_)), "{err}");
}

#[test]
fn rejects_self_reference() {
    let err = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::sequence(&["a"]).build())
        .try_build()
        .unwrap_err();
    assert!(matches!(err, AssetflowError::TaskCycle(_)), "{err}");
}

#[test]
fn rejects_unknown_child() {
    let err = ConfigFileBuilder::new()
        .with_task("build", TaskConfigBuilder::parallel(&["css"]).build())
        .try_build()
        .unwrap_err();
    assert!(err.to_string().contains("unknown task 'css'"), "{err}");
}

#[test]
fn rejects_unknown_watch_target() {
    let err = ConfigFileBuilder::new()
        .with_task("css", leaf("src/*.css"))
        .watch_rule(&["src/*.css"], "styles")
        .try_build()
        .unwrap_err();
    assert!(err.to_string().contains("unknown task 'styles'"), "{err}");
}

#[test]
fn rejects_leaf_that_is_also_aggregate() {
    let err = ConfigFileBuilder::new()
        .with_task("js", leaf("src/*.js"))
        .with_task(
            "mixed",
            TaskConfigBuilder::leaf(&["src/*.css"]).with_sequence(&["js"]).build(),
        )
        .try_build()
        .unwrap_err();
    assert!(err.to_string().contains("exactly one of"), "{err}");
}

#[test]
fn rejects_invalid_globs() {
    let err = ConfigFileBuilder::new()
        .with_task("css", leaf("src/[*.css"))
        .try_build()
        .unwrap_err();
    assert!(matches!(err, AssetflowError::ConfigError(_)), "{err}");
}

#[test]
fn rejects_zero_queue_length() {
    let err = ConfigFileBuilder::new()
        .with_task("css", leaf("src/*.css"))
        .on_busy(BusyPolicy::Queue, 0)
        .try_build()
        .unwrap_err();
    assert!(err.to_string().contains("queue_length"), "{err}");
}

#[test]
fn rejects_unknown_transform_kind() {
    let err = parse_config(
        r#"
        [task.css]
        src = ["src/*.css"]
        transforms = [{ kind = "sass" }]
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, AssetflowError::TomlError(_)), "{err}");
}

#[test]
fn bad_transform_options_fail_graph_build() {
    let cfg = ConfigFileBuilder::new()
        .with_task(
            "js",
            TaskConfigBuilder::leaf(&["src/*.js"])
                .transform(TransformSpec::Replace {
                    pattern: "(".into(),
                    replacement: "".into(),
                })
                .build(),
        )
        .build();
    let err = TaskGraph::from_config(&cfg, Path::new("/p")).unwrap_err();
    assert!(matches!(err, AssetflowError::ConfigError(_)), "{err}");
}

#[test]
fn parses_scss_and_transpile_stages() {
    let cfg = parse_config(
        r#"
        [task.css]
        src = ["src/scss/main.scss"]
        transforms = [{ kind = "scss", load_paths = ["node_modules"] }]

        [task.js]
        src = ["src/scripts/*.js"]
        transforms = [{ kind = "transpile" }, { kind = "minify-js" }]
        "#,
    )
    .unwrap();

    assert_eq!(
        cfg.tasks()["css"].transforms[0],
        TransformSpec::Scss {
            load_paths: vec!["node_modules".into()]
        }
    );
    assert_eq!(
        cfg.tasks()["js"].transforms[0],
        TransformSpec::Transpile {
            targets: "es2015".into()
        }
    );
}

#[test]
fn unknown_transpile_target_fails_graph_build() {
    let cfg = ConfigFileBuilder::new()
        .with_task(
            "js",
            TaskConfigBuilder::leaf(&["src/*.js"])
                .transform(TransformSpec::Transpile {
                    targets: "netscape4".into(),
                })
                .build(),
        )
        .build();
    let err = TaskGraph::from_config(&cfg, Path::new("/p")).unwrap_err();
    assert!(matches!(err, AssetflowError::ConfigError(_)), "{err}");
}
