// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{BusyPolicy, ReloadMode};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [project]
/// dest = "dist"
///
/// [serve]
/// port = 3000
///
/// [watch]
/// on_busy = "coalesce"
///
/// [[watch.rules]]
/// patterns = ["src/styles/**/*.css"]
/// task = "css"
///
/// [task.css]
/// src = ["src/styles/main.css"]
/// dest = "dist/static/css"
/// transforms = [{ kind = "imports" }, { kind = "minify-css" }]
///
/// [task.build]
/// parallel = ["css"]
/// ```
///
/// This is the unvalidated form; use [`ConfigFile`] (via `TryFrom`) for
/// anything that executes tasks.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub serve: ServeSection,

    #[serde(default)]
    pub watch: WatchSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>`, so every task reference
/// resolves and the task graph is acyclic.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    project: ProjectSection,
    serve: ServeSection,
    watch: WatchSection,
    task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            project: raw.project,
            serve: raw.serve,
            watch: raw.watch,
            task: raw.task,
        }
    }

    pub fn project(&self) -> &ProjectSection {
        &self.project
    }

    pub fn serve(&self) -> &ServeSection {
        &self.serve
    }

    pub fn watch(&self) -> &WatchSection {
        &self.watch
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }

    /// Apply a `--port` override from the CLI.
    pub fn set_serve_port(&mut self, port: u16) {
        self.serve.port = port;
    }
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Output root, relative to the project root. `clean` empties it and the
    /// dev server serves it.
    #[serde(default = "default_dest")]
    pub dest: String,

    /// Task run by the `build` command.
    #[serde(default = "default_build_task")]
    pub build_task: String,

    /// Task run by the `default` command before serving.
    #[serde(default = "default_dev_task")]
    pub dev_task: String,
}

fn default_dest() -> String {
    "dist".to_string()
}

fn default_build_task() -> String {
    "build".to_string()
}

fn default_dev_task() -> String {
    "dev-build".to_string()
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            dest: default_dest(),
            build_task: default_build_task(),
            dev_task: default_dev_task(),
        }
    }
}

/// `[serve]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServeSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// First port tried for the live reload WebSocket.
    #[serde(default = "default_reload_port")]
    pub reload_port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_reload_port() -> u16 {
    35729
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            reload_port: default_reload_port(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// `"coalesce"` (default) or `"queue"`.
    #[serde(default)]
    pub on_busy: BusyPolicy,

    /// Maximum pending reruns per task in `queue` mode.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// Events arriving within this window are handled as one batch.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default)]
    pub rules: Vec<WatchRuleConfig>,
}

fn default_queue_length() -> usize {
    1
}

fn default_debounce_ms() -> u64 {
    50
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            on_busy: BusyPolicy::default(),
            queue_length: default_queue_length(),
            debounce_ms: default_debounce_ms(),
            rules: Vec::new(),
        }
    }
}

/// One `[[watch.rules]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchRuleConfig {
    /// Globs relative to the project root; `!`-prefixed entries exclude.
    pub patterns: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    /// Task triggered when a matching file changes.
    pub task: String,

    /// Only fire when the changed file's content hash differs from the last
    /// one seen.
    #[serde(default)]
    pub use_hash: bool,
}

/// `[task.<name>]` section.
///
/// Exactly one of `src` (leaf), `sequence` or `parallel` must be set.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskConfig {
    /// Source globs; `!`-prefixed entries exclude.
    #[serde(default)]
    pub src: Option<Vec<String>>,

    /// Additional exclusion globs.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Output directory relative to the project root. A leaf without `dest`
    /// only reads its sources and notifies.
    #[serde(default)]
    pub dest: Option<String>,

    /// Ordered transform chain.
    #[serde(default)]
    pub transforms: Vec<TransformSpec>,

    #[serde(default)]
    pub reload: ReloadMode,

    /// Children run one after another.
    #[serde(default)]
    pub sequence: Option<Vec<String>>,

    /// Children run concurrently.
    #[serde(default)]
    pub parallel: Option<Vec<String>>,
}

impl TaskConfig {
    /// Child task names of an aggregate, in declaration order.
    pub fn children(&self) -> &[String] {
        self.sequence
            .as_deref()
            .or(self.parallel.as_deref())
            .unwrap_or(&[])
    }

    pub fn is_leaf(&self) -> bool {
        self.src.is_some()
    }
}

/// A single transform stage as written in config.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TransformSpec {
    /// Render files as minijinja templates.
    Template {
        /// Directory used to resolve `include` / `extends`.
        #[serde(default)]
        root: Option<String>,
        #[serde(default)]
        data: BTreeMap<String, serde_json::Value>,
    },
    /// Inline `@import` statements.
    Imports,
    /// Compile Sass to CSS. `load_paths` are searched after the importing
    /// file's directory.
    Scss {
        #[serde(default)]
        load_paths: Vec<String>,
    },
    /// Vendor-prefix CSS for the given browserslist queries.
    Prefix {
        #[serde(default = "default_browsers")]
        browsers: Vec<String>,
    },
    MinifyCss,
    /// Lower JavaScript syntax for an ES version or engine list.
    Transpile {
        #[serde(default = "default_js_targets")]
        targets: String,
    },
    MinifyJs,
    Concat {
        name: String,
        #[serde(default = "default_separator")]
        separator: String,
    },
    Rename {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        extension: Option<String>,
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default)]
        suffix: Option<String>,
        #[serde(default)]
        dirname: Option<String>,
    },
    Replace {
        pattern: String,
        replacement: String,
    },
    /// Pipe each file through a shell command.
    Exec {
        cmd: String,
        #[serde(default)]
        extension: Option<String>,
    },
    OptimizeImages {
        #[serde(default = "default_jpeg_quality")]
        jpeg_quality: u8,
    },
    SourcemapInit,
    SourcemapWrite {
        #[serde(default = "default_map_dir")]
        dir: String,
    },
}

fn default_browsers() -> Vec<String> {
    vec!["last 6 versions".to_string()]
}

fn default_js_targets() -> String {
    "es2015".to_string()
}

fn default_separator() -> String {
    "\n".to_string()
}

fn default_jpeg_quality() -> u8 {
    80
}

fn default_map_dir() -> String {
    ".".to_string()
}
