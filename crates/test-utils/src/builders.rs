#![allow(dead_code)]

use assetflow::config::{
    ConfigFile, ProjectSection, RawConfigFile, ServeSection, TaskConfig, TransformSpec,
    WatchRuleConfig, WatchSection,
};
use assetflow::errors::Result;
use assetflow::types::{BusyPolicy, ReloadMode};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                project: ProjectSection::default(),
                serve: ServeSection::default(),
                watch: WatchSection::default(),
                task: Default::default(),
            },
        }
    }

    pub fn dest(mut self, dest: &str) -> Self {
        self.config.project.dest = dest.to_string();
        self
    }

    pub fn build_task(mut self, task: &str) -> Self {
        self.config.project.build_task = task.to_string();
        self
    }

    pub fn on_busy(mut self, policy: BusyPolicy, queue_length: usize) -> Self {
        self.config.watch.on_busy = policy;
        self.config.watch.queue_length = queue_length;
        self
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn watch_rule(mut self, patterns: &[&str], task: &str) -> Self {
        self.config.watch.rules.push(WatchRuleConfig {
            patterns: strings(patterns),
            exclude: Vec::new(),
            task: task.to_string(),
            use_hash: false,
        });
        self
    }

    pub fn hashed_watch_rule(mut self, patterns: &[&str], task: &str) -> Self {
        self.config.watch.rules.push(WatchRuleConfig {
            patterns: strings(patterns),
            exclude: Vec::new(),
            task: task.to_string(),
            use_hash: true,
        });
        self
    }

    /// Validate, returning the error instead of panicking.
    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    /// A leaf reading `src`.
    pub fn leaf(src: &[&str]) -> Self {
        Self {
            task: TaskConfig {
                src: Some(strings(src)),
                ..TaskConfig::default()
            },
        }
    }

    pub fn sequence(children: &[&str]) -> Self {
        Self {
            task: TaskConfig {
                sequence: Some(strings(children)),
                ..TaskConfig::default()
            },
        }
    }

    pub fn parallel(children: &[&str]) -> Self {
        Self {
            task: TaskConfig {
                parallel: Some(strings(children)),
                ..TaskConfig::default()
            },
        }
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.task.exclude.push(pattern.to_string());
        self
    }

    pub fn dest(mut self, dest: &str) -> Self {
        self.task.dest = Some(dest.to_string());
        self
    }

    pub fn transform(mut self, spec: TransformSpec) -> Self {
        self.task.transforms.push(spec);
        self
    }

    pub fn reload(mut self, mode: ReloadMode) -> Self {
        self.task.reload = mode;
        self
    }

    /// Also set `sequence`, producing an invalid leaf+aggregate task.
    pub fn with_sequence(mut self, children: &[&str]) -> Self {
        self.task.sequence = Some(strings(children));
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
