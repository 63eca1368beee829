// src/watch/rules.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::GlobSet;

use crate::config::WatchSection;
use crate::engine::TaskName;
use crate::globs::{build_globset, build_optional_globset, split_negations};

/// A compiled `[[watch.rules]]` entry: which paths trigger which task.
///
/// Patterns are evaluated against `/`-separated paths relative to the
/// project root, e.g. `"src/styles/_vars.css"`.
#[derive(Clone)]
pub struct WatchRule {
    task: TaskName,
    patterns: Vec<String>,
    include: GlobSet,
    exclude: Option<GlobSet>,
    use_hash: bool,
}

impl fmt::Debug for WatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRule")
            .field("task", &self.task)
            .field("patterns", &self.patterns)
            .field("use_hash", &self.use_hash)
            .finish_non_exhaustive()
    }
}

impl WatchRule {
    /// `patterns` may contain `!`-prefixed exclusions; `exclude` is merged
    /// with them.
    pub fn new(
        task: impl Into<TaskName>,
        patterns: &[String],
        exclude: &[String],
        use_hash: bool,
    ) -> Result<Self> {
        let task = task.into();
        let (include, mut negated) = split_negations(patterns);
        negated.extend(exclude.iter().cloned());

        let include_set = build_globset(&include)
            .with_context(|| format!("building watch globset for task {task}"))?;
        let exclude_set = build_optional_globset(&negated)
            .with_context(|| format!("building exclude globset for task {task}"))?;

        Ok(Self {
            task,
            patterns: patterns.to_vec(),
            include: include_set,
            exclude: exclude_set,
            use_hash,
        })
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    /// Patterns as written in config.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    /// True if a change to `rel_path` should trigger this rule's task.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include.is_match(rel_path) {
            return false;
        }
        match &self.exclude {
            Some(exclude) => !exclude.is_match(rel_path),
            None => true,
        }
    }
}

/// Compile every rule of a `[watch]` section.
pub fn build_rules(section: &WatchSection) -> Result<Vec<WatchRule>> {
    section
        .rules
        .iter()
        .map(|rule| WatchRule::new(&rule.task, &rule.patterns, &rule.exclude, rule.use_hash))
        .collect()
}

/// Tasks whose rules match any of `rel_paths`, each listed once, in rule
/// order.
pub fn tasks_for_paths<'a, I>(rules: &[WatchRule], rel_paths: I) -> Vec<TaskName>
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: Clone,
{
    let paths = rel_paths.into_iter();
    let mut tasks: Vec<TaskName> = Vec::new();
    for rule in rules {
        if tasks.iter().any(|t| t == rule.task()) {
            continue;
        }
        if paths.clone().any(|p| rule.matches(p)) {
            tasks.push(rule.task.clone());
        }
    }
    tasks
}
