// src/config/validate.rs

use globset::Glob;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile, TaskConfig};
use crate::errors::{AssetflowError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    for (name, task) in cfg.task.iter() {
        validate_task_kind(name, task)?;
        validate_task_globs(name, task)?;
    }
    validate_task_children(cfg)?;
    validate_graph(cfg)?;
    validate_watch_rules(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(AssetflowError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.queue_length == 0 {
        return Err(AssetflowError::ConfigError(
            "[watch].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.project.dest.trim().is_empty() {
        return Err(AssetflowError::ConfigError(
            "[project].dest must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_task_kind(name: &str, task: &TaskConfig) -> Result<()> {
    let kinds = [
        task.src.is_some(),
        task.sequence.is_some(),
        task.parallel.is_some(),
    ]
    .iter()
    .filter(|set| **set)
    .count();

    if kinds != 1 {
        return Err(AssetflowError::ConfigError(format!(
            "task '{}' must set exactly one of `src`, `sequence` or `parallel`",
            name
        )));
    }

    if !task.is_leaf()
        && (task.dest.is_some() || !task.transforms.is_empty() || !task.exclude.is_empty())
    {
        return Err(AssetflowError::ConfigError(format!(
            "aggregate task '{}' cannot declare `dest`, `exclude` or `transforms`",
            name
        )));
    }

    if let Some(src) = &task.src {
        if !src.iter().any(|p| !p.starts_with('!')) {
            return Err(AssetflowError::ConfigError(format!(
                "task '{}' needs at least one inclusion pattern in `src`",
                name
            )));
        }
    }

    Ok(())
}

fn validate_task_globs(name: &str, task: &TaskConfig) -> Result<()> {
    let patterns = task
        .src
        .iter()
        .flatten()
        .chain(task.exclude.iter());

    for pat in patterns {
        check_glob(pat).map_err(|e| {
            AssetflowError::ConfigError(format!("task '{}': {}", name, e))
        })?;
    }
    Ok(())
}

fn check_glob(pattern: &str) -> std::result::Result<(), String> {
    let pat = pattern.strip_prefix('!').unwrap_or(pattern);
    Glob::new(pat)
        .map(|_| ())
        .map_err(|e| format!("invalid glob pattern '{}': {}", pattern, e))
}

fn validate_task_children(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for child in task.children() {
            if !cfg.task.contains_key(child) {
                return Err(AssetflowError::ConfigError(format!(
                    "task '{}' references unknown task '{}'",
                    name, child
                )));
            }
            if child == name {
                return Err(AssetflowError::TaskCycle(format!(
                    "task '{}' cannot contain itself",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_graph(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: aggregate -> child.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for child in task.children() {
            graph.add_edge(name.as_str(), child.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(AssetflowError::TaskCycle(format!(
                "cycle detected in task graph involving task '{}'",
                node
            )))
        }
    }
}

fn validate_watch_rules(cfg: &RawConfigFile) -> Result<()> {
    for (idx, rule) in cfg.watch.rules.iter().enumerate() {
        if !cfg.task.contains_key(&rule.task) {
            return Err(AssetflowError::ConfigError(format!(
                "watch rule #{} targets unknown task '{}'",
                idx + 1,
                rule.task
            )));
        }
        if rule.patterns.is_empty() {
            return Err(AssetflowError::ConfigError(format!(
                "watch rule #{} (task '{}') has no patterns",
                idx + 1,
                rule.task
            )));
        }
        for pat in rule.patterns.iter().chain(rule.exclude.iter()) {
            check_glob(pat).map_err(|e| {
                AssetflowError::ConfigError(format!("watch rule #{}: {}", idx + 1, e))
            })?;
        }
    }
    Ok(())
}
