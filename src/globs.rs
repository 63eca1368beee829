//! Glob helpers shared by file set resolution and watch rules.
//!
//! Patterns are evaluated against `/`-separated paths relative to the
//! project root. `*` does not cross directory separators; `**` does.

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

/// Split a pattern list into inclusions and `!`-prefixed exclusions.
pub fn split_negations(patterns: &[String]) -> (Vec<String>, Vec<String>) {
    let mut include = Vec::new();
    let mut exclude = Vec::new();
    for pat in patterns {
        match pat.strip_prefix('!') {
            Some(neg) => exclude.push(neg.to_string()),
            None => include.push(pat.clone()),
        }
    }
    (include, exclude)
}

pub fn build_matcher(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))?;
    Ok(glob.compile_matcher())
}

/// Build a GlobSet from string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Like [`build_globset`], but `None` for an empty list.
pub fn build_optional_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        Ok(None)
    } else {
        build_globset(patterns).map(Some)
    }
}

fn is_glob_component(component: &str) -> bool {
    component.contains(['*', '?', '[', '{'])
}

/// The directory part of a pattern before its first glob component.
///
/// - `src/img/**/*.png` -> `src/img`
/// - `src/styles/main.css` -> `src/styles`
/// - `*.js` -> ``
pub fn static_base(pattern: &str) -> String {
    let components: Vec<&str> = pattern.split('/').collect();
    let mut base = Vec::new();
    for (idx, component) in components.iter().enumerate() {
        let is_last = idx + 1 == components.len();
        if is_last || is_glob_component(component) {
            break;
        }
        base.push(*component);
    }
    base.join("/")
}
