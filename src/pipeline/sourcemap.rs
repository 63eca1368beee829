//! Source map bookkeeping carried on file entries.
//!
//! Maps are coarse: they list every original source (with its content) that
//! contributed to an output file, but carry no per-token mappings.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMapState {
    sources: Vec<String>,
    contents: Vec<String>,
}

impl SourceMapState {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        let mut state = Self::default();
        state.add_source(source, content);
        state
    }

    /// Record a contributing source; duplicates are ignored.
    pub fn add_source(&mut self, source: impl Into<String>, content: impl Into<String>) {
        let source = source.into();
        if self.sources.contains(&source) {
            return;
        }
        self.sources.push(source);
        self.contents.push(content.into());
    }

    pub fn merge(&mut self, other: &SourceMapState) {
        for (source, content) in other.sources.iter().zip(other.contents.iter()) {
            self.add_source(source.clone(), content.clone());
        }
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Serialize as a version 3 source map for `file`.
    pub fn to_json(&self, file: &str) -> String {
        let map = SourceMapV3 {
            version: 3,
            file,
            source_root: "/",
            sources: &self.sources,
            sources_content: &self.contents,
            names: &[],
            mappings: "",
        };
        serde_json::to_string(&map).unwrap_or_default()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMapV3<'a> {
    version: u8,
    file: &'a str,
    source_root: &'a str,
    sources: &'a [String],
    sources_content: &'a [String],
    names: &'a [String],
    mappings: &'a str,
}
