//! CSS stages backed by lightningcss.

use std::fmt;

use lightningcss::error::Error as CssError;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::errors::TransformError;
use crate::pipeline::fileset::{FileEntry, FileSet};

use super::{SyncTransform, TransformContext};

/// `kind at file:line:column`, with a 1-based line.
fn describe<T: fmt::Display>(err: CssError<T>) -> String {
    match err.loc {
        Some(loc) => format!("{} at {}:{}:{}", err.kind, loc.filename, loc.line + 1, loc.column),
        None => err.kind.to_string(),
    }
}

/// Parse, lower for `targets` and print a stylesheet.
fn process_css(
    stage: &str,
    entry: &FileEntry,
    targets: Targets,
    minify: bool,
) -> Result<String, TransformError> {
    let source = entry.text(stage)?;

    let mut sheet = StyleSheet::parse(
        source,
        ParserOptions {
            filename: entry.origin.display().to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| TransformError::new(stage, &entry.origin, describe(e)))?;

    sheet
        .minify(MinifyOptions {
            targets: targets.clone(),
            ..MinifyOptions::default()
        })
        .map_err(|e| TransformError::new(stage, &entry.origin, describe(e)))?;

    let out = sheet
        .to_css(PrinterOptions {
            minify,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| TransformError::new(stage, &entry.origin, describe(e)))?;
    Ok(out.code)
}

/// Add vendor prefixes for the configured browser queries.
#[derive(Debug, Clone)]
pub struct Prefix {
    targets: Targets,
}

impl Prefix {
    pub fn new(browsers: &[String]) -> anyhow::Result<Self> {
        let browsers = Browsers::from_browserslist(browsers.iter().map(String::as_str))
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        let targets = browsers.map(Targets::from).unwrap_or_default();
        Ok(Self { targets })
    }
}

impl SyncTransform for Prefix {
    fn name(&self) -> &'static str {
        "prefix"
    }

    fn apply_sync(&self, files: FileSet, _ctx: &TransformContext) -> Result<FileSet, TransformError> {
        files.try_map(|entry| {
            let code = process_css("prefix", entry, self.targets.clone(), false)?;
            entry.set_text(code);
            Ok(())
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MinifyCss;

impl SyncTransform for MinifyCss {
    fn name(&self) -> &'static str {
        "minify-css"
    }

    fn apply_sync(&self, files: FileSet, _ctx: &TransformContext) -> Result<FileSet, TransformError> {
        files.try_map(|entry| {
            let code = process_css("minify-css", entry, Targets::default(), true)?;
            entry.set_text(code);
            Ok(())
        })
    }
}
