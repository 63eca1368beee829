use regex::Regex;

use crate::errors::TransformError;
use crate::pipeline::fileset::FileSet;

use super::{SyncTransform, TransformContext};

/// Regex search and replace over text files. `$1` style group references
/// are expanded in the replacement.
#[derive(Debug, Clone)]
pub struct Replace {
    pattern: Regex,
    replacement: String,
}

impl Replace {
    pub fn new(pattern: &str, replacement: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            replacement: replacement.to_string(),
        })
    }
}

impl SyncTransform for Replace {
    fn name(&self) -> &'static str {
        "replace"
    }

    fn apply_sync(&self, files: FileSet, _ctx: &TransformContext) -> Result<FileSet, TransformError> {
        files.try_map(|entry| {
            let replaced = self
                .pattern
                .replace_all(entry.text("replace")?, self.replacement.as_str())
                .into_owned();
            entry.set_text(replaced);
            Ok(())
        })
    }
}
