// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Built-in pipeline mirroring the classic `src/` → `dist/static/` layout.
pub const DEFAULT_CONFIG: &str = include_str!("default.toml");

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    parse_str(&contents)
}

/// Parse TOML text into a `RawConfigFile`.
pub fn parse_str(contents: &str) -> Result<RawConfigFile> {
    let config: RawConfigFile = toml::from_str(contents)?;
    Ok(config)
}

/// Parse and validate TOML text.
pub fn parse_config(contents: &str) -> Result<ConfigFile> {
    ConfigFile::try_from(parse_str(contents)?)
}

/// Load a configuration file from path and run validation.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks task kinds, references, cycles, watch rules and globs.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// The embedded default pipeline, validated.
pub fn default_config() -> Result<ConfigFile> {
    parse_config(DEFAULT_CONFIG)
}

/// Load `path` if it exists, otherwise fall back to the embedded default.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if path.exists() {
        load_and_validate(path)
    } else {
        info!(path = ?path, "config file not found; using built-in default pipeline");
        default_config()
    }
}

/// Figure out the project root for a config path.
///
/// - If the path has a non-empty parent (e.g. "site/Assetflow.toml"),
///   that directory is the root.
/// - If it's a bare filename, the current working directory is used.
pub fn project_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
