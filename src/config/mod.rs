// src/config/mod.rs

//! Configuration loading and validation for assetflow.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, or the embedded default (`loader.rs`).
//! - Validate task kinds, references, acyclicity and globs (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    default_config, load_and_validate, load_from_path, load_or_default, parse_config, parse_str,
    project_root,
};
pub use model::{
    ConfigFile, ProjectSection, RawConfigFile, ServeSection, TaskConfig, TransformSpec,
    WatchRuleConfig, WatchSection,
};
