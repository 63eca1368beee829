// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling `[[watch.rules]]` globs into [`WatchRule`]s.
//! - Wiring up a cross-platform filesystem watcher (`notify`) with debounced
//!   batching.
//! - Optional content hashing, so rewrites with identical contents do not
//!   retrigger a task.
//!
//! It does **not** know about the task graph; it only turns filesystem
//! changes into task-level triggers.

pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod rules;
pub mod watcher;

pub use hash::{ContentHashes, compute_file_hash};
pub use rules::{WatchRule, build_rules, tasks_for_paths};
pub use watcher::{WatcherHandle, spawn_watcher};
