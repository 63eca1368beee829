//! Leaf pipelines: sources, transform chains and output writing.

pub mod backend;
pub mod fileset;
pub mod leaf;
pub mod sourcemap;
pub mod transform;

pub use backend::{LeafBackend, LeafFuture, PipelineBackend};
pub use fileset::{FileEntry, FileSet, SourceSpec};
pub use leaf::{LeafReport, LeafTask};
