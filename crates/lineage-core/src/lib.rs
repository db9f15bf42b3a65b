//! Lineage Core: file identities, inheritance records, and the dependency graph

pub mod config;
pub mod error;
pub mod graph;
pub mod model;
pub mod storage;

#[cfg(test)]
pub mod tests;

#[cfg(test)]
pub mod test_utils;

pub use config::{CONFIG_FILE, Config, DEFAULT_CACHE_FILE};
pub use error::{BuildError, CacheError, ConfigError, LineageError, PLUGIN_NAME, PluginError, ScanError};
pub use graph::DependencyGraph;
pub use model::{Directive, DirectiveKind, FileId, InheritanceRecord, ProjectFiles, ResolveState, normalize};
pub use petgraph::Direction;
pub use storage::{FsStorage, MemoryStorage, Storage};
