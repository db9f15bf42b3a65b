//! Test utilities for lineage-core

use crate::model::FileId;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Identity for `name` under the fixed test root `/project`.
pub fn id(name: &str) -> FileId {
    FileId::new(Path::new("/project").join(name))
}

/// Create a temporary project with a `lineage.toml` holding `config`.
pub fn create_configured_project(config: &str) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("lineage.toml"), config).unwrap();
    temp_dir
}
