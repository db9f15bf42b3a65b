//! Test utilities for lineage-engine

use crate::engine::Engine;
use lineage_core::{Config, FileId, MemoryStorage, ProjectFiles, Storage};
use std::path::Path;
use std::sync::Arc;

pub const ROOT: &str = "/project";

pub fn id(name: &str) -> FileId {
    FileId::new(Path::new(ROOT).join(name))
}

/// An in-memory project seeded with `files` (name, source).
pub fn memory_project(files: &[(&str, &str)]) -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new());
    for (name, source) in files {
        storage.insert(id(name).as_path(), source.as_bytes());
    }
    storage
}

pub fn config(cache_enabled: bool) -> Config {
    Config {
        cache_enabled,
        ..Config::for_root(ROOT)
    }
}

pub fn engine(storage: &Arc<MemoryStorage>, cache_enabled: bool) -> Engine {
    Engine::new(config(cache_enabled), storage.clone() as Arc<dyn Storage>)
}

/// Every template currently present in `storage`.
pub fn known(storage: &MemoryStorage) -> ProjectFiles {
    storage
        .paths()
        .into_iter()
        .filter(|p| p.extension().is_some_and(|e| e == "pug"))
        .map(FileId::new)
        .collect()
}

pub fn names(files: &[FileId]) -> Vec<String> {
    files
        .iter()
        .map(|f| f.relative_to(Path::new(ROOT)).to_string_lossy().into_owned())
        .collect()
}
