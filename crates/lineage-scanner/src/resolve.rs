//! Directive target resolution

use lineage_core::{Config, FileId};
use std::path::{Path, PathBuf};

/// Turns the raw path of a directive into a File Identity.
#[derive(Debug, Clone)]
pub struct PathResolver {
    base_directory: PathBuf,
    extension: String,
}

impl PathResolver {
    pub fn new(base_directory: impl Into<PathBuf>, extension: &str) -> Self {
        PathResolver {
            base_directory: base_directory.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.base_directory.clone(), config.canonical_extension())
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Resolve `raw` as written in `from`.
    ///
    /// `/`-prefixed targets are rooted at the base directory, anything else is
    /// relative to the directory of `from`. Targets without an extension get
    /// the template extension appended.
    pub fn resolve(&self, from: &FileId, raw: &str) -> FileId {
        let raw = raw.trim();
        let joined = match raw.strip_prefix('/') {
            Some(rooted) => self.base_directory.join(rooted),
            None => from.parent().join(raw),
        };

        if joined.extension().is_some() {
            return FileId::new(joined);
        }

        let mut with_extension = joined.into_os_string();
        with_extension.push(".");
        with_extension.push(&self.extension);
        FileId::new(PathBuf::from(with_extension))
    }
}
