//! Project configuration (`lineage.toml`)

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Optional config file looked up in the project root.
pub const CONFIG_FILE: &str = "lineage.toml";

/// Default persisted cache file, relative to the project root.
pub const DEFAULT_CACHE_FILE: &str = "temp.lineage.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root that `/`-prefixed directive targets resolve against.
    pub base_directory: PathBuf,
    /// Persist inheritance records between runs.
    pub cache_enabled: bool,
    /// Cache file location. Relative paths resolve against `base_directory`.
    pub cache_path: PathBuf,
    /// Extension appended to extensionless directive targets.
    pub template_extension: String,
    /// Other extensions treated as templates during discovery.
    pub extra_extensions: Vec<String>,
    /// Window in which a repeated error message is suppressed.
    pub debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_directory: absolutize(Path::new(".")),
            cache_enabled: true,
            cache_path: PathBuf::from(DEFAULT_CACHE_FILE),
            template_extension: "pug".to_string(),
            extra_extensions: vec!["jade".to_string()],
            debounce_ms: 500,
        }
    }
}

impl Config {
    /// Defaults rooted at `root`.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Config {
            base_directory: absolutize(&root.into()),
            ..Config::default()
        }
    }

    /// Load `lineage.toml` from `root` if present, otherwise use defaults.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let root = &absolutize(root);
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            tracing::debug!("No {} in {}, using defaults", CONFIG_FILE, root.display());
            return Ok(Config::for_root(root));
        }

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut config: Config =
            toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })?;

        config.base_directory = if config.base_directory.is_absolute() {
            config.base_directory
        } else {
            crate::model::normalize(&root.join(&config.base_directory))
        };
        Ok(config)
    }

    /// Extension without a leading dot.
    pub fn canonical_extension(&self) -> &str {
        self.template_extension.trim_start_matches('.')
    }

    /// Canonical extension followed by the extra ones.
    pub fn template_extensions(&self) -> Vec<&str> {
        std::iter::once(self.canonical_extension())
            .chain(self.extra_extensions.iter().map(|e| e.trim_start_matches('.')))
            .collect()
    }

    pub fn is_template(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.template_extensions().contains(&ext))
    }

    /// Absolute location of the persisted cache.
    pub fn cache_file(&self) -> PathBuf {
        if self.cache_path.is_absolute() {
            self.cache_path.clone()
        } else {
            crate::model::normalize(&self.base_directory.join(&self.cache_path))
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Anchor a relative path at the working directory, folding `.` and `..`.
fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return crate::model::normalize(path);
    }
    match std::env::current_dir() {
        Ok(cwd) => crate::model::normalize(&cwd.join(path)),
        Err(e) => {
            tracing::warn!("Cannot resolve {} against the working directory: {}", path.display(), e);
            crate::model::normalize(path)
        }
    }
}
