//! Project template discovery

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use lineage_core::{Config, FileId, ProjectFiles};

/// Build a matcher for every recognized template extension.
pub fn template_matcher(config: &Config) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for ext in config.template_extensions() {
        builder.add(Glob::new(&format!("**/*.{ext}"))?);
    }
    Ok(builder.build()?)
}

/// Walk the base directory and collect every template, sorted by path.
///
/// Hidden entries and anything excluded by `.gitignore` are skipped.
pub fn discover_templates(config: &Config) -> Result<ProjectFiles> {
    let root = &config.base_directory;
    let matcher = template_matcher(config)?;
    let mut found = Vec::new();

    for entry in WalkBuilder::new(root).hidden(true).git_ignore(true).build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Cannot read entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if matcher.is_match(relative) {
            found.push(FileId::resolve(root, path));
        }
    }

    found.sort();
    tracing::debug!("Discovered {} templates under {}", found.len(), root.display());
    Ok(found.into_iter().collect())
}
