//! CLI command implementations

use anyhow::Context;
use lineage_core::{Config, FileId, FsStorage, PluginError, Storage};
use lineage_engine::{Engine, SourceFile, StreamEvent, run_stream};
use lineage_scanner::discover_templates;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Global flags that override `lineage.toml`.
pub struct Options {
    pub root: PathBuf,
    pub no_cache: bool,
    pub cache_path: Option<PathBuf>,
    pub extension: Option<String>,
}

impl Options {
    fn config(&self) -> anyhow::Result<Config> {
        let root = std::fs::canonicalize(&self.root)
            .with_context(|| format!("project root {} not found", self.root.display()))?;
        let mut config = Config::load(&root)?;
        if self.no_cache {
            config.cache_enabled = false;
        }
        if let Some(cache_path) = &self.cache_path {
            config.cache_path = cache_path.clone();
        }
        if let Some(extension) = &self.extension {
            config.template_extension = extension.clone();
        }
        Ok(config)
    }
}

fn engine(config: Config) -> Engine {
    Engine::new(config, Arc::new(FsStorage) as Arc<dyn Storage>)
}

/// Canonical identity for a user-supplied path.
fn identify(path: &Path) -> anyhow::Result<FileId> {
    let canonical = std::fs::canonicalize(path)
        .with_context(|| format!("template {} not found", path.display()))?;
    Ok(FileId::new(canonical))
}

fn print_error(error: &PluginError) {
    tracing::error!("{}", error);
}

pub async fn resolve(options: Options, files: Vec<PathBuf>) -> anyhow::Result<()> {
    let config = options.config()?;
    let root = config.base_directory.clone();
    tracing::info!("Resolving {} changed files under {}", files.len(), root.display());

    let known = discover_templates(&config)?;
    let mut engine = engine(config);

    let (input_tx, input_rx) = mpsc::channel(files.len().max(1));
    let (output_tx, mut output_rx) = mpsc::channel(64);

    let feeder = tokio::spawn(async move {
        for path in files {
            let id = match identify(&path) {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!("{:#}", e);
                    continue;
                }
            };
            let contents = match tokio::fs::read(id.as_path()).await {
                Ok(contents) => contents,
                Err(e) => {
                    tracing::warn!("Cannot read {}: {}", id, e);
                    continue;
                }
            };
            let relative = id.relative_to(&root);
            if input_tx.send(SourceFile::new(id, relative, contents)).await.is_err() {
                break;
            }
        }
    });

    let printer = tokio::spawn(async move {
        let mut errors = 0usize;
        while let Some(event) = output_rx.recv().await {
            match event {
                StreamEvent::Data(file) => println!("{}", file.relative.display()),
                StreamEvent::Error(error) => {
                    errors += 1;
                    print_error(&error);
                }
                StreamEvent::End => break,
            }
        }
        errors
    });

    run_stream(&mut engine, &known, input_rx, output_tx).await?;
    feeder.await?;
    let errors = printer.await?;
    if errors > 0 {
        tracing::warn!("{} templates could not be resolved", errors);
    }
    Ok(())
}

pub fn graph(options: Options, file: PathBuf) -> anyhow::Result<()> {
    let config = options.config()?;
    let root = config.base_directory.clone();
    let known = discover_templates(&config)?;
    let target = identify(&file)?;

    let mut engine = engine(config);
    let outcome = engine.resolve_batch(std::slice::from_ref(&target), &known);
    for error in &outcome.errors {
        print_error(error);
    }
    if outcome.cyclic {
        tracing::warn!("{} is part of an extends/include cycle", target);
    }

    for dependent in engine.dependents_of(&target) {
        println!("{}", dependent.relative_to(&root).display());
    }
    Ok(())
}

pub fn clear(options: Options) -> anyhow::Result<()> {
    let config = options.config()?;
    tracing::info!("Clearing cache: {}", config.cache_file().display());

    engine(config).clear_cache()?;

    tracing::info!("Cache cleared");
    Ok(())
}
