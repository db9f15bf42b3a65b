//! Pipeline adapter: files in, files-to-recompile out
//!
//! The host pipeline pushes changed files into a channel; once it closes, one
//! batch is resolved and every affected file is pushed out, re-read from
//! storage, followed by `End`.

use crate::engine::Engine;
use anyhow::Result;
use lineage_core::{FileId, PluginError, ProjectFiles};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A file travelling through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: FileId,
    /// Path relative to the project base directory.
    pub relative: PathBuf,
    pub contents: Vec<u8>,
}

impl SourceFile {
    pub fn new(path: FileId, relative: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        SourceFile {
            path,
            relative: relative.into(),
            contents: contents.into(),
        }
    }
}

/// Events emitted to the host pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Data(SourceFile),
    Error(PluginError),
    End,
}

/// Consume `input` to completion, resolve the batch, and emit the result.
pub async fn run_stream(
    engine: &mut Engine,
    known: &ProjectFiles,
    mut input: mpsc::Receiver<SourceFile>,
    output: mpsc::Sender<StreamEvent>,
) -> Result<()> {
    let mut changed = Vec::new();
    while let Some(file) = input.recv().await {
        if file.contents.is_empty() {
            debug!("Ignoring empty file {}", file.path);
            continue;
        }
        changed.push(file.path);
    }

    if changed.is_empty() {
        output.send(StreamEvent::End).await?;
        return Ok(());
    }

    let outcome = engine.resolve_batch(&changed, known);
    for error in outcome.errors {
        output.send(StreamEvent::Error(error)).await?;
    }

    let storage = engine.storage();
    let root = engine.config().base_directory.clone();
    for file in outcome.files {
        match storage.read(file.as_path()) {
            Ok(contents) => {
                let relative = file.relative_to(&root);
                output
                    .send(StreamEvent::Data(SourceFile::new(file, relative, contents)))
                    .await?;
            }
            Err(e) => {
                warn!("Cannot re-read {}: {}", file, e);
                let message = format!("failed to read template {}: {}", file, e);
                if let Some(error) = engine.report(message) {
                    output.send(StreamEvent::Error(error)).await?;
                }
            }
        }
    }

    output.send(StreamEvent::End).await?;
    Ok(())
}
