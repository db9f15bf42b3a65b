//! Integration tests for Lineage
//!
//! These tests drive discovery, the engine and the CLI against real files.

use lineage_core::{Config, FileId, FsStorage, ProjectFiles, ResolveState, Storage};
use lineage_engine::{Engine, SourceFile, StreamEvent, run_stream};
use lineage_scanner::discover_templates;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// A small site: a layout, a partial, two pages and a standalone mail.
fn create_site() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let root = std::fs::canonicalize(temp_dir.path()).unwrap();

    let files = [
        ("layout.pug", "doctype html\nhtml\n  body\n    include partials/nav\n    block content\n"),
        ("partials/nav.pug", "nav\n  a(href='/') Home\n"),
        ("pages/index.pug", "extends ../layout\n\nblock content\n  h1 Welcome\n"),
        ("pages/about.pug", "extends /layout\n\nblock content\n  include ../partials/nav\n"),
        ("mail/welcome.pug", "p Hello\n"),
    ];
    for (name, contents) in files {
        let path = root.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    (temp_dir, root)
}

fn fs_engine(config: Config) -> Engine {
    Engine::new(config, Arc::new(FsStorage) as Arc<dyn Storage>)
}

fn relative(files: &[FileId], root: &Path) -> Vec<String> {
    files
        .iter()
        .map(|f| f.relative_to(root).display().to_string())
        .collect()
}

fn discover(config: &Config) -> ProjectFiles {
    discover_templates(config).unwrap()
}

#[test]
fn test_discovery_feeds_engine() {
    let (_temp, root) = create_site();
    let config = Config::for_root(&root);
    let known = discover(&config);
    assert_eq!(known.len(), 5);

    let mut engine = fs_engine(config);
    let outcome = engine.resolve_batch(&[FileId::resolve(&root, "partials/nav.pug")], &known);

    assert!(outcome.errors.is_empty());
    assert!(!outcome.cyclic);
    let files = relative(&outcome.files, &root);
    assert_eq!(files[0], "partials/nav.pug");
    // layout precedes the pages that extend it
    let layout = files.iter().position(|f| f == "layout.pug").unwrap();
    let index = files.iter().position(|f| f == "pages/index.pug").unwrap();
    let about = files.iter().position(|f| f == "pages/about.pug").unwrap();
    assert!(layout < index);
    assert!(layout < about);
    assert_eq!(files.len(), 4);
    assert!(!files.contains(&"mail/welcome.pug".to_string()));
}

#[test]
fn test_cache_file_written_and_reused() {
    let (_temp, root) = create_site();
    let config = Config::for_root(&root);
    let known = discover(&config);
    let changed = [FileId::resolve(&root, "layout.pug")];

    let first = fs_engine(config.clone()).resolve_batch(&changed, &known);
    assert!(config.cache_file().exists());
    assert_eq!(first.state_of(&changed[0]), Some(ResolveState::New));

    let second = fs_engine(config).resolve_batch(&changed, &known);
    assert_eq!(second.state_of(&changed[0]), Some(ResolveState::Cached));
    assert_eq!(first.files, second.files);
}

#[test]
fn test_edit_on_disk_invalidates_record() {
    let (_temp, root) = create_site();
    let config = Config::for_root(&root);
    let known = discover(&config);
    let mail = FileId::resolve(&root, "mail/welcome.pug");
    let nav = FileId::resolve(&root, "partials/nav.pug");

    let mut engine = fs_engine(config);
    engine.resolve_batch(std::slice::from_ref(&mail), &known);
    assert!(!engine.dependents_of(&nav).contains(&mail));

    std::fs::write(mail.as_path(), "include ../partials/nav\np Hello\n").unwrap();
    let outcome = engine.resolve_batch(std::slice::from_ref(&nav), &known);

    assert_eq!(outcome.state_of(&mail), Some(ResolveState::New));
    assert!(outcome.files.contains(&mail));
}

#[test]
fn test_deleted_template_leaves_graph() {
    let (_temp, root) = create_site();
    let config = Config::for_root(&root);
    let layout = FileId::resolve(&root, "layout.pug");
    let index = FileId::resolve(&root, "pages/index.pug");

    let mut engine = fs_engine(config.clone());
    engine.resolve_batch(std::slice::from_ref(&layout), &discover(&config));
    assert!(engine.graph().contains(&layout));

    std::fs::remove_file(layout.as_path()).unwrap();
    let outcome = engine.resolve_batch(std::slice::from_ref(&index), &discover(&config));

    assert!(outcome.errors.is_empty());
    assert!(!engine.graph().contains(&layout));
    assert!(engine.cache().record(&layout).is_none());
    assert_eq!(outcome.files, vec![index]);
}

#[test]
fn test_config_file_overrides_defaults() {
    let (_temp, root) = create_site();
    std::fs::write(
        root.join("lineage.toml"),
        "cache_path = \".cache/inheritance.json\"\ntemplate_extension = \"jade\"\nextra_extensions = []\n",
    )
    .unwrap();
    std::fs::write(root.join("base.jade"), "html\n  block body\n").unwrap();
    std::fs::write(root.join("home.jade"), "extends base\n").unwrap();

    let config = Config::load(&root).unwrap();
    let known = discover(&config);
    assert_eq!(known.len(), 2);

    let mut engine = fs_engine(config);
    let outcome = engine.resolve_batch(&[FileId::resolve(&root, "base.jade")], &known);

    assert_eq!(relative(&outcome.files, &root), vec!["base.jade", "home.jade"]);
    assert!(root.join(".cache/inheritance.json").exists());
}

#[test]
fn test_clear_cache_removes_file() {
    let (_temp, root) = create_site();
    let config = Config::for_root(&root);
    let known = discover(&config);

    let mut engine = fs_engine(config.clone());
    engine.resolve_batch(&[FileId::resolve(&root, "layout.pug")], &known);
    assert!(config.cache_file().exists());

    engine.clear_cache().unwrap();
    assert!(!config.cache_file().exists());
    assert!(engine.cache().is_empty());
}

#[tokio::test]
async fn test_stream_emits_recompile_set() {
    let (_temp, root) = create_site();
    let config = Config::for_root(&root);
    let known = discover(&config);
    let mut engine = fs_engine(config);

    let nav = FileId::resolve(&root, "partials/nav.pug");
    let contents = std::fs::read(nav.as_path()).unwrap();
    let (input_tx, input_rx) = mpsc::channel(4);
    let (output_tx, mut output_rx) = mpsc::channel(16);
    input_tx
        .send(SourceFile::new(nav, "partials/nav.pug", contents))
        .await
        .unwrap();
    drop(input_tx);

    run_stream(&mut engine, &known, input_rx, output_tx).await.unwrap();

    let mut emitted = Vec::new();
    while let Some(event) = output_rx.recv().await {
        match event {
            StreamEvent::Data(file) => {
                assert!(!file.contents.is_empty());
                emitted.push(file.relative.display().to_string());
            }
            StreamEvent::Error(e) => panic!("unexpected error: {e}"),
            StreamEvent::End => break,
        }
    }
    assert_eq!(emitted.len(), 4);
    assert_eq!(emitted[0], "partials/nav.pug");
}

#[test]
fn test_cli_resolve() {
    let (_temp, root) = create_site();

    let output = Command::new(env!("CARGO_BIN_EXE_lineage"))
        .arg("--root")
        .arg(&root)
        .args(["resolve", "layout.pug"])
        .current_dir(&root)
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "layout.pug");
    assert!(lines.contains(&"pages/index.pug"));
    assert!(lines.contains(&"pages/about.pug"));
    assert_eq!(lines.len(), 3);
}

#[test]
fn test_cli_graph_and_clear() {
    let (_temp, root) = create_site();

    let output = Command::new(env!("CARGO_BIN_EXE_lineage"))
        .arg("--root")
        .arg(&root)
        .args(["graph", "partials/nav.pug"])
        .current_dir(&root)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().any(|l| l == "layout.pug"));
    assert!(root.join("temp.lineage.json").exists());

    let output = Command::new(env!("CARGO_BIN_EXE_lineage"))
        .arg("--root")
        .arg(&root)
        .arg("clear")
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    assert!(!root.join("temp.lineage.json").exists());
}

#[test]
fn test_cli_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_lineage"))
        .arg("version")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Lineage v"));
}
