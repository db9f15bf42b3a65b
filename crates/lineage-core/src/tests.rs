//! Unit tests for lineage-core module

use crate::test_utils::{create_configured_project, id};
use crate::*;
use std::path::{Path, PathBuf};

#[test]
fn test_file_id_normalization() {
    let base = Path::new("/project/views");

    let direct = FileId::resolve(base, "pages/home.pug");
    let roundabout = FileId::resolve(base, "./partials/../pages/./home.pug");
    assert_eq!(direct, roundabout);
    assert_eq!(direct.as_path(), Path::new("/project/views/pages/home.pug"));

    // Absolute paths ignore the base
    let absolute = FileId::resolve(base, "/elsewhere/a.pug");
    assert_eq!(absolute.as_path(), Path::new("/elsewhere/a.pug"));
}

#[test]
fn test_file_id_relative_to() {
    let file = id("views/layout.pug");
    assert_eq!(file.relative_to(Path::new("/project")), PathBuf::from("views/layout.pug"));

    // Outside the root, the full path comes back
    let outside = FileId::new("/lib/mixins.pug");
    assert_eq!(outside.relative_to(Path::new("/project")), PathBuf::from("/lib/mixins.pug"));
}

#[test]
fn test_record_dependencies_dedup() {
    let mut record = InheritanceRecord::new(id("page.pug"));
    record.extends.push(id("layout.pug"));
    record.includes.push(id("nav.pug"));
    record.includes.push(id("layout.pug"));

    assert_eq!(record.dependencies(), vec![id("layout.pug"), id("nav.pug")]);
    assert_eq!(record.dependency_count(), 2);
    assert!(record.references(&id("nav.pug")));
    assert!(!record.references(&id("footer.pug")));
}

#[test]
fn test_project_files_membership() {
    let mut files: ProjectFiles = [id("a.pug"), id("b.pug")].into_iter().collect();
    assert_eq!(files.len(), 2);
    assert!(!files.insert(id("a.pug")), "Duplicate insert should be rejected");
    assert!(files.insert(id("c.pug")));
    assert!(files.contains(&id("c.pug")));

    let order: Vec<_> = files.iter().cloned().collect();
    assert_eq!(order, vec![id("a.pug"), id("b.pug"), id("c.pug")]);
}

#[test]
fn test_add_edge_is_idempotent() {
    let mut graph = DependencyGraph::new();

    assert!(graph.add_edge(&id("layout.pug"), &id("page.pug")));
    assert!(!graph.add_edge(&id("layout.pug"), &id("page.pug")));

    assert_eq!(graph.vertex_count(), 2);
    assert_eq!(graph.edge_count(), 1);
    assert!(graph.has_edge(&id("layout.pug"), &id("page.pug")));
    assert!(!graph.has_edge(&id("page.pug"), &id("layout.pug")));
}

#[test]
fn test_traverse_breadth_first_order() {
    let mut graph = DependencyGraph::new();
    // c is included by b and d; b is included by a
    graph.add_edge(&id("c.pug"), &id("b.pug"));
    graph.add_edge(&id("c.pug"), &id("d.pug"));
    graph.add_edge(&id("b.pug"), &id("a.pug"));

    let reached = graph.traverse_reachable(&id("c.pug"), Direction::Outgoing);
    assert_eq!(reached, vec![id("b.pug"), id("d.pug"), id("a.pug")]);

    let upstream = graph.traverse_reachable(&id("a.pug"), Direction::Incoming);
    assert_eq!(upstream, vec![id("b.pug"), id("c.pug")]);
}

#[test]
fn test_traverse_unknown_start() {
    let graph = DependencyGraph::new();
    assert!(graph.traverse_reachable(&id("ghost.pug"), Direction::Outgoing).is_empty());
}

#[test]
fn test_traverse_terminates_on_cycle() {
    let mut graph = DependencyGraph::new();
    graph.add_edge(&id("a.pug"), &id("b.pug"));
    graph.add_edge(&id("b.pug"), &id("a.pug"));

    let reached = graph.traverse_reachable(&id("a.pug"), Direction::Outgoing);
    assert_eq!(reached, vec![id("b.pug")], "Start vertex must not be reported");
}

#[test]
fn test_set_dependencies_replaces_incoming() {
    let mut graph = DependencyGraph::new();
    graph.set_dependencies(&id("page.pug"), [&id("old.pug"), &id("nav.pug")]);
    assert!(graph.has_edge(&id("old.pug"), &id("page.pug")));

    graph.set_dependencies(&id("page.pug"), [&id("new.pug"), &id("nav.pug")]);
    assert!(!graph.has_edge(&id("old.pug"), &id("page.pug")));
    assert!(graph.has_edge(&id("new.pug"), &id("page.pug")));
    assert!(graph.has_edge(&id("nav.pug"), &id("page.pug")));
    assert_eq!(graph.edge_count(), 2);

    // The old vertex stays until explicitly removed
    assert!(graph.contains(&id("old.pug")));
}

#[test]
fn test_remove_vertex_drops_edges() {
    let mut graph = DependencyGraph::new();
    graph.add_edge(&id("layout.pug"), &id("page.pug"));
    graph.add_edge(&id("page.pug"), &id("print.pug"));

    assert!(graph.remove_vertex(&id("page.pug")));
    assert!(!graph.remove_vertex(&id("page.pug")));
    assert_eq!(graph.edge_count(), 0);
    assert!(graph.traverse_reachable(&id("layout.pug"), Direction::Outgoing).is_empty());

    // Re-adding after removal works
    assert!(graph.add_edge(&id("layout.pug"), &id("page.pug")));
}

#[test]
fn test_retain_keeps_known() {
    let mut graph = DependencyGraph::new();
    graph.add_edge(&id("a.pug"), &id("b.pug"));
    graph.add_edge(&id("gone.pug"), &id("b.pug"));

    graph.retain(|file| file != &id("gone.pug"));
    assert!(!graph.contains(&id("gone.pug")));
    assert_eq!(graph.vertex_count(), 2);
    assert_eq!(graph.edge_count(), 1);
}

#[test]
fn test_topological_order_places_dependencies_first() {
    let mut graph = DependencyGraph::new();
    // diamond: base -> mid -> top, base -> top
    graph.add_edge(&id("base.pug"), &id("top.pug"));
    graph.add_edge(&id("base.pug"), &id("mid.pug"));
    graph.add_edge(&id("mid.pug"), &id("top.pug"));

    let subset = vec![id("base.pug"), id("top.pug"), id("mid.pug")];
    let order = graph.topological_order(&subset).unwrap();
    assert_eq!(order, vec![id("base.pug"), id("mid.pug"), id("top.pug")]);
}

#[test]
fn test_topological_order_detects_cycle() {
    let mut graph = DependencyGraph::new();
    graph.add_edge(&id("a.pug"), &id("b.pug"));
    graph.add_edge(&id("b.pug"), &id("a.pug"));

    assert!(graph.topological_order(&[id("a.pug"), id("b.pug")]).is_none());
}

#[test]
fn test_config_defaults() {
    let config = Config::for_root("/project");
    assert!(config.cache_enabled);
    assert_eq!(config.canonical_extension(), "pug");
    assert_eq!(config.cache_file(), PathBuf::from("/project/temp.lineage.json"));
    assert_eq!(config.debounce().as_millis(), 500);
    assert!(config.is_template(Path::new("a/b.pug")));
    assert!(config.is_template(Path::new("legacy.jade")));
    assert!(!config.is_template(Path::new("style.css")));
}

#[test]
fn test_config_relative_root_is_absolutized() {
    let cwd = std::env::current_dir().unwrap();

    let config = Config::for_root("site/views/..");
    assert!(config.base_directory.is_absolute());
    assert_eq!(config.base_directory, cwd.join("site"));
    assert_eq!(config.cache_file(), cwd.join("site").join(DEFAULT_CACHE_FILE));

    assert_eq!(Config::default().base_directory, cwd);

    let page = FileId::resolve(&config.base_directory, "index.pug");
    assert!(page.as_path().is_absolute());
}

#[test]
fn test_config_load_from_file() {
    let project = create_configured_project(
        r#"
cache_enabled = false
template_extension = ".jade"
base_directory = "views"
debounce_ms = 50
"#,
    );

    let config = Config::load(project.path()).unwrap();
    assert!(!config.cache_enabled);
    assert_eq!(config.canonical_extension(), "jade");
    assert_eq!(config.base_directory, project.path().join("views"));
    assert_eq!(config.debounce_ms, 50);
}

#[test]
fn test_config_rejects_unknown_keys() {
    let project = create_configured_project("cache_enabeld = true\n");
    let result = Config::load(project.path());
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
fn test_config_missing_file_uses_defaults() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let config = Config::load(temp_dir.path()).unwrap();
    assert_eq!(config.base_directory, temp_dir.path());
    assert!(config.cache_enabled);
}

#[test]
fn test_memory_storage_roundtrip() {
    let storage = MemoryStorage::new();
    let path = Path::new("/project/a.pug");

    assert!(!storage.exists(path));
    assert!(storage.read_optional(path).unwrap().is_none());

    storage.write(path, b"extends layout").unwrap();
    assert!(storage.exists(path));
    assert_eq!(storage.read(path).unwrap(), b"extends layout");

    storage.remove(path).unwrap();
    assert!(storage.read(path).is_err());
}

#[test]
fn test_plugin_error_display() {
    let err = PluginError::new("failed to read template /project/a.pug");
    assert_eq!(err.plugin, PLUGIN_NAME);
    assert_eq!(err.to_string(), "[lineage] failed to read template /project/a.pug");
}
