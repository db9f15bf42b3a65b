//! Resolution engine: keeps the dependency graph and cache current and
//! answers "what must be recompiled" for a batch of changed templates

use crate::cache::{ResolutionCache, ResolveContext};
use crate::reporter::ErrorReporter;
use lineage_core::{
    CacheError, Config, DependencyGraph, Direction, FileId, PluginError, ProjectFiles,
    ResolveState, Storage,
};
use lineage_scanner::PathResolver;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one resolution batch.
#[derive(Debug, Default, Clone)]
pub struct BatchOutcome {
    /// Changed files and their transitive dependents, each listed after
    /// every affected file it depends on.
    pub files: Vec<FileId>,
    /// Cache state of every record resolved during the batch.
    pub states: Vec<(FileId, ResolveState)>,
    /// Errors that survived debouncing.
    pub errors: Vec<PluginError>,
    /// The affected files contain an extends/include cycle; `files` is then
    /// in discovery order.
    pub cyclic: bool,
}

impl BatchOutcome {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn state_of(&self, file: &FileId) -> Option<ResolveState> {
        self.states
            .iter()
            .find(|(id, _)| id == file)
            .map(|&(_, state)| state)
    }

    fn mark(&mut self, file: &FileId, state: ResolveState) {
        match self.states.iter_mut().find(|(id, _)| id == file) {
            Some(entry) => entry.1 = state,
            None => self.states.push((file.clone(), state)),
        }
    }
}

/// One engine per project root. Batches run one at a time through `&mut self`.
pub struct Engine {
    config: Config,
    storage: Arc<dyn Storage>,
    resolver: PathResolver,
    graph: DependencyGraph,
    cache: ResolutionCache,
    reporter: ErrorReporter,
    cache_loaded: bool,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("root", &self.config.base_directory)
            .field("graph", &self.graph)
            .field("cached_records", &self.cache.len())
            .finish()
    }
}

impl Engine {
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> Self {
        let resolver = PathResolver::from_config(&config);
        let cache = ResolutionCache::new(&config);
        let reporter = ErrorReporter::new(config.debounce());
        Engine {
            config,
            storage,
            resolver,
            graph: DependencyGraph::new(),
            cache,
            reporter,
            cache_loaded: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.storage)
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Route an error message through the debouncer.
    pub fn report(&mut self, message: impl Into<String>) -> Option<PluginError> {
        self.reporter.report(message)
    }

    /// Files reachable from `file` in the current graph, breadth first.
    pub fn dependents_of(&self, file: &FileId) -> Vec<FileId> {
        self.graph.traverse_reachable(file, Direction::Outgoing)
    }

    /// Delete the persisted cache and forget every record.
    pub fn clear_cache(&mut self) -> Result<(), CacheError> {
        self.cache_loaded = true;
        self.cache.clear(self.storage.as_ref())
    }

    /// Resolve a batch of changed files against the known project files.
    ///
    /// Every known file is resolved (cheaply, through the cache) because a
    /// changed file's dependents are only visible through the records of the
    /// files that name it. Per-file failures are reported and skipped.
    pub fn resolve_batch(&mut self, changed: &[FileId], known: &ProjectFiles) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        if changed.is_empty() {
            debug!("Empty batch, nothing to resolve");
            return outcome;
        }

        self.ensure_cache_loaded(&mut outcome.errors);

        let changed: ProjectFiles = changed.iter().cloned().collect();
        let mut known = known.clone();
        known.extend(changed.iter().cloned());
        self.graph.retain(|id| known.contains(id));

        let ctx = ResolveContext {
            storage: self.storage.as_ref(),
            resolver: &self.resolver,
            known: &known,
        };

        let mut failed = HashSet::new();
        let others = known.iter().filter(|f| !changed.contains(f));
        for file in changed.iter().chain(others) {
            match self.cache.resolve(file, &ctx) {
                Ok(resolved) => {
                    let dependencies = resolved.record.dependencies();
                    self.graph.set_dependencies(file, dependencies.iter());
                    outcome.mark(file, resolved.state);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", file, e);
                    failed.insert(file.clone());
                    if let Some(err) = self.reporter.report(e.to_string()) {
                        outcome.errors.push(err);
                    }
                }
            }
        }

        let pruned = self.cache.prune(&ctx);
        for removed in &pruned.removed {
            self.graph.remove_vertex(removed);
        }
        for refreshed in &pruned.refreshed {
            if let Some(record) = self.cache.record(refreshed) {
                let dependencies = record.dependencies();
                self.graph.set_dependencies(refreshed, dependencies.iter());
                outcome.mark(refreshed, ResolveState::New);
            }
        }

        if let Err(e) = self.cache.persist(ctx.storage) {
            warn!("Cache not saved: {}", e);
            if let Some(err) = self.reporter.report(e.to_string()) {
                outcome.errors.push(err);
            }
        }

        let mut seen = HashSet::new();
        let mut discovered = Vec::new();
        for file in changed.iter().filter(|f| !failed.contains(*f)) {
            if seen.insert(file.clone()) {
                discovered.push(file.clone());
            }
            for dependent in self.graph.traverse_reachable(file, Direction::Outgoing) {
                if seen.insert(dependent.clone()) {
                    discovered.push(dependent);
                }
            }
        }

        match self.graph.topological_order(&discovered) {
            Some(order) => outcome.files = order,
            None => {
                warn!("Extends/include cycle among {} affected templates", discovered.len());
                outcome.cyclic = true;
                outcome.files = discovered;
            }
        }

        info!(
            "Resolved {} changed files: {} to recompile, {} errors",
            changed.len(),
            outcome.files.len(),
            outcome.errors.len()
        );
        outcome
    }

    fn ensure_cache_loaded(&mut self, errors: &mut Vec<PluginError>) {
        if self.cache_loaded {
            return;
        }
        self.cache_loaded = true;
        if let Err(e) = self.cache.load(self.storage.as_ref()) {
            warn!("Ignoring unusable cache: {}", e);
            if let Some(err) = self.reporter.report(e.to_string()) {
                errors.push(err);
            }
        }
    }
}
