//! Resolution cache: persisted inheritance records keyed per file
//!
//! A lookup always rescans the file (directive-only, cheap) and compares the
//! fingerprint of its directive list with the stored one:
//!
//! - no entry: build a record and store it (`New`)
//! - entry with a different fingerprint, or naming a target that has since
//!   become a project file: rebuild it and force a refresh of every entry that
//!   references this file (`New`)
//! - otherwise the stored record is returned (`Cached`)
//!
//! The whole cache is one JSON document, read once per engine and written
//! once per batch.

use lineage_core::{
    CacheError, Config, FileId, InheritanceRecord, LineageError, ProjectFiles, ResolveState,
    Storage,
};
use lineage_scanner::{BuiltRecord, PathResolver, build_record, scan_file};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Persisted document layout version.
pub const CACHE_VERSION: u32 = 1;

/// One file's entry as stored on disk. Paths are relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheEntry {
    pub path: String,
    pub extends: Vec<String>,
    pub includes: Vec<String>,
    pub dependencies: Vec<String>,
    pub dependency_count: usize,
    pub fingerprint: String,
    #[serde(default)]
    pub unresolved: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CacheDocument {
    version: u32,
    root: PathBuf,
    #[serde(default)]
    saved_at: Option<String>,
    entries: BTreeMap<String, CacheEntry>,
}

/// In-memory form of an entry.
#[derive(Debug, Clone)]
struct CachedRecord {
    record: InheritanceRecord,
    unresolved: Vec<FileId>,
    fingerprint: String,
}

impl CachedRecord {
    fn from_built(built: BuiltRecord) -> Self {
        CachedRecord {
            record: built.record,
            unresolved: built.unresolved,
            fingerprint: built.fingerprint,
        }
    }

    fn to_entry(&self, root: &Path) -> CacheEntry {
        let rel = |id: &FileId| id.relative_to(root).to_string_lossy().into_owned();
        let dependencies = self.record.dependencies();
        CacheEntry {
            path: rel(&self.record.owner),
            extends: self.record.extends.iter().map(rel).collect(),
            includes: self.record.includes.iter().map(rel).collect(),
            dependency_count: dependencies.len(),
            dependencies: dependencies.iter().map(rel).collect(),
            fingerprint: self.fingerprint.clone(),
            unresolved: self.unresolved.iter().map(rel).collect(),
        }
    }

    fn from_entry(entry: CacheEntry, root: &Path) -> Self {
        let abs = |p: &String| FileId::resolve(root, p);
        CachedRecord {
            record: InheritanceRecord {
                owner: abs(&entry.path),
                extends: entry.extends.iter().map(abs).collect(),
                includes: entry.includes.iter().map(abs).collect(),
            },
            unresolved: entry.unresolved.iter().map(abs).collect(),
            fingerprint: entry.fingerprint,
        }
    }
}

/// Everything a lookup needs besides the cache itself.
pub struct ResolveContext<'a> {
    pub storage: &'a dyn Storage,
    pub resolver: &'a PathResolver,
    pub known: &'a ProjectFiles,
}

impl ResolveContext<'_> {
    fn build(&self, file: &FileId) -> Result<BuiltRecord, LineageError> {
        let tokens = scan_file(self.storage, file, self.resolver)?;
        Ok(build_record(file, &tokens, self.known)?)
    }
}

/// A record and whether it came from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub record: InheritanceRecord,
    pub state: ResolveState,
}

/// Outcome of a pruning pass.
#[derive(Debug, Default)]
pub struct PruneReport {
    /// Owners that no longer exist; their entries are gone.
    pub removed: Vec<FileId>,
    /// Entries rebuilt because they referenced a removed file.
    pub refreshed: Vec<FileId>,
}

#[derive(Debug)]
pub struct ResolutionCache {
    root: PathBuf,
    cache_file: PathBuf,
    enabled: bool,
    entries: BTreeMap<String, CachedRecord>,
    /// Files rebuilt by cascade since the last `take_refreshed`.
    refreshed: Vec<FileId>,
}

impl ResolutionCache {
    pub fn new(config: &Config) -> Self {
        ResolutionCache {
            root: config.base_directory.clone(),
            cache_file: config.cache_file(),
            enabled: config.cache_enabled,
            entries: BTreeMap::new(),
            refreshed: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Filesystem-safe key: the root-relative path with separators and
    /// punctuation replaced by `_`.
    pub fn cache_key(&self, file: &FileId) -> String {
        file.relative_to(&self.root)
            .to_string_lossy()
            .trim_start_matches(['/', '\\'])
            .chars()
            .map(|c| match c {
                '/' | '\\' | '-' | '.' | ':' => '_',
                other => other,
            })
            .collect()
    }

    /// The stored record for `file`, if any.
    pub fn record(&self, file: &FileId) -> Option<&InheritanceRecord> {
        self.entries
            .get(&self.cache_key(file))
            .map(|cached| &cached.record)
            .filter(|record| &record.owner == file)
    }

    /// Load the persisted document. On any failure the cache starts empty and
    /// the error is returned for reporting. A missing file is not an error.
    pub fn load(&mut self, storage: &dyn Storage) -> Result<(), CacheError> {
        self.entries.clear();
        if !self.enabled {
            return Ok(());
        }

        let path = self.cache_file.clone();
        let bytes = match storage.read_optional(&path) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("No cache at {}, starting empty", path.display());
                return Ok(());
            }
            Err(source) => return Err(CacheError::Read { path, source }),
        };

        let document: CacheDocument =
            serde_json::from_slice(&bytes).map_err(|e| CacheError::Parse {
                path: path.clone(),
                message: e.to_string(),
            })?;

        if document.version != CACHE_VERSION {
            return Err(CacheError::Version {
                path,
                found: document.version,
                expected: CACHE_VERSION,
            });
        }
        if document.root != self.root {
            return Err(CacheError::RootMismatch {
                path,
                found: document.root,
                expected: self.root.clone(),
            });
        }

        for (key, entry) in document.entries {
            let cached = CachedRecord::from_entry(entry, &self.root);
            if self.cache_key(&cached.record.owner) != key {
                warn!("Dropping cache entry {} whose path does not match its key", key);
                continue;
            }
            self.entries.insert(key, cached);
        }
        info!("Loaded {} cached records from {}", self.entries.len(), path.display());
        Ok(())
    }

    /// Write the whole cache as one pretty-printed JSON document.
    pub fn persist(&self, storage: &dyn Storage) -> Result<(), CacheError> {
        if !self.enabled {
            return Ok(());
        }

        let document = CacheDocument {
            version: CACHE_VERSION,
            root: self.root.clone(),
            saved_at: Some(chrono::Utc::now().to_rfc3339()),
            entries: self
                .entries
                .iter()
                .map(|(key, cached)| (key.clone(), cached.to_entry(&self.root)))
                .collect(),
        };

        let json = serde_json::to_vec_pretty(&document).map_err(|e| CacheError::Parse {
            path: self.cache_file.clone(),
            message: e.to_string(),
        })?;
        storage
            .write(&self.cache_file, &json)
            .map_err(|source| CacheError::Write {
                path: self.cache_file.clone(),
                source,
            })?;
        debug!("Cache saved: {} ({} entries)", self.cache_file.display(), self.entries.len());
        Ok(())
    }

    /// Remove the persisted document and forget every entry.
    pub fn clear(&mut self, storage: &dyn Storage) -> Result<(), CacheError> {
        self.entries.clear();
        storage
            .remove(&self.cache_file)
            .map_err(|source| CacheError::Write {
                path: self.cache_file.clone(),
                source,
            })
    }

    /// Look up `file`, rebuilding its record when missing or stale.
    pub fn resolve(&mut self, file: &FileId, ctx: &ResolveContext<'_>) -> Result<Resolved, LineageError> {
        let built = ctx.build(file)?;

        if !self.enabled {
            return Ok(Resolved {
                record: built.record,
                state: ResolveState::New,
            });
        }

        let key = self.cache_key(file);
        let stale = match self.entries.get(&key) {
            Some(cached) if &cached.record.owner == file => {
                let fingerprint_changed = cached.fingerprint != built.fingerprint;
                let target_appeared = cached.unresolved.iter().any(|t| ctx.known.contains(t));
                let target_vanished = cached.record.dependencies().iter().any(|t| !ctx.known.contains(t));
                if !fingerprint_changed && !target_appeared && !target_vanished {
                    debug!("Cache hit: {}", file);
                    return Ok(Resolved {
                        record: cached.record.clone(),
                        state: ResolveState::Cached,
                    });
                }
                debug!(
                    "Cache stale: {} (fingerprint changed: {}, target appeared: {}, target vanished: {})",
                    file, fingerprint_changed, target_appeared, target_vanished
                );
                true
            }
            Some(_) => {
                debug!("Cache key collision for {}, treating as miss", file);
                false
            }
            None => {
                debug!("Cache miss: {}", file);
                false
            }
        };

        let record = built.record.clone();
        self.entries.insert(key, CachedRecord::from_built(built));
        if stale {
            self.refresh_dependents(file, ctx);
        }

        Ok(Resolved {
            record,
            state: ResolveState::New,
        })
    }

    /// Remove entries whose owner no longer exists or has left the known
    /// set, and refresh every entry that listed one of them as a dependency.
    pub fn prune(&mut self, ctx: &ResolveContext<'_>) -> PruneReport {
        let mut report = PruneReport::default();
        if !self.enabled {
            return report;
        }

        let missing: Vec<(String, FileId)> = self
            .entries
            .iter()
            .filter(|(_, cached)| {
                let owner = &cached.record.owner;
                !ctx.known.contains(owner) || !ctx.storage.exists(owner.as_path())
            })
            .map(|(key, cached)| (key.clone(), cached.record.owner.clone()))
            .collect();

        // Pruned files must not survive into the refreshed records.
        let remaining: ProjectFiles = ctx
            .known
            .iter()
            .filter(|f| !missing.iter().any(|(_, owner)| owner == *f))
            .cloned()
            .collect();
        let ctx = ResolveContext {
            storage: ctx.storage,
            resolver: ctx.resolver,
            known: &remaining,
        };

        for (key, owner) in missing {
            info!("Pruning cache entry for {}", owner);
            self.entries.remove(&key);
            self.refresh_dependents(&owner, &ctx);
            report.removed.push(owner);
        }

        report.refreshed = self.take_refreshed();
        report
    }

    /// Files rebuilt by cascading refreshes since the last call.
    pub fn take_refreshed(&mut self) -> Vec<FileId> {
        std::mem::take(&mut self.refreshed)
    }

    /// Rebuild every entry whose record references `target`. The cascade
    /// stops here: the dependents' own sources did not change.
    fn refresh_dependents(&mut self, target: &FileId, ctx: &ResolveContext<'_>) {
        let dependents: Vec<(String, FileId)> = self
            .entries
            .iter()
            .filter(|(_, cached)| &cached.record.owner != target && cached.record.references(target))
            .map(|(key, cached)| (key.clone(), cached.record.owner.clone()))
            .collect();

        for (key, owner) in dependents {
            if !ctx.storage.exists(owner.as_path()) {
                // Left for the pruning pass.
                continue;
            }
            match ctx.build(&owner) {
                Ok(built) => {
                    debug!("Refreshed {} after change to {}", owner, target);
                    self.entries.insert(key, CachedRecord::from_built(built));
                    if !self.refreshed.contains(&owner) {
                        self.refreshed.push(owner);
                    }
                }
                Err(e) => {
                    warn!("Dropping cache entry for {}: {}", owner, e);
                    self.entries.remove(&key);
                }
            }
        }
    }
}
