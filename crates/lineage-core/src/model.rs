//! Core data structures for template inheritance

use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Canonical absolute path uniquely identifying a project file.
///
/// Identities are normalized lexically: `.` segments are dropped and `..`
/// segments fold into their parent, so `views/../views/a.pug` and
/// `views/a.pug` under the same root are the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(PathBuf);

impl FileId {
    /// Build an identity for `path`, joining it onto `base` when relative.
    pub fn resolve(base: &Path, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.is_absolute() {
            FileId(normalize(path))
        } else {
            FileId(normalize(&base.join(path)))
        }
    }

    /// Build an identity from a path that is already absolute.
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileId(normalize(path.as_ref()))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Directory containing this file; relative directive targets resolve against it.
    pub fn parent(&self) -> &Path {
        self.0.parent().unwrap_or_else(|| Path::new("/"))
    }

    /// Path relative to `root`, or the full path when the file lives elsewhere.
    pub fn relative_to(&self, root: &Path) -> PathBuf {
        self.0
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| self.0.clone())
    }

    pub fn has_extension(&self) -> bool {
        self.0.extension().is_some()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for FileId {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Lexically normalize a path without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// The two inheritance statements a template can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DirectiveKind {
    Extends,
    Include,
}

impl DirectiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveKind::Extends => "extends",
            DirectiveKind::Include => "include",
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An `extends`/`include` statement paired with its resolved target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub target: FileId,
}

/// Extends/include targets discovered for one file.
///
/// Every target is a member of the project file set the record was built
/// against; untracked targets never make it in here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InheritanceRecord {
    pub owner: FileId,
    pub extends: Vec<FileId>,
    pub includes: Vec<FileId>,
}

impl InheritanceRecord {
    pub fn new(owner: FileId) -> Self {
        InheritanceRecord {
            owner,
            extends: Vec::new(),
            includes: Vec::new(),
        }
    }

    /// All targets, extends first, without duplicates across the two kinds.
    pub fn dependencies(&self) -> Vec<FileId> {
        let mut seen = HashSet::new();
        self.extends
            .iter()
            .chain(self.includes.iter())
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect()
    }

    pub fn dependency_count(&self) -> usize {
        self.dependencies().len()
    }

    /// Whether `target` appears among this record's extends or includes.
    pub fn references(&self, target: &FileId) -> bool {
        self.extends.contains(target) || self.includes.contains(target)
    }
}

/// Whether a record came out of the cache or had to be recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolveState {
    New,
    Cached,
}

/// The known project file set: insertion-ordered, with O(1) membership.
#[derive(Debug, Clone, Default)]
pub struct ProjectFiles {
    order: Vec<FileId>,
    members: HashSet<FileId>,
}

impl ProjectFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file. Returns false if it was already known.
    pub fn insert(&mut self, id: FileId) -> bool {
        if self.members.insert(id.clone()) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, id: &FileId) -> bool {
        self.members.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileId> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl FromIterator<FileId> for ProjectFiles {
    fn from_iter<I: IntoIterator<Item = FileId>>(iter: I) -> Self {
        let mut files = ProjectFiles::new();
        for id in iter {
            files.insert(id);
        }
        files
    }
}

impl Extend<FileId> for ProjectFiles {
    fn extend<I: IntoIterator<Item = FileId>>(&mut self, iter: I) {
        for id in iter {
            self.insert(id);
        }
    }
}
