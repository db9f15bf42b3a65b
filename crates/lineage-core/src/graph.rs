//! Dependency graph over file identities using petgraph::StableDiGraph
//!
//! Edges point from a dependency to its dependent: if `page.pug` extends
//! `layout.pug`, the edge is `layout.pug -> page.pug`. Walking outgoing edges
//! from a file therefore yields everything that must be recompiled with it.

use crate::model::FileId;
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet, VecDeque};

/// Directed graph of project files. Edge weights are insertion sequence numbers.
pub struct DependencyGraph {
    inner: StableDiGraph<FileId, u64>,
    index: HashMap<FileId, NodeIndex>,
    edges: HashSet<(NodeIndex, NodeIndex)>,
    next_seq: u64,
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("vertex_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph {
            inner: StableDiGraph::new(),
            index: HashMap::new(),
            edges: HashSet::new(),
            next_seq: 0,
        }
    }

    /// Get or lazily create the vertex for `id`.
    pub fn add_vertex(&mut self, id: &FileId) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.inner.add_node(id.clone());
        self.index.insert(id.clone(), idx);
        idx
    }

    /// Add `src -> dst`, creating both vertices if absent.
    /// Returns false when the edge already existed.
    pub fn add_edge(&mut self, src: &FileId, dst: &FileId) -> bool {
        let source = self.add_vertex(src);
        let target = self.add_vertex(dst);
        if !self.edges.insert((source, target)) {
            return false;
        }
        self.inner.add_edge(source, target, self.next_seq);
        self.next_seq += 1;
        true
    }

    pub fn has_edge(&self, src: &FileId, dst: &FileId) -> bool {
        match (self.index.get(src), self.index.get(dst)) {
            (Some(&s), Some(&d)) => self.edges.contains(&(s, d)),
            _ => false,
        }
    }

    pub fn contains(&self, id: &FileId) -> bool {
        self.index.contains_key(id)
    }

    pub fn vertex_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Replace the dependencies of `owner`: every incoming edge is dropped and
    /// one `dependency -> owner` edge is added per entry of `dependencies`.
    pub fn set_dependencies<'a>(
        &mut self,
        owner: &FileId,
        dependencies: impl IntoIterator<Item = &'a FileId>,
    ) {
        let owner_idx = self.add_vertex(owner);
        let stale: Vec<_> = self
            .inner
            .edges_directed(owner_idx, Direction::Incoming)
            .map(|edge| (edge.id(), edge.source()))
            .collect();
        for (edge_id, source) in stale {
            self.inner.remove_edge(edge_id);
            self.edges.remove(&(source, owner_idx));
        }

        for dependency in dependencies {
            self.add_edge(dependency, owner);
        }
    }

    /// Remove a vertex and all its edges.
    pub fn remove_vertex(&mut self, id: &FileId) -> bool {
        let Some(idx) = self.index.remove(id) else {
            return false;
        };
        self.edges.retain(|&(s, d)| s != idx && d != idx);
        self.inner.remove_node(idx);
        true
    }

    /// Drop every vertex for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(&FileId) -> bool) {
        let doomed: Vec<FileId> = self.index.keys().filter(|id| !keep(id)).cloned().collect();
        for id in doomed {
            tracing::debug!("Dropping vertex {}", id);
            self.remove_vertex(&id);
        }
    }

    /// Direct neighbors of `id` in `direction`, in edge insertion order.
    pub fn neighbors(&self, id: &FileId, direction: Direction) -> Vec<FileId> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        self.neighbor_indices(idx, direction)
            .into_iter()
            .filter_map(|n| self.inner.node_weight(n).cloned())
            .collect()
    }

    /// Breadth-first walk from `start` over edges in `direction`.
    ///
    /// Each vertex is visited at most once and `start` itself is never part of
    /// the result, so cycles terminate.
    pub fn traverse_reachable(&self, start: &FileId, direction: Direction) -> Vec<FileId> {
        let Some(&start_idx) = self.index.get(start) else {
            return Vec::new();
        };

        let mut visited = HashSet::from([start_idx]);
        let mut queue = VecDeque::from([start_idx]);
        let mut reached = Vec::new();

        while let Some(current) = queue.pop_front() {
            for next in self.neighbor_indices(current, direction) {
                if visited.insert(next) {
                    if let Some(id) = self.inner.node_weight(next) {
                        reached.push(id.clone());
                    }
                    queue.push_back(next);
                }
            }
        }

        reached
    }

    /// Order `subset` so each file comes after every file of the subset it
    /// depends on. Ties keep `subset` order. Returns `None` when the subset
    /// contains a cycle.
    pub fn topological_order(&self, subset: &[FileId]) -> Option<Vec<FileId>> {
        let position: HashMap<NodeIndex, usize> = subset
            .iter()
            .enumerate()
            .filter_map(|(pos, id)| self.index.get(id).map(|&idx| (idx, pos)))
            .collect();

        let mut in_degree: HashMap<NodeIndex, usize> = position.keys().map(|&idx| (idx, 0)).collect();
        for &idx in position.keys() {
            for next in self.neighbor_indices(idx, Direction::Outgoing) {
                if let Some(degree) = in_degree.get_mut(&next) {
                    *degree += 1;
                }
            }
        }

        let mut ready: Vec<NodeIndex> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(&idx, _)| idx)
            .collect();
        ready.sort_by_key(|idx| position[idx]);
        let mut queue = VecDeque::from(ready);

        let mut order = Vec::with_capacity(subset.len());
        while let Some(current) = queue.pop_front() {
            if let Some(id) = self.inner.node_weight(current) {
                order.push(id.clone());
            }
            for next in self.neighbor_indices(current, Direction::Outgoing) {
                if let Some(degree) = in_degree.get_mut(&next) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(next);
                    }
                }
            }
        }

        // Files of the subset missing from the graph have no edges at all.
        let mut ordered: Vec<FileId> = subset
            .iter()
            .filter(|id| !self.index.contains_key(*id))
            .cloned()
            .collect();
        if order.len() < position.len() {
            return None;
        }
        ordered.extend(order);
        Some(ordered)
    }

    fn neighbor_indices(&self, idx: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut edges: Vec<(u64, NodeIndex)> = self
            .inner
            .edges_directed(idx, direction)
            .map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                (*edge.weight(), other)
            })
            .collect();
        edges.sort_by_key(|&(seq, _)| seq);
        edges.into_iter().map(|(_, other)| other).collect()
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
