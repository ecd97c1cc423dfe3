//! Dependency tree: build-domain semantics over [`GraphStore`]
//!
//! # Edge direction
//!
//! Every edge points from a dependency to its dependant: `child -> parent`
//! means "child is a dependency of parent". Entry files therefore have no
//! outgoing edges in a well-formed tree, and a topological order lists
//! dependencies before the files that need them.

use crate::error::{GraphError, Result};
use crate::file::{FileId, FileMut, FileNode, FileParams, TreeId};
use crate::options::{IdStrategy, TreeOptions};
use crate::snapshot::TreeSnapshot;
use crate::store::GraphStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, trace, warn};

/// Ordering requested from [`DependencyTree::files`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Insertion order.
    #[default]
    Graph,
    /// Dependencies before dependants. Fails on a cycle.
    Topological,
}

/// Counts describing a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    pub files: usize,
    pub dependencies: usize,
    pub entries: usize,
}

/// Outcome of [`DependencyTree::remove_cycles_until_stable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleBreakReport {
    /// Passes of [`DependencyTree::remove_cycles`] that ran.
    pub passes: usize,
    /// Removed `(child, parent)` edges, in removal order.
    pub removed: Vec<(FileId, FileId)>,
    /// Whether the tree was cycle-free when the loop stopped.
    pub acyclic: bool,
}

/// The dependency graph of a build.
pub struct DependencyTree {
    id: TreeId,
    graph: GraphStore<FileId, FileNode>,
    options: TreeOptions,
}

impl std::fmt::Debug for DependencyTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyTree")
            .field("files", &self.graph.vertex_count())
            .field("dependencies", &self.graph.edge_count())
            .field("options", &self.options)
            .finish()
    }
}

impl Default for DependencyTree {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for DependencyTree {
    /// Deep copy; every file is rebound to the new tree.
    fn clone(&self) -> Self {
        let id = TreeId::next();
        DependencyTree {
            id,
            graph: self.graph.map_clone(|_, node| node.rehome(Some(id))),
            options: self.options,
        }
    }
}

impl DependencyTree {
    pub fn new() -> Self {
        Self::with_options(TreeOptions::default())
    }

    pub fn with_options(options: TreeOptions) -> Self {
        DependencyTree {
            id: TreeId::next(),
            graph: GraphStore::new(),
            options,
        }
    }

    pub fn id(&self) -> TreeId {
        self.id
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.graph.vertex_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn stats(&self) -> TreeStats {
        TreeStats {
            files: self.graph.vertex_count(),
            dependencies: self.graph.edge_count(),
            entries: self.iter().filter(|f| f.is_entry()).count(),
        }
    }

    /// Underlying graph, for read-only algorithms.
    pub fn graph(&self) -> &GraphStore<FileId, FileNode> {
        &self.graph
    }

    // ── Files ───────────────────────────────────────────────

    /// Track a file. When a file with the resolved id exists it is returned
    /// unchanged, unless `params.force` is set, in which case its payload is
    /// replaced and its edges are kept.
    pub fn add_file(&mut self, params: impl Into<FileParams>, is_entry: bool) -> &mut FileNode {
        let params = params.into();
        let id = self.resolve_new_id(&params);
        let tree = self.id;

        if self.graph.has_vertex(id.as_str()) {
            if params.force {
                debug!(file = %id, "replacing file");
                let node = FileNode::from_params(id.clone(), params, is_entry, tree);
                return self.graph.insert_vertex(id, node);
            }
            trace!(file = %id, "file already tracked");
        } else {
            debug!(file = %id, entry = is_entry, "adding file");
        }

        let key = id.clone();
        self.graph
            .get_or_insert_with(key, move || FileNode::from_params(id, params, is_entry, tree))
    }

    pub fn has_file(&self, id: &str) -> bool {
        self.graph.has_vertex(id)
    }

    pub fn file(&self, id: &str) -> Option<&FileNode> {
        self.graph.vertex_value(id)
    }

    pub fn file_mut(&mut self, id: &str) -> Option<&mut FileNode> {
        self.graph.vertex_value_mut(id)
    }

    /// Mutable handle that forwards edge operations for one file.
    pub fn file_handle(&mut self, id: &str) -> Option<FileMut<'_>> {
        let id = self.graph.vertex_key(id)?.clone();
        Some(FileMut::new(self, id))
    }

    /// First file whose current or past path equals `path`.
    pub fn find_file(&self, path: impl AsRef<Path>) -> Option<&FileNode> {
        let path = path.as_ref();
        self.iter().find(|f| f.has_path(path))
    }

    /// All files in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &FileNode> + '_ {
        self.graph.vertices().map(|(_, node)| node)
    }

    pub fn files(&self, order: Order) -> Result<Vec<&FileNode>> {
        let ids = match order {
            Order::Graph => return Ok(self.iter().collect()),
            Order::Topological => self.topological_ids()?,
        };
        Ok(self.nodes(ids))
    }

    pub fn file_ids(&self, order: Order) -> Result<Vec<FileId>> {
        Ok(self.files(order)?.into_iter().map(|f| f.id().clone()).collect())
    }

    /// Remove a file. Without `force` the file must have no edges; with
    /// `force` its edges are removed with it.
    pub fn remove_file(&mut self, id: &str, force: bool) -> Result<FileNode> {
        let node = if force {
            self.graph.destroy_vertex(id)?
        } else {
            self.graph.remove_vertex(id)?
        };
        debug!(file = %id, force, "removed file");
        Ok(node)
    }

    // ── Dependencies ────────────────────────────────────────

    pub fn has_dependency(&self, parent: &str, child: &str) -> bool {
        self.graph.has_edge(child, parent)
    }

    pub fn has_dependant(&self, child: &str, parent: &str) -> bool {
        self.graph.has_edge(child, parent)
    }

    /// Record that `parent` depends on `child`, creating `child` if needed.
    ///
    /// `parent` must already be tracked. Re-adding an existing dependency is
    /// a no-op. Returns the child.
    pub fn add_dependency(&mut self, parent: &str, child: impl Into<FileParams>) -> Result<&mut FileNode> {
        if !self.graph.has_vertex(parent) {
            return Err(GraphError::not_found(parent));
        }
        let child = self.resolve_or_add(child.into());
        self.link(&child, parent)?;
        self.graph
            .vertex_value_mut(child.as_str())
            .ok_or_else(|| GraphError::not_found(&child))
    }

    /// Record that `parent` depends on `child`, creating `parent` if needed.
    ///
    /// `child` must already be tracked. Returns the parent.
    pub fn add_dependant(&mut self, child: &str, parent: impl Into<FileParams>) -> Result<&mut FileNode> {
        if !self.graph.has_vertex(child) {
            return Err(GraphError::not_found(child));
        }
        let parent = self.resolve_or_add(parent.into());
        self.link(child, &parent)?;
        self.graph
            .vertex_value_mut(parent.as_str())
            .ok_or_else(|| GraphError::not_found(&parent))
    }

    /// Drop the edge `child -> parent`.
    ///
    /// With [`TreeOptions::gc_orphans`] the child is removed as well when it
    /// is left without dependants and is not an entry. Only the child is
    /// collected; its own dependencies stay, even if they become orphaned.
    pub fn remove_dependency(&mut self, parent: &str, child: &str) -> Result<()> {
        self.graph.remove_edge(child, parent)?;
        debug!(parent = %parent, child = %child, "removed dependency");
        self.collect_orphan(child)?;
        Ok(())
    }

    /// Mirror of [`remove_dependency`](Self::remove_dependency), with the
    /// same collection rule applied to `child`.
    pub fn remove_dependant(&mut self, child: &str, parent: &str) -> Result<()> {
        self.remove_dependency(parent, child)
    }

    /// Files `id` depends on: direct, or the full transitive closure in
    /// depth-first order.
    pub fn dependencies_of(&self, id: &str, recursive: bool) -> Result<Vec<&FileNode>> {
        let ids = if recursive {
            self.graph.vertices_with_path_to(id)?
        } else {
            self.graph.edges_to(id)?
        };
        Ok(self.nodes(ids))
    }

    /// Files that depend on `id`: direct, or the full transitive closure in
    /// depth-first order.
    pub fn dependants_of(&self, id: &str, recursive: bool) -> Result<Vec<&FileNode>> {
        let ids = if recursive {
            self.graph.vertices_with_path_from(id)?
        } else {
            self.graph.edges_from(id)?
        };
        Ok(self.nodes(ids))
    }

    /// Entry files. With `from`, only the entries that (transitively)
    /// depend on `from`, including `from` itself when it is an entry.
    pub fn entries(&self, from: Option<&str>) -> Result<Vec<&FileNode>> {
        let Some(from) = from else {
            return Ok(self.iter().filter(|f| f.is_entry()).collect());
        };
        let reachable: HashSet<&FileId> = self.graph.vertices_with_path_from(from)?.into_iter().collect();
        Ok(self
            .iter()
            .filter(|f| f.is_entry() && (f.id().as_str() == from || reachable.contains(f.id())))
            .collect())
    }

    /// Re-point `child` from dependant `from` to dependant `to`.
    ///
    /// The new edge is added before the old one is removed, so orphan
    /// collection never sees `child` without dependants. Preconditions are
    /// checked first; a failure leaves the tree untouched.
    pub fn move_dependency(&mut self, from: &str, to: &str, child: &str) -> Result<()> {
        if !self.graph.has_vertex(to) {
            return Err(GraphError::not_found(to));
        }
        if !self.graph.has_edge(child, from) {
            return Err(GraphError::edge_not_found(child, from));
        }
        if from == to {
            return Ok(());
        }
        if !self.graph.has_edge(child, to) {
            self.graph.add_edge(child, to)?;
        }
        self.graph.remove_edge(child, from)?;
        debug!(child = %child, from = %from, to = %to, "moved dependency");
        Ok(())
    }

    // ── Ordering, pruning, cycles ───────────────────────────

    /// Remove every file that is neither an anchor nor a (transitive)
    /// dependency of one. Returns the removed ids in removal order:
    /// dependencies first, with cyclic leftovers in insertion order.
    pub fn prune(&mut self, anchors: &[FileId]) -> Result<Vec<FileId>> {
        let mut keep: HashSet<FileId> = HashSet::new();
        for anchor in anchors {
            let closure = self.graph.vertices_with_path_to(anchor.as_str())?;
            keep.extend(closure.into_iter().cloned());
            keep.insert(anchor.clone());
        }

        let doomed: Vec<FileId> = self.graph.ids().filter(|id| !keep.contains(*id)).cloned().collect();
        let ordered = self.removal_order(&doomed)?;
        for id in &ordered {
            self.graph.destroy_vertex(id.as_str())?;
        }

        debug!(removed = ordered.len(), kept = keep.len(), "pruned tree");
        Ok(ordered)
    }

    /// [`prune`](Self::prune) anchored at every entry file.
    pub fn prune_entries(&mut self) -> Result<Vec<FileId>> {
        let anchors: Vec<FileId> = self
            .iter()
            .filter(|f| f.is_entry())
            .map(|f| f.id().clone())
            .collect();
        self.prune(&anchors)
    }

    /// Simple cycles as id sequences; see [`GraphStore::cycles`].
    pub fn cycles(&self) -> Vec<Vec<FileId>> {
        self.graph
            .cycles()
            .into_iter()
            .map(|cycle| cycle.into_iter().cloned().collect())
            .collect()
    }

    /// Break cycles, best effort.
    ///
    /// For each cycle whose edges are all still present, the member with the
    /// highest out-degree (most dependants; ties go to the earliest member)
    /// loses its edge to the next member. The choice is a heuristic: it is
    /// not guaranteed to remove the fewest edges, and callers that need an
    /// acyclic tree should repeat until [`cycles`](Self::cycles) is empty, as
    /// [`remove_cycles_until_stable`](Self::remove_cycles_until_stable) does.
    ///
    /// Returns the removed `(child, parent)` edges.
    pub fn remove_cycles(&mut self) -> Result<Vec<(FileId, FileId)>> {
        let mut removed = Vec::new();

        for cycle in self.cycles() {
            let n = cycle.len();
            let intact = (0..n).all(|i| self.graph.has_edge(cycle[i].as_str(), cycle[(i + 1) % n].as_str()));
            if !intact {
                continue;
            }

            let mut pick = 0;
            let mut pick_degree = 0;
            for (i, id) in cycle.iter().enumerate() {
                let degree = self.graph.out_degree(id.as_str())?;
                if degree > pick_degree {
                    pick = i;
                    pick_degree = degree;
                }
            }

            let from = cycle[pick].clone();
            let to = cycle[(pick + 1) % n].clone();
            self.graph.remove_edge(from.as_str(), to.as_str())?;
            debug!(child = %from, parent = %to, cycle_len = n, "broke dependency cycle");
            removed.push((from, to));
        }

        Ok(removed)
    }

    /// Run [`remove_cycles`](Self::remove_cycles) until no cycle remains or
    /// `max_passes` passes have run.
    pub fn remove_cycles_until_stable(&mut self, max_passes: usize) -> Result<CycleBreakReport> {
        let mut report = CycleBreakReport {
            passes: 0,
            removed: Vec::new(),
            acyclic: self.graph.cycles().is_empty(),
        };

        while !report.acyclic && report.passes < max_passes {
            report.removed.extend(self.remove_cycles()?);
            report.passes += 1;
            report.acyclic = self.graph.cycles().is_empty();
        }

        if !report.acyclic {
            warn!(passes = report.passes, "cycles remain after cycle breaking");
        }
        Ok(report)
    }

    // ── Internals ───────────────────────────────────────────

    /// Load every file of `snapshot` under its recorded id, then its edges.
    pub(crate) fn restore(&mut self, snapshot: TreeSnapshot) -> Result<()> {
        for record in snapshot.files {
            let mut node = FileNode::try_from(record)?;
            node.bind(self.id);
            self.graph.add_vertex(node.id().clone(), node)?;
        }
        for (child, parent) in &snapshot.dependencies {
            self.graph.add_edge(child.as_str(), parent.as_str())?;
        }
        debug!(
            files = self.graph.vertex_count(),
            dependencies = self.graph.edge_count(),
            "restored tree"
        );
        Ok(())
    }

    fn nodes(&self, ids: Vec<&FileId>) -> Vec<&FileNode> {
        ids.into_iter()
            .filter_map(|id| self.graph.vertex_value(id.as_str()))
            .collect()
    }

    /// Id a new file would get.
    fn resolve_new_id(&self, params: &FileParams) -> FileId {
        if let Some(id) = &params.id {
            return id.clone();
        }
        match self.options.id_strategy {
            IdStrategy::Path => FileId::new(params.path.as_str()),
            IdStrategy::Generated => loop {
                let id = FileId::generate();
                if !self.graph.has_vertex(id.as_str()) {
                    break id;
                }
            },
        }
    }

    /// Id of the file `params` names, creating the file when unknown.
    ///
    /// With generated ids and no explicit id, an existing file is matched
    /// by path (current or historical).
    fn resolve_or_add(&mut self, params: FileParams) -> FileId {
        if params.id.is_none() && self.options.id_strategy == IdStrategy::Generated {
            if let Some(existing) = self.find_file(&params.path) {
                return existing.id().clone();
            }
        }
        self.add_file(params, false).id().clone()
    }

    fn link(&mut self, child: &str, parent: &str) -> Result<()> {
        if self.graph.has_edge(child, parent) {
            trace!(child = %child, parent = %parent, "dependency already recorded");
            return Ok(());
        }
        self.graph.add_edge(child, parent)?;
        debug!(child = %child, parent = %parent, "added dependency");
        Ok(())
    }

    fn collect_orphan(&mut self, id: &str) -> Result<bool> {
        if !self.options.gc_orphans {
            return Ok(false);
        }
        let orphaned = match self.graph.vertex_value(id) {
            Some(node) => !node.is_entry() && self.graph.out_degree(id)? == 0,
            None => false,
        };
        if orphaned {
            self.graph.destroy_vertex(id)?;
            debug!(file = %id, "collected orphaned file");
        }
        Ok(orphaned)
    }

    /// Kahn's algorithm over the whole graph; ties resolved by insertion
    /// order.
    fn topological_ids(&self) -> Result<Vec<&FileId>> {
        let ids: Vec<&FileId> = self.graph.ids().collect();
        let position: HashMap<&FileId, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut in_degree = Vec::with_capacity(ids.len());
        for id in &ids {
            in_degree.push(self.graph.in_degree(id.as_str())?);
        }
        let mut ready: BTreeSet<usize> = (0..ids.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(ids.len());

        while let Some(i) = ready.pop_first() {
            order.push(ids[i]);
            for next in self.graph.edges_from(ids[i].as_str())? {
                if let Some(&j) = position.get(next) {
                    in_degree[j] -= 1;
                    if in_degree[j] == 0 {
                        ready.insert(j);
                    }
                }
            }
        }

        if order.len() < ids.len() {
            let remaining = (0..ids.len())
                .filter(|&i| in_degree[i] > 0)
                .map(|i| ids[i].to_string())
                .collect();
            return Err(GraphError::CycleDetected { remaining });
        }
        Ok(order)
    }

    /// Kahn's algorithm restricted to `doomed`; members stuck on a cycle
    /// follow in their given order.
    fn removal_order(&self, doomed: &[FileId]) -> Result<Vec<FileId>> {
        let position: HashMap<&FileId, usize> = doomed.iter().enumerate().map(|(i, id)| (id, i)).collect();

        let mut in_degree = Vec::with_capacity(doomed.len());
        for id in doomed {
            let count = self
                .graph
                .edges_to(id.as_str())?
                .into_iter()
                .filter(|dep| position.contains_key(dep))
                .count();
            in_degree.push(count);
        }

        let mut ready: BTreeSet<usize> = (0..doomed.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut emitted = vec![false; doomed.len()];
        let mut order = Vec::with_capacity(doomed.len());

        while let Some(i) = ready.pop_first() {
            emitted[i] = true;
            order.push(doomed[i].clone());
            for next in self.graph.edges_from(doomed[i].as_str())? {
                if let Some(&j) = position.get(next) {
                    in_degree[j] -= 1;
                    if in_degree[j] == 0 {
                        ready.insert(j);
                    }
                }
            }
        }

        order.extend((0..doomed.len()).filter(|&i| !emitted[i]).map(|i| doomed[i].clone()));
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{chain, ids, tree_with};

    #[test]
    fn test_add_file_is_idempotent() {
        let mut tree = DependencyTree::new();
        tree.add_file("/a.js", true).set_contents(b"one".to_vec());
        let again = tree.add_file("/a.js", false);

        assert_eq!(again.contents(), Some(&b"one"[..]));
        assert!(again.is_entry());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_forced_add_replaces_payload_and_keeps_edges() {
        let mut tree = tree_with(&[("/b.js", "/a.js")]);
        let replaced = tree.add_file(FileParams::new("/b.js").with_contents("new").forced(), false);
        assert_eq!(replaced.contents(), Some(&b"new"[..]));
        assert!(tree.has_dependency("/a.js", "/b.js"));
    }

    #[test]
    fn test_add_dependency_requires_parent() {
        let mut tree = DependencyTree::new();
        let err = tree.add_dependency("/missing.js", "/child.js").unwrap_err();
        assert!(matches!(err, GraphError::VertexNotFound(id) if id == "/missing.js"));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_add_dependant_creates_parent() {
        let mut tree = DependencyTree::new();
        tree.add_file("/lib.js", false);
        let parent = tree.add_dependant("/lib.js", "/app.js").unwrap().id().clone();

        assert_eq!(parent.as_str(), "/app.js");
        assert!(tree.has_dependant("/lib.js", "/app.js"));
        assert!(tree.has_dependency("/app.js", "/lib.js"));
    }

    #[test]
    fn test_add_dependency_twice_is_noop() {
        let mut tree = tree_with(&[("/b.js", "/a.js")]);
        tree.add_dependency("/a.js", "/b.js").unwrap();
        assert_eq!(tree.dependency_count(), 1);
    }

    #[test]
    fn test_direct_and_recursive_queries() {
        // C -> B -> A
        let tree = chain(&["A", "B", "C"]);

        assert_eq!(ids(tree.dependencies_of("A", false).unwrap()), vec!["B"]);
        assert_eq!(ids(tree.dependencies_of("A", true).unwrap()), vec!["B", "C"]);
        assert_eq!(ids(tree.dependants_of("C", true).unwrap()), vec!["B", "A"]);
        assert!(tree.dependants_of("A", true).unwrap().is_empty());
        assert!(matches!(
            tree.dependencies_of("Z", false),
            Err(GraphError::VertexNotFound(_))
        ));
    }

    #[test]
    fn test_remove_file_without_force_needs_no_edges() {
        let mut tree = chain(&["A", "B"]);
        assert!(matches!(tree.remove_file("B", false), Err(GraphError::VertexHasEdges(_))));

        let removed = tree.remove_file("B", true).unwrap();
        assert_eq!(removed.id().as_str(), "B");
        assert_eq!(tree.dependency_count(), 0);
        assert!(tree.remove_file("A", false).is_ok());
    }

    #[test]
    fn test_remove_dependency_without_gc_keeps_child() {
        let mut tree = chain(&["A", "B"]);
        tree.remove_dependency("A", "B").unwrap();
        assert!(tree.has_file("B"));
        assert!(matches!(
            tree.remove_dependency("A", "B"),
            Err(GraphError::EdgeNotFound { .. })
        ));
    }

    #[test]
    fn test_remove_dependency_with_gc_collects_orphan() {
        let mut tree = DependencyTree::with_options(TreeOptions::default().with_gc_orphans(true));
        tree.add_file("A", true);
        tree.add_file("X", true);
        tree.add_dependency("A", "B").unwrap();
        tree.add_dependency("A", "C").unwrap();
        tree.add_dependency("X", "C").unwrap();

        tree.remove_dependency("A", "B").unwrap();
        assert!(!tree.has_file("B"));

        // C still has dependant X
        tree.remove_dependant("C", "A").unwrap();
        assert!(tree.has_file("C"));
    }

    #[test]
    fn test_gc_spares_entries() {
        let mut tree = DependencyTree::with_options(TreeOptions::default().with_gc_orphans(true));
        tree.add_file("A", true);
        tree.add_file("B", true);
        tree.add_dependency("A", "B").unwrap();
        tree.remove_dependency("A", "B").unwrap();
        assert!(tree.has_file("B"));
    }

    #[test]
    fn test_move_dependency_survives_gc() {
        let mut tree = DependencyTree::with_options(TreeOptions::default().with_gc_orphans(true));
        tree.add_file("A", true);
        tree.add_file("X", true);
        tree.add_dependency("A", "B").unwrap();

        tree.move_dependency("A", "X", "B").unwrap();

        assert!(tree.has_file("B"));
        assert!(tree.has_dependency("X", "B"));
        assert!(!tree.has_dependency("A", "B"));
    }

    #[test]
    fn test_move_dependency_validates_first() {
        let mut tree = chain(&["A", "B"]);
        assert!(matches!(
            tree.move_dependency("A", "missing", "B"),
            Err(GraphError::VertexNotFound(_))
        ));
        tree.add_file("X", false);
        assert!(matches!(
            tree.move_dependency("X", "A", "B"),
            Err(GraphError::EdgeNotFound { .. })
        ));
        assert!(tree.has_dependency("A", "B"));
    }

    #[test]
    fn test_topological_order_puts_dependencies_first() {
        let mut tree = chain(&["A", "B", "C"]);
        tree.add_dependency("A", "D").unwrap();
        tree.add_dependency("D", "C").unwrap();

        let order = tree.file_ids(Order::Topological).unwrap();
        insta::assert_snapshot!(order.join(" "), @"C B D A");
        for (child, parent) in tree.graph().edges() {
            let c = order.iter().position(|id| id == child).unwrap();
            let p = order.iter().position(|id| id == parent).unwrap();
            assert!(c < p, "{child} must precede {parent}");
        }
    }

    #[test]
    fn test_topological_order_rejects_cycles() {
        let mut tree = chain(&["A", "B", "C"]);
        tree.add_dependency("C", "A").unwrap();
        tree.add_file("D", false);

        match tree.files(Order::Topological) {
            Err(GraphError::CycleDetected { remaining }) => {
                assert_eq!(remaining, vec!["A", "B", "C"]);
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
        assert_eq!(tree.files(Order::Graph).unwrap().len(), 4);
    }

    #[test]
    fn test_entries_from() {
        let mut tree = DependencyTree::new();
        tree.add_file("page1", true);
        tree.add_file("page2", true);
        tree.add_dependency("page1", "shared").unwrap();
        tree.add_dependency("page2", "only2").unwrap();
        tree.add_dependency("only2", "shared").unwrap();

        assert_eq!(ids(tree.entries(None).unwrap()), vec!["page1", "page2"]);
        assert_eq!(ids(tree.entries(Some("shared")).unwrap()), vec!["page1", "page2"]);
        assert_eq!(ids(tree.entries(Some("only2")).unwrap()), vec!["page2"]);
        assert_eq!(ids(tree.entries(Some("page1")).unwrap()), vec!["page1"]);
    }

    #[test]
    fn test_prune_removes_unreachable() {
        // A <- B <- C <- D, and E <- F <- C
        let mut tree = chain(&["A", "B", "C", "D"]);
        tree.add_file("E", false);
        tree.add_dependency("E", "F").unwrap();
        tree.add_dependency("F", "C").unwrap();

        let removed = tree.prune(&[FileId::from("A")]).unwrap();
        assert_eq!(removed, vec![FileId::from("F"), FileId::from("E")]);
        assert_eq!(tree.file_ids(Order::Graph).unwrap(), vec!["A", "B", "C", "D"].into_iter().map(FileId::from).collect::<Vec<_>>());

        assert!(tree.prune(&[FileId::from("A")]).unwrap().is_empty());
    }

    #[test]
    fn test_prune_entries_handles_cyclic_garbage() {
        let mut tree = DependencyTree::new();
        tree.add_file("main", true);
        tree.add_dependency("main", "dep").unwrap();
        tree.add_file("x", false);
        tree.add_dependency("x", "y").unwrap();
        tree.add_dependency("y", "x").unwrap();

        let removed = tree.prune_entries().unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_prune_unknown_anchor_fails() {
        let mut tree = chain(&["A", "B"]);
        assert!(tree.prune(&[FileId::from("nope")]).is_err());
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_remove_cycles_breaks_highest_out_degree() {
        // B -> A, C -> B, A -> C closes the loop; B also feeds D.
        let mut tree = chain(&["A", "B", "C"]);
        tree.add_dependency("C", "A").unwrap();
        tree.add_dependant("B", "D").unwrap();

        let removed = tree.remove_cycles().unwrap();
        assert_eq!(removed, vec![(FileId::from("B"), FileId::from("A"))]);
        assert!(tree.cycles().is_empty());
        assert!(tree.files(Order::Topological).is_ok());
    }

    #[test]
    fn test_remove_cycles_tie_goes_to_first_member() {
        // a -> b -> c -> a, every member has one dependant.
        let mut tree = DependencyTree::new();
        for name in ["a", "b", "c"] {
            tree.add_file(name, false);
        }
        tree.add_dependency("b", "a").unwrap();
        tree.add_dependency("c", "b").unwrap();
        tree.add_dependency("a", "c").unwrap();
        assert_eq!(tree.cycles(), vec![vec![FileId::from("a"), FileId::from("b"), FileId::from("c")]]);

        let removed = tree.remove_cycles().unwrap();
        assert_eq!(removed, vec![(FileId::from("a"), FileId::from("b"))]);
        assert!(tree.has_dependency("c", "b"));
        assert!(tree.has_dependency("a", "c"));
    }

    #[test]
    fn test_remove_cycles_tie_follows_insertion_order() {
        // Same ring, but c was tracked first so the cycle starts there.
        let mut tree = DependencyTree::new();
        for name in ["c", "a", "b"] {
            tree.add_file(name, false);
        }
        tree.add_dependency("b", "a").unwrap();
        tree.add_dependency("c", "b").unwrap();
        tree.add_dependency("a", "c").unwrap();

        let removed = tree.remove_cycles().unwrap();
        assert_eq!(removed, vec![(FileId::from("c"), FileId::from("a"))]);
        assert!(tree.cycles().is_empty());
    }

    #[test]
    fn test_remove_cycles_until_stable_converges() {
        let mut tree = DependencyTree::new();
        let names = ["a", "b", "c", "d"];
        for name in names {
            tree.add_file(name, false);
        }
        for parent in names {
            for child in names {
                if parent != child {
                    tree.add_dependency(parent, child).unwrap();
                }
            }
        }

        let report = tree.remove_cycles_until_stable(10).unwrap();
        assert!(report.acyclic);
        assert!(report.passes >= 1 && report.passes <= 10);
        assert!(tree.cycles().is_empty());
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_clone_is_independent_and_rehomed() {
        let tree = chain(&["A", "B"]);
        let mut copy = tree.clone();

        assert_ne!(copy.id(), tree.id());
        let b = copy.file("B").unwrap();
        assert_eq!(b.tree(), copy.id());
        assert!(b.dependants(&copy, false).is_ok());
        assert!(matches!(
            b.dependants(&tree, false),
            Err(GraphError::ForeignFile(_))
        ));

        copy.remove_dependency("A", "B").unwrap();
        assert!(tree.has_dependency("A", "B"));
    }

    #[test]
    fn test_generated_ids_decouple_from_path() {
        let mut tree = DependencyTree::with_options(TreeOptions::default().with_id_strategy(IdStrategy::Generated));
        let entry = tree.add_file("/index.html", true).id().clone();
        assert_ne!(entry.as_str(), "/index.html");

        let child = tree.add_dependency(&entry, "/style.css").unwrap().id().clone();
        let again = tree.add_dependency(&entry, "/style.css").unwrap().id().clone();
        assert_eq!(child, again);
        assert_eq!(tree.len(), 2);

        tree.file_mut(&child).unwrap().set_file_type("scss");
        assert_eq!(tree.find_file("/style.css").map(|f| f.id()), Some(&child));
        assert_eq!(tree.find_file("/style.scss").map(|f| f.id()), Some(&child));
    }

    #[test]
    fn test_file_handle_delegates() {
        let mut tree = DependencyTree::with_options(TreeOptions::default().with_gc_orphans(true));
        tree.add_file("A", true);

        let mut handle = tree.file_handle("A").unwrap();
        let child = handle.add_dependency("B").unwrap();
        assert_eq!(handle.dependencies(false).unwrap().len(), 1);
        handle.remove_dependency(&child).unwrap();
        handle.set_analyzed(true).unwrap();

        assert!(!tree.has_file("B"));
        assert!(tree.file("A").unwrap().analyzed());
        assert!(tree.file_handle("missing").is_none());
    }

    #[test]
    fn test_stats() {
        let mut tree = chain(&["A", "B", "C"]);
        tree.add_file("E", true);
        assert_eq!(
            tree.stats(),
            TreeStats {
                files: 4,
                dependencies: 2,
                entries: 2,
            }
        );
    }
}
