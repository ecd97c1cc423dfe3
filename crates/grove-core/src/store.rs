//! Generic id-keyed directed graph using petgraph::StableDiGraph

use crate::error::{GraphError, Result};
use indexmap::IndexMap;
use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;

/// A vertex as stored in the arena: its id alongside its value.
#[derive(Debug, Clone)]
struct Vertex<K, V> {
    id: K,
    value: V,
}

/// Directed graph keyed by opaque vertex ids, one value per vertex.
///
/// Vertices live in a petgraph arena; `index` maps ids to arena slots and
/// remembers insertion order, which is the order every query reports in.
/// At most one edge exists per ordered pair of vertices.
#[derive(Clone)]
pub struct GraphStore<K, V> {
    inner: StableDiGraph<Vertex<K, V>, ()>,
    index: IndexMap<K, NodeIndex>,
}

impl<K, V> std::fmt::Debug for GraphStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("vertex_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl<K, V> Default for GraphStore<K, V> {
    fn default() -> Self {
        GraphStore {
            inner: StableDiGraph::default(),
            index: IndexMap::new(),
        }
    }
}

impl<K, V> GraphStore<K, V>
where
    K: Clone + Eq + Hash + Display,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex. Fails with `DuplicateVertex` if the id is taken.
    pub fn add_vertex(&mut self, id: K, value: V) -> Result<()> {
        if self.index.contains_key(&id) {
            return Err(GraphError::DuplicateVertex(id.to_string()));
        }
        let idx = self.inner.add_node(Vertex {
            id: id.clone(),
            value,
        });
        self.index.insert(id, idx);
        Ok(())
    }

    /// Value for `id`, inserting the result of `default` when absent.
    pub fn get_or_insert_with(&mut self, id: K, default: impl FnOnce() -> V) -> &mut V {
        let idx = match self.index.get(&id) {
            Some(&idx) => idx,
            None => {
                let idx = self.inner.add_node(Vertex {
                    id: id.clone(),
                    value: default(),
                });
                self.index.insert(id, idx);
                idx
            }
        };
        &mut self.inner[idx].value
    }

    /// Insert `value` under `id`. An existing vertex keeps its edges and
    /// position; only its value is swapped.
    pub fn insert_vertex(&mut self, id: K, value: V) -> &mut V {
        match self.index.get(&id) {
            Some(&idx) => {
                let slot = &mut self.inner[idx].value;
                *slot = value;
                slot
            }
            None => self.get_or_insert_with(id, || value),
        }
    }

    pub fn has_vertex<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(id)
    }

    /// Value stored for `id`, or `None` when the vertex does not exist.
    pub fn vertex_value<Q>(&self, id: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.index.get(id)?;
        self.inner.node_weight(*idx).map(|v| &v.value)
    }

    pub fn vertex_value_mut<Q>(&mut self, id: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.index.get(id)?;
        self.inner.node_weight_mut(*idx).map(|v| &mut v.value)
    }

    /// The stored key equal to `id`.
    pub fn vertex_key<Q>(&self, id: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get_key_value(id).map(|(k, _)| k)
    }

    /// Remove an edge-free vertex and return its value.
    pub fn remove_vertex<Q>(&mut self, id: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        let idx = self.node(id)?;
        if self.inner.neighbors_undirected(idx).next().is_some() {
            return Err(GraphError::VertexHasEdges(id.to_string()));
        }
        self.destroy_vertex(id)
    }

    /// Remove a vertex together with every incident edge.
    pub fn destroy_vertex<Q>(&mut self, id: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        let idx = self
            .index
            .shift_remove(id)
            .ok_or_else(|| GraphError::not_found(id))?;
        self.inner
            .remove_node(idx)
            .map(|v| v.value)
            .ok_or_else(|| GraphError::not_found(id))
    }

    /// Add the edge `from -> to`. Both endpoints must exist.
    pub fn add_edge<Q>(&mut self, from: &Q, to: &Q) -> Result<()>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        let a = self.node(from)?;
        let b = self.node(to)?;
        if self.inner.find_edge(a, b).is_some() {
            return Err(GraphError::DuplicateEdge {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        self.inner.add_edge(a, b, ());
        Ok(())
    }

    pub fn remove_edge<Q>(&mut self, from: &Q, to: &Q) -> Result<()>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        let edge = match (self.index.get(from), self.index.get(to)) {
            (Some(&a), Some(&b)) => self.inner.find_edge(a, b),
            _ => None,
        };
        let edge = edge.ok_or_else(|| GraphError::edge_not_found(from, to))?;
        self.inner.remove_edge(edge);
        Ok(())
    }

    pub fn has_edge<Q>(&self, from: &Q, to: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&a), Some(&b)) => self.inner.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// Iterate over `(id, value)` pairs in insertion order.
    ///
    /// The iterator is lazy and borrows the store; call again to restart.
    pub fn vertices(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.index
            .values()
            .filter_map(move |&idx| self.inner.node_weight(idx))
            .map(|v| (&v.id, &v.value))
    }

    /// Iterate over vertex ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &K> + '_ {
        self.index.keys()
    }

    /// Every edge as `(from, to)`, grouped by `from` in insertion order.
    pub fn edges(&self) -> Vec<(&K, &K)> {
        let mut out = Vec::with_capacity(self.inner.edge_count());
        for &idx in self.index.values() {
            for next in self.sorted_neighbors(idx, Direction::Outgoing) {
                out.push((self.key(idx), self.key(next)));
            }
        }
        out
    }

    pub fn vertex_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Direct successors of `id` (targets of its outgoing edges).
    pub fn edges_from<Q>(&self, id: &Q) -> Result<Vec<&K>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        let idx = self.node(id)?;
        Ok(self.keys(self.sorted_neighbors(idx, Direction::Outgoing)))
    }

    /// Direct predecessors of `id` (sources of its incoming edges).
    pub fn edges_to<Q>(&self, id: &Q) -> Result<Vec<&K>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        let idx = self.node(id)?;
        Ok(self.keys(self.sorted_neighbors(idx, Direction::Incoming)))
    }

    pub fn out_degree<Q>(&self, id: &Q) -> Result<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        let idx = self.node(id)?;
        Ok(self.inner.neighbors_directed(idx, Direction::Outgoing).count())
    }

    pub fn in_degree<Q>(&self, id: &Q) -> Result<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        let idx = self.node(id)?;
        Ok(self.inner.neighbors_directed(idx, Direction::Incoming).count())
    }

    /// Every vertex reachable from `id` along outgoing edges, depth-first
    /// preorder. `id` itself appears only when it sits on a cycle.
    pub fn vertices_with_path_from<Q>(&self, id: &Q) -> Result<Vec<&K>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        let idx = self.node(id)?;
        Ok(self.keys(self.reachable(idx, Direction::Outgoing)))
    }

    /// Every vertex that reaches `id` along incoming edges, depth-first
    /// preorder. `id` itself appears only when it sits on a cycle.
    pub fn vertices_with_path_to<Q>(&self, id: &Q) -> Result<Vec<&K>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        let idx = self.node(id)?;
        Ok(self.keys(self.reachable(idx, Direction::Incoming)))
    }

    /// Enumerate every simple cycle.
    ///
    /// Uses Johnson's algorithm inside each strongly connected component.
    /// A cycle is reported starting at its earliest-inserted vertex; the
    /// closing edge runs from the last element back to the first. A
    /// self-loop is a one-element cycle.
    ///
    /// The number of simple cycles can grow exponentially with density.
    /// Callers working on untrusted graphs must bound the input.
    pub fn cycles(&self) -> Vec<Vec<&K>> {
        let mut found: Vec<Vec<NodeIndex>> = Vec::new();

        for component in tarjan_scc(&self.inner) {
            if component.len() == 1 {
                let n = component[0];
                if self.inner.find_edge(n, n).is_some() {
                    found.push(vec![n]);
                }
                continue;
            }

            let mut members = component;
            members.sort_by_key(|&n| self.position(n));
            for (rank, &start) in members.iter().enumerate() {
                let allowed: HashSet<NodeIndex> = members[rank..].iter().copied().collect();
                let mut search = CircuitSearch {
                    store: self,
                    allowed,
                    start,
                    blocked: HashSet::new(),
                    blocked_by: HashMap::new(),
                    path: Vec::new(),
                    found: &mut found,
                };
                search.circuit(start);
            }
        }

        found.sort_by_cached_key(|cycle| cycle.iter().map(|&n| self.position(n)).collect::<Vec<_>>());
        found.into_iter().map(|cycle| self.keys(cycle)).collect()
    }

    /// Copy the graph, passing every value through `mapper`.
    ///
    /// Ids, edges and insertion order are preserved; the result shares no
    /// state with `self`.
    pub fn map_clone<W>(&self, mut mapper: impl FnMut(&K, &V) -> W) -> GraphStore<K, W> {
        let mut out = GraphStore {
            inner: StableDiGraph::with_capacity(self.inner.node_count(), self.inner.edge_count()),
            index: IndexMap::with_capacity(self.index.len()),
        };
        let mut remap: HashMap<NodeIndex, NodeIndex> = HashMap::with_capacity(self.index.len());

        for (id, &idx) in &self.index {
            if let Some(vertex) = self.inner.node_weight(idx) {
                let new_idx = out.inner.add_node(Vertex {
                    id: id.clone(),
                    value: mapper(id, &vertex.value),
                });
                out.index.insert(id.clone(), new_idx);
                remap.insert(idx, new_idx);
            }
        }
        for &idx in self.index.values() {
            for next in self.sorted_neighbors(idx, Direction::Outgoing) {
                if let (Some(&a), Some(&b)) = (remap.get(&idx), remap.get(&next)) {
                    out.inner.add_edge(a, b, ());
                }
            }
        }
        out
    }

    fn node<Q>(&self, id: &Q) -> Result<NodeIndex>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::not_found(id))
    }

    /// Insertion position of an arena slot.
    fn position(&self, idx: NodeIndex) -> usize {
        self.inner
            .node_weight(idx)
            .and_then(|v| self.index.get_index_of(&v.id))
            .unwrap_or(usize::MAX)
    }

    fn key(&self, idx: NodeIndex) -> &K {
        &self.inner[idx].id
    }

    fn keys(&self, nodes: Vec<NodeIndex>) -> Vec<&K> {
        nodes.into_iter().map(|n| self.key(n)).collect()
    }

    fn sorted_neighbors(&self, idx: NodeIndex, dir: Direction) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self.inner.neighbors_directed(idx, dir).collect();
        out.sort_by_key(|&n| self.position(n));
        out.dedup();
        out
    }

    fn reachable(&self, start: NodeIndex, dir: Direction) -> Vec<NodeIndex> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack: Vec<(Vec<NodeIndex>, usize)> = vec![(self.sorted_neighbors(start, dir), 0)];

        while let Some(frame) = stack.last_mut() {
            let next = frame.0.get(frame.1).copied();
            frame.1 += 1;
            match next {
                Some(next) => {
                    if visited.insert(next) {
                        order.push(next);
                        stack.push((self.sorted_neighbors(next, dir), 0));
                    }
                }
                None => {
                    stack.pop();
                }
            }
        }

        order
    }
}

/// State for one Johnson circuit search rooted at `start`.
struct CircuitSearch<'a, K, V> {
    store: &'a GraphStore<K, V>,
    allowed: HashSet<NodeIndex>,
    start: NodeIndex,
    blocked: HashSet<NodeIndex>,
    blocked_by: HashMap<NodeIndex, HashSet<NodeIndex>>,
    path: Vec<NodeIndex>,
    found: &'a mut Vec<Vec<NodeIndex>>,
}

impl<K, V> CircuitSearch<'_, K, V>
where
    K: Clone + Eq + Hash + Display,
{
    fn successors(&self, v: NodeIndex) -> Vec<NodeIndex> {
        self.store
            .sorted_neighbors(v, Direction::Outgoing)
            .into_iter()
            .filter(|w| self.allowed.contains(w))
            .collect()
    }

    fn circuit(&mut self, v: NodeIndex) -> bool {
        let mut closed = false;
        self.path.push(v);
        self.blocked.insert(v);

        let successors = self.successors(v);
        for &w in &successors {
            if w == self.start {
                self.found.push(self.path.clone());
                closed = true;
            } else if !self.blocked.contains(&w) && self.circuit(w) {
                closed = true;
            }
        }

        if closed {
            self.unblock(v);
        } else {
            for w in successors {
                self.blocked_by.entry(w).or_default().insert(v);
            }
        }

        self.path.pop();
        closed
    }

    fn unblock(&mut self, v: NodeIndex) {
        self.blocked.remove(&v);
        let mut pending: Vec<NodeIndex> = self.blocked_by.remove(&v).into_iter().flatten().collect();
        while let Some(w) = pending.pop() {
            if self.blocked.remove(&w) {
                pending.extend(self.blocked_by.remove(&w).into_iter().flatten());
            }
        }
    }
}
