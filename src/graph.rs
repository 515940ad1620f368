//! The dependency graph, a graph between files.
//!
//! Edges point from a dependent to its dependency and remember how they were
//! learned: declared by a build rule, discovered by scanning content, or
//! reported by a build step after it ran.  The scheduler queries it for
//! "everything X needs" and, for change propagation, "everything that needs X".

use crate::cache::DepCache;
use crate::canon::canon_path;
use crate::search_path::{SearchPath, SearchPathId, SearchPaths};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use std::hash::BuildHasherDefault;
use std::sync::{Arc, Mutex, RwLock};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);
impl NodeId {
    fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum EdgeKind {
    /// Declared by a build rule.
    Explicit,
    /// Found by scanning the dependent's content.
    Implicit,
    /// Reported by the build step's own output (e.g. a compiler depfile)
    /// after it ran, for use in the next build.
    Output,
}

impl EdgeKind {
    fn bit(self) -> u8 {
        match self {
            EdgeKind::Explicit => 1,
            EdgeKind::Implicit => 2,
            EdgeKind::Output => 4,
        }
    }
}

/// The set of kinds an edge was added with.  An edge that is both declared
/// and scanned keeps both, so the explicit provenance is never lost.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct EdgeKinds(u8);

impl EdgeKinds {
    pub fn contains(self, kind: EdgeKind) -> bool {
        self.0 & kind.bit() != 0
    }
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
    fn insert(&mut self, kind: EdgeKind) {
        self.0 |= kind.bit();
    }
    fn remove(&mut self, kind: EdgeKind) {
        self.0 &= !kind.bit();
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Edge {
    pub node: NodeId,
    pub kinds: EdgeKinds,
}

#[derive(Debug, Default)]
struct Links {
    deps: Vec<Edge>,
    dependents: Vec<NodeId>,
}

/// Interns canonical paths to NodeIds.  Shared by scanning threads, which
/// create nodes for the files they discover.
#[derive(Default)]
struct NodeTable {
    ids: DashMap<Arc<str>, NodeId, BuildHasherDefault<FxHasher>>,
    names: RwLock<Vec<Arc<str>>>,
}

impl NodeTable {
    fn lookup(&self, canon: &str) -> Option<NodeId> {
        self.ids.get(canon).map(|id| *id)
    }

    fn intern(&self, canon: String) -> NodeId {
        if let Some(id) = self.lookup(&canon) {
            return id;
        }
        // The entry holds its shard lock while we append, so two threads
        // racing on one name agree on its id.
        match self.ids.entry(Arc::from(canon)) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let mut names = self.names.write().unwrap();
                let id = NodeId(names.len());
                names.push(entry.key().clone());
                entry.insert(id);
                id
            }
        }
    }

    fn name(&self, id: NodeId) -> Arc<str> {
        self.names.read().unwrap()[id.index()].clone()
    }

    fn len(&self) -> usize {
        self.names.read().unwrap().len()
    }
}

pub struct Graph {
    nodes: NodeTable,
    links: Vec<Links>,
    /// Memoized transitive_closure() results.
    closures: Mutex<FxHashMap<NodeId, Arc<[NodeId]>>>,
    search_paths: SearchPaths,
    cache: DepCache,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Graph {
        Self::with_cache(DepCache::new())
    }

    pub fn with_cache(cache: DepCache) -> Graph {
        Graph {
            nodes: NodeTable::default(),
            links: Vec::new(),
            closures: Mutex::new(FxHashMap::default()),
            search_paths: SearchPaths::default(),
            cache,
        }
    }

    /// Look up or create the node for a path.
    pub fn file_id(&self, path: &str) -> NodeId {
        self.nodes.intern(canon_path(path))
    }

    /// Look up an existing node by path.
    pub fn lookup(&self, path: &str) -> Option<NodeId> {
        self.nodes.lookup(&canon_path(path))
    }

    /// The canonical path of a node.
    pub fn name(&self, id: NodeId) -> Arc<str> {
        self.nodes.name(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cache(&self) -> &DepCache {
        &self.cache
    }

    pub fn search_path(&mut self, path: SearchPath) -> SearchPathId {
        self.search_paths.intern(path)
    }

    pub fn search_paths(&self) -> &SearchPaths {
        &self.search_paths
    }

    fn links_mut(&mut self, id: NodeId) -> &mut Links {
        if id.index() >= self.links.len() {
            self.links.resize_with(id.index() + 1, Links::default);
        }
        &mut self.links[id.index()]
    }

    /// Add an edge, or a kind to an existing edge.  Returns true if the
    /// graph changed.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) -> bool {
        let links = self.links_mut(from);
        if let Some(edge) = links.deps.iter_mut().find(|edge| edge.node == to) {
            if edge.kinds.contains(kind) {
                return false;
            }
            // Same topology, so cached closures stay valid.
            edge.kinds.insert(kind);
            return true;
        }
        let mut kinds = EdgeKinds::default();
        kinds.insert(kind);
        links.deps.push(Edge { node: to, kinds });
        self.links_mut(to).dependents.push(from);
        self.invalidate(from);
        true
    }

    /// Replace the edges of one kind leaving `from` with `deps`, leaving edges
    /// of other kinds alone.  Edges of `kind` are listed first, in the order
    /// of `deps`.  Returns true if anything changed, including the order.
    pub fn set_deps(&mut self, from: NodeId, kind: EdgeKind, deps: &[NodeId]) -> bool {
        let mut wanted: FxHashMap<NodeId, usize> = FxHashMap::default();
        for (rank, &dep) in deps.iter().enumerate() {
            wanted.entry(dep).or_insert(rank);
        }
        let mut changed = false;
        let mut dropped = Vec::new();
        let links = self.links_mut(from);
        for edge in links.deps.iter_mut() {
            if edge.kinds.contains(kind) && !wanted.contains_key(&edge.node) {
                edge.kinds.remove(kind);
                changed = true;
            }
        }
        links.deps.retain(|edge| {
            if edge.kinds.is_empty() {
                dropped.push(edge.node);
                false
            } else {
                true
            }
        });
        for &to in &dropped {
            self.links_mut(to).dependents.retain(|&id| id != from);
        }
        if !dropped.is_empty() {
            self.invalidate(from);
        }
        for &to in deps {
            changed |= self.add_edge(from, to, kind);
        }

        let links = self.links_mut(from);
        let before: Vec<NodeId> = links.deps.iter().map(|edge| edge.node).collect();
        links.deps.sort_by_key(|edge| {
            if edge.kinds.contains(kind) {
                wanted[&edge.node]
            } else {
                usize::MAX
            }
        });
        let reordered = links.deps.iter().map(|edge| edge.node).ne(before);
        if reordered {
            self.invalidate(from);
        }
        changed || reordered
    }

    /// Direct dependencies of a node.  Edges from the latest `set_deps` come
    /// first in the order given there; others follow in insertion order.
    pub fn dependencies(&self, id: NodeId) -> &[Edge] {
        match self.links.get(id.index()) {
            Some(links) => &links.deps,
            None => &[],
        }
    }

    pub fn dependencies_of_kind(
        &self,
        id: NodeId,
        kind: EdgeKind,
    ) -> impl Iterator<Item = NodeId> + '_ {
        self.dependencies(id)
            .iter()
            .filter(move |edge| edge.kinds.contains(kind))
            .map(|edge| edge.node)
    }

    /// Nodes with a direct edge to this one.
    pub fn dependents(&self, id: NodeId) -> &[NodeId] {
        match self.links.get(id.index()) {
            Some(links) => &links.dependents,
            None => &[],
        }
    }

    /// Everything a node needs, dependencies before their dependents, not
    /// including the node itself.  Cycles are cut at the first revisit.
    pub fn transitive_closure(&self, id: NodeId) -> Arc<[NodeId]> {
        if let Some(closure) = self.closures.lock().unwrap().get(&id) {
            return closure.clone();
        }

        let mut order = Vec::new();
        let mut seen = FxHashSet::default();
        seen.insert(id);
        // (node, index of the next dependency to visit)
        let mut stack = vec![(id, 0)];
        while let Some(top) = stack.len().checked_sub(1) {
            let (node, next) = stack[top];
            let deps = self.dependencies(node);
            if next < deps.len() {
                stack[top].1 += 1;
                let dep = deps[next].node;
                if seen.insert(dep) {
                    stack.push((dep, 0));
                }
            } else {
                stack.pop();
                if node != id {
                    order.push(node);
                }
            }
        }

        let closure: Arc<[NodeId]> = order.into();
        self.closures
            .lock()
            .unwrap()
            .insert(id, closure.clone());
        closure
    }

    /// Everything that transitively depends on a node, nearest first.
    pub fn transitive_dependents(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut seen = FxHashSet::default();
        seen.insert(id);
        let mut queue = std::collections::VecDeque::from([id]);
        while let Some(node) = queue.pop_front() {
            for &dependent in self.dependents(node) {
                if seen.insert(dependent) {
                    found.push(dependent);
                    queue.push_back(dependent);
                }
            }
        }
        found
    }

    /// Drop cached closures that could have passed through `id`.
    fn invalidate(&mut self, id: NodeId) {
        if self.closures.get_mut().unwrap().is_empty() {
            return;
        }
        let mut stale = self.transitive_dependents(id);
        stale.push(id);
        let closures = self.closures.get_mut().unwrap();
        for node in stale {
            closures.remove(&node);
        }
    }

    #[cfg(test)]
    fn closure_cached(&self, id: NodeId) -> bool {
        self.closures.lock().unwrap().contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(graph: &Graph, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|&id| graph.name(id).to_string()).collect()
    }

    #[test]
    fn interning() {
        let graph = Graph::new();
        let a = graph.file_id("src/a.c");
        assert_eq!(graph.file_id("./src/../src/a.c"), a);
        assert_ne!(graph.file_id("src/b.c"), a);
        assert_eq!(&*graph.name(a), "src/a.c");
        assert_eq!(graph.lookup("src//a.c"), Some(a));
        assert_eq!(graph.lookup("nope"), None);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn edge_kinds_merge() {
        let mut graph = Graph::new();
        let a = graph.file_id("a.c");
        let h = graph.file_id("a.h");
        assert!(graph.add_edge(a, h, EdgeKind::Explicit));
        assert!(graph.set_deps(a, EdgeKind::Implicit, &[h]));
        assert_eq!(graph.dependencies(a).len(), 1);
        let kinds = graph.dependencies(a)[0].kinds;
        assert!(kinds.contains(EdgeKind::Explicit));
        assert!(kinds.contains(EdgeKind::Implicit));
        assert_eq!(graph.dependents(h), &[a]);

        // Dropping the scanned edge keeps the declared one.
        assert!(graph.set_deps(a, EdgeKind::Implicit, &[]));
        assert_eq!(graph.dependencies(a).len(), 1);
        assert!(!graph.dependencies(a)[0].kinds.contains(EdgeKind::Implicit));
        assert_eq!(graph.dependents(h), &[a]);
    }

    #[test]
    fn set_deps_replaces() {
        let mut graph = Graph::new();
        let a = graph.file_id("a.c");
        let x = graph.file_id("x.h");
        let y = graph.file_id("y.h");
        assert!(graph.set_deps(a, EdgeKind::Implicit, &[x]));
        assert!(!graph.set_deps(a, EdgeKind::Implicit, &[x]));
        assert!(graph.set_deps(a, EdgeKind::Implicit, &[y]));
        let deps: Vec<_> = graph.dependencies_of_kind(a, EdgeKind::Implicit).collect();
        assert_eq!(deps, vec![y]);
        assert!(graph.dependents(x).is_empty());
        assert_eq!(graph.dependents(y), &[a]);
    }

    #[test]
    fn set_deps_order_is_canonical() {
        let mut graph = Graph::new();
        let a = graph.file_id("a.c");
        let x = graph.file_id("x.h");
        let y = graph.file_id("y.h");
        graph.set_deps(a, EdgeKind::Implicit, &[y]);
        assert!(graph.set_deps(a, EdgeKind::Implicit, &[x, y]));
        let deps: Vec<_> = graph.dependencies_of_kind(a, EdgeKind::Implicit).collect();
        assert_eq!(deps, vec![x, y]);
        assert!(!graph.set_deps(a, EdgeKind::Implicit, &[x, y]));
        assert_eq!(names(&graph, &graph.transitive_closure(a)), vec!["x.h", "y.h"]);
        // Same set in a new order still counts as a change.
        assert!(graph.set_deps(a, EdgeKind::Implicit, &[y, x]));
        assert!(!graph.closure_cached(a));
        assert_eq!(names(&graph, &graph.transitive_closure(a)), vec!["y.h", "x.h"]);
    }

    #[test]
    fn closure_order_and_cycles() {
        let mut graph = Graph::new();
        let prog = graph.file_id("prog");
        let o = graph.file_id("main.o");
        let c = graph.file_id("main.c");
        let h = graph.file_id("main.h");
        graph.add_edge(prog, o, EdgeKind::Explicit);
        graph.add_edge(o, c, EdgeKind::Explicit);
        graph.add_edge(c, h, EdgeKind::Implicit);
        graph.add_edge(h, c, EdgeKind::Implicit);
        assert_eq!(
            names(&graph, &graph.transitive_closure(prog)),
            vec!["main.h", "main.c", "main.o"]
        );
        assert_eq!(names(&graph, &graph.transitive_closure(c)), vec!["main.h"]);
        assert_eq!(
            names(&graph, &graph.transitive_dependents(h)),
            vec!["main.c", "main.o", "prog"]
        );
    }

    #[test]
    fn incremental_invalidation() {
        let mut graph = Graph::new();
        let a = graph.file_id("a");
        let b = graph.file_id("b");
        let c = graph.file_id("c");
        let other = graph.file_id("other");
        let lib = graph.file_id("lib");
        graph.add_edge(a, b, EdgeKind::Explicit);
        graph.add_edge(other, lib, EdgeKind::Explicit);
        graph.transitive_closure(a);
        graph.transitive_closure(other);
        assert!(graph.closure_cached(a));

        graph.add_edge(b, c, EdgeKind::Implicit);
        assert!(!graph.closure_cached(a));
        assert!(graph.closure_cached(other));
        assert_eq!(names(&graph, &graph.transitive_closure(a)), vec!["c", "b"]);
    }
}
