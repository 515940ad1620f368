//! Discovery of implicit dependencies: scan a file, resolve what it
//! includes, and follow the includes transitively.

use crate::cache::StateStore;
use crate::canon::{dirname, sort_key};
use crate::fs::{FileSystem, Signature};
use crate::graph::{EdgeKind, Graph, NodeId};
use crate::include::{Include, IncludeScanner};
use crate::registry::{ScannerId, ScannerRegistry};
use crate::resolve::{resolve, SearchOrder};
use crate::search_path::{SearchPath, SearchPathId};
use crate::trace;
use crate::tree;
use crate::warnings::{Unresolved, Warnings};
use anyhow::anyhow;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// A scan request that could not be completed.  Other requests are
/// unaffected.
#[derive(Debug)]
pub struct ScanFailure {
    pub node: NodeId,
    pub error: anyhow::Error,
}

/// The scan driver.  Borrows its collaborators so one graph can be scanned
/// with several configurations over its lifetime.
pub struct Discovery<'a> {
    registry: &'a ScannerRegistry,
    fs: &'a dyn FileSystem,
    warnings: &'a dyn Warnings,
}

/// Order dependencies by case-folded, separator-normalized name so results
/// don't depend on traversal order or platform.  Removes duplicates.
fn sort_deps(graph: &Graph, deps: &mut Vec<NodeId>) {
    deps.sort_by_cached_key(|&id| {
        let name = graph.name(id);
        (sort_key(&name), name)
    });
    deps.dedup();
}

impl<'a> Discovery<'a> {
    pub fn new(
        registry: &'a ScannerRegistry,
        fs: &'a dyn FileSystem,
        warnings: &'a dyn Warnings,
    ) -> Self {
        Discovery {
            registry,
            fs,
            warnings,
        }
    }

    fn read_includes(
        &self,
        name: &str,
        scanner: &dyn IncludeScanner,
        signature: Signature,
        store: Option<&dyn StateStore>,
    ) -> anyhow::Result<Vec<Include>> {
        if let Some(includes) = store.and_then(|s| s.load_includes(name, scanner.name(), signature)) {
            debug!(name, "includes loaded from store");
            return Ok(includes);
        }
        let content = trace::scope("read", || self.fs.read(name))
            .map_err(|err| anyhow!("read {}: {}", name, err))?;
        let text = String::from_utf8_lossy(&content);
        let includes = trace::scope("scan", || scanner.scan(&text));
        debug!(name, scanner = scanner.name(), count = includes.len(), "scanned");
        if let Some(store) = store {
            if let Err(err) = store.save_includes(name, scanner.name(), signature, &includes) {
                warn!("save includes of {}: {}", name, err);
            }
        }
        Ok(includes)
    }

    fn resolve_includes(
        &self,
        graph: &Graph,
        id: NodeId,
        name: &str,
        includes: &[Include],
        search_path: &SearchPath,
    ) -> (Vec<NodeId>, bool) {
        let origin = dirname(name);
        let mut deps = Vec::new();
        let mut seen = FxHashSet::default();
        let mut complete = true;
        for include in includes {
            let order = include.kind.search_order();
            match resolve(self.fs, &include.name, order, search_path.dirs(), origin) {
                Some(path) => {
                    let dep = graph.file_id(&path);
                    // A file including itself adds nothing.
                    if dep != id && seen.insert(dep) {
                        deps.push(dep);
                    }
                }
                None => {
                    complete = false;
                    self.warnings.unresolved(Unresolved {
                        include: include.name.clone(),
                        includer: name.to_owned(),
                        origin: match order {
                            SearchOrder::IncluderFirst => Some(origin.to_owned()),
                            SearchOrder::ConfiguredOnly => None,
                        },
                        search_path: search_path.clone(),
                    });
                }
            }
        }
        (deps, complete)
    }

    /// The files a node includes directly, in source order, as resolved
    /// along `path`.  A node that is not an existing file has none yet.
    pub fn direct_deps(
        &self,
        graph: &Graph,
        id: NodeId,
        scanner: ScannerId,
        path: SearchPathId,
    ) -> anyhow::Result<Arc<[NodeId]>> {
        let cache = graph.cache();
        let name = graph.name(id);
        let stat = cache
            .stat(self.fs, id, &name)
            .map_err(|err| anyhow!("stat {}: {}", name, err))?;
        let signature = match stat.signature() {
            Some(signature) => signature,
            None => {
                debug!(name = &*name, ?stat, "not a file, nothing to scan");
                return Ok(Vec::new().into());
            }
        };

        if let Some(deps) = cache.resolved(id, scanner, signature, path) {
            return Ok(deps);
        }

        let scanner_impl = self.registry.get(scanner);
        let store = cache.store();
        let includes = cache.includes(id, scanner, signature, || {
            self.read_includes(&name, scanner_impl, signature, store)
        })?;

        let search_path = graph.search_paths().get(path);
        let loaded = store
            .and_then(|s| s.load_resolved(&name, scanner_impl.name(), signature, search_path));
        let (deps, complete): (Arc<[NodeId]>, bool) = match loaded {
            Some(names) => (names.iter().map(|dep| graph.file_id(dep)).collect(), true),
            None => {
                let (deps, complete) =
                    self.resolve_includes(graph, id, &name, &includes, search_path);
                // A missing include may be generated later, so only complete
                // resolutions persist.
                if let Some(store) = store.filter(|_| complete) {
                    let names: Vec<String> = deps.iter().map(|&dep| graph.name(dep).to_string()).collect();
                    if let Err(err) =
                        store.save_resolved(&name, scanner_impl.name(), signature, search_path, &names)
                    {
                        warn!("save resolution of {}: {}", name, err);
                    }
                }
                (deps.into(), complete)
            }
        };
        cache.set_resolved(id, scanner, signature, path, deps.clone(), complete);
        Ok(deps)
    }

    /// The scanner for a file found by including it: its own if its suffix is
    /// registered, otherwise the includer's.
    fn scanner_for(&self, graph: &Graph, id: NodeId, includer: ScannerId) -> ScannerId {
        self.registry.for_path(&graph.name(id)).unwrap_or(includer)
    }

    /// Every file `root` transitively includes when resolved along `path`,
    /// without duplicates and in a stable order.  `root` itself is never part
    /// of the result, even when an include cycle leads back to it.
    pub fn implicit_deps(
        &self,
        graph: &Graph,
        root: NodeId,
        path: SearchPathId,
    ) -> anyhow::Result<Vec<NodeId>> {
        let scanner = match self.registry.for_path(&graph.name(root)) {
            Some(scanner) => scanner,
            None => return Ok(Vec::new()),
        };

        let mut found = Vec::new();
        let mut seen = FxHashSet::default();
        seen.insert(root);
        let mut stack = vec![(root, scanner)];
        while let Some((node, scanner)) = stack.pop() {
            let deps = self.direct_deps(graph, node, scanner, path)?;
            for &dep in deps.iter().rev() {
                if seen.insert(dep) {
                    found.push(dep);
                    stack.push((dep, self.scanner_for(graph, dep, scanner)));
                }
            }
        }

        sort_deps(graph, &mut found);
        Ok(found)
    }

    /// Scan many roots in parallel and record the results as implicit edges.
    /// A root requested with several search paths gets the union.
    pub fn scan_all(
        &self,
        graph: &mut Graph,
        requests: &[(NodeId, SearchPathId)],
    ) -> Vec<ScanFailure> {
        let results: Vec<(NodeId, anyhow::Result<Vec<NodeId>>)> = {
            let graph = &*graph;
            trace::scope("scan_all", || {
                requests
                    .par_iter()
                    .map(|&(id, path)| (id, self.implicit_deps(graph, id, path)))
                    .collect()
            })
        };

        let mut failures = Vec::new();
        let mut merged: Vec<(NodeId, Vec<NodeId>)> = Vec::new();
        let mut index: FxHashMap<NodeId, usize> = FxHashMap::default();
        for (id, result) in results {
            match result {
                Ok(deps) => match index.get(&id) {
                    Some(&i) => merged[i].1.extend(deps),
                    None => {
                        index.insert(id, merged.len());
                        merged.push((id, deps));
                    }
                },
                Err(error) => failures.push(ScanFailure { node: id, error }),
            }
        }

        for (id, mut deps) in merged {
            if failures.iter().any(|failure| failure.node == id) {
                continue;
            }
            sort_deps(graph, &mut deps);
            if graph.set_deps(id, EdgeKind::Implicit, &deps) {
                debug!(name = &*graph.name(id), count = deps.len(), "implicit deps changed");
            }
        }
        failures
    }

    /// Render what `root` includes as a tree, one level per include, in
    /// source order.
    pub fn include_tree(
        &self,
        graph: &Graph,
        root: NodeId,
        path: SearchPathId,
        prune: bool,
    ) -> anyhow::Result<String> {
        let mut scanners: FxHashMap<NodeId, ScannerId> = FxHashMap::default();
        if let Some(scanner) = self.registry.for_path(&graph.name(root)) {
            scanners.insert(root, scanner);
        }
        tree::render_tree(
            root,
            |node| {
                let scanner = match scanners.get(&node) {
                    Some(&scanner) => scanner,
                    None => return Ok(Vec::new()),
                };
                let deps = self.direct_deps(graph, node, scanner, path)?;
                for &dep in deps.iter() {
                    let dep_scanner = self.scanner_for(graph, dep, scanner);
                    scanners.entry(dep).or_insert(dep_scanner);
                }
                Ok(deps.to_vec())
            },
            |node| graph.name(node),
            prune,
        )
    }
}
