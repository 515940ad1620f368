//! Memoization of scan results.
//!
//! Two levels, invalidated together: the raw includes of a node are valid for
//! one (scanner, content signature) pair, and the resolved dependency lists
//! hang off those includes, one per search path.  When the signature changes
//! both are recomputed; when only the search path differs the includes are
//! reused and just the resolution runs again.  A resolution that left some
//! include unresolved only lasts for the session that computed it, since the
//! missing file may be generated before the next one.

use crate::fs::{FileSystem, Signature, Stat};
use crate::graph::NodeId;
use crate::include::Include;
use crate::registry::ScannerId;
use crate::search_path::{SearchPath, SearchPathId};
use dashmap::DashMap;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::BuildHasherDefault;
use std::sync::Arc;
use tracing::debug;

type FxDashMap<K, V> = DashMap<K, V, BuildHasherDefault<FxHasher>>;

struct Resolution {
    deps: Arc<[NodeId]>,
    /// Every include matched a file.
    complete: bool,
}

struct Slot {
    scanner: ScannerId,
    signature: Signature,
    includes: Arc<[Include]>,
    resolved: FxHashMap<SearchPathId, Resolution>,
}

impl Slot {
    fn new(scanner: ScannerId, signature: Signature, includes: Arc<[Include]>) -> Self {
        Slot {
            scanner,
            signature,
            includes,
            resolved: FxHashMap::default(),
        }
    }

    fn matches(&self, scanner: ScannerId, signature: Signature) -> bool {
        self.scanner == scanner && self.signature == signature
    }
}

/// Persistence for scan results across invocations.  Consulted when the
/// in-memory cache misses; every fresh computation is offered to it.
///
/// Only complete resolutions are saved.  Those loaded from a store are trusted
/// as-is, so a header added to an earlier search directory since the last run
/// goes unnoticed until the includer changes or the store is dropped.
pub trait StateStore: Send + Sync {
    fn load_includes(
        &self,
        node: &str,
        scanner: &str,
        signature: Signature,
    ) -> Option<Vec<Include>>;
    fn save_includes(
        &self,
        node: &str,
        scanner: &str,
        signature: Signature,
        includes: &[Include],
    ) -> anyhow::Result<()>;
    fn load_resolved(
        &self,
        node: &str,
        scanner: &str,
        signature: Signature,
        path: &SearchPath,
    ) -> Option<Vec<String>>;
    fn save_resolved(
        &self,
        node: &str,
        scanner: &str,
        signature: Signature,
        path: &SearchPath,
        deps: &[String],
    ) -> anyhow::Result<()>;
}

impl<T: StateStore + ?Sized> StateStore for Arc<T> {
    fn load_includes(
        &self,
        node: &str,
        scanner: &str,
        signature: Signature,
    ) -> Option<Vec<Include>> {
        (**self).load_includes(node, scanner, signature)
    }
    fn save_includes(
        &self,
        node: &str,
        scanner: &str,
        signature: Signature,
        includes: &[Include],
    ) -> anyhow::Result<()> {
        (**self).save_includes(node, scanner, signature, includes)
    }
    fn load_resolved(
        &self,
        node: &str,
        scanner: &str,
        signature: Signature,
        path: &SearchPath,
    ) -> Option<Vec<String>> {
        (**self).load_resolved(node, scanner, signature, path)
    }
    fn save_resolved(
        &self,
        node: &str,
        scanner: &str,
        signature: Signature,
        path: &SearchPath,
        deps: &[String],
    ) -> anyhow::Result<()> {
        (**self).save_resolved(node, scanner, signature, path, deps)
    }
}

type IncludesKey = (String, String, Signature);
type ResolvedKey = (String, String, Signature, SearchPath);

/// A StateStore that lives as long as the process, e.g. to share results
/// between several graphs.
#[derive(Default)]
pub struct MemoryStore {
    includes: FxDashMap<IncludesKey, Vec<Include>>,
    resolved: FxDashMap<ResolvedKey, Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saved entries, includes and resolutions together.
    pub fn len(&self) -> usize {
        self.includes.len() + self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StateStore for MemoryStore {
    fn load_includes(
        &self,
        node: &str,
        scanner: &str,
        signature: Signature,
    ) -> Option<Vec<Include>> {
        let key = (node.to_owned(), scanner.to_owned(), signature);
        self.includes.get(&key).map(|includes| includes.clone())
    }

    fn save_includes(
        &self,
        node: &str,
        scanner: &str,
        signature: Signature,
        includes: &[Include],
    ) -> anyhow::Result<()> {
        let key = (node.to_owned(), scanner.to_owned(), signature);
        self.includes.insert(key, includes.to_vec());
        Ok(())
    }

    fn load_resolved(
        &self,
        node: &str,
        scanner: &str,
        signature: Signature,
        path: &SearchPath,
    ) -> Option<Vec<String>> {
        let key = (node.to_owned(), scanner.to_owned(), signature, path.clone());
        self.resolved.get(&key).map(|deps| deps.clone())
    }

    fn save_resolved(
        &self,
        node: &str,
        scanner: &str,
        signature: Signature,
        path: &SearchPath,
        deps: &[String],
    ) -> anyhow::Result<()> {
        let key = (node.to_owned(), scanner.to_owned(), signature, path.clone());
        self.resolved.insert(key, deps.to_vec());
        Ok(())
    }
}

/// Per-node scan state, shared by scanning threads.  Slots are locked per
/// dashmap shard and never held across a file read or a scan.
#[derive(Default)]
pub struct DepCache {
    stats: FxDashMap<NodeId, Stat>,
    slots: FxDashMap<NodeId, Slot>,
    store: Option<Box<dyn StateStore>>,
}

impl DepCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: Box<dyn StateStore>) -> Self {
        DepCache {
            store: Some(store),
            ..Self::default()
        }
    }

    pub fn store(&self) -> Option<&dyn StateStore> {
        self.store.as_deref()
    }

    /// Stat a node's file, at most once per session.
    pub fn stat(&self, fs: &dyn FileSystem, id: NodeId, path: &str) -> std::io::Result<Stat> {
        if let Some(stat) = self.stats.get(&id) {
            return Ok(*stat);
        }
        let stat = fs.stat(path)?;
        self.stats.insert(id, stat);
        Ok(stat)
    }

    /// The raw includes of a node for the given scanner and content
    /// signature, calling `compute` on a miss.  Installing new includes
    /// discards every resolution made from the old ones.
    pub fn includes(
        &self,
        id: NodeId,
        scanner: ScannerId,
        signature: Signature,
        compute: impl FnOnce() -> anyhow::Result<Vec<Include>>,
    ) -> anyhow::Result<Arc<[Include]>> {
        if let Some(slot) = self.slots.get(&id) {
            if slot.matches(scanner, signature) {
                return Ok(slot.includes.clone());
            }
        }

        let includes: Arc<[Include]> = compute()?.into();
        let mut slot = self
            .slots
            .entry(id)
            .or_insert_with(|| Slot::new(scanner, signature, includes.clone()));
        // Another thread may have installed the same result meanwhile; keep
        // its resolutions in that case.
        if !slot.matches(scanner, signature) {
            debug!(?id, "content changed, dropping resolutions");
            *slot = Slot::new(scanner, signature, includes);
        }
        Ok(slot.includes.clone())
    }

    /// Resolved dependencies of a node for a search path, if still valid for
    /// the node's current scanner and signature.
    pub fn resolved(
        &self,
        id: NodeId,
        scanner: ScannerId,
        signature: Signature,
        path: SearchPathId,
    ) -> Option<Arc<[NodeId]>> {
        let slot = self.slots.get(&id)?;
        if !slot.matches(scanner, signature) {
            return None;
        }
        slot.resolved.get(&path).map(|resolution| resolution.deps.clone())
    }

    /// Record a resolution.  Dropped if the node's includes were replaced
    /// since the resolution was computed.  `complete` is false when some
    /// include matched no file.
    pub fn set_resolved(
        &self,
        id: NodeId,
        scanner: ScannerId,
        signature: Signature,
        path: SearchPathId,
        deps: Arc<[NodeId]>,
        complete: bool,
    ) {
        if let Some(mut slot) = self.slots.get_mut(&id) {
            if slot.matches(scanner, signature) {
                slot.resolved.insert(path, Resolution { deps, complete });
            }
        }
    }

    /// Start a new session: files may have changed, so forget stat results
    /// and incomplete resolutions.  Includes and complete resolutions survive
    /// and are revalidated by signature.
    pub fn restat(&self) {
        self.stats.clear();
        for mut slot in self.slots.iter_mut() {
            slot.resolved.retain(|_, resolution| resolution.complete);
        }
    }

    /// Forget the stat result of one node, e.g. after it was rebuilt.
    pub fn restat_node(&self, id: NodeId) {
        self.stats.remove(&id);
    }

    /// Forget every resolution while keeping raw includes.  Needed when files
    /// may have appeared in search directories, which signatures of the
    /// includers don't reflect.
    pub fn forget_resolutions(&self) {
        for mut slot in self.slots.iter_mut() {
            slot.resolved.clear();
        }
    }

    /// Forget everything, as if nothing had been scanned.
    pub fn clear(&self) {
        self.stats.clear();
        self.slots.clear();
    }

    /// Whether the raw includes of a node are cached for this signature.
    pub fn is_scanned(&self, id: NodeId, scanner: ScannerId, signature: Signature) -> bool {
        self.slots
            .get(&id)
            .map_or(false, |slot| slot.matches(scanner, signature))
    }
}
