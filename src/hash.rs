//! A single hash over a dependency list, as a build step would record it to
//! decide later whether its inputs changed.
//!
//! The hash covers names and content signatures in list order, so it is only
//! stable if the list order is; discovery sorts its results for that reason.

use crate::fs::{FileSystem, Stat};
use crate::graph::{Graph, NodeId};
use std::collections::hash_map::DefaultHasher;
use std::hash::{self, Hasher};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Hash(pub u64);

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Designed to not serialize too much: values go straight into the hasher,
/// with a separator between variable-length parts.
#[derive(Default)]
struct TerseHash(DefaultHasher);

const UNIT_SEPARATOR: u8 = 0x1F;

impl TerseHash {
    fn write_string(&mut self, string: &str) {
        hash::Hash::hash(string, &mut self.0);
    }

    fn write_stat(&mut self, stat: Stat) {
        hash::Hash::hash(&stat, &mut self.0);
    }

    fn write_separator(&mut self) {
        self.0.write_u8(UNIT_SEPARATOR);
    }

    fn finish(&mut self) -> Hash {
        Hash(self.0.finish())
    }
}

/// Hash the names and current stats of `deps`.  Stats come from the graph's
/// per-session memo, so files are not re-stated within a session.
pub fn fingerprint(graph: &Graph, fs: &dyn FileSystem, deps: &[NodeId]) -> std::io::Result<Hash> {
    let mut hasher = TerseHash::default();
    for &id in deps {
        let name = graph.name(id);
        let stat = graph.cache().stat(fs, id, &name)?;
        hasher.write_string(&name);
        hasher.write_stat(stat);
    }
    hasher.write_separator();
    Ok(hasher.finish())
}
